use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use checkout_types::domain::cart::{Cart, CartItem};
use checkout_types::domain::order::{Order, OrderStatus};
use checkout_types::domain::product::Product;
use checkout_types::ports::cart_store::CartStore;
use checkout_types::ports::catalog_store::CatalogStore;
use checkout_types::ports::inventory_ledger::{InventoryLedger, LedgerError, ReservationToken};
use checkout_types::ports::order_store::OrderStore;
use checkout_types::ports::StoreError;

#[derive(Debug, Clone)]
struct Hold {
    product_id: Uuid,
    qty: u32,
    expires_at: DateTime<Utc>,
}

/// In-memory adapter. Per-product serialization comes from the dashmap
/// entry guard held while the stock counter is examined and mutated.
#[derive(Clone)]
pub struct MemoryStore {
    products: Arc<DashMap<Uuid, Product>>,
    reservations: Arc<DashMap<Uuid, Hold>>,
    carts: Arc<DashMap<Uuid, Vec<CartItem>>>,
    orders: Arc<DashMap<Uuid, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            products: Arc::new(DashMap::new()),
            reservations: Arc::new(DashMap::new()),
            carts: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
        }
    }

    fn restore_stock(&self, product_id: Uuid, qty: u32) {
        if let Some(mut product) = self.products.get_mut(&product_id) {
            product.stock += qty;
            product.updated_at = Utc::now();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError> {
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&id).map(|p| p.clone()))
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.products.iter().map(|kv| kv.value().clone()).collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(products)
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn reserve(
        &self,
        product_id: Uuid,
        qty: u32,
        ttl: chrono::Duration,
    ) -> Result<ReservationToken, LedgerError> {
        self.purge_expired().await?;

        let mut product = self
            .products
            .get_mut(&product_id)
            .ok_or(LedgerError::UnknownProduct(product_id))?;
        if product.stock < qty {
            return Err(LedgerError::InsufficientStock {
                product_id,
                requested: qty,
                available: product.stock,
            });
        }
        product.stock -= qty;
        product.updated_at = Utc::now();

        let token = ReservationToken::new();
        self.reservations.insert(
            token.0,
            Hold {
                product_id,
                qty,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(token)
    }

    async fn commit(&self, token: ReservationToken) -> Result<(), LedgerError> {
        self.purge_expired().await?;
        // The decrement already happened at reserve time; committing
        // just retires the hold.
        match self.reservations.remove(&token.0) {
            Some(_) => Ok(()),
            None => Err(LedgerError::ReservationNotFound(token)),
        }
    }

    async fn release(&self, token: ReservationToken) -> Result<(), LedgerError> {
        match self.reservations.remove(&token.0) {
            Some((_, hold)) => {
                self.restore_stock(hold.product_id, hold.qty);
                Ok(())
            }
            None => Err(LedgerError::ReservationNotFound(token)),
        }
    }

    async fn purge_expired(&self) -> Result<u64, LedgerError> {
        let now = Utc::now();
        let candidates: Vec<Uuid> = self
            .reservations
            .iter()
            .filter(|kv| kv.value().expires_at <= now)
            .map(|kv| *kv.key())
            .collect();

        let mut purged = 0;
        for token in candidates {
            if let Some((_, hold)) = self
                .reservations
                .remove_if(&token, |_, hold| hold.expires_at <= now)
            {
                self.restore_stock(hold.product_id, hold.qty);
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Cart, StoreError> {
        let mut items = self.carts.entry(user_id).or_default();
        match items.iter_mut().find(|i| i.product_id == product_id) {
            // Saturate rather than wrap; a wrapped merge could leave a
            // line at quantity 0.
            Some(line) => line.quantity = line.quantity.saturating_add(qty),
            None => items.push(CartItem {
                product_id,
                quantity: qty,
            }),
        }
        Ok(Cart {
            user_id,
            items: items.clone(),
        })
    }

    async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Option<Cart>, StoreError> {
        let Some(mut items) = self.carts.get_mut(&user_id) else {
            return Ok(None);
        };
        match items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => {
                line.quantity = qty;
                Ok(Some(Cart {
                    user_id,
                    items: items.clone(),
                }))
            }
            None => Ok(None),
        }
    }

    async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Cart>, StoreError> {
        let Some(mut items) = self.carts.get_mut(&user_id) else {
            return Ok(None);
        };
        match items.iter().position(|i| i.product_id == product_id) {
            Some(idx) => {
                items.remove(idx);
                Ok(Some(Cart {
                    user_id,
                    items: items.clone(),
                }))
            }
            None => Ok(None),
        }
    }

    async fn cart(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        Ok(Cart {
            user_id,
            items: self
                .carts
                .get(&user_id)
                .map(|items| items.clone())
                .unwrap_or_default(),
        })
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        if let Some(mut items) = self.carts.get_mut(&user_id) {
            items.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| kv.value().user_id == user_id)
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    async fn transition_from_pending(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_method_display: Option<String>,
    ) -> Result<Option<Order>, StoreError> {
        let Some(mut order) = self.orders.get_mut(&id) else {
            return Ok(None);
        };
        if order.status != OrderStatus::Pending {
            return Ok(None);
        }
        order.status = status;
        if payment_method_display.is_some() {
            order.payment_method_display = payment_method_display;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}
