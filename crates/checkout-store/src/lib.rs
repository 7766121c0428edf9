#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a store feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use uuid::Uuid;

use checkout_types::domain::cart::Cart;
use checkout_types::domain::order::{Order, OrderStatus};
use checkout_types::domain::product::Product;
use checkout_types::ports::cart_store::CartStore;
use checkout_types::ports::catalog_store::CatalogStore;
use checkout_types::ports::inventory_ledger::{InventoryLedger, LedgerError, ReservationToken};
use checkout_types::ports::order_store::OrderStore;
use checkout_types::ports::StoreError;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Facade over the enabled storage adapters.
#[derive(Clone)]
pub enum Store {
    #[cfg(feature = "memory")]
    Memory(memory::MemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteStore),
}

#[cfg(all(feature = "memory", not(feature = "sqlite")))]
pub async fn build_store(_: Option<&str>) -> anyhow::Result<Store> {
    Ok(Store::Memory(memory::MemoryStore::new()))
}

#[cfg(all(feature = "sqlite", not(feature = "memory")))]
pub async fn build_store(database_url: Option<&str>) -> anyhow::Result<Store> {
    let url = database_url.unwrap_or("sqlite://checkout.db");
    Ok(Store::Sqlite(sqlite::SqliteStore::new(url).await?))
}

// With both features enabled, a configured DATABASE_URL selects sqlite
// and its absence falls back to the in-memory adapter.
#[cfg(all(feature = "memory", feature = "sqlite"))]
pub async fn build_store(database_url: Option<&str>) -> anyhow::Result<Store> {
    match database_url {
        Some(url) => Ok(Store::Sqlite(sqlite::SqliteStore::new(url).await?)),
        None => Ok(Store::Memory(memory::MemoryStore::new())),
    }
}

#[async_trait]
impl CatalogStore for Store {
    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.upsert_product(product).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.upsert_product(product).await,
        }
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.get_product(id).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.get_product(id).await,
        }
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.list_products().await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.list_products().await,
        }
    }
}

#[async_trait]
impl InventoryLedger for Store {
    async fn reserve(
        &self,
        product_id: Uuid,
        qty: u32,
        ttl: chrono::Duration,
    ) -> Result<ReservationToken, LedgerError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.reserve(product_id, qty, ttl).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.reserve(product_id, qty, ttl).await,
        }
    }

    async fn commit(&self, token: ReservationToken) -> Result<(), LedgerError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.commit(token).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.commit(token).await,
        }
    }

    async fn release(&self, token: ReservationToken) -> Result<(), LedgerError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.release(token).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.release(token).await,
        }
    }

    async fn purge_expired(&self) -> Result<u64, LedgerError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.purge_expired().await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.purge_expired().await,
        }
    }
}

#[async_trait]
impl CartStore for Store {
    async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Cart, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.add_item(user_id, product_id, qty).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.add_item(user_id, product_id, qty).await,
        }
    }

    async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Option<Cart>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.set_quantity(user_id, product_id, qty).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.set_quantity(user_id, product_id, qty).await,
        }
    }

    async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Cart>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.remove_item(user_id, product_id).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.remove_item(user_id, product_id).await,
        }
    }

    async fn cart(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.cart(user_id).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.cart(user_id).await,
        }
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.clear_cart(user_id).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.clear_cart(user_id).await,
        }
    }
}

#[async_trait]
impl OrderStore for Store {
    async fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.insert_order(order).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.insert_order(order).await,
        }
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.get_order(id).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.get_order(id).await,
        }
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => s.list_orders_for_user(user_id).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.list_orders_for_user(user_id).await,
        }
    }

    async fn transition_from_pending(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_method_display: Option<String>,
    ) -> Result<Option<Order>, StoreError> {
        match self {
            #[cfg(feature = "memory")]
            Store::Memory(s) => {
                s.transition_from_pending(id, status, payment_method_display)
                    .await
            }
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => {
                s.transition_from_pending(id, status, payment_method_display)
                    .await
            }
        }
    }
}
