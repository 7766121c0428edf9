use serde::Serialize;
use uuid::Uuid;

use checkout_types::domain::cart::Cart;
use checkout_types::domain::money::Money;
use checkout_types::domain::product::Product;

use crate::application::Storage;
use crate::errors::CheckoutError;

/// One cart line priced against the live catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub user_id: Uuid,
    pub lines: Vec<CartLineView>,
    pub subtotal: Money,
}

/// Cart mutations plus live-priced views. Stock checks here are soft;
/// the inventory ledger is the only authority at order time.
pub struct CartService<S: Storage> {
    store: S,
}

impl<S: Storage> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn view_cart(&self, user_id: Uuid) -> Result<CartView, CheckoutError> {
        let cart = self.store.cart(user_id).await?;
        self.render(cart).await
    }

    /// Adds `qty` units, merging with any existing line. The merged
    /// quantity must still fit within current stock.
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<CartView, CheckoutError> {
        if qty == 0 {
            return Err(CheckoutError::Validation("quantity must be at least 1".into()));
        }
        let product = self.require_product(product_id).await?;
        let cart = self.store.cart(user_id).await?;
        let merged = cart
            .quantity_of(product_id)
            .unwrap_or(0)
            .checked_add(qty)
            .ok_or_else(|| CheckoutError::Validation("quantity out of range".into()))?;
        self.check_stock(&product, merged)?;

        let cart = self.store.add_item(user_id, product_id, qty).await?;
        self.render(cart).await
    }

    /// Sets a line's quantity. Zero or negative removes the line.
    pub async fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: i64,
    ) -> Result<CartView, CheckoutError> {
        if qty <= 0 {
            return self.remove_item(user_id, product_id).await;
        }
        let qty = u32::try_from(qty)
            .map_err(|_| CheckoutError::Validation("quantity out of range".into()))?;
        let product = self.require_product(product_id).await?;
        self.check_stock(&product, qty)?;

        match self.store.set_quantity(user_id, product_id, qty).await? {
            Some(cart) => self.render(cart).await,
            None => Err(CheckoutError::NotFound(format!(
                "cart item {product_id}"
            ))),
        }
    }

    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, CheckoutError> {
        match self.store.remove_item(user_id, product_id).await? {
            Some(cart) => self.render(cart).await,
            None => Err(CheckoutError::NotFound(format!(
                "cart item {product_id}"
            ))),
        }
    }

    async fn require_product(&self, product_id: Uuid) -> Result<Product, CheckoutError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("product {product_id}")))
    }

    fn check_stock(&self, product: &Product, requested: u32) -> Result<(), CheckoutError> {
        if requested > product.stock {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                requested,
                available: product.stock,
            });
        }
        Ok(())
    }

    /// Prices the cart against the live catalog. Lines whose product
    /// has since disappeared are omitted from the view.
    async fn render(&self, cart: Cart) -> Result<CartView, CheckoutError> {
        let mut lines = Vec::with_capacity(cart.items.len());
        let mut subtotal = Money::ZERO;
        for item in &cart.items {
            let Some(product) = self.store.get_product(item.product_id).await? else {
                continue;
            };
            let line_total = product.price.mul_qty(item.quantity);
            subtotal += line_total;
            lines.push(CartLineView {
                product_id: product.id,
                name: product.name,
                quantity: item.quantity,
                unit_price: product.price,
                line_total,
            });
        }
        Ok(CartView {
            user_id: cart.user_id,
            lines,
            subtotal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_store::memory::MemoryStore;
    use checkout_types::ports::catalog_store::CatalogStore;

    async fn seeded_store(stock: u32) -> (MemoryStore, Product) {
        let store = MemoryStore::new();
        let product = Product::new("Widget".into(), Money(1000), stock).unwrap();
        let product = store.upsert_product(product).await.unwrap();
        (store, product)
    }

    #[tokio::test]
    async fn add_merges_and_prices_live() {
        let (store, product) = seeded_store(5).await;
        let svc = CartService::new(store);
        let user = Uuid::new_v4();

        svc.add_item(user, product.id, 1).await.unwrap();
        let view = svc.add_item(user, product.id, 2).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 3);
        assert_eq!(view.subtotal, Money(3000));
    }

    #[tokio::test]
    async fn add_beyond_stock_is_rejected() {
        let (store, product) = seeded_store(2).await;
        let svc = CartService::new(store);
        let user = Uuid::new_v4();

        svc.add_item(user, product.id, 2).await.unwrap();
        let over = svc.add_item(user, product.id, 1).await;
        assert!(matches!(
            over,
            Err(CheckoutError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn add_with_overflowing_merged_quantity_is_rejected() {
        let (store, product) = seeded_store(5).await;
        let svc = CartService::new(store);
        let user = Uuid::new_v4();

        svc.add_item(user, product.id, 1).await.unwrap();
        let overflow = svc.add_item(user, product.id, u32::MAX).await;
        assert!(matches!(overflow, Err(CheckoutError::Validation(_))));

        // The existing line is untouched.
        let view = svc.view_cart(user).await.unwrap();
        assert_eq!(view.lines[0].quantity, 1);
    }

    #[tokio::test]
    async fn update_to_zero_removes_the_line() {
        let (store, product) = seeded_store(5).await;
        let svc = CartService::new(store);
        let user = Uuid::new_v4();

        svc.add_item(user, product.id, 2).await.unwrap();
        let view = svc.update_item(user, product.id, 0).await.unwrap();
        assert!(view.lines.is_empty());
    }

    #[tokio::test]
    async fn unknown_product_and_missing_line() {
        let (store, product) = seeded_store(5).await;
        let svc = CartService::new(store);
        let user = Uuid::new_v4();

        let missing = svc.add_item(user, Uuid::new_v4(), 1).await;
        assert!(matches!(missing, Err(CheckoutError::NotFound(_))));

        let no_line = svc.update_item(user, product.id, 2).await;
        assert!(matches!(no_line, Err(CheckoutError::NotFound(_))));
    }
}
