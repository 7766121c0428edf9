use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::ports::StoreError;

/// Per-user mutable line-item collection. No prices are stored and no
/// cross-user visibility exists; stock/price checks happen in the
/// service layer against the live catalog.
#[async_trait]
pub trait CartStore: Send + Sync + 'static {
    /// Adds `qty` of a product, merging into an existing line instead
    /// of duplicating it. The cart is created lazily on first add.
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, qty: u32)
        -> Result<Cart, StoreError>;

    /// Sets the quantity of an existing line (`qty` >= 1). Returns
    /// `None` if the user has no such line.
    async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Option<Cart>, StoreError>;

    /// Deletes a line. Returns `None` if the user has no such line.
    async fn remove_item(&self, user_id: Uuid, product_id: Uuid)
        -> Result<Option<Cart>, StoreError>;

    /// The user's cart; an empty cart if none exists yet.
    async fn cart(&self, user_id: Uuid) -> Result<Cart, StoreError>;

    /// Empties the cart without deleting it.
    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError>;
}
