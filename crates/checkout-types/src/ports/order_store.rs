use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};
use crate::ports::StoreError;

/// Persistence for orders. Line items and total are written once at
/// insert; afterwards only the status and settlement metadata change,
/// and only through the compare-and-set transition below.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn insert_order(&self, order: Order) -> Result<Order, StoreError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;

    /// Atomically moves a `PENDING` order to `status`, optionally
    /// recording the payment display string. Returns the updated order,
    /// or `None` when the order was not `PENDING` or does not exist.
    /// This is the guard that keeps settle, cancel and timeout paths
    /// mutually exclusive.
    async fn transition_from_pending(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_method_display: Option<String>,
    ) -> Result<Option<Order>, StoreError>;
}
