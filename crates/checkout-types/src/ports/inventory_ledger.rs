use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle for a provisional stock hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken(pub Uuid);

impl ReservationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReservationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("unknown product {0}")]
    UnknownProduct(Uuid),

    #[error("reservation {0:?} not found or expired")]
    ReservationNotFound(ReservationToken),

    #[error("ledger error: {0}")]
    Backend(String),
}

/// Atomic reservation protocol over per-product stock counters.
///
/// `reserve` provisionally decrements stock before returning, so two
/// concurrent reservations against the last unit never both succeed.
/// A hold that is neither committed nor released within its TTL is
/// restored by `purge_expired`, which implementations run before every
/// mutation.
#[async_trait]
pub trait InventoryLedger: Send + Sync + 'static {
    async fn reserve(
        &self,
        product_id: Uuid,
        qty: u32,
        ttl: chrono::Duration,
    ) -> Result<ReservationToken, LedgerError>;

    /// Makes the provisional decrement permanent.
    async fn commit(&self, token: ReservationToken) -> Result<(), LedgerError>;

    /// Restores the reserved units to the stock counter.
    async fn release(&self, token: ReservationToken) -> Result<(), LedgerError>;

    /// Releases all expired holds, returning how many were restored.
    async fn purge_expired(&self) -> Result<u64, LedgerError>;
}
