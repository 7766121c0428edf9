pub mod cart_store;
pub mod catalog_store;
pub mod inventory_ledger;
pub mod order_store;
pub mod providers;

/// Adapter-level failure (connectivity, serialization, constraint
/// violations). Domain conditions have their own error types.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),
}
