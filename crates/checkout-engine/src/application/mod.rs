pub mod cart_service;
pub mod checkout_service;
pub mod order_engine;
pub mod provider_registry;
pub mod providers;
pub mod quote_engine;

use checkout_types::ports::cart_store::CartStore;
use checkout_types::ports::catalog_store::CatalogStore;
use checkout_types::ports::inventory_ledger::InventoryLedger;
use checkout_types::ports::order_store::OrderStore;

/// Everything the checkout core needs from persistence, in one bound.
pub trait Storage:
    CatalogStore + CartStore + InventoryLedger + OrderStore + Clone + Send + Sync + 'static
{
}

impl<T> Storage for T where
    T: CatalogStore + CartStore + InventoryLedger + OrderStore + Clone + Send + Sync + 'static
{
}
