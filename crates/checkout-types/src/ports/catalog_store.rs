use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::ports::StoreError;

/// Read-mostly product catalog. Creation and updates belong to catalog
/// management; the checkout core reads prices and stock live and never
/// touches stock outside the inventory ledger.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
}
