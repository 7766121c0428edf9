use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::Money;

/// Catalog entry. Read-mostly here: `stock` is mutated only through the
/// inventory ledger; everything else belongs to catalog management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: String, price: Money, stock: u32) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            anyhow::bail!("product name empty");
        }
        if price.cents() < 0 {
            anyhow::bail!("product price must not be negative");
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            price,
            stock,
            created_at: now,
            updated_at: now,
        })
    }
}
