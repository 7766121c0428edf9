use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::money::Money;
use crate::domain::provider::FieldValues;

/// One cart line frozen at quote time: quantity plus the unit price
/// that was live when the quote was computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuoteLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A time-bounded, priced checkout offer. Valid only while unexpired
/// and while its snapshot still matches the live cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutQuote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<QuoteLine>,
    pub payment_provider_id: String,
    pub shipping_provider_id: String,
    pub destination: FieldValues,
    pub shipping_address: String,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub tax: Money,
    pub total: Money,
    pub expires_at: DateTime<Utc>,
}

impl CheckoutQuote {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the snapshot still covers exactly the cart's contents:
    /// same products with the same quantities.
    pub fn matches_cart(&self, cart: &Cart) -> bool {
        if self.lines.len() != cart.items.len() {
            return false;
        }
        self.lines
            .iter()
            .all(|line| cart.quantity_of(line.product_id) == Some(line.quantity))
    }
}
