use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a cart. Quantity is always >= 1; a line that would drop
/// to zero is deleted instead. Prices are never stored here, they are
/// re-read live from the catalog on every view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Pre-purchase line items for one user, insertion-ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<u32> {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map(|i| i.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_lookup() {
        let pid = Uuid::new_v4();
        let mut cart = Cart::empty(Uuid::new_v4());
        assert!(cart.is_empty());
        assert_eq!(cart.quantity_of(pid), None);
        cart.items.push(CartItem {
            product_id: pid,
            quantity: 3,
        });
        assert_eq!(cart.quantity_of(pid), Some(3));
    }
}
