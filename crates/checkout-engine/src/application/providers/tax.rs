use checkout_types::domain::money::Money;
use checkout_types::domain::provider::FieldValues;
use checkout_types::domain::quote::QuoteLine;
use checkout_types::ports::providers::TaxPolicy;

/// Flat basis-point rate over subtotal plus shipping. A rate of zero
/// (the default) produces tax-free quotes.
pub struct FlatRateTax {
    bps: u32,
}

impl FlatRateTax {
    pub fn new(bps: u32) -> Self {
        Self { bps }
    }
}

impl TaxPolicy for FlatRateTax {
    fn compute_tax(
        &self,
        lines: &[QuoteLine],
        shipping: Money,
        _destination: &FieldValues,
    ) -> Money {
        if self.bps == 0 {
            return Money::ZERO;
        }
        let subtotal: Money = lines
            .iter()
            .map(|l| l.unit_price.mul_qty(l.quantity))
            .sum();
        (subtotal + shipping).apply_bps(self.bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn line(qty: u32, unit_price: i64) -> QuoteLine {
        QuoteLine {
            product_id: Uuid::new_v4(),
            name: "Widget".into(),
            quantity: qty,
            unit_price: Money(unit_price),
        }
    }

    #[test]
    fn zero_rate_means_no_tax() {
        let tax = FlatRateTax::new(0);
        assert_eq!(
            tax.compute_tax(&[line(2, 500)], Money(599), &FieldValues::new()),
            Money::ZERO
        );
    }

    #[test]
    fn taxes_subtotal_plus_shipping() {
        // 8.5% of (1000 + 500) = 127.5, rounded half up to 128.
        let tax = FlatRateTax::new(850);
        assert_eq!(
            tax.compute_tax(&[line(1, 1000)], Money(500), &FieldValues::new()),
            Money(128)
        );
    }
}
