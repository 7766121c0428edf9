use async_trait::async_trait;
use chrono::{Datelike, Utc};
use uuid::Uuid;

use checkout_types::domain::money::Money;
use checkout_types::domain::provider::{
    FieldDefinition, FieldValues, ProviderDefinition, ProviderKind,
};
use checkout_types::ports::providers::{PaymentProvider, ProviderError, SettlementReceipt};

use super::digits_only;

/// Simulated card gateway. A card number ending in `0000` is declined,
/// as are malformed numbers and past expiry dates; everything else
/// settles immediately.
pub struct DummyCardProvider {
    definition: ProviderDefinition,
}

impl DummyCardProvider {
    pub fn new() -> Self {
        Self {
            definition: ProviderDefinition {
                id: "dummy-card".into(),
                kind: ProviderKind::Payment,
                name: "Dummy Card Gateway".into(),
                description: "Simulates card-based authorization with test outcomes.".into(),
                fields: vec![
                    FieldDefinition::required("cardholder_name", "Cardholder name"),
                    FieldDefinition::required("card_number", "Card number"),
                    FieldDefinition::required("exp_month", "Exp month"),
                    FieldDefinition::required("exp_year", "Exp year"),
                ],
                states: vec![],
            },
        }
    }

    fn check(&self, input: &FieldValues) -> Result<(), ProviderError> {
        let missing = self.definition.missing_required(input);
        if !missing.is_empty() {
            return Err(ProviderError::MissingFields(missing));
        }
        let number = digits_only(input.get("card_number").map(String::as_str).unwrap_or(""));
        if number.len() < 12 || number.len() > 19 {
            return Err(ProviderError::Declined(
                "card number must be between 12 and 19 digits".into(),
            ));
        }
        if number.ends_with("0000") {
            return Err(ProviderError::Declined(
                "simulated decline: use a non-0000 suffix to approve".into(),
            ));
        }
        let year: i32 = input
            .get("exp_year")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        let month: u32 = input
            .get("exp_month")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        let now = Utc::now();
        if year < now.year() || (year == now.year() && month < now.month()) {
            return Err(ProviderError::Declined(
                "card expiry must be in the future".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DummyCardProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for DummyCardProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn settle(
        &self,
        _amount: Money,
        input: &FieldValues,
    ) -> Result<SettlementReceipt, ProviderError> {
        self.check(input)?;
        Ok(SettlementReceipt {
            reference: format!("card_{}", Uuid::new_v4().simple()),
        })
    }

    fn display(&self, input: &FieldValues) -> String {
        let number = digits_only(input.get("card_number").map(String::as_str).unwrap_or(""));
        if number.len() >= 4 {
            let brand = detect_card_brand(&number);
            format!("{brand} \u{2022}\u{2022}\u{2022}\u{2022} {}", &number[number.len() - 4..])
        } else {
            "Card".into()
        }
    }
}

fn detect_card_brand(number: &str) -> &'static str {
    if number.starts_with('4') {
        "Visa"
    } else if number.starts_with("34") || number.starts_with("37") {
        "American Express"
    } else if number.starts_with('5') {
        "Mastercard"
    } else if number.starts_with('6') {
        "Discover"
    } else {
        "Card"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(number: &str) -> FieldValues {
        let mut v = FieldValues::new();
        v.insert("cardholder_name".into(), "Alex Merchant".into());
        v.insert("card_number".into(), number.into());
        v.insert("exp_month".into(), "12".into());
        v.insert("exp_year".into(), (Utc::now().year() + 1).to_string());
        v
    }

    #[tokio::test]
    async fn settles_a_valid_card() {
        let provider = DummyCardProvider::new();
        let receipt = provider
            .settle(Money(1500), &input("4242424242424242"))
            .await
            .unwrap();
        assert!(receipt.reference.starts_with("card_"));
    }

    #[tokio::test]
    async fn declines_zero_suffix_and_bad_length() {
        let provider = DummyCardProvider::new();
        let declined = provider.settle(Money(100), &input("4242424242420000")).await;
        assert!(matches!(declined, Err(ProviderError::Declined(_))));

        let short = provider.settle(Money(100), &input("4242")).await;
        assert!(matches!(short, Err(ProviderError::Declined(_))));
    }

    #[tokio::test]
    async fn declines_expired_cards() {
        let provider = DummyCardProvider::new();
        let mut values = input("4242424242424242");
        values.insert("exp_year".into(), "2020".into());
        let expired = provider.settle(Money(100), &values).await;
        assert!(matches!(expired, Err(ProviderError::Declined(_))));
    }

    #[tokio::test]
    async fn reports_missing_fields() {
        let provider = DummyCardProvider::new();
        let res = provider.settle(Money(100), &FieldValues::new()).await;
        match res {
            Err(ProviderError::MissingFields(fields)) => {
                assert!(fields.contains(&"card_number".to_string()));
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn display_masks_all_but_last_four() {
        let provider = DummyCardProvider::new();
        assert_eq!(
            provider.display(&input("4242 4242 4242 4242")),
            "Visa \u{2022}\u{2022}\u{2022}\u{2022} 4242"
        );
        assert_eq!(
            provider.display(&input("378282246310005")),
            "American Express \u{2022}\u{2022}\u{2022}\u{2022} 0005"
        );
        assert_eq!(provider.display(&FieldValues::new()), "Card");
    }
}
