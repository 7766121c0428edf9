use checkout_types::domain::money::Money;
use checkout_types::domain::provider::{
    FieldDefinition, FieldValues, ProviderDefinition, ProviderKind,
};
use checkout_types::domain::quote::QuoteLine;
use checkout_types::ports::providers::{ProviderError, ShippingProvider};

const STANDARD_RATE: Money = Money(599);
const EXPRESS_RATE: Money = Money(1599);
const CROSS_BORDER_SURCHARGE: Money = Money(1250);

/// Simulated ground carrier. Flat standard/express rates with a
/// surcharge for non-US destinations.
pub struct DummyGroundProvider {
    definition: ProviderDefinition,
}

impl DummyGroundProvider {
    pub fn new() -> Self {
        Self {
            definition: ProviderDefinition {
                id: "dummy-ground".into(),
                kind: ProviderKind::Shipping,
                name: "Dummy Ground Carrier".into(),
                description: "Flat-rate ground shipping with an express option.".into(),
                fields: vec![
                    FieldDefinition::required("full_name", "Recipient name"),
                    FieldDefinition::required("line1", "Address line 1"),
                    FieldDefinition::optional("line2", "Address line 2"),
                    FieldDefinition::required("city", "City"),
                    FieldDefinition::optional("state", "State/Province"),
                    FieldDefinition::required("postal_code", "Postal code"),
                    FieldDefinition::required("country", "Country"),
                    FieldDefinition::required("service_level", "Service level"),
                ],
                states: vec![],
            },
        }
    }
}

impl Default for DummyGroundProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ShippingProvider for DummyGroundProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    fn quote(
        &self,
        _lines: &[QuoteLine],
        destination: &FieldValues,
    ) -> Result<Money, ProviderError> {
        let missing = self.definition.missing_required(destination);
        if !missing.is_empty() {
            return Err(ProviderError::MissingFields(missing));
        }
        let service = destination
            .get("service_level")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let mut cost = if service == "express" {
            EXPRESS_RATE
        } else {
            STANDARD_RATE
        };
        let country = destination
            .get("country")
            .map(|v| v.trim().to_ascii_uppercase())
            .unwrap_or_default();
        if !country.is_empty() && country != "US" {
            cost += CROSS_BORDER_SURCHARGE;
        }
        Ok(cost)
    }

    fn display(&self, destination: &FieldValues) -> String {
        let parts = [
            destination.get("line1").map(|v| v.trim().to_string()),
            destination.get("line2").map(|v| v.trim().to_string()),
            destination.get("city").map(|v| v.trim().to_string()),
            destination.get("state").map(|v| v.trim().to_string()),
            destination.get("postal_code").map(|v| v.trim().to_string()),
            destination
                .get("country")
                .map(|v| v.trim().to_ascii_uppercase()),
        ];
        parts
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destination(country: &str, service: &str) -> FieldValues {
        let mut v = FieldValues::new();
        v.insert("full_name".into(), "Alex Merchant".into());
        v.insert("line1".into(), "1 Main St".into());
        v.insert("city".into(), "Springfield".into());
        v.insert("postal_code".into(), "12345".into());
        v.insert("country".into(), country.into());
        v.insert("service_level".into(), service.into());
        v
    }

    #[test]
    fn quotes_standard_and_express_rates() {
        let provider = DummyGroundProvider::new();
        assert_eq!(
            provider.quote(&[], &destination("US", "standard")).unwrap(),
            Money(599)
        );
        assert_eq!(
            provider.quote(&[], &destination("US", "express")).unwrap(),
            Money(1599)
        );
    }

    #[test]
    fn surcharges_cross_border_destinations() {
        let provider = DummyGroundProvider::new();
        assert_eq!(
            provider.quote(&[], &destination("de", "standard")).unwrap(),
            Money(599 + 1250)
        );
    }

    #[test]
    fn requires_address_and_service_level() {
        let provider = DummyGroundProvider::new();
        let mut partial = FieldValues::new();
        partial.insert("line1".into(), "1 Main St".into());
        match provider.quote(&[], &partial) {
            Err(ProviderError::MissingFields(fields)) => {
                assert!(fields.contains(&"city".to_string()));
                assert!(fields.contains(&"country".to_string()));
                assert!(fields.contains(&"service_level".to_string()));
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn display_joins_non_empty_parts() {
        let provider = DummyGroundProvider::new();
        let mut dest = destination("us", "standard");
        dest.insert("line2".into(), "  ".into());
        assert_eq!(
            provider.display(&dest),
            "1 Main St, Springfield, 12345, US"
        );
    }
}
