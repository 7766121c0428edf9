use checkout_types::domain::money::Money;
use checkout_types::domain::provider::{
    FieldDefinition, FieldValues, ProviderDefinition, ProviderKind,
};
use checkout_types::domain::quote::QuoteLine;
use checkout_types::ports::providers::{ProviderError, ShippingProvider};

/// In-store pickup. Free, but a pickup location and contact are
/// required so the order can be handed over.
pub struct DummyPickupProvider {
    definition: ProviderDefinition,
}

impl DummyPickupProvider {
    pub fn new() -> Self {
        Self {
            definition: ProviderDefinition {
                id: "dummy-pickup".into(),
                kind: ProviderKind::Shipping,
                name: "Dummy Store Pickup".into(),
                description: "No shipping fee; requires pickup location details.".into(),
                fields: vec![
                    FieldDefinition::required("pickup_location", "Pickup location"),
                    FieldDefinition::required("pickup_contact", "Contact name"),
                    FieldDefinition::optional("state", "State/Province"),
                    FieldDefinition::optional("postal_code", "Pickup postal code"),
                ],
                states: vec![],
            },
        }
    }
}

impl Default for DummyPickupProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ShippingProvider for DummyPickupProvider {
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
        Ok(Money::ZERO)
    }

    fn display(&self, destination: &FieldValues) -> String {
        let location = destination
            .get("pickup_location")
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or("Store");
        let contact = destination
            .get("pickup_contact")
            .map(|v| v.trim())
            .unwrap_or_default();
        let state = destination
            .get("state")
            .map(|v| v.trim().to_ascii_uppercase())
            .unwrap_or_default();
        let suffix = if state.is_empty() {
            String::new()
        } else {
            format!(" ({state})")
        };
        if contact.is_empty() {
            format!("Pickup at {location}{suffix}")
        } else {
            format!("Pickup at {location}{suffix} for {contact}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_is_free_once_details_are_supplied() {
        let provider = DummyPickupProvider::new();
        let mut dest = FieldValues::new();
        dest.insert("pickup_location".into(), "Downtown".into());
        dest.insert("pickup_contact".into(), "Alex".into());
        assert_eq!(provider.quote(&[], &dest).unwrap(), Money::ZERO);
        assert_eq!(provider.display(&dest), "Pickup at Downtown for Alex");

        dest.insert("state".into(), "ca".into());
        assert_eq!(provider.display(&dest), "Pickup at Downtown (CA) for Alex");
    }

    #[test]
    fn missing_location_is_rejected() {
        let provider = DummyPickupProvider::new();
        assert!(matches!(
            provider.quote(&[], &FieldValues::new()),
            Err(ProviderError::MissingFields(_))
        ));
    }
}
