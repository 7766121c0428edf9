use async_trait::async_trait;
use uuid::Uuid;

use checkout_types::domain::money::Money;
use checkout_types::domain::provider::{
    FieldDefinition, FieldValues, ProviderDefinition, ProviderKind,
};
use checkout_types::ports::providers::{PaymentProvider, ProviderError, SettlementReceipt};

/// Simulated redirect wallet. Any syntactically plausible account email
/// settles.
pub struct DummyWalletProvider {
    definition: ProviderDefinition,
}

impl DummyWalletProvider {
    pub fn new() -> Self {
        Self {
            definition: ProviderDefinition {
                id: "dummy-wallet".into(),
                kind: ProviderKind::Payment,
                name: "Dummy Wallet".into(),
                description: "Simulates redirect wallet payments.".into(),
                fields: vec![FieldDefinition::required(
                    "wallet_email",
                    "Wallet account email",
                )],
                states: vec![],
            },
        }
    }

    fn email<'a>(&self, input: &'a FieldValues) -> Result<&'a str, ProviderError> {
        let missing = self.definition.missing_required(input);
        if !missing.is_empty() {
            return Err(ProviderError::MissingFields(missing));
        }
        let email = input
            .get("wallet_email")
            .map(|v| v.trim())
            .unwrap_or_default();
        if !email.contains('@') {
            return Err(ProviderError::Declined(
                "wallet account email is not valid".into(),
            ));
        }
        Ok(email)
    }
}

impl Default for DummyWalletProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for DummyWalletProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn settle(
        &self,
        _amount: Money,
        input: &FieldValues,
    ) -> Result<SettlementReceipt, ProviderError> {
        self.email(input)?;
        Ok(SettlementReceipt {
            reference: format!("wallet_{}", Uuid::new_v4().simple()),
        })
    }

    fn display(&self, input: &FieldValues) -> String {
        match input.get("wallet_email").map(|v| v.trim()) {
            Some(email) if !email.is_empty() => format!("Dummy Wallet {email}"),
            _ => "Dummy Wallet".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settles_with_an_account_email() {
        let provider = DummyWalletProvider::new();
        let mut values = FieldValues::new();
        values.insert("wallet_email".into(), "buyer@example.com".into());
        let receipt = provider.settle(Money(1500), &values).await.unwrap();
        assert!(receipt.reference.starts_with("wallet_"));
        assert_eq!(provider.display(&values), "Dummy Wallet buyer@example.com");
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_email() {
        let provider = DummyWalletProvider::new();
        let missing = provider.settle(Money(100), &FieldValues::new()).await;
        assert!(matches!(missing, Err(ProviderError::MissingFields(_))));

        let mut values = FieldValues::new();
        values.insert("wallet_email".into(), "not-an-email".into());
        let declined = provider.settle(Money(100), &values).await;
        assert!(matches!(declined, Err(ProviderError::Declined(_))));
    }
}
