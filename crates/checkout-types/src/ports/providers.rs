use async_trait::async_trait;

use crate::domain::money::Money;
use crate::domain::provider::{FieldValues, ProviderDefinition};
use crate::domain::quote::QuoteLine;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("declined: {0}")]
    Declined(String),
}

/// Proof of a successful settlement, as reported by the provider.
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub reference: String,
}

/// Payment capability module. Settlement is terminal for an order's
/// status; implementations simulate or bridge to real gateways.
#[async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    fn definition(&self) -> &ProviderDefinition;

    async fn settle(
        &self,
        amount: Money,
        input: &FieldValues,
    ) -> Result<SettlementReceipt, ProviderError>;

    /// Human-readable payment method summary, e.g. "Visa •••• 4242".
    fn display(&self, input: &FieldValues) -> String;
}

/// Shipping capability module: quotes a cost for a snapshot and
/// destination, and renders the destination for display.
pub trait ShippingProvider: Send + Sync + 'static {
    fn definition(&self) -> &ProviderDefinition;

    fn quote(&self, lines: &[QuoteLine], destination: &FieldValues)
        -> Result<Money, ProviderError>;

    fn display(&self, destination: &FieldValues) -> String;
}

/// Pluggable tax computation, an external collaborator of the quote
/// engine.
pub trait TaxPolicy: Send + Sync + 'static {
    fn compute_tax(&self, lines: &[QuoteLine], shipping: Money, destination: &FieldValues)
        -> Money;
}
