use std::collections::BTreeMap;
use std::sync::Arc;

use checkout_types::domain::provider::ProviderDefinition;
use checkout_types::ports::providers::{PaymentProvider, ShippingProvider};

use crate::application::providers::{
    DummyCardProvider, DummyGroundProvider, DummyPickupProvider, DummyWalletProvider,
};
use crate::errors::CheckoutError;

/// Read-only catalog of payment and shipping capability modules,
/// keyed by provider id. Registration happens once at startup.
pub struct ProviderRegistry {
    payments: BTreeMap<String, Arc<dyn PaymentProvider>>,
    shippings: BTreeMap<String, Arc<dyn ShippingProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            payments: BTreeMap::new(),
            shippings: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the simulated providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_payment(Arc::new(DummyCardProvider::new()));
        registry.register_payment(Arc::new(DummyWalletProvider::new()));
        registry.register_shipping(Arc::new(DummyGroundProvider::new()));
        registry.register_shipping(Arc::new(DummyPickupProvider::new()));
        registry
    }

    pub fn register_payment(&mut self, provider: Arc<dyn PaymentProvider>) {
        self.payments
            .insert(provider.definition().id.clone(), provider);
    }

    pub fn register_shipping(&mut self, provider: Arc<dyn ShippingProvider>) {
        self.shippings
            .insert(provider.definition().id.clone(), provider);
    }

    /// All definitions, payments first, each group ordered by id.
    pub fn definitions(&self) -> Vec<ProviderDefinition> {
        self.payments
            .values()
            .map(|p| p.definition().clone())
            .chain(self.shippings.values().map(|s| s.definition().clone()))
            .collect()
    }

    /// Looks up a payment provider and rejects ones advertising an
    /// `error` state.
    pub fn selectable_payment(&self, id: &str) -> Result<Arc<dyn PaymentProvider>, CheckoutError> {
        let provider = self
            .payments
            .get(id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound(format!("payment provider {id:?}")))?;
        if provider.definition().has_error_state() {
            return Err(CheckoutError::Validation(format!(
                "payment provider {id:?} is currently unavailable"
            )));
        }
        Ok(provider)
    }

    pub fn selectable_shipping(
        &self,
        id: &str,
    ) -> Result<Arc<dyn ShippingProvider>, CheckoutError> {
        let provider = self
            .shippings
            .get(id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound(format!("shipping provider {id:?}")))?;
        if provider.definition().has_error_state() {
            return Err(CheckoutError::Validation(format!(
                "shipping provider {id:?} is currently unavailable"
            )));
        }
        Ok(provider)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
