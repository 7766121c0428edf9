use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use checkout_types::domain::provider::FieldValues;
use checkout_types::domain::quote::{CheckoutQuote, QuoteLine};
use checkout_types::ports::providers::{ProviderError, TaxPolicy};

use crate::application::provider_registry::ProviderRegistry;
use crate::application::Storage;
use crate::errors::CheckoutError;

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub payment_provider_id: String,
    pub shipping_provider_id: String,
    pub destination: FieldValues,
}

/// Prices the current cart into a time-bounded offer. Quotes live only
/// in memory; one is consumed the moment an order is created from it,
/// so the same quote can never place two orders.
pub struct QuoteEngine {
    registry: Arc<ProviderRegistry>,
    tax: Arc<dyn TaxPolicy>,
    ttl: chrono::Duration,
    quotes: DashMap<Uuid, CheckoutQuote>,
}

impl QuoteEngine {
    pub fn new(registry: Arc<ProviderRegistry>, tax: Arc<dyn TaxPolicy>, ttl: chrono::Duration) -> Self {
        Self {
            registry,
            tax,
            ttl,
            quotes: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Snapshots the cart at live prices, quotes shipping and tax, and
    /// stores the offer under a fresh id.
    pub async fn create_quote<S: Storage>(
        &self,
        store: &S,
        user_id: Uuid,
        request: QuoteRequest,
    ) -> Result<CheckoutQuote, CheckoutError> {
        self.prune_expired();

        let cart = store.cart(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::Validation("cart is empty".into()));
        }

        let payment = self.registry.selectable_payment(&request.payment_provider_id)?;
        let shipping = self
            .registry
            .selectable_shipping(&request.shipping_provider_id)?;

        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = store
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| CheckoutError::NotFound(format!("product {}", item.product_id)))?;
            if item.quantity > product.stock {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }
            lines.push(QuoteLine {
                product_id: product.id,
                name: product.name,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        let shipping_cost = shipping
            .quote(&lines, &request.destination)
            .map_err(provider_err)?;
        let shipping_address = shipping.display(&request.destination);
        let tax = self
            .tax
            .compute_tax(&lines, shipping_cost, &request.destination);
        let subtotal = lines
            .iter()
            .map(|l| l.unit_price.mul_qty(l.quantity))
            .sum();

        let quote = CheckoutQuote {
            id: Uuid::new_v4(),
            user_id,
            lines,
            payment_provider_id: payment.definition().id.clone(),
            shipping_provider_id: shipping.definition().id.clone(),
            destination: request.destination,
            shipping_address,
            subtotal,
            shipping_cost,
            tax,
            total: subtotal + shipping_cost + tax,
            expires_at: Utc::now() + self.ttl,
        };
        self.quotes.insert(quote.id, quote.clone());
        Ok(quote)
    }

    /// Removes and returns the quote, but only for its owner. A second
    /// take of the same id finds nothing, which is what rejects
    /// double-submits.
    pub fn take(&self, quote_id: Uuid, user_id: Uuid) -> Option<CheckoutQuote> {
        self.quotes
            .remove_if(&quote_id, |_, quote| quote.user_id == user_id)
            .map(|(_, quote)| quote)
    }

    /// Drops expired quotes, returning how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.quotes.len();
        self.quotes.retain(|_, quote| !quote.is_expired(now));
        before - self.quotes.len()
    }
}

fn provider_err(err: ProviderError) -> CheckoutError {
    match err {
        ProviderError::MissingFields(fields) => CheckoutError::MissingFields(fields),
        ProviderError::Declined(reason) => CheckoutError::ProviderDeclined(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_store::memory::MemoryStore;
    use checkout_types::domain::money::Money;
    use checkout_types::domain::product::Product;
    use checkout_types::ports::cart_store::CartStore;
    use checkout_types::ports::catalog_store::CatalogStore;

    use crate::application::providers::FlatRateTax;

    fn engine(ttl: chrono::Duration) -> QuoteEngine {
        QuoteEngine::new(
            Arc::new(ProviderRegistry::with_defaults()),
            Arc::new(FlatRateTax::new(0)),
            ttl,
        )
    }

    fn us_destination() -> FieldValues {
        let mut dest = FieldValues::new();
        dest.insert("full_name".into(), "Alex Merchant".into());
        dest.insert("line1".into(), "1 Main St".into());
        dest.insert("city".into(), "Springfield".into());
        dest.insert("postal_code".into(), "12345".into());
        dest.insert("country".into(), "US".into());
        dest.insert("service_level".into(), "standard".into());
        dest
    }

    fn request() -> QuoteRequest {
        QuoteRequest {
            payment_provider_id: "dummy-card".into(),
            shipping_provider_id: "dummy-ground".into(),
            destination: us_destination(),
        }
    }

    async fn store_with_cart(price: i64, stock: u32, qty: u32) -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let product = store
            .upsert_product(Product::new("Widget".into(), Money(price), stock).unwrap())
            .await
            .unwrap();
        let user = Uuid::new_v4();
        store.add_item(user, product.id, qty).await.unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn quotes_cart_at_live_prices() {
        let (store, user) = store_with_cart(1000, 5, 2).await;
        let engine = engine(chrono::Duration::minutes(15));
        let quote = engine.create_quote(&store, user, request()).await.unwrap();
        assert_eq!(quote.subtotal, Money(2000));
        assert_eq!(quote.shipping_cost, Money(599));
        assert_eq!(quote.tax, Money::ZERO);
        assert_eq!(quote.total, Money(2599));
        assert_eq!(quote.shipping_address, "1 Main St, Springfield, 12345, US");
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_quoted() {
        let store = MemoryStore::new();
        let engine = engine(chrono::Duration::minutes(15));
        let res = engine.create_quote(&store, Uuid::new_v4(), request()).await;
        assert!(matches!(res, Err(CheckoutError::Validation(_))));
    }

    #[tokio::test]
    async fn over_stock_cart_cannot_be_quoted() {
        let (store, user) = store_with_cart(1000, 1, 1).await;
        // Bump the line past available stock directly in the store.
        let product_id = store.cart(user).await.unwrap().items[0].product_id;
        store.set_quantity(user, product_id, 3).await.unwrap();

        let engine = engine(chrono::Duration::minutes(15));
        let res = engine.create_quote(&store, user, request()).await;
        assert!(matches!(
            res,
            Err(CheckoutError::InsufficientStock { requested: 3, available: 1, .. })
        ));
    }

    #[tokio::test]
    async fn missing_destination_fields_surface() {
        let (store, user) = store_with_cart(1000, 5, 1).await;
        let engine = engine(chrono::Duration::minutes(15));
        let res = engine
            .create_quote(
                &store,
                user,
                QuoteRequest {
                    destination: FieldValues::new(),
                    ..request()
                },
            )
            .await;
        assert!(matches!(res, Err(CheckoutError::MissingFields(_))));
    }

    #[tokio::test]
    async fn take_is_owner_scoped_and_single_shot() {
        let (store, user) = store_with_cart(1000, 5, 1).await;
        let engine = engine(chrono::Duration::minutes(15));
        let quote = engine.create_quote(&store, user, request()).await.unwrap();

        assert!(engine.take(quote.id, Uuid::new_v4()).is_none());
        assert!(engine.take(quote.id, user).is_some());
        assert!(engine.take(quote.id, user).is_none());
    }

    #[tokio::test]
    async fn expired_quotes_are_pruned() {
        let (store, user) = store_with_cart(1000, 5, 1).await;
        let engine = engine(chrono::Duration::zero());
        let quote = engine.create_quote(&store, user, request()).await.unwrap();
        assert_eq!(engine.prune_expired(), 1);
        assert!(engine.take(quote.id, user).is_none());
    }
}
