use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use checkout_types::domain::money::Money;
use checkout_types::domain::order::Order;
use checkout_types::domain::product::Product;
use checkout_types::domain::provider::{FieldValues, ProviderDefinition};
use checkout_types::domain::quote::CheckoutQuote;
use checkout_types::ports::providers::TaxPolicy;

use crate::application::cart_service::{CartService, CartView};
use crate::application::order_engine::OrderEngine;
use crate::application::provider_registry::ProviderRegistry;
use crate::application::quote_engine::{QuoteEngine, QuoteRequest};
use crate::application::Storage;
use crate::errors::CheckoutError;

/// One entry point for the whole checkout lifecycle. The inbound
/// adapters talk only to this facade.
pub struct CheckoutService<S: Storage> {
    store: S,
    carts: CartService<S>,
    registry: Arc<ProviderRegistry>,
    quotes: QuoteEngine,
    orders: OrderEngine<S>,
}

impl<S: Storage> CheckoutService<S> {
    pub fn new(
        store: S,
        registry: Arc<ProviderRegistry>,
        tax: Arc<dyn TaxPolicy>,
        quote_ttl: chrono::Duration,
        settle_timeout: Duration,
    ) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            quotes: QuoteEngine::new(registry.clone(), tax, quote_ttl),
            // Holds live exactly as long as the quote that priced them.
            orders: OrderEngine::new(store.clone(), registry.clone(), quote_ttl, settle_timeout),
            registry,
            store,
        }
    }

    // Catalog

    pub async fn create_product(
        &self,
        name: String,
        price: Money,
        stock: u32,
    ) -> Result<Product, CheckoutError> {
        let product =
            Product::new(name, price, stock).map_err(|e| CheckoutError::Validation(e.to_string()))?;
        Ok(self.store.upsert_product(product).await?)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, CheckoutError> {
        Ok(self.store.list_products().await?)
    }

    // Cart

    pub async fn view_cart(&self, user_id: Uuid) -> Result<CartView, CheckoutError> {
        self.carts.view_cart(user_id).await
    }

    pub async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<CartView, CheckoutError> {
        self.carts.add_item(user_id, product_id, qty).await
    }

    pub async fn update_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: i64,
    ) -> Result<CartView, CheckoutError> {
        self.carts.update_item(user_id, product_id, qty).await
    }

    pub async fn remove_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, CheckoutError> {
        self.carts.remove_item(user_id, product_id).await
    }

    // Providers

    pub fn providers(&self) -> Vec<ProviderDefinition> {
        self.registry.definitions()
    }

    // Checkout

    pub async fn quote_checkout(
        &self,
        user_id: Uuid,
        request: QuoteRequest,
    ) -> Result<CheckoutQuote, CheckoutError> {
        self.quotes.create_quote(&self.store, user_id, request).await
    }

    /// Two-call flow: consumes the quote and creates a `PENDING` order.
    pub async fn create_order(
        &self,
        user_id: Uuid,
        quote_id: Uuid,
    ) -> Result<Order, CheckoutError> {
        let quote = self
            .quotes
            .take(quote_id, user_id)
            .ok_or(CheckoutError::QuoteExpired)?;
        self.orders.create(user_id, quote).await
    }

    /// One-call flow: create then settle. The quote is consumed either
    /// way; if settlement is declined the order is left `FAILED` and
    /// the cart intact, so the caller can re-quote and retry.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        quote_id: Uuid,
        payment_input: FieldValues,
    ) -> Result<Order, CheckoutError> {
        let order = self.create_order(user_id, quote_id).await?;
        self.orders.settle(user_id, order.id, payment_input).await
    }

    pub async fn settle_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        payment_input: FieldValues,
    ) -> Result<Order, CheckoutError> {
        self.orders.settle(user_id, order_id, payment_input).await
    }

    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, CheckoutError> {
        self.orders.cancel(user_id, order_id).await
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, CheckoutError> {
        self.orders.get(user_id, order_id).await
    }

    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>, CheckoutError> {
        self.orders.list(user_id).await
    }
}
