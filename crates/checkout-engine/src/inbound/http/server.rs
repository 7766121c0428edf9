use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{delete, get, patch, post},
    serve, Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use checkout_types::domain::money::Money;
use checkout_types::domain::order::Order;
use checkout_types::domain::product::Product;
use checkout_types::domain::provider::{FieldValues, ProviderDefinition};
use checkout_types::domain::quote::CheckoutQuote;

use crate::application::cart_service::CartView;
use crate::application::checkout_service::CheckoutService;
use crate::application::quote_engine::QuoteRequest;
use crate::application::Storage;
use crate::errors::CheckoutError;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

pub struct HttpServer<S: Storage> {
    pub service: Arc<CheckoutService<S>>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

#[derive(Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct QuoteCheckoutRequest {
    pub payment_provider_id: String,
    pub shipping_provider_id: String,
    #[serde(default)]
    pub destination: FieldValues,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub quote_id: Uuid,
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub quote_id: Uuid,
    #[serde(default)]
    pub payment_input: FieldValues,
}

#[derive(Deserialize)]
pub struct SettleOrderRequest {
    #[serde(default)]
    pub payment_input: FieldValues,
}

impl<S: Storage> HttpServer<S> {
    pub async fn new(service: CheckoutService<S>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let svc = self.service.clone();
        let app = Router::new()
            .route("/health", get(health))
            .route("/products", get(list_products::<S>))
            .route("/products", post(create_product::<S>))
            .route("/cart", get(view_cart::<S>))
            .route("/cart/items", post(add_cart_item::<S>))
            .route("/cart/items/{product_id}", patch(update_cart_item::<S>))
            .route("/cart/items/{product_id}", delete(remove_cart_item::<S>))
            .route("/providers", get(list_providers::<S>))
            .route("/checkout/quote", post(quote_checkout::<S>))
            .route("/checkout/place", post(place_order::<S>))
            .route("/orders", post(create_order::<S>))
            .route("/orders", get(list_orders::<S>))
            .route("/orders/{id}", get(get_order::<S>))
            .route("/orders/{id}/settle", post(settle_order::<S>))
            .route("/orders/{id}/cancel", post(cancel_order::<S>))
            .layer(trace_layer)
            .with_state(svc);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

/// Identity arrives pre-resolved as a trusted `x-user-id` header set by
/// the fronting auth layer.
fn require_user(headers: &HeaderMap) -> Result<Uuid, CheckoutError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CheckoutError::Validation("missing x-user-id header".into()))?;
    Uuid::parse_str(raw).map_err(|e| CheckoutError::Validation(e.to_string()))
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn list_products<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
) -> Result<Json<Vec<Product>>, CheckoutError> {
    Ok(Json(service.list_products().await?))
}

async fn create_product<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(axum::http::StatusCode, Json<Product>), CheckoutError> {
    let product = service
        .create_product(payload.name, payload.price, payload.stock)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(product)))
}

async fn view_cart<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
) -> Result<Json<CartView>, CheckoutError> {
    let user = require_user(&headers)?;
    Ok(Json(service.view_cart(user).await?))
}

async fn add_cart_item<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<Json<CartView>, CheckoutError> {
    let user = require_user(&headers)?;
    let view = service
        .add_to_cart(user, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(view))
}

async fn update_cart_item<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>, CheckoutError> {
    let user = require_user(&headers)?;
    let view = service
        .update_cart_item(user, product_id, payload.quantity)
        .await?;
    Ok(Json(view))
}

async fn remove_cart_item<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>, CheckoutError> {
    let user = require_user(&headers)?;
    Ok(Json(service.remove_cart_item(user, product_id).await?))
}

async fn list_providers<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
) -> Result<Json<Vec<ProviderDefinition>>, CheckoutError> {
    Ok(Json(service.providers()))
}

async fn quote_checkout<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Json(payload): Json<QuoteCheckoutRequest>,
) -> Result<(axum::http::StatusCode, Json<CheckoutQuote>), CheckoutError> {
    let user = require_user(&headers)?;
    let quote = service
        .quote_checkout(
            user,
            QuoteRequest {
                payment_provider_id: payload.payment_provider_id,
                shipping_provider_id: payload.shipping_provider_id,
                destination: payload.destination,
            },
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(quote)))
}

async fn place_order<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<Order>), CheckoutError> {
    let user = require_user(&headers)?;
    let order = service
        .place_order(user, payload.quote_id, payload.payment_input)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(order)))
}

async fn create_order<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<Order>), CheckoutError> {
    let user = require_user(&headers)?;
    let order = service.create_order(user, payload.quote_id).await?;
    Ok((axum::http::StatusCode::CREATED, Json(order)))
}

async fn list_orders<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, CheckoutError> {
    let user = require_user(&headers)?;
    Ok(Json(service.list_orders(user).await?))
}

async fn get_order<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, CheckoutError> {
    let user = require_user(&headers)?;
    Ok(Json(service.get_order(user, id).await?))
}

async fn settle_order<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettleOrderRequest>,
) -> Result<Json<Order>, CheckoutError> {
    let user = require_user(&headers)?;
    let order = service.settle_order(user, id, payload.payment_input).await?;
    Ok(Json(order))
}

async fn cancel_order<S: Storage>(
    State(service): State<Arc<CheckoutService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, CheckoutError> {
    let user = require_user(&headers)?;
    Ok(Json(service.cancel_order(user, id).await?))
}
