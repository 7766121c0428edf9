use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

use checkout_types::domain::order::OrderStatus;
use checkout_types::ports::inventory_ledger::LedgerError;
use checkout_types::ports::StoreError;

/// The full error taxonomy surfaced to callers. Nothing here is
/// retried or swallowed by the core; retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("quote expired or no longer matches the cart")]
    QuoteExpired,

    #[error("operation not valid while order is {0}")]
    InvalidState(OrderStatus),

    #[error("payment declined: {0}")]
    ProviderDeclined(String),

    #[error("provider timed out")]
    ProviderTimeout,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        CheckoutError::Internal(anyhow::anyhow!(err.to_string()))
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                product_id,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            LedgerError::UnknownProduct(id) => CheckoutError::NotFound(format!("product {id}")),
            other => CheckoutError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let code = match &self {
            CheckoutError::Validation(_) | CheckoutError::MissingFields(_) => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
            CheckoutError::InsufficientStock { .. } | CheckoutError::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            CheckoutError::QuoteExpired => StatusCode::GONE,
            CheckoutError::ProviderDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            CheckoutError::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let msg = match &self {
            CheckoutError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        let mut body = serde_json::json!({ "error": msg });
        match &self {
            CheckoutError::MissingFields(fields) => {
                body["fields"] = serde_json::json!(fields);
            }
            CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                body["product_id"] = serde_json::json!(product_id);
                body["requested"] = serde_json::json!(requested);
                body["available"] = serde_json::json!(available);
            }
            _ => {}
        }
        (code, Json(body)).into_response()
    }
}
