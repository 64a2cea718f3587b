//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{OrderError, PaymentError};
use services::ServiceError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No or malformed identity headers.
    #[error("{0}")]
    Unauthorized(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Service-layer error.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Service(err) => service_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    let status = match &err {
        ServiceError::OrderNotFound(_) | ServiceError::PaymentNotFound(_) => StatusCode::NOT_FOUND,

        ServiceError::Forbidden => StatusCode::FORBIDDEN,

        ServiceError::EmptyCart
        | ServiceError::ProductNotFound(_)
        | ServiceError::InvalidOrderTotal
        | ServiceError::Coupon(_) => StatusCode::BAD_REQUEST,

        ServiceError::Order(order_err) => match order_err {
            OrderError::InvalidTransition { .. }
            | OrderError::PaymentNotCompleted { .. }
            | OrderError::NotCancellable { .. }
            | OrderError::NotReturnable { .. } => StatusCode::CONFLICT,
            OrderError::EmptyCart
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. } => StatusCode::BAD_REQUEST,
        },

        ServiceError::Payment(payment_err) => match payment_err {
            PaymentError::RefundExceedsBalance { .. } => StatusCode::CONFLICT,
            PaymentError::InvalidAmount { .. } | PaymentError::InvalidRefundAmount { .. } => {
                StatusCode::BAD_REQUEST
            }
        },

        ServiceError::Store(store_err) => match store_err {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::InsufficientStock { .. }
            | StoreError::VersionConflict { .. }
            | StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        },

        ServiceError::Gateway(_) => StatusCode::PAYMENT_REQUIRED,

        ServiceError::NoShippingMethod
        | ServiceError::Cart(_)
        | ServiceError::Catalog(_)
        | ServiceError::Notification(_) => StatusCode::BAD_GATEWAY,
    };

    if status == StatusCode::BAD_GATEWAY {
        tracing::error!(error = %err, "collaborator failure");
    }
    (status, err.to_string())
}
