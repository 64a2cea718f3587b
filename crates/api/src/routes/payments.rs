//! Payment endpoints: charges, refunds, verification, statistics.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use domain::{Payment, PaymentState};
use services::{ProcessPaymentRequest, RefundRequest};

use crate::error::ApiError;
use crate::routes::orders::AppState;
use crate::routes::requester_from_headers;

/// POST /payments — charges the order's total through the gateway.
///
/// A declined charge responds 402 with the failed payment record in the
/// body; the decline detail sits on the record's error field.
#[tracing::instrument(skip_all)]
pub async fn process(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let requester = requester_from_headers(&headers)?;
    let payment = state.payments.process(requester, request).await?;
    let status = if payment.status() == PaymentState::Completed {
        StatusCode::CREATED
    } else {
        StatusCode::PAYMENT_REQUIRED
    };
    Ok((status, Json(payment)))
}

/// GET /payments/statistics — ledger aggregates; admin only.
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<services::PaymentStatistics>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    Ok(Json(state.payments.statistics(requester).await?))
}

/// GET /payments/{transaction_id} — full payment record; owner or admin.
pub async fn details(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(transaction_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    Ok(Json(
        state.payments.details(requester, &transaction_id).await?,
    ))
}

/// GET /payments/{transaction_id}/verify — did this charge complete?
pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(transaction_id): Path<String>,
) -> Result<Json<services::PaymentVerification>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    Ok(Json(
        state.payments.verify(requester, &transaction_id).await?,
    ))
}

/// POST /payments/{transaction_id}/refund — refunds part or all of a
/// payment; admin only.
#[tracing::instrument(skip(state, headers, request))]
pub async fn refund(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(transaction_id): Path<String>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<Payment>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let payment = state
        .payments
        .refund(requester, &transaction_id, request)
        .await?;
    Ok(Json(payment))
}
