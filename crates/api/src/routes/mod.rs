//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;

use axum::http::HeaderMap;
use common::UserId;
use services::{Requester, Role};

use crate::error::ApiError;

/// Builds the requester identity from the trusted identity headers.
///
/// Authentication happens at the edge; by the time a request reaches
/// this service, `x-user-id` and `x-user-role` carry a verified
/// identity. A missing or malformed id is rejected as unauthorized.
pub(crate) fn requester_from_headers(headers: &HeaderMap) -> Result<Requester, ApiError> {
    let raw_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".to_string()))?;
    let user_id = uuid::Uuid::parse_str(raw_id)
        .map(UserId::from_uuid)
        .map_err(|err| ApiError::Unauthorized(format!("Invalid x-user-id: {err}")))?;

    let role = match headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok())
    {
        Some("admin") => Role::Admin,
        _ => Role::Customer,
    };

    Ok(Requester { user_id, role })
}
