//! Payment ledger aggregate and related types.

mod ledger;

pub use ledger::{GatewayError, Payment, Refund, RequestMetadata};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// State of a payment record.
///
/// Wider than the order-side `PaymentStatus`: a payment can also be cancelled
/// or expire before it is ever attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
    Cancelled,
    Expired,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Processing => "processing",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
            PaymentState::PartiallyRefunded => "partially_refunded",
            PaymentState::Cancelled => "cancelled",
            PaymentState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a refund was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    CustomerRequest,
    ProductReturn,
    Fraud,
    Other,
}

/// Outcome of a single refund entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Completed,
    Failed,
    PartiallyRefunded,
}

/// Errors that can occur on the payment ledger.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payments are only created for orders with a positive total.
    #[error("Payment amount must be positive, got {amount}")]
    InvalidAmount { amount: Money },

    /// Refund amounts must be positive.
    #[error("Refund amount must be positive, got {amount}")]
    InvalidRefundAmount { amount: Money },

    /// The refund would overdraw the payment.
    #[error("Refund of {requested} exceeds remaining refundable amount {available}")]
    RefundExceedsBalance { requested: Money, available: Money },
}
