//! Order and payment status state machines.

use serde::{Deserialize, Serialize};

use crate::payment::PaymentState;

/// Fulfillment status of an order.
///
/// Legal transitions:
/// ```text
/// Pending ────┬──► Processing ──► Shipped ──► Delivered ──► Returned ──┐
///             │        │                                               │
///             ├────────┴──► Cancelled ─────────────────────────────────┼──► Refunded
///             │
///             └──► Shipped (payment completed)
/// ```
/// `Shipped` and `Delivered` additionally require the order's payment status
/// to be `Completed`; that guard lives on the aggregate, not in this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

impl OrderStatus {
    /// Returns true if this status may transition directly to `next`.
    ///
    /// Encoded as a closed from-state × to-state table rather than ad hoc
    /// conditionals; anything not listed is rejected.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Processing)
                | (Pending, Shipped)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Returned)
                | (Returned, Refunded)
                | (Cancelled, Refunded)
        )
    }

    /// Returns true if the order can still be cancelled by its owner.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Refunded)
    }

    /// Returns the snake_case name used in documents and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "returned" => Ok(OrderStatus::Returned),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Payment status as seen on the order document.
///
/// A propagated copy of the payment record's state; the `Payment` ledger is
/// the source of truth and this field is updated alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<PaymentState> for PaymentStatus {
    /// Maps the payment record's wider state onto the order-side enum.
    ///
    /// Cancelled and expired payments leave the order unpaid, so both narrow
    /// to `Failed`.
    fn from(state: PaymentState) -> Self {
        match state {
            PaymentState::Pending => PaymentStatus::Pending,
            PaymentState::Processing => PaymentStatus::Processing,
            PaymentState::Completed => PaymentStatus::Completed,
            PaymentState::Failed | PaymentState::Cancelled | PaymentState::Expired => {
                PaymentStatus::Failed
            }
            PaymentState::Refunded => PaymentStatus::Refunded,
            PaymentState::PartiallyRefunded => PaymentStatus::PartiallyRefunded,
        }
    }
}
