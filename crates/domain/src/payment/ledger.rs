//! Payment record with its append-only refund ledger.

use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::order::PaymentMethod;

use super::{PaymentError, PaymentState, RefundReason, RefundStatus};

/// One refund against a payment. Append-only: entries are finalized at
/// creation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub amount: Money,
    pub reason: RefundReason,
    pub status: RefundStatus,
    pub transaction_id: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Error detail recorded when the gateway declines an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Request metadata captured for audit, informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Payment record for one order.
///
/// The monetary ledger: `total_refunded` is never allowed past `amount`, and
/// the state is a pure function of that relationship once refunds begin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: OrderId,
    user_id: UserId,
    amount: Money,
    currency: String,
    payment_method: PaymentMethod,
    status: PaymentState,
    transaction_id: String,
    refunds: Vec<Refund>,
    total_refunded: Money,
    error: Option<GatewayError>,
    metadata: RequestMetadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Optimistic concurrency version, managed by the repository.
    #[serde(default)]
    version: u64,
}

impl Payment {
    /// Creates a payment attempt for an order, fixing the amount at the
    /// order's total and generating a unique transaction id.
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        currency: impl Into<String>,
        payment_method: PaymentMethod,
        metadata: RequestMetadata,
        now: DateTime<Utc>,
    ) -> Result<Payment, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount { amount });
        }
        Ok(Payment {
            id: PaymentId::new(),
            order_id,
            user_id,
            amount,
            currency: currency.into(),
            payment_method,
            status: PaymentState::Processing,
            transaction_id: generate_transaction_id("TXN", now),
            refunds: Vec::new(),
            total_refunded: Money::zero(),
            error: None,
            metadata,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Marks the gateway charge as successful.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = PaymentState::Completed;
        self.updated_at = now;
    }

    /// Records a gateway decline; the error detail is kept on the record.
    pub fn fail(&mut self, error: GatewayError, now: DateTime<Utc>) {
        self.status = PaymentState::Failed;
        self.error = Some(error);
        self.updated_at = now;
    }

    /// Applies a successful refund to the ledger.
    ///
    /// Enforces conservation (`total_refunded + amount <= self.amount`) before
    /// anything is recorded, appends a completed refund entry, and rederives
    /// the payment state from the new balance.
    pub fn apply_refund(
        &mut self,
        amount: Money,
        reason: RefundReason,
        now: DateTime<Utc>,
    ) -> Result<&Refund, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidRefundAmount { amount });
        }
        let available = self.amount - self.total_refunded;
        if amount > available {
            return Err(PaymentError::RefundExceedsBalance {
                requested: amount,
                available,
            });
        }

        self.refunds.push(Refund {
            amount,
            reason,
            status: RefundStatus::Completed,
            transaction_id: generate_transaction_id("REF", now),
            processed_at: Some(now),
            notes: None,
        });
        self.total_refunded += amount;
        self.status = derive_refund_state(self.status, self.total_refunded, self.amount);
        self.updated_at = now;
        Ok(self.refunds.last().expect("refund just pushed"))
    }

    /// Records a refund the gateway declined.
    ///
    /// The failed entry is kept for audit with the decline message in its
    /// notes; the ledger balance and payment state are untouched.
    pub fn record_failed_refund(
        &mut self,
        amount: Money,
        reason: RefundReason,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> &Refund {
        self.refunds.push(Refund {
            amount,
            reason,
            status: RefundStatus::Failed,
            transaction_id: generate_transaction_id("REF", now),
            processed_at: None,
            notes: Some(notes.into()),
        });
        self.updated_at = now;
        self.refunds.last().expect("refund just pushed")
    }

    /// Returns the amount still refundable.
    pub fn remaining_refundable(&self) -> Money {
        self.amount - self.total_refunded
    }
}

// Query methods
impl Payment {
    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> PaymentState {
        self.status
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn refunds(&self) -> &[Refund] {
        &self.refunds
    }

    pub fn total_refunded(&self) -> Money {
        self.total_refunded
    }

    pub fn error(&self) -> Option<&GatewayError> {
        self.error.as_ref()
    }

    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the concurrency version; only the repository should call this.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Derives the payment state from the refunded balance.
///
/// No refunds leaves the state alone; a partial balance is partially
/// refunded; a full balance is refunded.
fn derive_refund_state(current: PaymentState, total_refunded: Money, amount: Money) -> PaymentState {
    if total_refunded.is_zero() {
        current
    } else if total_refunded == amount {
        PaymentState::Refunded
    } else {
        PaymentState::PartiallyRefunded
    }
}

fn generate_transaction_id(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}-{}", now.timestamp_millis(), &suffix[..10])
}
