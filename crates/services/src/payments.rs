//! Payment orchestration: charges, refunds, verification, statistics.
//!
//! The payment record is the source of truth for payment state; the
//! owning order's `payment_status` is a propagated copy, updated after
//! every ledger change.

use std::collections::HashMap;

use chrono::Utc;
use common::OrderId;
use domain::{
    Money, Payment, PaymentDetails, PaymentError, PaymentMethod, PaymentState, RefundReason,
    RequestMetadata,
};
use serde::{Deserialize, Serialize};
use store::{OrderRepository, PaymentRepository, StoreError};

use crate::auth::Requester;
use crate::collaborators::PaymentGateway;
use crate::error::{Result, ServiceError};

const CAS_RETRIES: u32 = 5;

/// Input for processing a payment against an order.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentRequest {
    pub order_id: OrderId,
    /// Overrides the method chosen at checkout when present.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

/// Input for refunding part or all of a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub amount: Money,
    pub reason: RefundReason,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a verification lookup.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentVerification {
    pub transaction_id: String,
    pub status: PaymentState,
    pub verified: bool,
    pub amount: Money,
}

/// Aggregate payment figures across the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatistics {
    pub total_payments: u64,
    pub total_amount: Money,
    pub total_refunded: Money,
    pub net_amount: Money,
    pub status_counts: HashMap<String, u64>,
}

/// Orchestrates the payment ledger against the gateway and the order.
pub struct PaymentService<S, G> {
    store: S,
    gateway: G,
}

impl<S, G> PaymentService<S, G>
where
    S: PaymentRepository + OrderRepository + Clone,
    G: PaymentGateway,
{
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Charges the order's total through the gateway.
    ///
    /// A declined charge still comes back as `Ok`: the failure is
    /// recorded on the payment's error field and its `Failed` status,
    /// never swallowed.
    #[tracing::instrument(skip(self, request), fields(user_id = %requester.user_id, order_id = %request.order_id))]
    pub async fn process(
        &self,
        requester: Requester,
        request: ProcessPaymentRequest,
    ) -> Result<Payment> {
        metrics::counter!("payments_attempted_total").increment(1);
        let now = Utc::now();

        let order = self.load_order(request.order_id).await?;
        if !requester.can_access(order.user_id()) {
            return Err(ServiceError::Forbidden);
        }
        if !order.total().is_positive() {
            return Err(ServiceError::InvalidOrderTotal);
        }

        let method = request.payment_method.unwrap_or(order.payment_method());
        let mut payment = Payment::new(
            order.id(),
            order.user_id(),
            order.total(),
            "USD",
            method,
            request.metadata,
            now,
        )?;
        PaymentRepository::insert(&self.store, payment.clone()).await?;

        let charge = self
            .gateway
            .charge(payment.transaction_id(), payment.amount(), method)
            .await;
        let now = Utc::now();
        match charge {
            Ok(()) => {
                payment.complete(now);
                metrics::counter!("payments_completed_total").increment(1);
            }
            Err(gateway_error) => {
                tracing::warn!(
                    code = gateway_error.code,
                    message = gateway_error.message,
                    "charge declined"
                );
                payment.fail(gateway_error, now);
                metrics::counter!("payments_failed_total").increment(1);
            }
        }
        let payment = PaymentRepository::update(&self.store, payment).await?;

        self.propagate_to_order(&payment, true).await?;
        Ok(payment)
    }

    /// Refunds part or all of a completed payment; admin only.
    ///
    /// The balance check runs before the gateway is asked for money, so
    /// an over-refund never reaches the gateway. A gateway rejection is
    /// recorded as a failed refund entry and surfaced as an error.
    #[tracing::instrument(skip(self, request), fields(user_id = %requester.user_id))]
    pub async fn refund(
        &self,
        requester: Requester,
        transaction_id: &str,
        request: RefundRequest,
    ) -> Result<Payment> {
        if !requester.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        let payment = self.load_payment(transaction_id).await?;

        if !request.amount.is_positive() {
            return Err(PaymentError::InvalidRefundAmount {
                amount: request.amount,
            }
            .into());
        }
        if request.amount > payment.remaining_refundable() {
            return Err(PaymentError::RefundExceedsBalance {
                requested: request.amount,
                available: payment.remaining_refundable(),
            }
            .into());
        }

        if let Err(gateway_error) = self
            .gateway
            .refund(payment.transaction_id(), request.amount)
            .await
        {
            let notes = request
                .notes
                .clone()
                .unwrap_or_else(|| gateway_error.message.clone());
            self.record_failed_refund(transaction_id, request.amount, request.reason, notes)
                .await?;
            metrics::counter!("refunds_failed_total").increment(1);
            return Err(ServiceError::Gateway(gateway_error));
        }

        // The gateway has already moved the money; apply it to the ledger
        // with a re-read retry so a concurrent writer cannot drop it.
        let mut applied = None;
        for _ in 0..CAS_RETRIES {
            let mut payment = self.load_payment(transaction_id).await?;
            payment.apply_refund(request.amount, request.reason, Utc::now())?;
            match PaymentRepository::update(&self.store, payment).await {
                Ok(payment) => {
                    applied = Some(payment);
                    break;
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        let payment = applied.ok_or(StoreError::VersionConflict {
            entity: "payment",
            id: transaction_id.to_string(),
            expected: 0,
        })?;

        metrics::counter!("refunds_total").increment(1);
        metrics::counter!("refunded_cents_total").increment(request.amount.cents() as u64);

        self.propagate_to_order(&payment, false).await?;
        Ok(payment)
    }

    /// Reports whether a transaction ended in a completed charge.
    pub async fn verify(
        &self,
        requester: Requester,
        transaction_id: &str,
    ) -> Result<PaymentVerification> {
        let payment = self.load_payment(transaction_id).await?;
        if !requester.can_access(payment.user_id()) {
            return Err(ServiceError::Forbidden);
        }
        Ok(PaymentVerification {
            transaction_id: payment.transaction_id().to_string(),
            status: payment.status(),
            verified: payment.status() == PaymentState::Completed,
            amount: payment.amount(),
        })
    }

    /// Fetches the full payment record; owner or admin only.
    pub async fn details(&self, requester: Requester, transaction_id: &str) -> Result<Payment> {
        let payment = self.load_payment(transaction_id).await?;
        if !requester.can_access(payment.user_id()) {
            return Err(ServiceError::Forbidden);
        }
        Ok(payment)
    }

    /// Aggregates ledger figures across all payments; admin only.
    pub async fn statistics(&self, requester: Requester) -> Result<PaymentStatistics> {
        if !requester.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        let payments = PaymentRepository::list_all(&self.store).await?;

        let mut total_amount = Money::zero();
        let mut total_refunded = Money::zero();
        let mut status_counts: HashMap<String, u64> = HashMap::new();
        for payment in &payments {
            total_amount += payment.amount();
            total_refunded += payment.total_refunded();
            *status_counts
                .entry(payment.status().as_str().to_string())
                .or_insert(0) += 1;
        }

        Ok(PaymentStatistics {
            total_payments: payments.len() as u64,
            total_amount,
            total_refunded,
            net_amount: total_amount - total_refunded,
            status_counts,
        })
    }

    async fn load_order(&self, id: OrderId) -> Result<domain::Order> {
        match OrderRepository::get(&self.store, id).await {
            Ok(order) => Ok(order),
            Err(StoreError::NotFound { .. }) => Err(ServiceError::OrderNotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_payment(&self, transaction_id: &str) -> Result<Payment> {
        match self.store.find_by_transaction(transaction_id).await {
            Ok(payment) => Ok(payment),
            Err(StoreError::NotFound { .. }) => {
                Err(ServiceError::PaymentNotFound(transaction_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn record_failed_refund(
        &self,
        transaction_id: &str,
        amount: Money,
        reason: RefundReason,
        notes: String,
    ) -> Result<()> {
        for _ in 0..CAS_RETRIES {
            let mut payment = self.load_payment(transaction_id).await?;
            payment.record_failed_refund(amount, reason, notes.clone(), Utc::now());
            match PaymentRepository::update(&self.store, payment).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(StoreError::VersionConflict {
            entity: "payment",
            id: transaction_id.to_string(),
            expected: 0,
        }
        .into())
    }

    /// Copies the payment's state onto its order, with the payment
    /// details snapshot on a first successful charge.
    async fn propagate_to_order(&self, payment: &Payment, with_details: bool) -> Result<()> {
        for _ in 0..CAS_RETRIES {
            let mut order = self.load_order(payment.order_id()).await?;
            let now = Utc::now();
            if with_details && payment.status() == PaymentState::Completed {
                order.record_payment(
                    payment.status(),
                    PaymentDetails {
                        transaction_id: payment.transaction_id().to_string(),
                        payment_date: now,
                        amount: payment.amount(),
                        currency: payment.currency().to_string(),
                    },
                    now,
                );
            } else {
                order.set_payment_status(payment.status(), now);
            }
            match OrderRepository::update(&self.store, order).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(StoreError::VersionConflict {
            entity: "order",
            id: payment.order_id().to_string(),
            expected: 0,
        }
        .into())
    }
}
