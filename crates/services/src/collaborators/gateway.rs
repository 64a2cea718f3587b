//! Payment gateway trait and simulated implementation.
//!
//! The gateway is a black box that either accepts or rejects a charge
//! or refund. Failures come back as [`GatewayError`] and are recorded on
//! the payment ledger by the orchestrator, never swallowed.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{GatewayError, Money, PaymentMethod};

/// Trait for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Captures funds for a transaction.
    async fn charge(
        &self,
        transaction_id: &str,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<(), GatewayError>;

    /// Returns funds for a previously captured transaction.
    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<(), GatewayError>;
}

#[derive(Debug, Default)]
struct SimulatedGatewayState {
    captured: HashSet<String>,
    charge_count: u32,
    refund_count: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// Simulated gateway that always succeeds unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPaymentGateway {
    state: Arc<RwLock<SimulatedGatewayState>>,
}

impl SimulatedPaymentGateway {
    /// Creates a new simulated gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Configures the gateway to reject refunds.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Number of successful charges.
    pub fn charge_count(&self) -> u32 {
        self.state.read().unwrap().charge_count
    }

    /// Number of successful refunds.
    pub fn refund_count(&self) -> u32 {
        self.state.read().unwrap().refund_count
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(
        &self,
        transaction_id: &str,
        _amount: Money,
        _method: PaymentMethod,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_charge {
            return Err(GatewayError {
                code: "card_declined".to_string(),
                message: "The card was declined".to_string(),
            });
        }
        state.captured.insert(transaction_id.to_string());
        state.charge_count += 1;
        Ok(())
    }

    async fn refund(&self, transaction_id: &str, _amount: Money) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_refund {
            return Err(GatewayError {
                code: "refund_rejected".to_string(),
                message: "The gateway rejected the refund".to_string(),
            });
        }
        if !state.captured.contains(transaction_id) {
            return Err(GatewayError {
                code: "unknown_transaction".to_string(),
                message: format!("No captured transaction {transaction_id}"),
            });
        }
        state.refund_count += 1;
        Ok(())
    }
}
