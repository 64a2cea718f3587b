//! Notification collaborator trait and in-memory implementation.
//!
//! Notifications are fire-and-forget from the orchestrator's point of
//! view: a send failure is logged and never fails the business operation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;

use crate::error::ServiceError;

/// Trait for outbound order notifications.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Tells the user their order was placed.
    async fn order_confirmation(
        &self,
        user_id: UserId,
        order_number: &str,
    ) -> Result<(), ServiceError>;

    /// Tells the user their order was cancelled.
    async fn order_cancelled(&self, user_id: UserId, order_number: &str)
    -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<(UserId, String)>,
    fail_on_send: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on the next send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Number of notifications sent.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    fn record(&self, user_id: UserId, message: String) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(ServiceError::Notification(
                "Notification backend unavailable".to_string(),
            ));
        }
        state.sent.push((user_id, message));
        Ok(())
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn order_confirmation(
        &self,
        user_id: UserId,
        order_number: &str,
    ) -> Result<(), ServiceError> {
        self.record(user_id, format!("confirmation:{order_number}"))
    }

    async fn order_cancelled(
        &self,
        user_id: UserId,
        order_number: &str,
    ) -> Result<(), ServiceError> {
        self.record(user_id, format!("cancelled:{order_number}"))
    }
}
