//! Shipping-rate collaborator trait and in-memory implementation.
//!
//! Rate calculation lives outside this core; the orchestrator only asks
//! for the method to apply to a checkout and its cost.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Money;

use crate::error::ServiceError;

/// A shipping method offered for an order.
#[derive(Debug, Clone)]
pub struct ShippingMethod {
    pub name: String,
    pub cost: Money,
}

/// Trait for shipping rate lookups.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Returns the method applied to a checkout when the buyer does not
    /// pick one explicitly.
    async fn default_method(&self) -> Result<ShippingMethod, ServiceError>;
}

#[derive(Debug)]
struct InMemoryShippingState {
    method: Option<ShippingMethod>,
}

/// In-memory shipping service for testing.
#[derive(Debug, Clone)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a service offering flat-rate standard shipping.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryShippingState {
                method: Some(ShippingMethod {
                    name: "standard".to_string(),
                    cost: Money::from_cents(599),
                }),
            })),
        }
    }

    /// Replaces the offered method.
    pub fn set_method(&self, method: ShippingMethod) {
        self.state.write().unwrap().method = Some(method);
    }

    /// Makes the service report no method available.
    pub fn set_unavailable(&self) {
        self.state.write().unwrap().method = None;
    }
}

impl Default for InMemoryShippingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn default_method(&self) -> Result<ShippingMethod, ServiceError> {
        self.state
            .read()
            .unwrap()
            .method
            .clone()
            .ok_or(ServiceError::NoShippingMethod)
    }
}
