//! Catalog service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, ProductId};

use crate::error::ServiceError;

/// Trait for looking up current product prices.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Returns the current unit price for a product.
    async fn price(&self, product_id: &ProductId) -> Result<Money, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    prices: HashMap<ProductId, Money>,
    fail_on_price: bool,
}

/// In-memory catalog service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogService {
    /// Creates a new in-memory catalog service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the price for a product.
    pub fn set_price(&self, product_id: ProductId, price: Money) {
        self.state.write().unwrap().prices.insert(product_id, price);
    }

    /// Configures the service to fail on the next price lookup.
    pub fn set_fail_on_price(&self, fail: bool) {
        self.state.write().unwrap().fail_on_price = fail;
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn price(&self, product_id: &ProductId) -> Result<Money, ServiceError> {
        let state = self.state.read().unwrap();
        if state.fail_on_price {
            return Err(ServiceError::Catalog(
                "Catalog backend unavailable".to_string(),
            ));
        }
        state
            .prices
            .get(product_id)
            .copied()
            .ok_or_else(|| ServiceError::ProductNotFound(product_id.clone()))
    }
}
