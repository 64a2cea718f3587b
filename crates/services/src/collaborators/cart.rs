//! Cart service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use domain::ProductId;

use crate::error::ServiceError;

/// A line in a user's cart, as the cart side stores it.
///
/// Prices are intentionally absent; checkout fetches them from the
/// catalog so the order freezes prices at checkout time.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub variant: Option<String>,
}

/// Trait for reading and clearing a user's cart.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Returns the user's current cart lines.
    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, ServiceError>;

    /// Empties the user's cart after a successful checkout.
    async fn clear(&self, user_id: UserId) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartLine>>,
    fail_on_clear: bool,
}

/// In-memory cart service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    /// Creates a new in-memory cart service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line to a user's cart.
    pub fn add_line(&self, user_id: UserId, line: CartLine) {
        self.state
            .write()
            .unwrap()
            .carts
            .entry(user_id)
            .or_default()
            .push(line);
    }

    /// Configures the service to fail on the next clear call.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    /// Returns the number of lines in a user's cart.
    pub fn line_count(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .unwrap()
            .carts
            .get(&user_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, ServiceError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, user_id: UserId) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_clear {
            return Err(ServiceError::Cart("Cart backend unavailable".to_string()));
        }
        state.carts.remove(&user_id);
        Ok(())
    }
}
