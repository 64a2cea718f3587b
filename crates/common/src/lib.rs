//! Shared types for the storefront backend.

mod types;

pub use types::{OrderId, PaymentId, UserId};
