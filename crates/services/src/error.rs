//! Service error types.

use common::OrderId;
use domain::{CouponError, GatewayError, OrderError, PaymentError, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during order and payment orchestration.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No payment record matches the given transaction id.
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// The requester's cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line references a product the catalog does not know.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The shipping collaborator has no method to offer.
    #[error("No shipping method available")]
    NoShippingMethod,

    /// Payments require a positive order total.
    #[error("Order total must be positive")]
    InvalidOrderTotal,

    /// The requester is not the owner and not an admin.
    #[error("Not allowed to access this resource")]
    Forbidden,

    /// The payment gateway rejected the operation.
    #[error("Payment gateway error: {0}")]
    Gateway(GatewayError),

    /// Cart collaborator error.
    #[error("Cart service error: {0}")]
    Cart(String),

    /// Catalog collaborator error.
    #[error("Catalog service error: {0}")]
    Catalog(String),

    /// Notification collaborator error.
    #[error("Notification service error: {0}")]
    Notification(String),

    /// Order aggregate rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Payment ledger rejected the operation.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Coupon validation failed.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
