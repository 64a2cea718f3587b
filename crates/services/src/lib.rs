//! Order and payment orchestration for the storefront backend.
//!
//! Two services compose the domain aggregates with the store and the
//! external collaborators:
//!
//! 1. [`OrderService`] turns a cart into a priced, stock-reserving order
//!    and drives it through its lifecycle, restoring stock on
//!    cancellation and return.
//! 2. [`PaymentService`] records charges and refunds on the payment
//!    ledger and keeps the order's payment status in sync with it.
//!
//! Failures in a multi-step operation undo the steps already taken:
//! checkout releases its stock reservation if the order cannot be
//! persisted, and a cancellation that loses a write race re-reserves
//! the stock it released.

pub mod auth;
pub mod collaborators;
pub mod coupons;
pub mod error;
pub mod orders;
pub mod payments;

pub use auth::{Requester, Role};
pub use collaborators::{
    CartLine, CartService, CatalogService, InMemoryCartService, InMemoryCatalogService,
    InMemoryNotificationService, InMemoryShippingService, NotificationService, PaymentGateway,
    ShippingMethod, ShippingService, SimulatedPaymentGateway,
};
pub use coupons::CouponEvaluator;
pub use error::ServiceError;
pub use orders::{CheckoutRequest, OrderService};
pub use payments::{
    PaymentService, PaymentStatistics, PaymentVerification, ProcessPaymentRequest, RefundRequest,
};
