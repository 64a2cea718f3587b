//! Domain layer for the storefront transaction backend.
//!
//! This crate holds the pure business logic:
//! - the order aggregate with its status state machine and audit trail
//! - the payment ledger with append-only refunds and amount conservation
//! - coupon validation and discount computation
//! - fixed-point money and the totals calculator
//!
//! Nothing in here performs I/O; persistence and orchestration live in the
//! `store` and `services` crates.

pub mod coupon;
pub mod money;
pub mod order;
pub mod payment;
pub mod product;

pub use coupon::{Coupon, CouponError, DiscountType};
pub use money::Money;
pub use order::{
    Address, Discount, LineItem, NewOrder, Order, OrderError, OrderStatus, OrderTotals,
    PaymentDetails, PaymentMethod, PaymentStatus, ShippingUpdate,
};
pub use payment::{
    GatewayError, Payment, PaymentError, PaymentState, Refund, RefundReason, RefundStatus,
    RequestMetadata,
};
pub use product::ProductId;
