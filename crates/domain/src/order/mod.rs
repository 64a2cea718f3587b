//! Order aggregate and related types.

mod aggregate;
mod pricing;
mod status;
mod value_objects;

pub use aggregate::{NewOrder, Order};
pub use pricing::{OrderTotals, TAX_RATE_PCT};
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{
    Address, Discount, LineItem, PaymentDetails, PaymentMethod, ShippingUpdate,
};

use thiserror::Error;

use crate::money::Money;
use crate::product::ProductId;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order must contain at least one line item.
    #[error("Cart is empty")]
    EmptyCart,

    /// Line item quantity must be at least 1.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Line item unit price cannot be negative.
    #[error("Invalid unit price {price} for product {product_id}")]
    InvalidPrice { product_id: ProductId, price: Money },

    /// The requested status change is not in the transition table.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Orders cannot be shipped or delivered before payment completes.
    #[error("Cannot mark order as '{target}' while payment is '{payment_status}'")]
    PaymentNotCompleted {
        target: OrderStatus,
        payment_status: PaymentStatus,
    },

    /// Cancellation is only allowed from pending or processing.
    #[error("Order cannot be cancelled from '{status}' status")]
    NotCancellable { status: OrderStatus },

    /// Only delivered orders can be returned.
    #[error("Order cannot be returned from '{status}' status")]
    NotReturnable { status: OrderStatus },
}
