//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::payment::PaymentState;

use super::{
    Address, Discount, LineItem, OrderError, OrderStatus, OrderTotals, PaymentDetails,
    PaymentMethod, PaymentStatus, ShippingUpdate,
};

/// Input for creating an order at checkout.
///
/// The service layer assembles this from the cart, catalog, shipping, and
/// coupon collaborators; `Order::create` owns the validation and the totals.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub shipping_method: String,
    pub shipping_cost: Money,
    pub discount: Option<Discount>,
}

/// Order aggregate root.
///
/// Created atomically from a non-empty cart at checkout, then mutated only
/// through the transition methods below. Terminal orders are retained for
/// audit, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    items: Vec<LineItem>,
    shipping_address: Address,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_details: Option<PaymentDetails>,
    order_status: OrderStatus,
    shipping_method: String,
    shipping_cost: Money,
    shipping_updates: Vec<ShippingUpdate>,
    tracking_number: Option<String>,
    subtotal: Money,
    tax: Money,
    discount: Option<Discount>,
    total: Money,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, managed by the repository.
    #[serde(default)]
    version: u64,
}

impl Order {
    /// Creates a new order, computing and freezing its totals.
    ///
    /// Rejects an empty item list and any item with a zero quantity or
    /// negative price; the resulting totals always satisfy
    /// `total == subtotal + tax + shipping_cost - discount` (clamped at zero).
    pub fn create(new: NewOrder, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if new.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        for item in &new.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.clone(),
                    price: item.unit_price,
                });
            }
        }

        let totals = OrderTotals::calculate(&new.items);
        let discount_amount = new.discount.as_ref().map(|d| d.amount).unwrap_or_default();
        let total = totals.grand_total(new.shipping_cost, discount_amount);

        let mut order = Order {
            id: OrderId::new(),
            order_number: generate_order_number(now),
            user_id: new.user_id,
            items: new.items,
            shipping_address: new.shipping_address,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            order_status: OrderStatus::Pending,
            shipping_method: new.shipping_method,
            shipping_cost: new.shipping_cost,
            shipping_updates: Vec::new(),
            tracking_number: None,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: new.discount,
            total,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
            version: 0,
        };
        order.push_update(OrderStatus::Pending, "Order placed", None, now);
        Ok(order)
    }

    /// Transitions the order to `new_status`.
    ///
    /// Enforces the transition table, refuses to ship or deliver an unpaid
    /// order, stamps the delivery date, and appends to the audit trail.
    pub fn update_status(
        &mut self,
        new_status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.order_status.can_transition_to(new_status) {
            return Err(OrderError::InvalidTransition {
                from: self.order_status,
                to: new_status,
            });
        }
        if matches!(new_status, OrderStatus::Shipped | OrderStatus::Delivered)
            && self.payment_status != PaymentStatus::Completed
        {
            return Err(OrderError::PaymentNotCompleted {
                target: new_status,
                payment_status: self.payment_status,
            });
        }

        self.order_status = new_status;
        if new_status == OrderStatus::Delivered {
            self.delivered_at = Some(now);
        }
        self.push_update(new_status, format!("Order {new_status}"), None, now);
        Ok(())
    }

    /// Cancels the order, recording the reason.
    ///
    /// The caller must release reserved stock before persisting the result;
    /// a cancellation whose stock release fails is never committed.
    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.order_status.is_cancellable() {
            return Err(OrderError::NotCancellable {
                status: self.order_status,
            });
        }
        let reason = reason.into();
        self.order_status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.push_update(
            OrderStatus::Cancelled,
            format!("Order cancelled: {reason}"),
            None,
            now,
        );
        self.cancellation_reason = Some(reason);
        Ok(())
    }

    /// Marks a delivered order as returned.
    ///
    /// Rejects anything not currently delivered, which also makes a second
    /// return attempt fail.
    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.order_status != OrderStatus::Delivered {
            return Err(OrderError::NotReturnable {
                status: self.order_status,
            });
        }
        self.order_status = OrderStatus::Returned;
        self.push_update(
            OrderStatus::Returned,
            "Order returned",
            Some("Return Center".to_string()),
            now,
        );
        Ok(())
    }

    /// Records the outcome of a payment attempt on the order.
    ///
    /// The payment record is the source of truth; this copies its state onto
    /// the order and snapshots the transaction details.
    pub fn record_payment(
        &mut self,
        state: PaymentState,
        details: PaymentDetails,
        now: DateTime<Utc>,
    ) {
        self.payment_status = state.into();
        self.payment_details = Some(details);
        self.updated_at = now;
    }

    /// Propagates a refund-driven payment state change onto the order.
    pub fn set_payment_status(&mut self, state: PaymentState, now: DateTime<Utc>) {
        self.payment_status = state.into();
        self.updated_at = now;
    }

    /// Sets or replaces the carrier tracking number.
    pub fn set_tracking_number(&mut self, tracking_number: impl Into<String>, now: DateTime<Utc>) {
        self.tracking_number = Some(tracking_number.into());
        self.updated_at = now;
    }

    fn push_update(
        &mut self,
        status: OrderStatus,
        description: impl Into<String>,
        location: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.shipping_updates.push(ShippingUpdate {
            status,
            location,
            description: description.into(),
            timestamp: now,
        });
        self.updated_at = now;
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_details(&self) -> Option<&PaymentDetails> {
        self.payment_details.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn shipping_method(&self) -> &str {
        &self.shipping_method
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn shipping_updates(&self) -> &[ShippingUpdate] {
        &self.shipping_updates
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn discount(&self) -> Option<&Discount> {
        self.discount.as_ref()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the concurrency version; only the repository should call this.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Generates a human-readable order number, e.g. `ORD-493021-a3f9`.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let ts = now.timestamp_millis().rem_euclid(1_000_000);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{ts:06}-{}", &suffix[..4])
}
