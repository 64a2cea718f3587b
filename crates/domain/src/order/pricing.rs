//! Order totals calculator.
//!
//! Pure functions over line items; shipping and discount are layered on by the
//! caller before the order is persisted.

use crate::money::Money;

use super::LineItem;

/// Flat tax rate applied to every order, in percent.
pub const TAX_RATE_PCT: i64 = 10;

/// Subtotal, tax, and total for a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computes totals for the given line items.
    ///
    /// Assumes quantities and prices were validated upstream; this is a pure
    /// calculation with no error path.
    pub fn calculate(items: &[LineItem]) -> OrderTotals {
        let subtotal: Money = items.iter().map(LineItem::line_total).sum();
        let tax = subtotal.percent(TAX_RATE_PCT);
        OrderTotals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Returns the grand total after shipping and discount.
    ///
    /// Clamped at zero so an oversized fixed coupon can never produce a
    /// negative order total.
    pub fn grand_total(&self, shipping_cost: Money, discount: Money) -> Money {
        let total = self.total + shipping_cost - discount;
        if total.is_negative() { Money::zero() } else { total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductId;

    fn item(price_cents: i64, qty: u32) -> LineItem {
        LineItem::new(ProductId::new("SKU-001"), qty, Money::from_cents(price_cents))
    }

    #[test]
    fn subtotal_is_price_times_quantity() {
        let totals = OrderTotals::calculate(&[item(5000, 2)]);
        assert_eq!(totals.subtotal.cents(), 10000);
    }

    #[test]
    fn tax_is_ten_percent() {
        let totals = OrderTotals::calculate(&[item(5000, 2)]);
        assert_eq!(totals.tax.cents(), 1000);
        assert_eq!(totals.total.cents(), 11000);
    }

    #[test]
    fn empty_items_are_zero() {
        let totals = OrderTotals::calculate(&[]);
        assert_eq!(totals.subtotal, Money::zero());
        assert_eq!(totals.tax, Money::zero());
        assert_eq!(totals.total, Money::zero());
    }

    #[test]
    fn multiple_items_sum() {
        let totals = OrderTotals::calculate(&[item(1000, 2), item(2500, 1)]);
        assert_eq!(totals.subtotal.cents(), 4500);
        assert_eq!(totals.tax.cents(), 450);
    }

    #[test]
    fn grand_total_adds_shipping_subtracts_discount() {
        let totals = OrderTotals::calculate(&[item(5000, 2)]);
        let total = totals.grand_total(Money::from_cents(500), Money::from_cents(1000));
        assert_eq!(total.cents(), 11000 + 500 - 1000);
    }

    #[test]
    fn grand_total_never_negative() {
        let totals = OrderTotals::calculate(&[item(100, 1)]);
        let total = totals.grand_total(Money::zero(), Money::from_cents(100_000));
        assert_eq!(total, Money::zero());
    }

    #[test]
    fn tax_truncates_to_the_cent() {
        // 3 * $0.33 = $0.99, 10% = $0.099 -> 9 cents
        let totals = OrderTotals::calculate(&[item(33, 3)]);
        assert_eq!(totals.tax.cents(), 9);
    }
}
