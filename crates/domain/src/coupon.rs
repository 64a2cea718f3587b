//! Coupon validation and discount computation.
//!
//! Coupon definitions are owned by the catalog/admin side; this core only
//! reads them, computes discounts, and bumps usage counters on commit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// How a coupon's discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the subtotal, 0-100.
    Percentage,
    /// `discount_value` is a flat amount in cents.
    Fixed,
}

/// Errors raised when a coupon fails validation.
#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Coupon '{code}' is not active")]
    Inactive { code: String },

    #[error("Coupon '{code}' is not valid at this time")]
    Expired { code: String },

    #[error("Coupon '{code}' has reached its usage limit")]
    Exhausted { code: String },

    #[error("Usage limit for coupon '{code}' reached for this user")]
    UserLimitReached { code: String },
}

/// A coupon definition with its usage counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount_value: i64,
    pub discount_type: DiscountType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub min_purchase: Money,
    pub max_discount: Option<Money>,
    pub max_usage: Option<u32>,
    pub usage_count: u32,
    pub usage_per_user: Option<u32>,
    pub used_by: HashMap<UserId, u32>,
    pub is_active: bool,
    /// Optimistic concurrency version, managed by the repository.
    #[serde(default)]
    pub version: u64,
}

impl Coupon {
    /// Checks whether this coupon can be used by `user` at `now`.
    pub fn validate(&self, now: DateTime<Utc>, user: UserId) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive {
                code: self.code.clone(),
            });
        }
        if now < self.start_date || now > self.end_date {
            return Err(CouponError::Expired {
                code: self.code.clone(),
            });
        }
        if let Some(max) = self.max_usage
            && self.usage_count >= max
        {
            return Err(CouponError::Exhausted {
                code: self.code.clone(),
            });
        }
        if let Some(per_user) = self.usage_per_user
            && self.used_by.get(&user).copied().unwrap_or(0) >= per_user
        {
            return Err(CouponError::UserLimitReached {
                code: self.code.clone(),
            });
        }
        Ok(())
    }

    /// Computes the discount for a subtotal.
    ///
    /// Below the minimum purchase the discount is zero. Percentage discounts
    /// truncate to the cent and are capped at `max_discount` when set.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        if subtotal < self.min_purchase {
            return Money::zero();
        }
        match self.discount_type {
            DiscountType::Percentage => {
                let discount = subtotal.percent(self.discount_value);
                match self.max_discount {
                    Some(cap) => discount.min(cap),
                    None => discount,
                }
            }
            DiscountType::Fixed => Money::from_cents(self.discount_value),
        }
    }

    /// Increments the global and per-user usage counters.
    ///
    /// Must only be called after the order using this coupon was persisted;
    /// failed checkouts never consume usage.
    pub fn record_usage(&mut self, user: UserId) {
        self.usage_count += 1;
        *self.used_by.entry(user).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "SAVE10".to_string(),
            discount_value: 10,
            discount_type: DiscountType::Percentage,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            min_purchase: Money::from_cents(1000),
            max_discount: Some(Money::from_cents(2000)),
            max_usage: Some(100),
            usage_count: 0,
            usage_per_user: Some(2),
            used_by: HashMap::new(),
            is_active: true,
            version: 0,
        }
    }

    #[test]
    fn valid_coupon_passes() {
        assert!(coupon().validate(Utc::now(), UserId::new()).is_ok());
    }

    #[test]
    fn inactive_coupon_rejected() {
        let mut c = coupon();
        c.is_active = false;
        let result = c.validate(Utc::now(), UserId::new());
        assert!(matches!(result, Err(CouponError::Inactive { .. })));
    }

    #[test]
    fn out_of_window_rejected() {
        let c = coupon();
        let before = c.start_date - Duration::hours(1);
        let after = c.end_date + Duration::hours(1);
        assert!(matches!(
            c.validate(before, UserId::new()),
            Err(CouponError::Expired { .. })
        ));
        assert!(matches!(
            c.validate(after, UserId::new()),
            Err(CouponError::Expired { .. })
        ));
    }

    #[test]
    fn exhausted_coupon_rejected() {
        let mut c = coupon();
        c.usage_count = 100;
        let result = c.validate(Utc::now(), UserId::new());
        assert!(matches!(result, Err(CouponError::Exhausted { .. })));
    }

    #[test]
    fn per_user_limit_enforced() {
        let mut c = coupon();
        let user = UserId::new();
        c.record_usage(user);
        c.record_usage(user);
        let result = c.validate(Utc::now(), user);
        assert!(matches!(result, Err(CouponError::UserLimitReached { .. })));
        // Another user is unaffected.
        assert!(c.validate(Utc::now(), UserId::new()).is_ok());
    }

    #[test]
    fn percentage_discount() {
        let c = coupon();
        assert_eq!(c.discount_for(Money::from_cents(10000)).cents(), 1000);
    }

    #[test]
    fn percentage_discount_capped() {
        let c = coupon();
        // 10% of $500.00 = $50.00, capped at $20.00
        assert_eq!(c.discount_for(Money::from_cents(50000)).cents(), 2000);
    }

    #[test]
    fn below_min_purchase_is_zero() {
        let c = coupon();
        assert_eq!(c.discount_for(Money::from_cents(999)), Money::zero());
    }

    #[test]
    fn fixed_discount() {
        let mut c = coupon();
        c.discount_type = DiscountType::Fixed;
        c.discount_value = 500;
        assert_eq!(c.discount_for(Money::from_cents(10000)).cents(), 500);
    }

    #[test]
    fn record_usage_bumps_counters() {
        let mut c = coupon();
        let user = UserId::new();
        c.record_usage(user);
        assert_eq!(c.usage_count, 1);
        assert_eq!(c.used_by.get(&user), Some(&1));
    }
}
