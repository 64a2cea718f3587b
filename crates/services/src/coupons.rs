//! Coupon evaluation against the coupon repository.
//!
//! Pricing a coupon is a pure read; usage counters only move after the
//! order using the coupon has been persisted. The counter bump is a
//! compare-and-swap with a bounded re-read retry, so concurrent commits
//! against one code cannot lose an increment.

use chrono::{DateTime, Utc};
use common::UserId;
use domain::Money;
use store::{CouponRepository, StoreError};

use crate::error::{Result, ServiceError};

const COMMIT_RETRIES: u32 = 5;

/// Evaluates and commits coupons for checkout.
#[derive(Clone)]
pub struct CouponEvaluator<C> {
    coupons: C,
}

impl<C: CouponRepository> CouponEvaluator<C> {
    pub fn new(coupons: C) -> Self {
        Self { coupons }
    }

    /// Validates the coupon for this user and returns the discount it
    /// grants on `subtotal`. Does not touch usage counters.
    pub async fn price_discount(
        &self,
        code: &str,
        user: UserId,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<Money> {
        let coupon = self.coupons.find_by_code(code).await?;
        coupon.validate(now, user)?;
        Ok(coupon.discount_for(subtotal))
    }

    /// Bumps the coupon's usage counters for this user.
    pub async fn commit_usage(&self, code: &str, user: UserId) -> Result<()> {
        let mut last_conflict = None;
        for _ in 0..COMMIT_RETRIES {
            let mut coupon = self.coupons.find_by_code(code).await?;
            coupon.record_usage(user);
            match self.coupons.update(coupon).await {
                Ok(_) => return Ok(()),
                Err(err @ StoreError::VersionConflict { .. }) => {
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        match last_conflict {
            Some(err) => Err(err.into()),
            None => Err(ServiceError::Store(StoreError::NotFound {
                entity: "coupon",
                id: code.to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::{Coupon, CouponError, DiscountType};
    use store::InMemoryStore;

    fn seed_coupon(now: DateTime<Utc>) -> Coupon {
        Coupon {
            code: "SAVE10".to_string(),
            discount_value: 10,
            discount_type: DiscountType::Percentage,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            min_purchase: Money::from_cents(1000),
            max_discount: None,
            max_usage: Some(1),
            usage_count: 0,
            usage_per_user: None,
            used_by: Default::default(),
            is_active: true,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_price_discount_does_not_consume_usage() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        CouponRepository::insert(&store, seed_coupon(now)).await.unwrap();
        let evaluator = CouponEvaluator::new(store.clone());
        let user = UserId::new();

        let discount = evaluator
            .price_discount("SAVE10", user, Money::from_cents(10000), now)
            .await
            .unwrap();
        assert_eq!(discount, Money::from_cents(1000));

        // Pricing twice is fine even with max_usage = 1.
        evaluator
            .price_discount("SAVE10", user, Money::from_cents(10000), now)
            .await
            .unwrap();
        assert_eq!(store.find_by_code("SAVE10").await.unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn test_commit_then_exhausted() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        CouponRepository::insert(&store, seed_coupon(now)).await.unwrap();
        let evaluator = CouponEvaluator::new(store.clone());
        let user = UserId::new();

        evaluator.commit_usage("SAVE10", user).await.unwrap();
        let result = evaluator
            .price_discount("SAVE10", user, Money::from_cents(10000), now)
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Coupon(CouponError::Exhausted { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let evaluator = CouponEvaluator::new(InMemoryStore::new());
        let result = evaluator
            .price_discount("NOPE", UserId::new(), Money::from_cents(5000), Utc::now())
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_commits_all_counted() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut coupon = seed_coupon(now);
        coupon.max_usage = None;
        CouponRepository::insert(&store, coupon).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let evaluator = CouponEvaluator::new(store.clone());
            handles.push(tokio::spawn(async move {
                evaluator.commit_usage("SAVE10", UserId::new()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.find_by_code("SAVE10").await.unwrap().usage_count, 4);
    }
}
