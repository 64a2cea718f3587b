//! In-memory store implementation.
//!
//! Backs tests and the development server. Documents live in hash maps
//! behind async RwLocks, with the same conditional-write semantics the
//! durable implementation would provide.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, PaymentId, UserId};
use domain::{Coupon, Order, OrderStatus, Payment, ProductId};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::repository::{
    CouponRepository, OrderRepository, Page, PageRequest, PaymentRepository, StockRepository,
};

/// In-memory implementation of every repository trait.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
    stock: Arc<RwLock<HashMap<ProductId, u32>>>,
    coupons: Arc<RwLock<HashMap<String, Coupon>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all collections.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
        self.payments.write().await.clear();
        self.stock.write().await.clear();
        self.coupons.write().await.clear();
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(StoreError::AlreadyExists {
                entity: "order",
                id: order.id().to_string(),
            });
        }
        orders.insert(order.id(), order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Order> {
        self.orders
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            })
    }

    async fn update(&self, mut order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let stored = orders.get(&order.id()).ok_or_else(|| StoreError::NotFound {
            entity: "order",
            id: order.id().to_string(),
        })?;
        if stored.version() != order.version() {
            return Err(StoreError::VersionConflict {
                entity: "order",
                id: order.id().to_string(),
                expected: order.version(),
            });
        }
        order.set_version(order.version() + 1);
        orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(Page::from_items(matched, page))
    }

    async fn list_all(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(Page::from_items(matched, page))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.id()) {
            return Err(StoreError::AlreadyExists {
                entity: "payment",
                id: payment.id().to_string(),
            });
        }
        payments.insert(payment.id(), payment);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "payment",
                id: id.to_string(),
            })
    }

    async fn find_by_transaction(&self, transaction_id: &str) -> Result<Payment> {
        self.payments
            .read()
            .await
            .values()
            .find(|p| p.transaction_id() == transaction_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "payment",
                id: transaction_id.to_string(),
            })
    }

    async fn update(&self, mut payment: Payment) -> Result<Payment> {
        let mut payments = self.payments.write().await;
        let stored = payments
            .get(&payment.id())
            .ok_or_else(|| StoreError::NotFound {
                entity: "payment",
                id: payment.id().to_string(),
            })?;
        if stored.version() != payment.version() {
            return Err(StoreError::VersionConflict {
                entity: "payment",
                id: payment.id().to_string(),
                expected: payment.version(),
            });
        }
        payment.set_version(payment.version() + 1);
        payments.insert(payment.id(), payment.clone());
        Ok(payment)
    }

    async fn list_all(&self) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut all: Vec<Payment> = payments.values().cloned().collect();
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(all)
    }
}

#[async_trait]
impl StockRepository for InMemoryStore {
    async fn level(&self, product_id: &ProductId) -> Result<u32> {
        Ok(self.stock.read().await.get(product_id).copied().unwrap_or(0))
    }

    async fn set_level(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.stock.write().await.insert(product_id, quantity);
        Ok(())
    }

    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut stock = self.stock.write().await;
        let available = stock.get(product_id).copied().unwrap_or(0);
        if available < quantity {
            return Err(StoreError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available,
            });
        }
        stock.insert(product_id.clone(), available - quantity);
        Ok(())
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut stock = self.stock.write().await;
        *stock.entry(product_id.clone()).or_insert(0) += quantity;
        Ok(())
    }

    async fn reserve_many(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        // Single write lock across the check and the apply keeps the
        // reservation all-or-nothing even under concurrent checkouts.
        let mut stock = self.stock.write().await;
        for (product_id, quantity) in lines {
            let available = stock.get(product_id).copied().unwrap_or(0);
            if available < *quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: *quantity,
                    available,
                });
            }
        }
        for (product_id, quantity) in lines {
            if let Some(level) = stock.get_mut(product_id) {
                *level -= quantity;
            }
        }
        Ok(())
    }

    async fn release_many(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        let mut stock = self.stock.write().await;
        for (product_id, quantity) in lines {
            *stock.entry(product_id.clone()).or_insert(0) += quantity;
        }
        Ok(())
    }
}

#[async_trait]
impl CouponRepository for InMemoryStore {
    async fn insert(&self, coupon: Coupon) -> Result<()> {
        let mut coupons = self.coupons.write().await;
        if coupons.contains_key(&coupon.code) {
            return Err(StoreError::AlreadyExists {
                entity: "coupon",
                id: coupon.code.clone(),
            });
        }
        coupons.insert(coupon.code.clone(), coupon);
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Coupon> {
        self.coupons
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "coupon",
                id: code.to_string(),
            })
    }

    async fn update(&self, mut coupon: Coupon) -> Result<Coupon> {
        let mut coupons = self.coupons.write().await;
        let stored = coupons
            .get(&coupon.code)
            .ok_or_else(|| StoreError::NotFound {
                entity: "coupon",
                id: coupon.code.clone(),
            })?;
        if stored.version != coupon.version {
            return Err(StoreError::VersionConflict {
                entity: "coupon",
                id: coupon.code.clone(),
                expected: coupon.version,
            });
        }
        coupon.version += 1;
        coupons.insert(coupon.code.clone(), coupon.clone());
        Ok(coupon)
    }
}
