//! Repository traits for the storefront's persisted documents.

use async_trait::async_trait;
use common::{OrderId, PaymentId, UserId};
use domain::{Coupon, Order, OrderStatus, Payment, ProductId};

use crate::error::Result;

/// A page request with 1-based page numbers.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a request, clamping the page to at least 1 and the limit
    /// to the 1..=100 range.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.limit) as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// A page of results with the totals needed to render pagination.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Slices `items` (already filtered and sorted) down to the requested
    /// page and fills in the totals.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let total_pages = total.div_ceil(request.limit as u64) as u32;
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(request.limit as usize)
            .collect();
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        }
    }
}

/// Storage for order documents.
///
/// `update` is a compare-and-swap: the write succeeds only if the stored
/// version matches the incoming document's version, and the persisted
/// document comes back with the version bumped.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;
    async fn get(&self, id: OrderId) -> Result<Order>;
    async fn update(&self, order: Order) -> Result<Order>;
    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>>;
    async fn list_all(&self, status: Option<OrderStatus>, page: PageRequest)
    -> Result<Page<Order>>;
}

/// Storage for payment documents.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn get(&self, id: PaymentId) -> Result<Payment>;
    async fn find_by_transaction(&self, transaction_id: &str) -> Result<Payment>;
    async fn update(&self, payment: Payment) -> Result<Payment>;
    async fn list_all(&self) -> Result<Vec<Payment>>;
}

/// Storage for stock levels, keyed by product.
///
/// Reservations are conditional writes: the availability check and the
/// decrement happen atomically inside the store, and `reserve_many` is
/// all-or-nothing across its lines.
#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn level(&self, product_id: &ProductId) -> Result<u32>;
    async fn set_level(&self, product_id: ProductId, quantity: u32) -> Result<()>;
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<()>;
    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()>;
    async fn reserve_many(&self, lines: &[(ProductId, u32)]) -> Result<()>;
    async fn release_many(&self, lines: &[(ProductId, u32)]) -> Result<()>;
}

/// Storage for coupon definitions and their usage counters.
#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn insert(&self, coupon: Coupon) -> Result<()>;
    async fn find_by_code(&self, code: &str) -> Result<Coupon>;
    async fn update(&self, coupon: Coupon) -> Result<Coupon>;
}
