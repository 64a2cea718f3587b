//! Order orchestration: checkout, lifecycle transitions, and listings.

use chrono::Utc;
use common::OrderId;
use domain::{
    Address, Discount, LineItem, Money, NewOrder, Order, OrderStatus, PaymentMethod, ProductId,
};
use serde::Deserialize;
use store::{OrderRepository, Page, PageRequest, StockRepository};

use crate::auth::Requester;
use crate::collaborators::{CartService, CatalogService, NotificationService, ShippingService};
use crate::coupons::CouponEvaluator;
use crate::error::{Result, ServiceError};

/// Checkout input: everything the order needs beyond the cart itself.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Orchestrates order creation and lifecycle transitions.
///
/// Checkout composes the cart, catalog, shipping, coupon, and stock
/// collaborators into one operation: stock is reserved before the order
/// is persisted, and released again if persistence fails. Cancellation
/// and return restore stock before the transition commits.
pub struct OrderService<S, Cart, Cat, Sh, N> {
    store: S,
    carts: Cart,
    catalog: Cat,
    shipping: Sh,
    notifier: N,
    coupons: CouponEvaluator<S>,
}

impl<S, Cart, Cat, Sh, N> OrderService<S, Cart, Cat, Sh, N>
where
    S: OrderRepository + StockRepository + store::CouponRepository + Clone,
    Cart: CartService,
    Cat: CatalogService,
    Sh: ShippingService,
    N: NotificationService,
{
    pub fn new(store: S, carts: Cart, catalog: Cat, shipping: Sh, notifier: N) -> Self {
        let coupons = CouponEvaluator::new(store.clone());
        Self {
            store,
            carts,
            catalog,
            shipping,
            notifier,
            coupons,
        }
    }

    /// Converts the requester's cart into a persisted order.
    ///
    /// Prices are frozen from the catalog at this moment. Stock for every
    /// line is reserved all-or-nothing before the order document exists;
    /// if the insert then fails, the reservation is rolled back.
    #[tracing::instrument(skip(self, request), fields(user_id = %requester.user_id))]
    pub async fn checkout(&self, requester: Requester, request: CheckoutRequest) -> Result<Order> {
        metrics::counter!("checkouts_total").increment(1);
        let start = std::time::Instant::now();
        let now = Utc::now();
        let user_id = requester.user_id;

        let cart_lines = self.carts.lines(user_id).await?;
        if cart_lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let mut items = Vec::with_capacity(cart_lines.len());
        for line in &cart_lines {
            let price = self.catalog.price(&line.product_id).await?;
            let mut item = LineItem::new(line.product_id.clone(), line.quantity, price);
            if let Some(variant) = &line.variant {
                item = item.with_variant(variant.clone());
            }
            items.push(item);
        }
        let subtotal: Money = items.iter().map(LineItem::line_total).sum();

        let shipping = self.shipping.default_method().await?;

        let discount = match &request.coupon_code {
            Some(code) => {
                let amount = self
                    .coupons
                    .price_discount(code, user_id, subtotal, now)
                    .await?;
                Some(Discount {
                    code: code.clone(),
                    amount,
                })
            }
            None => None,
        };

        let reservation: Vec<(ProductId, u32)> = items
            .iter()
            .map(|item| (item.product_id.clone(), item.quantity))
            .collect();
        self.store.reserve_many(&reservation).await?;

        let order = match Order::create(
            NewOrder {
                user_id,
                items,
                shipping_address: request.shipping_address,
                payment_method: request.payment_method,
                shipping_method: shipping.name,
                shipping_cost: shipping.cost,
                discount,
            },
            now,
        ) {
            Ok(order) => order,
            Err(err) => {
                self.store.release_many(&reservation).await?;
                return Err(err.into());
            }
        };

        if let Err(err) = OrderRepository::insert(&self.store, order.clone()).await {
            self.store.release_many(&reservation).await?;
            return Err(err.into());
        }

        if let Some(code) = &request.coupon_code
            && let Err(err) = self.coupons.commit_usage(code, user_id).await
        {
            tracing::warn!(%err, code, "coupon usage commit failed after checkout");
        }
        if let Err(err) = self.carts.clear(user_id).await {
            tracing::warn!(%err, "cart clear failed after checkout");
        }
        if let Err(err) = self
            .notifier
            .order_confirmation(user_id, order.order_number())
            .await
        {
            tracing::warn!(%err, "order confirmation failed");
        }

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id(), order_number = order.order_number(), "order placed");
        Ok(order)
    }

    /// Fetches one order; owner or admin only.
    pub async fn get_order(&self, requester: Requester, id: OrderId) -> Result<Order> {
        let order = self.load(id).await?;
        if !requester.can_access(order.user_id()) {
            return Err(ServiceError::Forbidden);
        }
        Ok(order)
    }

    /// Lists the requester's own orders, newest first.
    pub async fn list_orders(
        &self,
        requester: Requester,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        Ok(self
            .store
            .list_for_user(requester.user_id, status, page)
            .await?)
    }

    /// Lists every order in the system; admin only.
    pub async fn list_all_orders(
        &self,
        requester: Requester,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        if !requester.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.store.list_all(status, page).await?)
    }

    /// Moves an order along the status machine; admin only.
    #[tracing::instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn update_status(
        &self,
        requester: Requester,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order> {
        if !requester.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        let mut order = self.load(id).await?;
        order.update_status(new_status, Utc::now())?;
        let order = OrderRepository::update(&self.store, order).await?;
        tracing::info!(order_id = %id, status = %new_status, "order status updated");
        Ok(order)
    }

    /// Cancels an order and restores its stock.
    ///
    /// Stock is released before the cancelled document is committed; if
    /// the commit loses a concurrent write race, the release is undone
    /// and the conflict surfaces to the caller.
    #[tracing::instrument(skip(self, reason), fields(user_id = %requester.user_id))]
    pub async fn cancel(
        &self,
        requester: Requester,
        id: OrderId,
        reason: impl Into<String> + Send,
    ) -> Result<Order> {
        let mut order = self.load(id).await?;
        if !requester.can_access(order.user_id()) {
            return Err(ServiceError::Forbidden);
        }
        order.cancel(reason, Utc::now())?;
        let order = self.commit_with_restock(order).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        if let Err(err) = self
            .notifier
            .order_cancelled(order.user_id(), order.order_number())
            .await
        {
            tracing::warn!(%err, "cancellation notice failed");
        }
        Ok(order)
    }

    /// Marks a delivered order as returned and restores its stock.
    #[tracing::instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn mark_returned(&self, requester: Requester, id: OrderId) -> Result<Order> {
        let mut order = self.load(id).await?;
        if !requester.can_access(order.user_id()) {
            return Err(ServiceError::Forbidden);
        }
        order.mark_returned(Utc::now())?;
        let order = self.commit_with_restock(order).await?;
        metrics::counter!("orders_returned_total").increment(1);
        Ok(order)
    }

    /// Attaches a carrier tracking number; admin only.
    pub async fn add_tracking(
        &self,
        requester: Requester,
        id: OrderId,
        tracking_number: impl Into<String> + Send,
    ) -> Result<Order> {
        if !requester.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        let mut order = self.load(id).await?;
        order.set_tracking_number(tracking_number, Utc::now());
        Ok(OrderRepository::update(&self.store, order).await?)
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        match OrderRepository::get(&self.store, id).await {
            Ok(order) => Ok(order),
            Err(store::StoreError::NotFound { .. }) => Err(ServiceError::OrderNotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Releases the order's stock, then commits the already-mutated
    /// document. A lost write race re-reserves the stock so the failed
    /// transition leaves no trace.
    async fn commit_with_restock(&self, order: Order) -> Result<Order> {
        let lines: Vec<(ProductId, u32)> = order
            .items()
            .iter()
            .map(|item| (item.product_id.clone(), item.quantity))
            .collect();
        self.store.release_many(&lines).await?;

        match OrderRepository::update(&self.store, order).await {
            Ok(order) => Ok(order),
            Err(err) => {
                if let Err(reserve_err) = self.store.reserve_many(&lines).await {
                    tracing::error!(%reserve_err, "failed to undo stock release after lost write");
                }
                Err(err.into())
            }
        }
    }
}
