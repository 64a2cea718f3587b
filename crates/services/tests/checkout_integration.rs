//! End-to-end tests for checkout, cancellation, payment, and refunds.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::UserId;
use domain::{
    Address, Coupon, CouponError, DiscountType, Money, OrderError, OrderStatus, PaymentMethod,
    PaymentState, PaymentStatus, ProductId, RefundReason,
};
use services::{
    CartLine, CheckoutRequest, InMemoryCartService, InMemoryCatalogService,
    InMemoryNotificationService, InMemoryShippingService, OrderService, PaymentService,
    ProcessPaymentRequest, RefundRequest, Requester, ServiceError, SimulatedPaymentGateway,
};
use store::{CouponRepository, InMemoryStore, PageRequest, StockRepository, StoreError};

type TestOrderService = OrderService<
    InMemoryStore,
    InMemoryCartService,
    InMemoryCatalogService,
    InMemoryShippingService,
    InMemoryNotificationService,
>;

struct TestHarness {
    store: InMemoryStore,
    carts: InMemoryCartService,
    catalog: InMemoryCatalogService,
    gateway: SimulatedPaymentGateway,
    notifier: InMemoryNotificationService,
    orders: TestOrderService,
    payments: PaymentService<InMemoryStore, SimulatedPaymentGateway>,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let carts = InMemoryCartService::new();
        let catalog = InMemoryCatalogService::new();
        let shipping = InMemoryShippingService::new();
        let gateway = SimulatedPaymentGateway::new();
        let notifier = InMemoryNotificationService::new();

        let orders = OrderService::new(
            store.clone(),
            carts.clone(),
            catalog.clone(),
            shipping.clone(),
            notifier.clone(),
        );
        let payments = PaymentService::new(store.clone(), gateway.clone());

        Self {
            store,
            carts,
            catalog,
            gateway,
            notifier,
            orders,
            payments,
        }
    }

    async fn seed_product(&self, sku: &str, price: Money, stock: u32) {
        self.catalog.set_price(ProductId::new(sku), price);
        self.store
            .set_level(ProductId::new(sku), stock)
            .await
            .unwrap();
    }

    fn fill_cart(&self, user: UserId, sku: &str, quantity: u32) {
        self.carts.add_line(
            user,
            CartLine {
                product_id: ProductId::new(sku),
                quantity,
                variant: None,
            },
        );
    }

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62704".to_string(),
                country: "US".to_string(),
            },
            payment_method: PaymentMethod::CreditCard,
            coupon_code: None,
        }
    }
}

#[tokio::test]
async fn checkout_prices_reserves_and_clears_cart() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(2000), 10).await;
    harness.fill_cart(user, "SKU-001", 2);

    let order = harness
        .orders
        .checkout(Requester::customer(user), TestHarness::checkout_request())
        .await
        .unwrap();

    // subtotal 4000, tax 400, shipping 599
    assert_eq!(order.subtotal(), Money::from_cents(4000));
    assert_eq!(order.tax(), Money::from_cents(400));
    assert_eq!(order.total(), Money::from_cents(4999));
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.payment_status(), PaymentStatus::Pending);
    assert!(order.order_number().starts_with("ORD-"));

    let level = harness.store.level(&ProductId::new("SKU-001")).await.unwrap();
    assert_eq!(level, 8);
    assert_eq!(harness.carts.line_count(user), 0);
    assert_eq!(harness.notifier.sent_count(), 1);
}

#[tokio::test]
async fn checkout_with_empty_cart_fails() {
    let harness = TestHarness::new();
    let result = harness
        .orders
        .checkout(
            Requester::customer(UserId::new()),
            TestHarness::checkout_request(),
        )
        .await;
    assert!(matches!(result, Err(ServiceError::EmptyCart)));
}

#[tokio::test]
async fn checkout_insufficient_stock_reserves_nothing() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-A", Money::from_cents(1000), 10).await;
    harness.seed_product("SKU-B", Money::from_cents(1000), 1).await;
    harness.fill_cart(user, "SKU-A", 2);
    harness.fill_cart(user, "SKU-B", 2);

    let result = harness
        .orders
        .checkout(Requester::customer(user), TestHarness::checkout_request())
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Store(StoreError::InsufficientStock { .. }))
    ));

    assert_eq!(harness.store.level(&ProductId::new("SKU-A")).await.unwrap(), 10);
    assert_eq!(harness.store.level(&ProductId::new("SKU-B")).await.unwrap(), 1);
    // Cart is kept so the buyer can adjust it.
    assert_eq!(harness.carts.line_count(user), 2);
}

#[tokio::test]
async fn concurrent_checkouts_for_last_unit() {
    let harness = Arc::new(TestHarness::new());
    harness.seed_product("SKU-001", Money::from_cents(2000), 1).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            let user = UserId::new();
            harness.fill_cart(user, "SKU-001", 1);
            harness
                .orders
                .checkout(Requester::customer(user), TestHarness::checkout_request())
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 0);
}

#[tokio::test]
async fn coupon_applies_and_consumes_usage() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(10000), 5).await;
    harness.fill_cart(user, "SKU-001", 1);

    let now = Utc::now();
    CouponRepository::insert(
        &harness.store,
        Coupon {
            code: "SAVE10".to_string(),
            discount_value: 10,
            discount_type: DiscountType::Percentage,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            min_purchase: Money::from_cents(5000),
            max_discount: None,
            max_usage: Some(1),
            usage_count: 0,
            usage_per_user: None,
            used_by: Default::default(),
            is_active: true,
            version: 0,
        },
    )
    .await
    .unwrap();

    let mut request = TestHarness::checkout_request();
    request.coupon_code = Some("SAVE10".to_string());
    let order = harness
        .orders
        .checkout(Requester::customer(user), request.clone())
        .await
        .unwrap();

    // subtotal 10000, discount 1000, tax 1000, shipping 599
    assert_eq!(order.discount().unwrap().amount, Money::from_cents(1000));
    assert_eq!(order.total(), Money::from_cents(10599));
    assert_eq!(
        harness.store.find_by_code("SAVE10").await.unwrap().usage_count,
        1
    );

    // A second buyer finds the coupon exhausted; nothing is reserved.
    let other = UserId::new();
    harness.fill_cart(other, "SKU-001", 1);
    let result = harness
        .orders
        .checkout(Requester::customer(other), request)
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Coupon(CouponError::Exhausted { .. }))
    ));
    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 4);
}

#[tokio::test]
async fn cancel_restores_stock_and_rejects_second_cancel() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(2000), 5).await;
    harness.fill_cart(user, "SKU-001", 3);

    let requester = Requester::customer(user);
    let order = harness
        .orders
        .checkout(requester, TestHarness::checkout_request())
        .await
        .unwrap();
    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 2);

    let cancelled = harness
        .orders
        .cancel(requester, order.id(), "changed mind")
        .await
        .unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason(), Some("changed mind"));
    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 5);

    let result = harness
        .orders
        .cancel(requester, order.id(), "again")
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Order(OrderError::NotCancellable { .. }))
    ));
    // No double release.
    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 5);
}

#[tokio::test]
async fn other_customer_cannot_read_or_cancel() {
    let harness = TestHarness::new();
    let owner = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(2000), 5).await;
    harness.fill_cart(owner, "SKU-001", 1);

    let order = harness
        .orders
        .checkout(Requester::customer(owner), TestHarness::checkout_request())
        .await
        .unwrap();

    let intruder = Requester::customer(UserId::new());
    assert!(matches!(
        harness.orders.get_order(intruder, order.id()).await,
        Err(ServiceError::Forbidden)
    ));
    assert!(matches!(
        harness.orders.cancel(intruder, order.id(), "mine now").await,
        Err(ServiceError::Forbidden)
    ));

    // Admins can read anything.
    let admin = Requester::admin(UserId::new());
    assert!(harness.orders.get_order(admin, order.id()).await.is_ok());
}

#[tokio::test]
async fn payment_completes_order_payment_status() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(2000), 5).await;
    harness.fill_cart(user, "SKU-001", 1);

    let requester = Requester::customer(user);
    let order = harness
        .orders
        .checkout(requester, TestHarness::checkout_request())
        .await
        .unwrap();

    let payment = harness
        .payments
        .process(
            requester,
            ProcessPaymentRequest {
                order_id: order.id(),
                payment_method: None,
                metadata: Default::default(),
            },
        )
        .await
        .unwrap();

    assert_eq!(payment.status(), PaymentState::Completed);
    assert_eq!(payment.amount(), order.total());
    assert!(payment.transaction_id().starts_with("TXN-"));

    let order = harness.orders.get_order(requester, order.id()).await.unwrap();
    assert_eq!(order.payment_status(), PaymentStatus::Completed);
    let details = order.payment_details().unwrap();
    assert_eq!(details.transaction_id, payment.transaction_id());
    assert_eq!(details.amount, payment.amount());
}

#[tokio::test]
async fn declined_charge_recorded_as_failed_payment() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(2000), 5).await;
    harness.fill_cart(user, "SKU-001", 1);

    let requester = Requester::customer(user);
    let order = harness
        .orders
        .checkout(requester, TestHarness::checkout_request())
        .await
        .unwrap();

    harness.gateway.set_fail_on_charge(true);
    let payment = harness
        .payments
        .process(
            requester,
            ProcessPaymentRequest {
                order_id: order.id(),
                payment_method: None,
                metadata: Default::default(),
            },
        )
        .await
        .unwrap();

    assert_eq!(payment.status(), PaymentState::Failed);
    assert_eq!(payment.error().unwrap().code, "card_declined");

    let order = harness.orders.get_order(requester, order.id()).await.unwrap();
    assert_eq!(order.payment_status(), PaymentStatus::Failed);
    // The order cannot ship without a completed payment.
    let admin = Requester::admin(UserId::new());
    let shipped = harness
        .orders
        .update_status(admin, order.id(), OrderStatus::Shipped)
        .await;
    assert!(matches!(
        shipped,
        Err(ServiceError::Order(OrderError::PaymentNotCompleted { .. }))
    ));
}

#[tokio::test]
async fn full_lifecycle_ship_deliver_return() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(2000), 5).await;
    harness.fill_cart(user, "SKU-001", 2);

    let requester = Requester::customer(user);
    let order = harness
        .orders
        .checkout(requester, TestHarness::checkout_request())
        .await
        .unwrap();
    harness
        .payments
        .process(
            requester,
            ProcessPaymentRequest {
                order_id: order.id(),
                payment_method: None,
                metadata: Default::default(),
            },
        )
        .await
        .unwrap();

    let admin = Requester::admin(UserId::new());
    harness
        .orders
        .update_status(admin, order.id(), OrderStatus::Processing)
        .await
        .unwrap();
    harness
        .orders
        .add_tracking(admin, order.id(), "1Z999AA10123456784")
        .await
        .unwrap();
    harness
        .orders
        .update_status(admin, order.id(), OrderStatus::Shipped)
        .await
        .unwrap();
    let delivered = harness
        .orders
        .update_status(admin, order.id(), OrderStatus::Delivered)
        .await
        .unwrap();
    assert!(delivered.delivered_at().is_some());
    assert_eq!(delivered.tracking_number(), Some("1Z999AA10123456784"));

    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 3);
    let returned = harness.orders.mark_returned(requester, order.id()).await.unwrap();
    assert_eq!(returned.status(), OrderStatus::Returned);
    assert_eq!(harness.store.level(&ProductId::new("SKU-001")).await.unwrap(), 5);

    // Audit trail is append-only and ordered.
    let updates = returned.shipping_updates();
    assert!(updates.len() >= 5);
    assert!(updates.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn refund_ledger_conservation() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(5000), 5).await;
    harness.fill_cart(user, "SKU-001", 2);

    let requester = Requester::customer(user);
    let order = harness
        .orders
        .checkout(requester, TestHarness::checkout_request())
        .await
        .unwrap();
    let payment = harness
        .payments
        .process(
            requester,
            ProcessPaymentRequest {
                order_id: order.id(),
                payment_method: None,
                metadata: Default::default(),
            },
        )
        .await
        .unwrap();
    let txn = payment.transaction_id().to_string();
    let total = payment.amount();

    let admin = Requester::admin(UserId::new());
    let partial = harness
        .payments
        .refund(
            admin,
            &txn,
            RefundRequest {
                amount: Money::from_cents(3000),
                reason: RefundReason::CustomerRequest,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(partial.status(), PaymentState::PartiallyRefunded);
    assert_eq!(partial.total_refunded(), Money::from_cents(3000));

    // Over-refunding the remainder is rejected before the gateway moves money.
    let refunds_before = harness.gateway.refund_count();
    let too_much = harness
        .payments
        .refund(
            admin,
            &txn,
            RefundRequest {
                amount: total,
                reason: RefundReason::CustomerRequest,
                notes: None,
            },
        )
        .await;
    assert!(matches!(
        too_much,
        Err(ServiceError::Payment(
            domain::PaymentError::RefundExceedsBalance { .. }
        ))
    ));
    assert_eq!(harness.gateway.refund_count(), refunds_before);

    // Refunding exactly the remainder completes the ledger.
    let full = harness
        .payments
        .refund(
            admin,
            &txn,
            RefundRequest {
                amount: total - Money::from_cents(3000),
                reason: RefundReason::ProductReturn,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(full.status(), PaymentState::Refunded);
    assert_eq!(full.total_refunded(), total);
    assert_eq!(full.remaining_refundable(), Money::zero());

    let order = harness.orders.get_order(requester, order.id()).await.unwrap();
    assert_eq!(order.payment_status(), PaymentStatus::Refunded);
}

#[tokio::test]
async fn rejected_gateway_refund_is_recorded() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(5000), 5).await;
    harness.fill_cart(user, "SKU-001", 1);

    let requester = Requester::customer(user);
    let order = harness
        .orders
        .checkout(requester, TestHarness::checkout_request())
        .await
        .unwrap();
    let payment = harness
        .payments
        .process(
            requester,
            ProcessPaymentRequest {
                order_id: order.id(),
                payment_method: None,
                metadata: Default::default(),
            },
        )
        .await
        .unwrap();
    let txn = payment.transaction_id().to_string();

    harness.gateway.set_fail_on_refund(true);
    let admin = Requester::admin(UserId::new());
    let result = harness
        .payments
        .refund(
            admin,
            &txn,
            RefundRequest {
                amount: Money::from_cents(1000),
                reason: RefundReason::Other,
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Gateway(_))));

    // The failed attempt is on the ledger but moved no money, with the
    // gateway's decline message in its notes.
    let payment = harness.payments.details(admin, &txn).await.unwrap();
    assert_eq!(payment.refunds().len(), 1);
    assert_eq!(
        payment.refunds()[0].status,
        domain::RefundStatus::Failed
    );
    assert_eq!(
        payment.refunds()[0].notes.as_deref(),
        Some("The gateway rejected the refund")
    );
    assert_eq!(payment.total_refunded(), Money::zero());
    assert_eq!(payment.status(), PaymentState::Completed);
}

#[tokio::test]
async fn refund_on_unknown_transaction_is_not_found() {
    let harness = TestHarness::new();
    let admin = Requester::admin(UserId::new());
    let result = harness
        .payments
        .refund(
            admin,
            "TXN-missing",
            RefundRequest {
                amount: Money::from_cents(100),
                reason: RefundReason::Other,
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::PaymentNotFound(_))));
}

#[tokio::test]
async fn statistics_aggregate_the_ledger() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(5000), 10).await;

    let requester = Requester::customer(user);
    let mut transactions = Vec::new();
    for _ in 0..2 {
        harness.fill_cart(user, "SKU-001", 1);
        let order = harness
            .orders
            .checkout(requester, TestHarness::checkout_request())
            .await
            .unwrap();
        let payment = harness
            .payments
            .process(
                requester,
                ProcessPaymentRequest {
                    order_id: order.id(),
                    payment_method: None,
                    metadata: Default::default(),
                },
            )
            .await
            .unwrap();
        transactions.push((payment.transaction_id().to_string(), payment.amount()));
    }

    let admin = Requester::admin(UserId::new());
    harness
        .payments
        .refund(
            admin,
            &transactions[0].0,
            RefundRequest {
                amount: Money::from_cents(2000),
                reason: RefundReason::CustomerRequest,
                notes: None,
            },
        )
        .await
        .unwrap();

    let stats = harness.payments.statistics(admin).await.unwrap();
    let expected_total = transactions[0].1 + transactions[1].1;
    assert_eq!(stats.total_payments, 2);
    assert_eq!(stats.total_amount, expected_total);
    assert_eq!(stats.total_refunded, Money::from_cents(2000));
    assert_eq!(stats.net_amount, expected_total - Money::from_cents(2000));
    assert_eq!(stats.status_counts.get("completed"), Some(&1));
    assert_eq!(stats.status_counts.get("partially_refunded"), Some(&1));

    // Statistics are admin only.
    assert!(matches!(
        harness.payments.statistics(requester).await,
        Err(ServiceError::Forbidden)
    ));
}

#[tokio::test]
async fn listing_filters_by_status_and_owner() {
    let harness = TestHarness::new();
    let user = UserId::new();
    harness.seed_product("SKU-001", Money::from_cents(1000), 10).await;

    let requester = Requester::customer(user);
    for _ in 0..3 {
        harness.fill_cart(user, "SKU-001", 1);
        harness
            .orders
            .checkout(requester, TestHarness::checkout_request())
            .await
            .unwrap();
    }
    let other = UserId::new();
    harness.fill_cart(other, "SKU-001", 1);
    harness
        .orders
        .checkout(Requester::customer(other), TestHarness::checkout_request())
        .await
        .unwrap();

    let mine = harness
        .orders
        .list_orders(requester, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 3);

    let pending = harness
        .orders
        .list_orders(requester, Some(OrderStatus::Pending), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(pending.total, 3);
    let shipped = harness
        .orders
        .list_orders(requester, Some(OrderStatus::Shipped), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(shipped.total, 0);

    let all = harness
        .orders
        .list_all_orders(Requester::admin(UserId::new()), None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 4);

    assert!(matches!(
        harness
            .orders
            .list_all_orders(requester, None, PageRequest::default())
            .await,
        Err(ServiceError::Forbidden)
    ));
}
