//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for checkout, order lifecycle management,
//! payments, and refunds, with structured logging (tracing) and
//! Prometheus metrics. Identity arrives via trusted `x-user-id` /
//! `x-user-role` headers set by the upstream edge.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::{Duration, Utc};
use domain::{Coupon, DiscountType, Money, ProductId};
use metrics_exporter_prometheus::PrometheusHandle;
use services::{
    InMemoryCartService, InMemoryCatalogService, InMemoryNotificationService,
    InMemoryShippingService, OrderService, PaymentService, SimulatedPaymentGateway,
};
use store::{CouponRepository, InMemoryStore, StockRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::checkout))
        .route("/orders", get(routes::orders::list))
        .route("/orders/all", get(routes::orders::list_all))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", post(routes::orders::update_status))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/return", post(routes::orders::mark_returned))
        .route("/orders/{id}/tracking", post(routes::orders::add_tracking))
        .route("/payments", post(routes::payments::process))
        .route("/payments/statistics", get(routes::payments::statistics))
        .route("/payments/{transaction_id}", get(routes::payments::details))
        .route(
            "/payments/{transaction_id}/verify",
            get(routes::payments::verify),
        )
        .route(
            "/payments/{transaction_id}/refund",
            post(routes::payments::refund),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the in-memory store and
/// collaborators. The collaborator handles stay on the state so callers
/// can seed carts, prices, and stock.
pub fn create_default_state() -> Arc<AppState> {
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
        notifier,
    );
    let payments = PaymentService::new(store.clone(), gateway.clone());

    Arc::new(AppState {
        orders,
        payments,
        store,
        carts,
        catalog,
        gateway,
    })
}

/// Seeds a handful of products and one coupon so the development server
/// is usable out of the box.
pub async fn seed_demo_data(state: &AppState) {
    let products = [
        ("SKU-TSHIRT", Money::from_cents(1999), 100),
        ("SKU-HOODIE", Money::from_cents(4999), 50),
        ("SKU-MUG", Money::from_cents(1299), 200),
    ];
    for (sku, price, stock) in products {
        state.catalog.set_price(ProductId::new(sku), price);
        if let Err(err) = state.store.set_level(ProductId::new(sku), stock).await {
            tracing::warn!(%err, sku, "failed to seed stock level");
        }
    }

    let now = Utc::now();
    let coupon = Coupon {
        code: "WELCOME10".to_string(),
        discount_value: 10,
        discount_type: DiscountType::Percentage,
        start_date: now,
        end_date: now + Duration::days(365),
        min_purchase: Money::from_cents(2000),
        max_discount: Some(Money::from_cents(5000)),
        max_usage: None,
        usage_count: 0,
        usage_per_user: Some(1),
        used_by: Default::default(),
        is_active: true,
        version: 0,
    };
    if let Err(err) = CouponRepository::insert(&state.store, coupon).await {
        tracing::warn!(%err, "failed to seed demo coupon");
    }
}
