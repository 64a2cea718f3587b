//! Order endpoints: checkout, listings, and lifecycle transitions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use common::OrderId;
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use services::{
    CheckoutRequest, InMemoryCartService, InMemoryCatalogService, InMemoryNotificationService,
    InMemoryShippingService, OrderService, PaymentService, SimulatedPaymentGateway,
};
use store::{InMemoryStore, Page, PageRequest};

use crate::error::ApiError;
use crate::routes::requester_from_headers;

type StoreOrderService = OrderService<
    InMemoryStore,
    InMemoryCartService,
    InMemoryCatalogService,
    InMemoryShippingService,
    InMemoryNotificationService,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: StoreOrderService,
    pub payments: PaymentService<InMemoryStore, SimulatedPaymentGateway>,
    pub store: InMemoryStore,
    pub carts: InMemoryCartService,
    pub catalog: InMemoryCatalogService,
    pub gateway: SimulatedPaymentGateway,
}

// -- Request types --

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(PageRequest::DEFAULT_LIMIT),
        )
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct TrackingRequest {
    pub tracking_number: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl From<Page<Order>> for OrderListResponse {
    fn from(page: Page<Order>) -> Self {
        Self {
            orders: page.items,
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

// -- Handlers --

/// POST /orders — converts the requester's cart into an order.
#[tracing::instrument(skip_all)]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let requester = requester_from_headers(&headers)?;
    let order = state.orders.checkout(requester, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders — lists the requester's own orders.
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let page = state
        .orders
        .list_orders(requester, query.status, query.page_request())
        .await?;
    Ok(Json(page.into()))
}

/// GET /orders/all — lists every order; admin only.
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let page = state
        .orders
        .list_all_orders(requester, query.status, query.page_request())
        .await?;
    Ok(Json(page.into()))
}

/// GET /orders/{id} — fetches one order; owner or admin only.
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let order = state.orders.get_order(requester, id).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/status — moves the order along its lifecycle; admin only.
#[tracing::instrument(skip(state, headers, request))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let order = state
        .orders
        .update_status(requester, id, request.status)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/cancel — cancels a pending or processing order.
#[tracing::instrument(skip(state, headers, request))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Order>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let order = state.orders.cancel(requester, id, request.reason).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/return — marks a delivered order as returned.
#[tracing::instrument(skip(state, headers))]
pub async fn mark_returned(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let order = state.orders.mark_returned(requester, id).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/tracking — attaches a tracking number; admin only.
pub async fn add_tracking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
    Json(request): Json<TrackingRequest>,
) -> Result<Json<Order>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let order = state
        .orders
        .add_tracking(requester, id, request.tracking_number)
        .await?;
    Ok(Json(order))
}
