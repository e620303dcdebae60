//! Admin route handlers.
//!
//! Catalog editing, site documents and order fulfilment. Every handler
//! requires an admin session via [`RequireAdmin`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use vitrine_core::catalog::{ActiveFilters, FilterVocabulary, Product, ProductInput};
use vitrine_core::site::{SiteContent, SiteDocument, SiteSections};
use vitrine_core::{OrderId, OrderStatus, ProductId};

use crate::db::{OrderRepository, ProductRepository, SiteConfigRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::state::AppState;

/// Default and maximum page size for the order list.
const DEFAULT_ORDER_LIMIT: i64 = 50;
const MAX_ORDER_LIMIT: i64 = 500;

// =============================================================================
// Products
// =============================================================================

/// Add a product.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let input = input.validated()?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;
    state.catalog().invalidate().await;

    info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let input = input.validated()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await?;
    state.catalog().invalidate().await;

    info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Delete a product. Existing orders keep their snapshot.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate().await;

    info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Site documents
// =============================================================================

/// Replace logo, favicon and title.
pub async fn put_content(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(content): Json<SiteContent>,
) -> Result<Json<SiteContent>> {
    let content = content.normalized();
    SiteConfigRepository::new(state.pool())
        .put(SiteDocument::Content, &content)
        .await?;
    Ok(Json(content))
}

/// Replace the home page sections.
pub async fn put_sections(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(sections): Json<SiteSections>,
) -> Result<Json<SiteSections>> {
    SiteConfigRepository::new(state.pool())
        .put(SiteDocument::Sections, &sections)
        .await?;
    Ok(Json(sections))
}

/// Replace the filter vocabulary.
pub async fn put_filters(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(filters): Json<FilterVocabulary>,
) -> Result<Json<FilterVocabulary>> {
    let filters = filters.normalized();
    SiteConfigRepository::new(state.pool())
        .put(SiteDocument::Filters, &filters)
        .await?;
    Ok(Json(filters))
}

/// Choose which catalog filters are shown.
pub async fn put_active_filters(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(active): Json<ActiveFilters>,
) -> Result<Json<ActiveFilters>> {
    SiteConfigRepository::new(state.pool())
        .put(SiteDocument::ActiveFilters, &active)
        .await?;
    Ok(Json(active))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// All orders, newest first.
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ORDER_LIMIT)
        .clamp(1, MAX_ORDER_LIMIT);
    let orders = OrderRepository::new(state.pool())
        .list_all(query.status, limit)
        .await?;
    Ok(Json(orders))
}

/// Move an order through fulfilment.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, update.status)
        .await?;

    info!(order_id = %id, status = %order.status, "Order status updated");
    Ok(Json(order))
}
