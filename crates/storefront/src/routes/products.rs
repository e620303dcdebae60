//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use vitrine_core::ProductId;
use vitrine_core::catalog::{ActiveFilters, Product, ProductQuery};
use vitrine_core::site::SiteDocument;

use crate::db::SiteConfigRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// A filtered catalog page.
#[derive(Debug, Serialize)]
pub struct ProductListing {
    pub products: Vec<Product>,
    pub total: usize,
    pub active_filters: ActiveFilters,
}

/// List products matching the query.
///
/// Constraints on filters the admin disabled are ignored.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductListing>> {
    let active_filters: ActiveFilters = SiteConfigRepository::new(state.pool())
        .get(SiteDocument::ActiveFilters)
        .await?;
    let products = state.catalog().products(state.pool()).await?;

    let products = query.apply(&products, &active_filters);
    Ok(Json(ProductListing {
        total: products.len(),
        products,
        active_filters,
    }))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    state
        .catalog()
        .product(state.pool(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}
