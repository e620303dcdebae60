//! Account route handlers.
//!
//! These routes require authentication. Addresses and orders are always
//! scoped to the logged-in user; another user's ids read as not found.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use vitrine_core::address::{Address, AddressInput};
use vitrine_core::{AddressId, OrderId};

use crate::db::{AddressRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::state::AppState;

// =============================================================================
// Addresses
// =============================================================================

/// Saved addresses, default first.
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(addresses))
}

/// Save a new address.
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    let input = input.validated()?;
    let repo = AddressRepository::new(state.pool());
    let id = repo.save(user.id, &input).await?;
    let address = repo
        .get(user.id, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("address {id} vanished after insert")))?;

    info!(address_id = %id, "Address saved");
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an address.
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    let input = input.validated()?;
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await?;
    Ok(Json(address))
}

/// Delete an address.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make an address the default.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .set_default(user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

/// Order history, newest first.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// One order.
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}
