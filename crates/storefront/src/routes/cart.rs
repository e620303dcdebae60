//! Cart and shipping route handlers.
//!
//! The cart lives in the shopper's [`CheckoutSession`](crate::services::cart::CheckoutSession).
//! Every change to the cart or destination restarts shipping under the same
//! lock and recomputes it before the response is built, so the returned view
//! is always consistent.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::address::{ManualAddress, ShippingDestination};
use vitrine_core::shipping::ShippingCalculation;
use vitrine_core::{AddressId, ProductId};

use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::services::cart::{
    CartView, CheckoutSession, SessionHandle, change_and_refresh, refresh_shipping,
};
use crate::state::AppState;

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
}

/// Quantity change request; zero or less removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove-line request.
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub product_id: ProductId,
}

/// Where to ship: a saved address of the logged-in user or a manual entry.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestinationRequest {
    Saved { address_id: AddressId },
    Manual(ManualAddress),
}

/// Shipping option choice.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub option_id: String,
}

#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u32,
}

pub(crate) async fn checkout_session(state: &AppState, session: &Session) -> Result<SessionHandle> {
    Ok(state.carts().for_session(session).await?)
}

/// Apply a change, recompute shipping and snapshot the session.
async fn changed_view<F>(state: &AppState, handle: &SessionHandle, change: F) -> CartView
where
    F: FnOnce(&mut CheckoutSession),
{
    change_and_refresh(handle, state.quoter(), change).await;
    handle.lock().await.view()
}

/// Show the cart with totals and shipping state.
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let handle = checkout_session(&state, &session).await?;
    let view = handle.lock().await.view();
    Ok(Json(view))
}

/// Add one unit of a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let product = state
        .catalog()
        .product(state.pool(), req.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", req.product_id)))?;

    let handle = checkout_session(&state, &session).await?;
    let view = changed_view(&state, &handle, |s| s.cart.add_item(&product)).await;
    Ok(Json(view))
}

/// Set a line's quantity.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let handle = checkout_session(&state, &session).await?;
    let view = changed_view(&state, &handle, |s| {
        s.cart.set_quantity(req.product_id, req.quantity);
    })
    .await;
    Ok(Json(view))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let handle = checkout_session(&state, &session).await?;
    let view = changed_view(&state, &handle, |s| s.cart.remove_item(req.product_id)).await;
    Ok(Json(view))
}

/// Item count for the header badge.
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<CartCount>> {
    let handle = checkout_session(&state, &session).await?;
    let count = handle.lock().await.cart.item_count();
    Ok(Json(CartCount { count }))
}

/// Choose the shipping destination.
///
/// Saved addresses must belong to the logged-in user.
#[instrument(skip(state, session, user, req))]
pub async fn set_destination(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<DestinationRequest>,
) -> Result<Json<CartView>> {
    let destination = match req {
        DestinationRequest::Saved { address_id } => {
            let user = user.ok_or_else(|| {
                AppError::Unauthorized("Please log in to use saved addresses.".to_string())
            })?;
            let address = AddressRepository::new(state.pool())
                .get(user.id, address_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("address {address_id}")))?;
            ShippingDestination::Saved(address)
        }
        DestinationRequest::Manual(manual) => ShippingDestination::Manual(manual),
    };

    let handle = checkout_session(&state, &session).await?;
    let view = changed_view(&state, &handle, |s| s.destination = Some(destination)).await;
    Ok(Json(view))
}

/// Recalculate shipping, e.g. to retry after a rate API failure.
#[instrument(skip(state, session))]
pub async fn calculate(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ShippingCalculation>> {
    let handle = checkout_session(&state, &session).await?;
    refresh_shipping(&handle, state.quoter()).await;
    let shipping = handle.lock().await.shipping.clone();
    Ok(Json(shipping))
}

/// Current shipping calculation state.
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ShippingCalculation>> {
    let handle = checkout_session(&state, &session).await?;
    let shipping = handle.lock().await.shipping.clone();
    Ok(Json(shipping))
}

/// Pick one of the resolved shipping options.
#[instrument(skip(state, session))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SelectRequest>,
) -> Result<Json<CartView>> {
    let handle = checkout_session(&state, &session).await?;
    let mut checkout = handle.lock().await;
    checkout.shipping.select(&req.option_id)?;
    Ok(Json(checkout.view()))
}
