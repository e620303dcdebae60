//! Checkout route handlers.
//!
//! `POST /checkout` validates the session, assembles the provider payload,
//! submits it and stores a `pending_payment` order. The provider then sends
//! the shopper back to `GET /checkout/return`; PayPal approvals are completed
//! by a capture call.
//!
//! Provider failures leave the cart and shipping selection untouched so the
//! shopper can simply retry.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use vitrine_core::OrderId;
use vitrine_core::checkout::{
    AssembleOptions, CheckoutContext, CheckoutError, CheckoutUrls, CheckoutUser,
    ExternalReference, PaymentOutcome,
};

use super::cart::checkout_session;
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CurrentUser, NewOrder, Order, OrderItem};
use crate::services::cart::change_and_refresh;
use crate::services::payments::PaymentGateway;
use crate::state::AppState;

/// Where to send the shopper next.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub external_reference: ExternalReference,
    pub provider: &'static str,
    pub redirect_url: String,
}

/// Query parameters a provider appends to the return URL.
///
/// MercadoPago sends `status` (or `collection_status`) and our
/// `external_reference`; PayPal sends its order id as `token`.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnQuery {
    pub status: Option<String>,
    pub collection_status: Option<String>,
    pub external_reference: Option<String>,
    pub token: Option<String>,
}

/// Result of a provider callback.
#[derive(Debug, Serialize)]
pub struct PaymentResult {
    /// `None` while the provider still reports the payment as pending.
    pub outcome: Option<PaymentOutcome>,
    pub order: Order,
}

/// Start checkout with the configured payment provider.
#[instrument(skip(state, session, user))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CheckoutResponse>> {
    let user = user.ok_or(CheckoutError::NotAuthenticated)?;
    let checkout_user = CheckoutUser::from(&user);
    let handle = checkout_session(&state, &session).await?;
    let provider_ready = state.payments().ensure_ready().await;

    // Snapshot under the lock; the provider call runs without it.
    let (order, items, destination) = {
        let checkout = handle.lock().await;
        let context = CheckoutContext {
            user: Some(&checkout_user),
            provider_ready,
            destination: checkout.destination.as_ref(),
            shipping: &checkout.shipping,
            cart: &checkout.cart,
        };
        let order = context.assemble(&AssembleOptions {
            currency: state.config().currency,
            urls: CheckoutUrls::for_return_endpoint(&state.config().checkout_return_url()),
            now: Utc::now(),
        })?;
        let items: Vec<OrderItem> = checkout.cart.items().iter().map(OrderItem::from).collect();
        let destination = checkout
            .destination
            .clone()
            .ok_or(CheckoutError::IncompleteShipping)?;
        (order, items, destination)
    };

    let provider_checkout = state.payments().create_checkout(&order).await?;

    let stored = OrderRepository::new(state.pool())
        .create(&NewOrder {
            user_id: user.id,
            external_reference: order.external_reference.clone(),
            provider: state.payments().provider_name(),
            provider_reference: Some(provider_checkout.provider_reference.clone()),
            items,
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            total: order.total,
            shipping_option: order.shipping.as_ref().map(|o| o.name.clone()),
            shipping_address: destination,
        })
        .await?;

    info!(
        order_id = %stored.id,
        external_reference = %stored.external_reference,
        total = %stored.total,
        provider = %stored.provider,
        "Checkout started"
    );
    add_breadcrumb(
        "checkout",
        "Checkout started",
        Some(&[("order_id", stored.id.to_string().as_str())]),
    );

    Ok(Json(CheckoutResponse {
        order_id: stored.id,
        external_reference: stored.external_reference,
        provider: state.payments().provider_name(),
        redirect_url: provider_checkout.redirect_url,
    }))
}

/// Landing endpoint after the provider flow.
#[instrument(skip(state, session, user))]
pub async fn provider_return(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<PaymentResult>> {
    if let (PaymentGateway::PayPal(_), Some(token)) = (state.payments(), query.token.as_deref()) {
        return capture_paypal_order(&state, &session, &user, token).await.map(Json);
    }

    let reference = query
        .external_reference
        .as_deref()
        .and_then(ExternalReference::from_provider)
        .ok_or_else(|| AppError::BadRequest("Unknown payment reference".to_string()))?;
    let order = owned_order(
        OrderRepository::new(state.pool())
            .get_by_reference(&reference)
            .await?,
        &user,
    )?;

    let outcome = query
        .status
        .as_deref()
        .or(query.collection_status.as_deref())
        .and_then(PaymentOutcome::from_mercado_pago_status);

    match outcome {
        Some(outcome) => settle(&state, &session, order, outcome).await.map(Json),
        None => {
            info!(external_reference = %order.external_reference, "Payment still pending");
            Ok(Json(PaymentResult {
                outcome: None,
                order,
            }))
        }
    }
}

/// Capture an approved PayPal order.
#[instrument(skip(state, session, user))]
pub async fn capture(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentResult>> {
    capture_paypal_order(&state, &session, &user, &order_id)
        .await
        .map(Json)
}

async fn capture_paypal_order(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    paypal_order_id: &str,
) -> Result<PaymentResult> {
    let order = owned_order(
        OrderRepository::new(state.pool())
            .get_by_provider_reference(state.payments().provider_name(), paypal_order_id)
            .await?,
        user,
    )?;

    // Already settled; never capture twice
    if !order.status.awaits_payment() {
        return Ok(PaymentResult {
            outcome: None,
            order,
        });
    }

    let capture = state.payments().capture(paypal_order_id).await?;
    if let Some(reference) = capture.reference_id()
        && reference != order.external_reference.as_str()
    {
        warn!(
            expected = %order.external_reference,
            received = reference,
            "Capture reference mismatch"
        );
        return Err(AppError::BadRequest("Payment reference mismatch".to_string()));
    }

    settle(state, session, order, capture.outcome()).await
}

/// An order that exists and belongs to the user; anything else is not found.
fn owned_order(order: Option<Order>, user: &CurrentUser) -> Result<Order> {
    order
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("order".to_string()))
}

/// Apply a final outcome. Approved payments empty the cart.
async fn settle(
    state: &AppState,
    session: &Session,
    order: Order,
    outcome: PaymentOutcome,
) -> Result<PaymentResult> {
    let settled = OrderRepository::new(state.pool())
        .settle_payment(&order.external_reference, outcome.order_status())
        .await?;

    let Some(order) = settled else {
        info!(
            external_reference = %order.external_reference,
            status = %order.status,
            "Ignoring outcome for settled order"
        );
        return Ok(PaymentResult {
            outcome: Some(outcome),
            order,
        });
    };

    info!(
        external_reference = %order.external_reference,
        ?outcome,
        "Payment settled"
    );

    if outcome == PaymentOutcome::Approved {
        let handle = checkout_session(state, session).await?;
        change_and_refresh(&handle, state.quoter(), |s| s.cart.clear()).await;
    }

    Ok(PaymentResult {
        outcome: Some(outcome),
        order,
    })
}
