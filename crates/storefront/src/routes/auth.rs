//! Authentication route handlers.
//!
//! Email and password accounts. The logged-in user is kept in the session;
//! the cart survives login and logout.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use vitrine_core::UserId;
use vitrine_core::address::{ShippingDestination, default_address};

use super::cart::checkout_session;
use crate::db::AddressRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::services::cart::change_and_refresh;
use crate::state::AppState;

/// Registration request body.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create an account and log it in.
#[instrument(skip(state, session, req))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register_with_password(&req.name, &req.email, &req.password)
        .await?;

    start_session(&session, &user).await?;
    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
#[instrument(skip(state, session, req))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = match AuthService::new(state.pool())
        .login_with_password(&req.email, &req.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    start_session(&session, &user).await?;
    adopt_default_address(&state, &session, user.id).await?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

/// Log out. The cart stays with the browser session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user, fresh from the database.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Ship to the user's default address unless a destination is already chosen.
async fn adopt_default_address(state: &AppState, session: &Session, user_id: UserId) -> Result<()> {
    let handle = checkout_session(state, session).await?;
    if handle.lock().await.destination.is_some() {
        return Ok(());
    }

    let addresses = AddressRepository::new(state.pool()).list(user_id).await?;
    let Some(address) = default_address(&addresses) else {
        return Ok(());
    };

    let destination = ShippingDestination::Saved(address.clone());
    change_and_refresh(&handle, state.quoter(), |s| {
        s.destination.get_or_insert(destination);
    })
    .await;
    Ok(())
}
