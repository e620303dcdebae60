//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Grant admin rights to an existing account
//! vitrine-cli admin promote -e owner@example.com
//!
//! # Revoke them
//! vitrine-cli admin demote -e owner@example.com
//! ```
//!
//! Accounts are created through `POST /auth/register`; these commands only
//! flip the `is_admin` flag.

use thiserror::Error;
use vitrine_core::{Email, UserId};

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with this email.
    #[error("No user with email: {0}")]
    UserNotFound(String),
}

/// Grant or revoke admin rights.
///
/// Returns the ID of the updated user.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<UserId, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let user_id: Option<i32> = sqlx::query_scalar(
        "UPDATE storefront.user
         SET is_admin = $2, updated_at = NOW()
         WHERE email = $1
         RETURNING id",
    )
    .bind(email.as_str())
    .bind(is_admin)
    .fetch_optional(&pool)
    .await?;

    let user_id = user_id
        .map(UserId::new)
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    tracing::info!(user_id = %user_id, email = %email, is_admin, "Admin flag updated");
    Ok(user_id)
}
