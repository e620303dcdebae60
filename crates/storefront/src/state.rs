//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use vitrine_core::shipping::ShippingError;

use crate::config::StorefrontConfig;
use crate::services::cart::CartRegistry;
use crate::services::catalog::CatalogCache;
use crate::services::payments::{PaymentError, PaymentGateway};
use crate::services::shipping::ShippingQuoter;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("shipping quoter: {0}")]
    Shipping(#[from] ShippingError),
    #[error("payment gateway: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    quoter: ShippingQuoter,
    payments: PaymentGateway,
    carts: CartRegistry,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the shipping quoter or payment client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let quoter = ShippingQuoter::from_config(&config.shipping)?;
        let payments = PaymentGateway::from_config(&config.payments)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                quoter,
                payments,
                carts: CartRegistry::new(),
                catalog: CatalogCache::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the configured shipping quoter.
    #[must_use]
    pub fn quoter(&self) -> &ShippingQuoter {
        &self.inner.quoter
    }

    /// Get a reference to the configured payment provider.
    #[must_use]
    pub fn payments(&self) -> &PaymentGateway {
        &self.inner.payments
    }

    /// Get a reference to the per-session checkout state.
    #[must_use]
    pub fn carts(&self) -> &CartRegistry {
        &self.inner.carts
    }

    /// Get a reference to the product cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }
}
