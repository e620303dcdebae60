//! Cached read access to the product catalog.
//!
//! The full product list is cached for 5 minutes. Admin writes call
//! [`CatalogCache::invalidate`] so changes show up immediately.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use vitrine_core::ProductId;
use vitrine_core::catalog::Product;

use crate::db::{ProductRepository, RepositoryError};

const PRODUCTS_KEY: &str = "products";

/// Product list cache in front of [`ProductRepository`].
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(300)) // 5 minutes
                .build(),
        }
    }

    /// All products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    pub async fn products(&self, pool: &PgPool) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(PRODUCTS_KEY).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(pool).list().await?);
        self.cache.insert(PRODUCTS_KEY, Arc::clone(&products)).await;
        Ok(products)
    }

    /// A single product, served from the cached list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    pub async fn product(
        &self,
        pool: &PgPool,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let products = self.products(pool).await?;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    /// Drop cached data after a catalog write.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
