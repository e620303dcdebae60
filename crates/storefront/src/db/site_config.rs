//! Site configuration documents stored as JSONB.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::types::Json;

use vitrine_core::site::SiteDocument;

use super::RepositoryError;

/// Repository for the admin-editable site documents.
pub struct SiteConfigRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SiteConfigRepository<'a> {
    /// Create a new site config repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read a document, falling back to its default when absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not
    /// match the document type.
    pub async fn get<T>(&self, document: SiteDocument) -> Result<T, RepositoryError>
    where
        T: DeserializeOwned + Default,
    {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM storefront.site_config WHERE key = $1")
                .bind(document.key())
                .fetch_optional(self.pool)
                .await?;

        match value {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid {} document in database: {e}",
                    document.key()
                ))
            }),
            None => Ok(T::default()),
        }
    }

    /// Insert or replace a document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn put<T>(&self, document: SiteDocument, value: &T) -> Result<(), RepositoryError>
    where
        T: Serialize + Sync,
    {
        sqlx::query(
            "INSERT INTO storefront.site_config (key, value)
             VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(document.key())
        .bind(Json(value))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
