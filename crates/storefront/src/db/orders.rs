//! Order repository.
//!
//! Items and the shipping address are stored as JSONB snapshots so that an
//! order keeps showing what was bought even after products or addresses change.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use vitrine_core::address::ShippingDestination;
use vitrine_core::checkout::ExternalReference;
use vitrine_core::{Money, OrderId, OrderStatus, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewOrder, Order, OrderItem};

const ORDER_COLUMNS: &str = "id, user_id, external_reference, provider, provider_reference, \
                             items, subtotal_cents, shipping_cost_cents, total_cents, \
                             shipping_option, shipping_address, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    external_reference: String,
    provider: String,
    provider_reference: Option<String>,
    items: Json<Vec<OrderItem>>,
    subtotal_cents: i64,
    shipping_cost_cents: i64,
    total_cents: i64,
    shipping_option: Option<String>,
    shipping_address: Json<ShippingDestination>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let external_reference =
            ExternalReference::from_provider(&r.external_reference).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "invalid external reference in database: {}",
                    r.external_reference
                ))
            })?;

        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            external_reference,
            provider: r.provider,
            provider_reference: r.provider_reference,
            items: r.items.0,
            subtotal: Money::from_minor(r.subtotal_cents),
            shipping_cost: Money::from_minor(r.shipping_cost_cents),
            total: Money::from_minor(r.total_cents),
            shipping_option: r.shipping_option,
            shipping_address: r.shipping_address.0,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new order in `pending_payment`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the external reference is taken.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO storefront.order
                (user_id, external_reference, provider, provider_reference, items,
                 subtotal_cents, shipping_cost_cents, total_cents, shipping_option,
                 shipping_address, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id)
        .bind(order.external_reference.as_str())
        .bind(order.provider)
        .bind(&order.provider_reference)
        .bind(Json(&order.items))
        .bind(order.subtotal.minor())
        .bind(order.shipping_cost.minor())
        .bind(order.total.minor())
        .bind(&order.shipping_option)
        .bind(Json(&order.shipping_address))
        .bind(OrderStatus::PendingPayment)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("external reference already exists"))?;

        Order::try_from(row)
    }

    /// Look an order up by the reference sent to the provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE external_reference = $1"
        ))
        .bind(reference.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// Look an order up by the provider's own id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_provider_reference(
        &self,
        provider: &str,
        provider_reference: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order
             WHERE provider = $1 AND provider_reference = $2"
        ))
        .bind(provider)
        .bind(provider_reference)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// One order of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// All orders, newest first, optionally narrowed to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order
             WHERE $1::text IS NULL OR status = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Set an order's status unconditionally (admin fulfilment).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE storefront.order SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Order::try_from(row)
    }

    /// Record a payment outcome on an order still awaiting payment.
    ///
    /// Returns `None` when the order already left `pending_payment`, so a
    /// replayed provider callback cannot flip a settled order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn settle_payment(
        &self,
        reference: &ExternalReference,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE storefront.order SET status = $2, updated_at = NOW()
             WHERE external_reference = $1 AND status = $3
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(reference.as_str())
        .bind(status)
        .bind(OrderStatus::PendingPayment)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}
