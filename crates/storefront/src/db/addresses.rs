//! Address directory: saved addresses per user.
//!
//! A user has at most one default address. Saving or promoting a default
//! clears the previous one in the same transaction; the partial unique index
//! `address_one_default_per_user` backs this up.

use sqlx::{PgPool, Postgres, Transaction};

use vitrine_core::address::{Address, AddressInput};
use vitrine_core::{AddressId, AddressType, UserId};

use super::RepositoryError;

const ADDRESS_COLUMNS: &str = "id, user_id, name, email, street, house_number, complement, \
                               city, state, zip_code, country, address_type, is_default";

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: UserId,
    name: Option<String>,
    email: Option<String>,
    street: String,
    house_number: String,
    complement: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    address_type: AddressType,
    is_default: bool,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            email: r.email,
            street: r.street,
            house_number: r.house_number,
            complement: r.complement,
            city: r.city,
            state: r.state,
            zip_code: r.zip_code,
            country: r.country,
            address_type: r.address_type,
            is_default: r.is_default,
        }
    }
}

/// Repository for saved addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses of a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.address
             WHERE user_id = $1
             ORDER BY is_default DESC, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// One address, only if it belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.address
             WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    /// Insert a new address and return its id.
    ///
    /// The input must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn save(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<AddressId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let id: AddressId = sqlx::query_scalar(
            "INSERT INTO storefront.address
                (user_id, name, email, street, house_number, complement,
                 city, state, zip_code, country, address_type, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.street)
        .bind(&input.house_number)
        .bind(&input.complement)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip_code)
        .bind(&input.country)
        .bind(input.address_type)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Replace the fields of an existing address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to the user.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "UPDATE storefront.address SET
                name = $3, email = $4, street = $5, house_number = $6, complement = $7,
                city = $8, state = $9, zip_code = $10, country = $11,
                address_type = $12, is_default = $13, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.street)
        .bind(&input.house_number)
        .bind(&input.complement)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip_code)
        .bind(&input.country)
        .bind(input.address_type)
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(Address::from(row))
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to the user.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.address WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Make one address the user's default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to the user.
    pub async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        clear_default(&mut tx, user_id).await?;

        let result = sqlx::query(
            "UPDATE storefront.address SET is_default = TRUE, updated_at = NOW()
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the cleared default
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn clear_default(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.address SET is_default = FALSE, updated_at = NOW()
         WHERE user_id = $1 AND is_default",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
