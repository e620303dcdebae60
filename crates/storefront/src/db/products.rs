//! Product catalog repository.

use sqlx::PgPool;

use vitrine_core::catalog::{Dimensions, Product, ProductInput};
use vitrine_core::{Money, ProductId};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category, image, stock, \
                               gender, size, model_year, color, region, \
                               width_cm, height_cm, length_cm, weight_kg";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price_cents: i64,
    category: String,
    image: Option<String>,
    stock: i32,
    gender: Option<String>,
    size: Option<String>,
    model_year: Option<i32>,
    color: Option<String>,
    region: Option<String>,
    width_cm: Option<f64>,
    height_cm: Option<f64>,
    length_cm: Option<f64>,
    weight_kg: Option<f64>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        if r.price_cents < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "negative price for product {}",
                r.id
            )));
        }

        // Dimensions are all-or-nothing
        let dimensions = match (r.width_cm, r.height_cm, r.length_cm, r.weight_kg) {
            (Some(width), Some(height), Some(length), Some(weight)) => Some(Dimensions {
                width,
                height,
                length,
                weight,
            }),
            _ => None,
        };

        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: Money::from_minor(r.price_cents),
            category: r.category,
            image: r.image,
            stock: r.stock,
            gender: r.gender,
            size: r.size,
            model_year: r.model_year,
            color: r.color,
            region: r.region,
            dimensions,
        })
    }
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The whole catalog in storage order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let dims = input.dimensions;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO storefront.product
                (name, description, price_cents, category, image, stock, gender, size,
                 model_year, color, region, width_cm, height_cm, length_cm, weight_kg)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price.minor())
        .bind(&input.category)
        .bind(&input.image)
        .bind(input.stock)
        .bind(&input.gender)
        .bind(&input.size)
        .bind(input.model_year)
        .bind(&input.color)
        .bind(&input.region)
        .bind(dims.map(|d| d.width))
        .bind(dims.map(|d| d.height))
        .bind(dims.map(|d| d.length))
        .bind(dims.map(|d| d.weight))
        .fetch_one(self.pool)
        .await?;

        Product::try_from(row)
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let dims = input.dimensions;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE storefront.product SET
                name = $2, description = $3, price_cents = $4, category = $5, image = $6,
                stock = $7, gender = $8, size = $9, model_year = $10, color = $11,
                region = $12, width_cm = $13, height_cm = $14, length_cm = $15,
                weight_kg = $16, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price.minor())
        .bind(&input.category)
        .bind(&input.image)
        .bind(input.stock)
        .bind(&input.gender)
        .bind(&input.size)
        .bind(input.model_year)
        .bind(&input.color)
        .bind(&input.region)
        .bind(dims.map(|d| d.width))
        .bind(dims.map(|d| d.height))
        .bind(dims.map(|d| d.length))
        .bind(dims.map(|d| d.weight))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
