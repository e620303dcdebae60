//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Camisa Retrô 1994
//!     price: "189.90"
//!     category: camisas
//!     stock: 12
//!     size: M
//!     dimensions: { width: 30, height: 4, length: 40, weight: 0.3 }
//! ```
//!
//! Every product is validated before the database is touched.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use vitrine_core::catalog::{ProductError, ProductInput};

use super::{CommandError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<ProductInput>,
}

/// Parse and validate a seed document.
///
/// Logs every invalid product before failing, so one run reports them all.
fn parse(content: &str) -> Result<Vec<ProductInput>, SeedError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let mut products = Vec::with_capacity(file.products.len());
    let mut errors: Vec<(usize, String, ProductError)> = Vec::new();
    for (index, input) in file.products.into_iter().enumerate() {
        let name = input.name.clone();
        match input.validated() {
            Ok(product) => products.push(product),
            Err(e) => errors.push((index, name, e)),
        }
    }

    if !errors.is_empty() {
        error!("Seed validation failed:");
        for (index, name, err) in &errors {
            error!("  - product #{index} ({name:?}): {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    Ok(products)
}

/// Insert the products in `file_path`.
///
/// With `clear_existing`, the catalog is emptied first in the same
/// transaction. Order snapshots are unaffected.
pub async fn products(file_path: &str, clear_existing: bool) -> Result<usize, SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products = parse(&content)?;
    info!(products = products.len(), "Parsed and validated");

    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    if clear_existing {
        let deleted = sqlx::query("DELETE FROM storefront.product")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        info!(deleted, "Cleared existing products");
    }

    for product in &products {
        let dims = product.dimensions;
        sqlx::query(
            "INSERT INTO storefront.product
                (name, description, price_cents, category, image, stock, gender, size,
                 model_year, color, region, width_cm, height_cm, length_cm, weight_kg)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.minor())
        .bind(&product.category)
        .bind(&product.image)
        .bind(product.stock)
        .bind(&product.gender)
        .bind(&product.size)
        .bind(product.model_year)
        .bind(&product.color)
        .bind(&product.region)
        .bind(dims.map(|d| d.width))
        .bind(dims.map(|d| d.height))
        .bind(dims.map(|d| d.length))
        .bind(dims.map(|d| d.weight))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(inserted = products.len(), "Seeding complete");
    Ok(products.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_converts_price() {
        let products = parse(
            r#"
products:
  - name: "  Camisa Retrô 1994 "
    price: "189.90"
    category: camisas
    stock: 12
    color: ""
    dimensions: { width: 30, height: 4, length: 40, weight: 0.3 }
  - name: Caneca
    price: 35
"#,
        )
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Camisa Retrô 1994");
        assert_eq!(products[0].price.minor(), 18_990);
        assert_eq!(products[0].color, None);
        assert!(products[0].dimensions.is_some());
        assert_eq!(products[1].price.minor(), 3_500);
        assert_eq!(products[1].stock, 0);
    }

    #[test]
    fn test_parse_reports_every_invalid_product() {
        let err = parse(
            r"
products:
  - name: ''
    price: 10
  - name: Boné
    price: 50
  - name: Meia
    price: 15
    stock: -1
",
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Invalid(2)));
    }

    #[test]
    fn test_parse_rejects_missing_products_key() {
        assert!(matches!(parse("items: []"), Err(SeedError::Yaml(_))));
    }
}
