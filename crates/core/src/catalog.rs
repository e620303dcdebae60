//! Products and catalog filtering.
//!
//! The storefront lists the whole catalog and narrows it with a free-text
//! search, a category and a set of dynamic attribute filters whose
//! vocabulary is edited by admins (see [`FilterVocabulary`]). Admins may also
//! hide individual filters with [`ActiveFilters`]; a hidden filter is ignored
//! even if a value for it is present in the query.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId};

/// Package dimensions used for shipping quotes (centimetres and kilograms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    /// Image URL; uploads happen outside the storefront.
    pub image: Option<String>,
    pub stock: i32,
    pub gender: Option<String>,
    pub size: Option<String>,
    pub model_year: Option<i32>,
    pub color: Option<String>,
    pub region: Option<String>,
    pub dimensions: Option<Dimensions>,
}

/// Product fields submitted by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub image: Option<String>,
    pub stock: i32,
    pub gender: Option<String>,
    pub size: Option<String>,
    pub model_year: Option<i32>,
    pub color: Option<String>,
    pub region: Option<String>,
    pub dimensions: Option<Dimensions>,
}

/// Errors validating product input.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProductError {
    #[error("name is required")]
    MissingName,
    #[error("stock cannot be negative")]
    NegativeStock,
    #[error("dimensions must be positive")]
    InvalidDimensions,
}

impl ProductInput {
    /// Trim text fields, blank optionals become `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] for a blank name, negative stock or
    /// non-positive dimensions.
    pub fn validated(self) -> Result<Self, ProductError> {
        let optional = |s: Option<String>| {
            s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };

        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ProductError::MissingName);
        }
        if self.stock < 0 {
            return Err(ProductError::NegativeStock);
        }
        if let Some(d) = self.dimensions
            && [d.width, d.height, d.length, d.weight]
                .iter()
                .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(ProductError::InvalidDimensions);
        }

        Ok(Self {
            name,
            description: self.description.trim().to_owned(),
            category: self.category.trim().to_owned(),
            image: optional(self.image),
            gender: optional(self.gender),
            size: optional(self.size),
            color: optional(self.color),
            region: optional(self.region),
            ..self
        })
    }
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Storage order.
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    Name,
}

/// A catalog listing query.
///
/// Empty values and the literal `all` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub gender: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub region: Option<String>,
    pub year: Option<String>,
    pub sort: SortOrder,
}

/// Normalize a filter value: `None` when it does not constrain anything.
fn constraint(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

fn attribute_matches(wanted: Option<&str>, enabled: bool, actual: Option<&str>) -> bool {
    match constraint(wanted) {
        Some(wanted) if enabled => actual.is_some_and(|a| a == wanted),
        _ => true,
    }
}

impl ProductQuery {
    /// Whether a product satisfies every enabled constraint.
    #[must_use]
    pub fn matches(&self, product: &Product, active: &ActiveFilters) -> bool {
        let search_ok = constraint(self.q.as_deref()).is_none_or(|term| {
            let term = term.to_lowercase();
            product.name.to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term)
        });

        let category_ok = !active.category
            || constraint(self.category.as_deref()).is_none_or(|c| product.category == c);

        let year = product.model_year.map(|y| y.to_string());

        search_ok
            && category_ok
            && attribute_matches(self.gender.as_deref(), active.gender, product.gender.as_deref())
            && attribute_matches(self.size.as_deref(), active.size, product.size.as_deref())
            && attribute_matches(self.color.as_deref(), active.color, product.color.as_deref())
            && attribute_matches(self.region.as_deref(), active.region, product.region.as_deref())
            && attribute_matches(self.year.as_deref(), active.year, year.as_deref())
    }

    /// Filter and sort a product list.
    #[must_use]
    pub fn apply(&self, products: &[Product], active: &ActiveFilters) -> Vec<Product> {
        let mut result: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p, active))
            .cloned()
            .collect();

        // sort_by is stable, so ties keep storage order
        match self.sort {
            SortOrder::Featured => {}
            SortOrder::PriceLow => result.sort_by_key(|p| p.price),
            SortOrder::PriceHigh => result.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOrder::Name => result.sort_by(|a, b| compare_names(&a.name, &b.name)),
        }
        result
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Admin-editable vocabulary for the catalog filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterVocabulary {
    pub categories: Vec<String>,
    pub genders: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub regions: Vec<String>,
    pub years: Vec<i32>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|&v| v.to_owned()).collect()
}

impl Default for FilterVocabulary {
    fn default() -> Self {
        Self {
            categories: strings(&["Eletrônicos", "Roupas", "Casa", "Livros", "Esportes"]),
            genders: strings(&["masculino", "feminino"]),
            sizes: strings(&["P", "M", "G", "GG", "XGG", "EXG"]),
            colors: strings(&["Azul", "Branco", "Cinza", "Preto"]),
            regions: strings(&["Sudeste", "Nordeste", "Sul", "Centro-oeste"]),
            years: (1978..=1997).collect(),
        }
    }
}

impl FilterVocabulary {
    /// Drop blank entries and duplicates, keeping first occurrence order.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.categories,
            &mut self.genders,
            &mut self.sizes,
            &mut self.colors,
            &mut self.regions,
        ] {
            let mut seen = std::collections::HashSet::new();
            list.retain(|v| {
                let v = v.trim();
                !v.is_empty() && seen.insert(v.to_owned())
            });
            for v in list.iter_mut() {
                *v = v.trim().to_owned();
            }
        }
        let mut seen = std::collections::HashSet::new();
        self.years.retain(|y| seen.insert(*y));
        self
    }
}

/// Which filters the catalog shows. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ActiveFilters {
    pub category: bool,
    pub gender: bool,
    pub size: bool,
    pub color: bool,
    pub region: bool,
    pub year: bool,
}

impl Default for ActiveFilters {
    fn default() -> Self {
        Self {
            category: true,
            gender: true,
            size: true,
            color: true,
            region: true,
            year: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build a test product with only the fields catalog tests care about.
    pub(crate) fn product(id: i32, name: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: format!("Camisa retrô {name}"),
            price: Money::from_minor(price_cents),
            category: "Roupas".to_owned(),
            image: None,
            stock: 10,
            gender: Some("masculino".to_owned()),
            size: Some("M".to_owned()),
            model_year: Some(1994),
            color: Some("Azul".to_owned()),
            region: Some("Sudeste".to_owned()),
            dimensions: None,
        }
    }

    fn catalog() -> Vec<Product> {
        let mut b = product(2, "bahia", 15000);
        b.region = Some("Nordeste".to_owned());
        b.size = Some("G".to_owned());
        let mut c = product(3, "Cruzeiro", 9900);
        c.category = "Esportes".to_owned();
        c.model_year = Some(1997);
        vec![product(1, "Atlético", 12000), b, c]
    }

    fn ids(products: &[Product]) -> Vec<i32> {
        products.iter().map(|p| p.id.as_i32()).collect()
    }

    #[test]
    fn test_product_input_validation() {
        let input = ProductInput {
            name: "  Bahia 1988 ".to_owned(),
            price: Money::from_minor(15000),
            color: Some("  ".to_owned()),
            ..ProductInput::default()
        }
        .validated()
        .unwrap();
        assert_eq!(input.name, "Bahia 1988");
        assert_eq!(input.color, None);

        assert_eq!(
            ProductInput::default().validated(),
            Err(ProductError::MissingName)
        );
        let bad = ProductInput {
            name: "x".to_owned(),
            dimensions: Some(Dimensions::default()),
            ..ProductInput::default()
        };
        assert_eq!(bad.validated(), Err(ProductError::InvalidDimensions));
    }

    #[test]
    fn test_empty_query_keeps_storage_order() {
        let result = ProductQuery::default().apply(&catalog(), &ActiveFilters::default());
        assert_eq!(ids(&result), vec![1, 2, 3]);
    }

    #[test]
    fn test_search_matches_name_or_description_case_insensitive() {
        let query = ProductQuery {
            q: Some("CRUZ".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(ids(&query.apply(&catalog(), &ActiveFilters::default())), vec![3]);

        let query = ProductQuery {
            q: Some("retrô".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(query.apply(&catalog(), &ActiveFilters::default()).len(), 3);
    }

    #[test]
    fn test_category_all_is_no_constraint() {
        let query = ProductQuery {
            category: Some("all".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(query.apply(&catalog(), &ActiveFilters::default()).len(), 3);

        let query = ProductQuery {
            category: Some("Esportes".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(ids(&query.apply(&catalog(), &ActiveFilters::default())), vec![3]);
    }

    #[test]
    fn test_dynamic_filters_combine() {
        let query = ProductQuery {
            region: Some("Sudeste".to_owned()),
            year: Some("1994".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(ids(&query.apply(&catalog(), &ActiveFilters::default())), vec![1]);
    }

    #[test]
    fn test_disabled_filter_is_ignored() {
        let query = ProductQuery {
            size: Some("G".to_owned()),
            ..ProductQuery::default()
        };
        let active = ActiveFilters {
            size: false,
            ..ActiveFilters::default()
        };
        assert_eq!(query.apply(&catalog(), &active).len(), 3);
        assert_eq!(ids(&query.apply(&catalog(), &ActiveFilters::default())), vec![2]);
    }

    #[test]
    fn test_sort_orders() {
        let all = catalog();
        let active = ActiveFilters::default();
        let by = |sort| {
            ids(&ProductQuery {
                sort,
                ..ProductQuery::default()
            }
            .apply(&all, &active))
        };
        assert_eq!(by(SortOrder::PriceLow), vec![3, 1, 2]);
        assert_eq!(by(SortOrder::PriceHigh), vec![2, 1, 3]);
        assert_eq!(by(SortOrder::Name), vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_order_parses_kebab_case() {
        let sort: SortOrder = serde_json::from_str("\"price-high\"").unwrap();
        assert_eq!(sort, SortOrder::PriceHigh);
    }

    #[test]
    fn test_vocabulary_defaults_and_normalization() {
        let vocab = FilterVocabulary::default();
        assert_eq!(vocab.years.first(), Some(&1978));
        assert_eq!(vocab.years.last(), Some(&1997));

        let messy = FilterVocabulary {
            colors: strings(&["Azul", " ", "Azul", " Preto "]),
            years: vec![1990, 1990, 1991],
            ..FilterVocabulary::default()
        }
        .normalized();
        assert_eq!(messy.colors, strings(&["Azul", "Preto"]));
        assert_eq!(messy.years, vec![1990, 1991]);
    }

    #[test]
    fn test_missing_active_filter_fields_default_to_enabled() {
        let active: ActiveFilters = serde_json::from_str(r#"{"gender": false}"#).unwrap();
        assert!(!active.gender);
        assert!(active.category && active.size && active.year);
    }
}
