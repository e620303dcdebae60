//! Shipping options for a destination and cart.
//!
//! Two strategies produce options: the [`rules::ShippingRules`] table, which
//! is pure and lives here, and an external rate API that the storefront
//! calls over HTTP. Both take a [`QuoteRequest`] and return zero or more
//! [`ShippingOption`]s. The [`calculation::ShippingCalculation`] state
//! machine tracks which calculation is current and which option the shopper
//! picked.

pub mod calculation;
pub mod rules;

use serde::{Deserialize, Serialize};

pub use calculation::{
    Applied, CalculationState, RequestToken, SelectionError, ShippingCalculation,
};
pub use rules::{Rule, ShippingRules};

use crate::address::ShippingDestination;
use crate::cart::{CartItem, CartStore};
use crate::catalog::Dimensions;
use crate::types::{Money, ProductId};

/// A named quote: cost plus a delivery estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: String,
    pub name: String,
    pub cost: Money,
    pub delivery_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Errors producing shipping options.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ShippingError {
    /// The rate API could not be reached or answered with an error.
    #[error("could not calculate shipping: {0}")]
    Unavailable(String),
    /// The rate API did not answer in time.
    #[error("could not calculate shipping: timed out")]
    Timeout,
    /// The rate API answered with something we could not read.
    #[error("could not calculate shipping: invalid response: {0}")]
    InvalidResponse(String),
}

impl ShippingError {
    /// Message safe to show to shoppers.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        "Could not calculate shipping. Try again."
    }
}

/// One cart line as seen by a shipping quoter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub dimensions: Option<Dimensions>,
}

impl From<&CartItem> for QuoteItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.id,
            quantity: item.quantity,
            unit_price: item.price,
            dimensions: item.dimensions,
        }
    }
}

/// Everything a quoter needs: destination plus cart contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRequest {
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub items: Vec<QuoteItem>,
    pub subtotal: Money,
}

impl QuoteRequest {
    /// Build a request, or `None` when there is nothing to quote.
    ///
    /// An empty cart or a destination without a postal code produces no
    /// calculation at all.
    #[must_use]
    pub fn new(destination: &ShippingDestination, cart: &CartStore) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        let postal_code = destination.postal_code()?;
        let fields = destination.fields();
        Some(Self {
            city: fields.city.to_owned(),
            state: fields.state.to_owned(),
            postal_code: postal_code.to_owned(),
            items: cart.items().iter().map(QuoteItem::from).collect(),
            subtotal: cart.subtotal(),
        })
    }
}
