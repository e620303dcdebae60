//! Cart store.
//!
//! The cart is an explicit object owned by one shopper session. All
//! mutations go through [`CartStore`] so that derived totals stay consistent
//! and subscribed observers (shipping recalculation, logging) see every
//! change exactly once.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Dimensions, Product};
use crate::types::{Money, ProductId};

/// Largest quantity one line can hold; larger requests are clamped.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub image: Option<String>,
    pub dimensions: Option<Dimensions>,
}

impl CartItem {
    /// Price times quantity.
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

impl From<&Product> for CartItem {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity: 1,
            image: product.image.clone(),
            dimensions: product.dimensions,
        }
    }
}

/// What kind of mutation produced a [`CartEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEventKind {
    ItemAdded,
    QuantityChanged,
    ItemRemoved,
    Cleared,
}

/// Notification sent to observers after a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEvent {
    pub kind: CartEventKind,
    /// The affected product, `None` for [`CartEventKind::Cleared`].
    pub product_id: Option<ProductId>,
    pub item_count: u32,
    pub subtotal: Money,
    pub revision: u64,
}

/// Receives cart change notifications.
pub trait CartObserver: Send + Sync {
    fn on_change(&self, event: &CartEvent);
}

impl<F> CartObserver for F
where
    F: Fn(&CartEvent) + Send + Sync,
{
    fn on_change(&self, event: &CartEvent) {
        self(event);
    }
}

/// Line items keyed by product id, with derived totals.
///
/// The `revision` increases on every mutation that actually changed the
/// cart; no-op calls (removing an absent item, setting the same quantity)
/// leave it and the observers untouched.
///
/// ```
/// use vitrine_core::cart::{CartItem, CartStore};
/// use vitrine_core::{Money, ProductId};
///
/// let mut cart = CartStore::new();
/// cart.insert(CartItem {
///     id: ProductId::new(1),
///     name: "Camisa".to_owned(),
///     price: Money::from_minor(1000),
///     quantity: 1,
///     image: None,
///     dimensions: None,
/// });
/// cart.set_quantity(ProductId::new(1), 3);
/// assert_eq!(cart.item_count(), 3);
/// assert_eq!(cart.subtotal(), Money::from_minor(3000));
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CartStore {
    items: Vec<CartItem>,
    revision: u64,
    #[serde(skip)]
    observers: Vec<Arc<dyn CartObserver>>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for subsequent mutations.
    pub fn subscribe(&mut self, observer: Arc<dyn CartObserver>) {
        self.observers.push(observer);
    }

    /// Add one unit of a product, merging with an existing line.
    pub fn add_item(&mut self, product: &Product) {
        self.insert(CartItem::from(product));
    }

    /// Add a prepared line, merging quantity with an existing line.
    ///
    /// A zero quantity is treated as one. The merged quantity is clamped to
    /// [`MAX_LINE_QUANTITY`].
    pub fn insert(&mut self, item: CartItem) {
        let id = item.id;
        let quantity = item.quantity.clamp(1, MAX_LINE_QUANTITY);
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == id) {
            let merged = existing.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            if merged == existing.quantity {
                return;
            }
            existing.quantity = merged;
        } else {
            self.items.push(CartItem { quantity, ..item });
        }
        self.changed(CartEventKind::ItemAdded, Some(id));
    }

    /// Set a line's quantity. Zero or negative removes the line; anything
    /// above [`MAX_LINE_QUANTITY`] is clamped to it.
    ///
    /// Unknown ids are ignored.
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        let quantity = u32::try_from(quantity)
            .unwrap_or(MAX_LINE_QUANTITY)
            .min(MAX_LINE_QUANTITY);
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return;
        };
        if item.quantity == quantity {
            return;
        }
        item.quantity = quantity;
        self.changed(CartEventKind::QuantityChanged, Some(id));
    }

    /// Remove a line. No-op if absent.
    pub fn remove_item(&mut self, id: ProductId) {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        if self.items.len() != before {
            self.changed(CartEventKind::ItemRemoved, Some(id));
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.changed(CartEventKind::Cleared, None);
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |count, i| count.saturating_add(i.quantity))
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Mutation counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    fn changed(&mut self, kind: CartEventKind, product_id: Option<ProductId>) {
        self.revision += 1;
        if self.observers.is_empty() {
            return;
        }
        let event = CartEvent {
            kind,
            product_id,
            item_count: self.item_count(),
            subtotal: self.subtotal(),
            revision: self.revision,
        };
        for observer in &self.observers {
            observer.on_change(&event);
        }
    }
}
