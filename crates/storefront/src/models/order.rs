//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrine_core::address::ShippingDestination;
use vitrine_core::cart::CartItem;
use vitrine_core::checkout::ExternalReference;
use vitrine_core::{Money, OrderId, OrderStatus, ProductId, UserId};

/// Snapshot of one cart line at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.id,
            name: item.name.clone(),
            unit_price: item.price,
            quantity: item.quantity,
            image: item.image.clone(),
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub external_reference: ExternalReference,
    pub provider: String,
    /// Provider-side id: MercadoPago preference id or PayPal order id.
    pub provider_reference: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub shipping_option: Option<String>,
    pub shipping_address: ShippingDestination,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of an order about to be stored.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub external_reference: ExternalReference,
    pub provider: &'static str,
    pub provider_reference: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub shipping_option: Option<String>,
    pub shipping_address: ShippingDestination,
}
