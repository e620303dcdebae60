//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `cart` - Per-session cart, destination and shipping state
//! - `shipping` - Rule table and Melhor Envio quoters
//! - `catalog` - Cached product list
//! - `payments` - MercadoPago and PayPal checkout adapters

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod payments;
pub mod shipping;
