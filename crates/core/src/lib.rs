//! Vitrine Core - Shared domain library.
//!
//! This crate provides the types and pure business rules used by the
//! Vitrine components:
//! - `storefront` - Public-facing JSON API, cart and checkout
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. Everything here is synchronous and deterministic, which
//! keeps the shipping and checkout rules easy to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails and statuses
//! - [`cart`] - Cart store with derived totals and change observers
//! - [`address`] - Saved addresses and checkout destinations
//! - [`shipping`] - Shipping rule table and the calculation state machine
//! - [`checkout`] - Checkout preconditions and provider payload assembly
//! - [`catalog`] - Products and dynamic catalog filters
//! - [`site`] - Admin-editable site content documents

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod shipping;
pub mod site;
pub mod types;

pub use types::*;
