//! Domain models for storefront.
//!
//! Types here are what repositories return and handlers serialize; the pure
//! business types (cart, addresses, products) live in `vitrine-core`.

pub mod order;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order, OrderItem};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
