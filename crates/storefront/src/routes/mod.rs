//! HTTP route handlers for storefront.
//!
//! Every endpoint speaks JSON. Errors are `{"error": "<message>"}`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Database and payment provider readiness
//!
//! # Catalog
//! GET  /products                    - Filtered, sorted product listing
//! GET  /products/{id}               - Product detail
//! GET  /site/content                - Logo, favicon, title
//! GET  /site/sections               - Enabled home page sections
//! GET  /site/filters                - Filter vocabulary and active filters
//!
//! # Cart
//! GET  /cart                        - Cart, totals and shipping state
//! POST /cart/add                    - Add one unit of a product
//! POST /cart/update                 - Set a line's quantity (<= 0 removes)
//! POST /cart/remove                 - Remove a line
//! GET  /cart/count                  - Item count badge
//! PUT  /cart/destination            - Saved address or manual entry
//! POST /cart/shipping/calculate     - Recalculate shipping
//! GET  /cart/shipping               - Shipping calculation state
//! POST /cart/shipping/select        - Choose a shipping option
//!
//! # Checkout
//! POST /checkout                    - Submit to the payment provider
//! GET  /checkout/return             - Provider return URL
//! POST /checkout/paypal/{id}/capture - Capture an approved PayPal order
//!
//! # Auth
//! POST /auth/register               - Create account and log in
//! POST /auth/login                  - Log in
//! POST /auth/logout                 - Log out
//! GET  /auth/me                     - Current user
//!
//! # Account (requires auth)
//! GET    /account/addresses         - Saved addresses
//! POST   /account/addresses         - Save an address
//! PUT    /account/addresses/{id}    - Replace an address
//! DELETE /account/addresses/{id}    - Delete an address
//! POST   /account/addresses/{id}/default - Make default
//! GET    /account/orders            - Order history
//! GET    /account/orders/{id}       - Order detail
//!
//! # Admin (requires admin)
//! POST   /admin/products            - Create product
//! PUT    /admin/products/{id}       - Replace product
//! DELETE /admin/products/{id}       - Delete product
//! PUT    /admin/site/content        - Replace site content
//! PUT    /admin/site/sections       - Replace home sections
//! PUT    /admin/site/filters        - Replace filter vocabulary
//! PUT    /admin/site/active-filters - Choose shown filters
//! GET    /admin/orders              - All orders (?status=&limit=)
//! PUT    /admin/orders/{id}/status  - Change order status
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod products;
pub mod site;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the site document routes router.
pub fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/content", get(site::content))
        .route("/sections", get(site::sections))
        .route("/filters", get(site::filters))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
        .route("/destination", put(cart::set_destination))
        .route("/shipping", get(cart::shipping))
        .route("/shipping/calculate", post(cart::calculate))
        .route("/shipping/select", post(cart::select))
}

/// Create the checkout routes router.
///
/// Submitting and capturing are rate limited per client IP.
pub fn checkout_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/", post(checkout::create))
        .route("/paypal/{order_id}/capture", post(checkout::capture))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/return", get(checkout::provider_return))
        .merge(limited)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route("/addresses/{id}/default", post(account::set_default_address))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/site/content", put(admin::put_content))
        .route("/site/sections", put(admin::put_sections))
        .route("/site/filters", put(admin::put_filters))
        .route("/site/active-filters", put(admin::put_active_filters))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", put(admin::update_order_status))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/site", site_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}
