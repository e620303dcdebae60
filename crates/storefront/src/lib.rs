//! Vitrine Storefront library.
//!
//! The JSON API behind the shop: catalog, cart, shipping, checkout with
//! MercadoPago or PayPal, accounts and admin. Exposed as a library so the
//! router can be tested without binding a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use state::AppState;

/// Build the application router with its middleware stack.
///
/// The session layer is passed in so tests can use an in-memory store.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use secrecy::ExposeSecret;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::tests::test_config;

    /// Router over a pool that never connects, for routes that skip the database.
    fn test_app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(config.database_url.expose_secret())
            .unwrap();
        let session_layer = middleware::session::configure(
            SessionManagerLayer::new(MemoryStore::default()),
            &config,
        );
        let state = AppState::new(config, pool).unwrap();
        app(state, session_layer)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = test_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_empty_cart_sets_session_cookie() {
        let response = test_app().oneshot(get("/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("vitrine_session="));
        assert!(cookie.contains("HttpOnly"));

        let body = json_body(response).await;
        assert_eq!(body["item_count"], 0);
        assert_eq!(body["total"], "0.00");
        assert_eq!(body["shipping"]["state"]["status"], "idle");
    }

    #[tokio::test]
    async fn test_cart_update_of_absent_item_is_noop() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/cart/update",
                &serde_json::json!({"product_id": 7, "quantity": 3}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["item_count"], 0);
    }

    #[tokio::test]
    async fn test_manual_destination_with_empty_cart_stays_idle() {
        let response = test_app()
            .oneshot(json_request(
                "PUT",
                "/cart/destination",
                &serde_json::json!({
                    "kind": "manual",
                    "street": "Rua A",
                    "city": "Recife",
                    "state": "PE",
                    "zip_code": "50030-230"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["destination"]["city"], "Recife");
        assert_eq!(body["shipping"]["state"]["status"], "idle");
    }

    #[tokio::test]
    async fn test_selecting_without_options_is_rejected() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/cart/shipping/select",
                &serde_json::json!({"option_id": "pickup"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_requires_login() {
        let response = test_app()
            .oneshot(json_request("POST", "/checkout", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["error"],
            "Please log in to continue with checkout."
        );
    }

    #[tokio::test]
    async fn test_account_and_admin_require_session() {
        let response = test_app().oneshot(get("/account/orders")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = test_app().oneshot(get("/admin/orders")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_saved_destination_requires_login() {
        let response = test_app()
            .oneshot(json_request(
                "PUT",
                "/cart/destination",
                &serde_json::json!({"kind": "saved", "address_id": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
