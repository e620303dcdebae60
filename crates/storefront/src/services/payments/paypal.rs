//! PayPal Orders v2 client.
//!
//! Authenticates with OAuth client credentials. The access token is cached
//! and refreshed a minute before it expires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use vitrine_core::checkout::CheckoutOrder;
use vitrine_core::checkout::paypal::{CaptureResponse, OrderRequest, OrderResponse};

use super::{PaymentError, ProviderCheckout};
use crate::config::PayPalConfig;

const TOKEN_PATH: &str = "/v1/oauth2/token";
const ORDERS_PATH: &str = "/v2/checkout/orders";

/// Refresh this long before the provider-reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: SecretString,
    refresh_at: Instant,
}

/// Client for PayPal orders.
#[derive(Clone)]
pub struct PayPalClient {
    client: reqwest::Client,
    api_url: String,
    client_id: String,
    client_secret: SecretString,
    token: Arc<Mutex<Option<AccessToken>>>,
    ready: Arc<AtomicBool>,
}

impl std::fmt::Debug for PayPalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalClient")
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl PayPalClient {
    /// Create a new client. No request is made until [`Self::warm_up`].
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Http` if the HTTP client fails to build.
    pub fn new(config: &PayPalConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Arc::new(Mutex::new(None)),
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether an access token has been obtained at least once.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Fetch the first access token.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the token request fails.
    pub async fn warm_up(&self) -> Result<(), PaymentError> {
        self.access_token().await.map(|_| ())
    }

    async fn access_token(&self) -> Result<SecretString, PaymentError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let response = self
            .client
            .post(format!("{}{TOKEN_PATH}", self.api_url))
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "PayPal token request failed");
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let value = SecretString::from(token.access_token);
        *cached = Some(AccessToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        self.ready.store(true, Ordering::Release);
        debug!(expires_in = token.expires_in, "PayPal access token refreshed");

        Ok(value)
    }

    /// Create an order and return its approval link.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` on transport failures, non-2xx responses, an
    /// unreadable body or a response without an approval link.
    #[instrument(skip(self, order), fields(reference = %order.external_reference))]
    pub async fn create_order(&self, order: &CheckoutOrder) -> Result<ProviderCheckout, PaymentError> {
        let token = self.access_token().await?;
        let body = OrderRequest::from(order);

        let response = self
            .client
            .post(format!("{}{ORDERS_PATH}", self.api_url))
            .bearer_auth(token.expose_secret())
            .header("PayPal-Request-Id", order.external_reference.as_str())
            .json(&body)
            .send()
            .await?;

        let created: OrderResponse = read_json(response).await?;
        let redirect_url = created
            .approval_url()
            .ok_or_else(|| PaymentError::Parse("order has no approval link".to_string()))?
            .to_owned();

        Ok(ProviderCheckout {
            provider_reference: created.id,
            redirect_url,
        })
    }

    /// Capture an approved order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` on transport failures, non-2xx responses or an
    /// unreadable body.
    #[instrument(skip(self))]
    pub async fn capture(&self, order_id: &str) -> Result<CaptureResponse, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}{ORDERS_PATH}/{order_id}/capture", self.api_url))
            .bearer_auth(token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        read_json(response).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "PayPal request failed");
        return Err(PaymentError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}
