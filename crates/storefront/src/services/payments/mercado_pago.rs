//! MercadoPago preferences API client.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{instrument, warn};

use vitrine_core::checkout::CheckoutOrder;
use vitrine_core::checkout::mercado_pago::{Preference, PreferenceResponse};

use super::{PaymentError, ProviderCheckout};
use crate::config::MercadoPagoConfig;

const PREFERENCES_PATH: &str = "/checkout/preferences";

/// Client for MercadoPago checkout preferences.
#[derive(Clone)]
pub struct MercadoPagoClient {
    client: reqwest::Client,
    preferences_url: String,
}

impl std::fmt::Debug for MercadoPagoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MercadoPagoClient")
            .field("preferences_url", &self.preferences_url)
            .finish_non_exhaustive()
    }
}

impl MercadoPagoClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Config` if the access token is not a valid
    /// header value, `PaymentError::Http` if the HTTP client fails to build.
    pub fn new(config: &MercadoPagoConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.access_token.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaymentError::Config(format!("invalid access token format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            preferences_url: format!(
                "{}{PREFERENCES_PATH}",
                config.api_url.trim_end_matches('/')
            ),
        })
    }

    /// Create a checkout preference for an order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` on transport failures, non-2xx responses or an
    /// unreadable body.
    #[instrument(skip(self, order), fields(reference = %order.external_reference))]
    pub async fn create_preference(
        &self,
        order: &CheckoutOrder,
    ) -> Result<ProviderCheckout, PaymentError> {
        let body = Preference::from(order);

        let response = self
            .client
            .post(&self.preferences_url)
            .header("X-Idempotency-Key", order.external_reference.as_str())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "MercadoPago rejected the preference");
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let preference: PreferenceResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        Ok(ProviderCheckout::from(preference))
    }
}

impl From<PreferenceResponse> for ProviderCheckout {
    fn from(preference: PreferenceResponse) -> Self {
        Self {
            provider_reference: preference.id,
            redirect_url: preference.init_point,
        }
    }
}
