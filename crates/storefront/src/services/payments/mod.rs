//! Payment provider adapters.
//!
//! One provider is active per deployment. [`PaymentGateway::create_checkout`]
//! turns a [`CheckoutOrder`] into a redirect the shopper follows to pay.
//! Provider calls are bounded by [`PROVIDER_TIMEOUT`].

pub mod mercado_pago;
pub mod paypal;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use vitrine_core::checkout::CheckoutOrder;
use vitrine_core::checkout::paypal::CaptureResponse;

pub use mercado_pago::MercadoPagoClient;
pub use paypal::PayPalClient;

use crate::config::PaymentConfig;

/// Upper bound for one provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Boot warm-up attempts. After that, readiness is retried per checkout by
/// [`PaymentGateway::ensure_ready`].
const WARM_UP_ATTEMPTS: u32 = 5;

/// Errors that can occur when talking to a payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-2xx status.
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider did not answer within [`PROVIDER_TIMEOUT`].
    #[error("provider timed out")]
    Timeout,

    /// The active provider does not support the operation.
    #[error("operation not supported by {0}")]
    Unsupported(&'static str),

    /// Client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Where to send the shopper, and the provider's id for the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderCheckout {
    pub provider_reference: String,
    pub redirect_url: String,
}

/// The payment provider configured for this deployment.
#[derive(Debug, Clone)]
pub enum PaymentGateway {
    MercadoPago(MercadoPagoClient),
    PayPal(PayPalClient),
}

async fn bounded<T>(
    call: impl Future<Output = Result<T, PaymentError>>,
) -> Result<T, PaymentError> {
    tokio::time::timeout(PROVIDER_TIMEOUT, call)
        .await
        .map_err(|_| PaymentError::Timeout)?
}

impl PaymentGateway {
    /// Build the client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the client cannot be built.
    pub fn from_config(config: &PaymentConfig) -> Result<Self, PaymentError> {
        match config {
            PaymentConfig::MercadoPago(mp) => Ok(Self::MercadoPago(MercadoPagoClient::new(mp)?)),
            PaymentConfig::PayPal(pp) => Ok(Self::PayPal(PayPalClient::new(pp)?)),
        }
    }

    /// Provider name stored on orders.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        match self {
            Self::MercadoPago(_) => "mercado_pago",
            Self::PayPal(_) => "paypal",
        }
    }

    /// Whether checkout can be offered.
    ///
    /// MercadoPago needs no handshake; PayPal is ready once it holds a token.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self {
            Self::MercadoPago(_) => true,
            Self::PayPal(client) => client.is_ready(),
        }
    }

    /// Readiness for a checkout request.
    ///
    /// A PayPal client without a token gets one bounded token request, so
    /// checkout recovers as soon as the provider does.
    pub async fn ensure_ready(&self) -> bool {
        let Self::PayPal(client) = self else {
            return true;
        };
        if client.is_ready() {
            return true;
        }
        match bounded(client.warm_up()).await {
            Ok(()) => {
                info!(provider = self.provider_name(), "Payment provider ready on demand");
                true
            }
            Err(e) => {
                warn!(provider = self.provider_name(), error = %e, "Payment provider still unavailable");
                false
            }
        }
    }

    /// Background readiness check run once at boot.
    ///
    /// Retries with exponential backoff and logs the result.
    pub async fn warm_up(&self) {
        let Self::PayPal(client) = self else {
            info!(provider = self.provider_name(), "Payment provider ready");
            return;
        };

        for attempt in 1..=WARM_UP_ATTEMPTS {
            match bounded(client.warm_up()).await {
                Ok(()) => {
                    info!(provider = self.provider_name(), attempt, "Payment provider ready");
                    return;
                }
                Err(e) => {
                    warn!(provider = self.provider_name(), attempt, error = %e, "Payment provider warm-up failed");
                    tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                }
            }
        }

        let err = PaymentError::Config("warm-up attempts exhausted".to_string());
        sentry::capture_error(&err);
        tracing::error!(provider = self.provider_name(), "Payment provider never became ready");
    }

    /// Submit an order to the provider.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` for any provider failure, including timeout.
    #[instrument(skip(self, order), fields(provider = self.provider_name(), total = %order.total))]
    pub async fn create_checkout(
        &self,
        order: &CheckoutOrder,
    ) -> Result<ProviderCheckout, PaymentError> {
        match self {
            Self::MercadoPago(client) => bounded(client.create_preference(order)).await,
            Self::PayPal(client) => bounded(client.create_order(order)).await,
        }
    }

    /// Capture an approved PayPal order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Unsupported` for MercadoPago, which settles on
    /// its own, and `PaymentError` for any provider failure.
    pub async fn capture(&self, provider_reference: &str) -> Result<CaptureResponse, PaymentError> {
        match self {
            Self::MercadoPago(_) => Err(PaymentError::Unsupported("mercado_pago")),
            Self::PayPal(client) => bounded(client.capture(provider_reference)).await,
        }
    }
}
