//! Shipping quoters.
//!
//! One strategy is active per deployment: the in-process rule table or the
//! Melhor Envio rate API. Every quote is bounded by [`QUOTE_TIMEOUT`].

pub mod melhor_envio;

use std::time::Duration;

use tracing::instrument;

use vitrine_core::shipping::{QuoteRequest, ShippingError, ShippingOption, ShippingRules};

pub use melhor_envio::MelhorEnvioClient;

use crate::config::{ShippingConfig, ShippingStrategy};

/// Upper bound for one quote, rule table included.
pub const QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// The configured shipping strategy.
#[derive(Debug, Clone)]
pub enum ShippingQuoter {
    RuleTable(ShippingRules),
    MelhorEnvio(MelhorEnvioClient),
}

impl ShippingQuoter {
    /// Build the quoter selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::Unavailable` if the rate API client cannot be built.
    pub fn from_config(config: &ShippingConfig) -> Result<Self, ShippingError> {
        match &config.strategy {
            ShippingStrategy::Rules => Ok(Self::RuleTable(config.rules.clone())),
            ShippingStrategy::MelhorEnvio(me) => Ok(Self::MelhorEnvio(MelhorEnvioClient::new(me)?)),
        }
    }

    /// Strategy name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RuleTable(_) => "rules",
            Self::MelhorEnvio(_) => "melhor_envio",
        }
    }

    /// Produce options for a request.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::Timeout` after [`QUOTE_TIMEOUT`] and whatever
    /// the rate API client reports otherwise. The rule table never fails.
    #[instrument(skip(self, request), fields(strategy = self.name()))]
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Vec<ShippingOption>, ShippingError> {
        match self {
            Self::RuleTable(rules) => Ok(rules.quote(request)),
            Self::MelhorEnvio(client) => tokio::time::timeout(QUOTE_TIMEOUT, client.quote(request))
                .await
                .map_err(|_| ShippingError::Timeout)?,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::Money;
    use vitrine_core::shipping::QuoteItem;
    use vitrine_core::ProductId;

    use super::*;
    use crate::config::MelhorEnvioConfig;

    fn request(city: &str, state: &str, subtotal_cents: i64) -> QuoteRequest {
        QuoteRequest {
            city: city.to_owned(),
            state: state.to_owned(),
            postal_code: "01000-000".to_owned(),
            items: vec![QuoteItem {
                product_id: ProductId::new(1),
                quantity: 1,
                unit_price: Money::from_minor(subtotal_cents),
                dimensions: None,
            }],
            subtotal: Money::from_minor(subtotal_cents),
        }
    }

    #[tokio::test]
    async fn test_rule_table_quotes_in_process() {
        let quoter = ShippingQuoter::RuleTable(ShippingRules::default());
        let options = quoter.quote(&request("Manaus", "AM", 10_000)).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].cost, Money::from_minor(2_500));
    }

    #[tokio::test]
    async fn test_unreachable_rate_api_is_retryable_error() {
        let quoter = ShippingQuoter::from_config(&ShippingConfig {
            strategy: ShippingStrategy::MelhorEnvio(MelhorEnvioConfig {
                // Nothing listens on the discard port
                api_url: "http://127.0.0.1:9".to_owned(),
                token: "tok-1a2b3c".to_owned().into(),
                client_id: "1".to_owned(),
                origin_postal_code: "30130010".to_owned(),
            }),
            rules: ShippingRules::default(),
        })
        .unwrap();
        assert_eq!(quoter.name(), "melhor_envio");

        let err = quoter.quote(&request("Manaus", "AM", 10_000)).await.unwrap_err();
        assert!(matches!(
            err,
            ShippingError::Unavailable(_) | ShippingError::Timeout
        ));
        assert_eq!(err.user_message(), "Could not calculate shipping. Try again.");
    }
}
