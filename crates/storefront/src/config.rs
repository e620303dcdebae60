//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_CURRENCY` - ISO currency code (default: BRL)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Shipping
//! - `SHIPPING_STRATEGY` - `rules` (default) or `melhor_envio`
//! - `SHIPPING_HOME_CITY` - Seller city (default: Belo Horizonte)
//! - `SHIPPING_HOME_STATE` - Seller state (default: MG)
//! - `SHIPPING_NEARBY_STATES` - Comma-separated free-shipping states (default: PR,SC,RS,SP,RJ,ES,MG)
//! - `SHIPPING_FREE_THRESHOLD` - Free shipping above this subtotal (default: 399.00)
//! - `SHIPPING_FALLBACK_COST` - Flat cost otherwise (default: 25.00)
//! - `SHIPPING_ORIGIN_POSTAL_CODE` - Origin postal code, required for `melhor_envio`
//! - `MELHOR_ENVIO_API_URL` - Rate API base URL (default: sandbox)
//! - `MELHOR_ENVIO_TOKEN` - Rate API bearer token, required for `melhor_envio`
//! - `MELHOR_ENVIO_CLIENT_ID` - Rate API client id, required for `melhor_envio`
//!
//! ## Payments
//! - `PAYMENT_PROVIDER` - `mercado_pago` (default) or `paypal`
//! - `MERCADO_PAGO_ACCESS_TOKEN` - required for `mercado_pago`
//! - `MERCADO_PAGO_API_URL` - default: <https://api.mercadopago.com>
//! - `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET` - required for `paypal`
//! - `PAYPAL_API_URL` - default: <https://api-m.sandbox.paypal.com>

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use vitrine_core::shipping::ShippingRules;
use vitrine_core::{CurrencyCode, Money};

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_MELHOR_ENVIO_API_URL: &str = "https://sandbox.melhorenvio.com.br";
const DEFAULT_MERCADO_PAGO_API_URL: &str = "https://api.mercadopago.com";
const DEFAULT_PAYPAL_API_URL: &str = "https://api-m.sandbox.paypal.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Currency for prices and provider payloads
    pub currency: CurrencyCode,
    /// Shipping strategy and rule table
    pub shipping: ShippingConfig,
    /// Active payment provider
    pub payments: PaymentConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Shipping configuration.
#[derive(Debug, Clone)]
pub struct ShippingConfig {
    pub strategy: ShippingStrategy,
    pub rules: ShippingRules,
}

/// Which quoter computes shipping options.
#[derive(Debug, Clone)]
pub enum ShippingStrategy {
    Rules,
    MelhorEnvio(MelhorEnvioConfig),
}

/// Melhor Envio rate API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct MelhorEnvioConfig {
    pub api_url: String,
    pub token: SecretString,
    pub client_id: String,
    pub origin_postal_code: String,
}

impl std::fmt::Debug for MelhorEnvioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MelhorEnvioConfig")
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("origin_postal_code", &self.origin_postal_code)
            .finish()
    }
}

/// The payment provider active in this deployment.
#[derive(Debug, Clone)]
pub enum PaymentConfig {
    MercadoPago(MercadoPagoConfig),
    PayPal(PayPalConfig),
}

/// MercadoPago preferences API configuration.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    pub api_url: String,
    pub access_token: SecretString,
}

impl std::fmt::Debug for MercadoPagoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MercadoPagoConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// PayPal Orders API configuration.
#[derive(Clone)]
pub struct PayPalConfig {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = parse_base_url(&get_required_env("STOREFRONT_BASE_URL")?)?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let currency_code = get_env_or_default("STORE_CURRENCY", "BRL");
        let currency = CurrencyCode::from_code(&currency_code).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "STORE_CURRENCY".to_string(),
                format!("unsupported currency {currency_code}"),
            )
        })?;

        let shipping = ShippingConfig::from_env()?;
        let payments = PaymentConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            currency,
            shipping,
            payments,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Where payment providers send the shopper back to.
    #[must_use]
    pub fn checkout_return_url(&self) -> String {
        format!("{}/checkout/return", self.base_url)
    }
}

impl ShippingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = ShippingRules::default();
        let nearby_states = get_optional_env("SHIPPING_NEARBY_STATES")
            .map_or(defaults.nearby_states, |v| parse_state_list(&v));

        let rules = ShippingRules {
            home_city: get_env_or_default("SHIPPING_HOME_CITY", &defaults.home_city),
            home_state: get_env_or_default("SHIPPING_HOME_STATE", &defaults.home_state),
            nearby_states,
            free_shipping_threshold: parse_money(
                "SHIPPING_FREE_THRESHOLD",
                &get_env_or_default("SHIPPING_FREE_THRESHOLD", "399.00"),
            )?,
            fallback_cost: parse_money(
                "SHIPPING_FALLBACK_COST",
                &get_env_or_default("SHIPPING_FALLBACK_COST", "25.00"),
            )?,
        };

        let strategy = match get_env_or_default("SHIPPING_STRATEGY", "rules").as_str() {
            "rules" => ShippingStrategy::Rules,
            "melhor_envio" => ShippingStrategy::MelhorEnvio(MelhorEnvioConfig {
                api_url: get_env_or_default("MELHOR_ENVIO_API_URL", DEFAULT_MELHOR_ENVIO_API_URL),
                token: get_validated_secret("MELHOR_ENVIO_TOKEN")?,
                client_id: get_required_env("MELHOR_ENVIO_CLIENT_ID")?,
                origin_postal_code: get_required_env("SHIPPING_ORIGIN_POSTAL_CODE")?,
            }),
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "SHIPPING_STRATEGY".to_string(),
                    format!("expected 'rules' or 'melhor_envio', got '{other}'"),
                ));
            }
        };

        Ok(Self { strategy, rules })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("PAYMENT_PROVIDER", "mercado_pago").as_str() {
            "mercado_pago" => Ok(Self::MercadoPago(MercadoPagoConfig {
                api_url: get_env_or_default("MERCADO_PAGO_API_URL", DEFAULT_MERCADO_PAGO_API_URL),
                access_token: get_validated_secret("MERCADO_PAGO_ACCESS_TOKEN")?,
            })),
            "paypal" => Ok(Self::PayPal(PayPalConfig {
                api_url: get_env_or_default("PAYPAL_API_URL", DEFAULT_PAYPAL_API_URL),
                client_id: get_required_env("PAYPAL_CLIENT_ID")?,
                client_secret: get_validated_secret("PAYPAL_CLIENT_SECRET")?,
            })),
            other => Err(ConfigError::InvalidEnvVar(
                "PAYMENT_PROVIDER".to_string(),
                format!("expected 'mercado_pago' or 'paypal', got '{other}'"),
            )),
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
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate the base URL and strip any trailing slash.
fn parse_base_url(value: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| {
        ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_BASE_URL".to_string(),
            "must be http or https".to_string(),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Parse a decimal amount such as `399.00`.
fn parse_money(key: &str, value: &str) -> Result<Money, ConfigError> {
    Money::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse `PR, sc ,RS` into `["PR", "SC", "RS"]`.
fn parse_state_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Configuration for router and service tests.
    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/vitrine_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            currency: CurrencyCode::BRL,
            shipping: ShippingConfig {
                strategy: ShippingStrategy::Rules,
                rules: ShippingRules::default(),
            },
            payments: PaymentConfig::MercadoPago(MercadoPagoConfig {
                api_url: "http://127.0.0.1:9".to_string(),
                access_token: SecretString::from("TEST-4f1c9a7e2b"),
            }),
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_state_list_normalizes() {
        assert_eq!(parse_state_list(" pr, SC ,,rs "), vec!["PR", "SC", "RS"]);
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("K", "399.00").unwrap(), Money::from_minor(39_900));
        assert!(matches!(
            parse_money("K", "abc"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_money("K", "-1").is_err());
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url("https://loja.example/").unwrap(),
            "https://loja.example"
        );
        assert!(parse_base_url("ftp://loja.example").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_socket_addr_and_urls() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_https());
        assert_eq!(
            config.checkout_return_url(),
            "http://localhost:3000/checkout/return"
        );
        assert_eq!(config.payments.provider_name(), "mercado_pago");
    }

    #[test]
    fn test_provider_configs_debug_redacts_secrets() {
        let paypal = PayPalConfig {
            api_url: "https://api-m.sandbox.paypal.com".to_string(),
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
        };
        let debug_output = format!("{paypal:?}");
        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));

        let melhor_envio = MelhorEnvioConfig {
            api_url: DEFAULT_MELHOR_ENVIO_API_URL.to_string(),
            token: SecretString::from("super_secret_token"),
            client_id: "42".to_string(),
            origin_postal_code: "30130-005".to_string(),
        };
        assert!(!format!("{melhor_envio:?}").contains("super_secret_token"));
    }
}
