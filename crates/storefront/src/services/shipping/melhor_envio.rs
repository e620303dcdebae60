//! Melhor Envio rate API client.
//!
//! Only the quote endpoint is used. Request building and response mapping
//! are plain functions so they can be tested without a server.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use vitrine_core::address::postal_code_digits;
use vitrine_core::catalog::Dimensions;
use vitrine_core::shipping::{QuoteRequest, ShippingError, ShippingOption};
use vitrine_core::Money;

use crate::config::MelhorEnvioConfig;

const CALCULATE_PATH: &str = "/api/v2/me/shipment/calculate";

/// Used for products stored without dimensions (smallest accepted parcel).
const FALLBACK_DIMENSIONS: Dimensions = Dimensions {
    width: 11.0,
    height: 2.0,
    length: 16.0,
    weight: 0.3,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostalCode {
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculateProduct {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub insurance_value: Decimal,
    pub quantity: u32,
}

/// Body for the calculate endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculateRequest {
    pub from: PostalCode,
    pub to: PostalCode,
    pub products: Vec<CalculateProduct>,
}

impl CalculateRequest {
    #[must_use]
    pub fn new(origin_postal_code: &str, request: &QuoteRequest) -> Self {
        Self {
            from: PostalCode {
                postal_code: postal_code_digits(origin_postal_code),
            },
            to: PostalCode {
                postal_code: postal_code_digits(&request.postal_code),
            },
            products: request
                .items
                .iter()
                .map(|item| {
                    let d = item.dimensions.unwrap_or(FALLBACK_DIMENSIONS);
                    CalculateProduct {
                        id: item.product_id.to_string(),
                        width: d.width,
                        height: d.height,
                        length: d.length,
                        weight: d.weight,
                        insurance_value: item.unit_price.to_decimal(),
                        quantity: item.quantity,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    pub name: String,
}

/// One entry of the calculate response. Entries the carrier cannot serve
/// carry an `error` and no price.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculatedService {
    pub id: serde_json::Value,
    pub name: String,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub delivery_time: Option<u32>,
    #[serde(default)]
    pub company: Option<Company>,
    #[serde(default)]
    pub error: Option<String>,
}

fn delivery_estimate(days: Option<u32>) -> String {
    match days {
        Some(1) => "1 dia útil".to_owned(),
        Some(n) => format!("{n} dias úteis"),
        None => "Prazo a confirmar".to_owned(),
    }
}

/// Map the calculate response into options, dropping errored entries.
#[must_use]
pub fn map_services(services: Vec<CalculatedService>) -> Vec<ShippingOption> {
    services
        .into_iter()
        .filter(|s| s.error.is_none())
        .filter_map(|s| {
            let cost = s.price?;
            let id = match s.id {
                serde_json::Value::String(id) => id,
                other => other.to_string(),
            };
            Some(ShippingOption {
                id,
                name: s.name,
                cost,
                delivery_time: delivery_estimate(s.delivery_time),
                note: s.company.map(|c| c.name),
            })
        })
        .collect()
}

/// Client for the Melhor Envio rate API.
#[derive(Clone)]
pub struct MelhorEnvioClient {
    client: reqwest::Client,
    calculate_url: String,
    origin_postal_code: String,
}

impl std::fmt::Debug for MelhorEnvioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MelhorEnvioClient")
            .field("calculate_url", &self.calculate_url)
            .field("origin_postal_code", &self.origin_postal_code)
            .finish_non_exhaustive()
    }
}

impl MelhorEnvioClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::Unavailable` if the token is not a valid
    /// header value or the HTTP client fails to build.
    pub fn new(config: &MelhorEnvioConfig) -> Result<Self, ShippingError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.token.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ShippingError::Unavailable(format!("invalid token format: {e}")))?,
        );
        headers.insert(
            "X-Client-Id",
            HeaderValue::from_str(&config.client_id)
                .map_err(|e| ShippingError::Unavailable(format!("invalid client id: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShippingError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            calculate_url: format!("{}{CALCULATE_PATH}", config.api_url.trim_end_matches('/')),
            origin_postal_code: config.origin_postal_code.clone(),
        })
    }

    /// Quote a destination and cart.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::Unavailable` on transport failures or non-2xx
    /// responses and `ShippingError::InvalidResponse` when the body is not a
    /// list of services.
    #[instrument(skip(self, request), fields(to = %request.postal_code, items = request.items.len()))]
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Vec<ShippingOption>, ShippingError> {
        let body = CalculateRequest::new(&self.origin_postal_code, request);

        let response = self
            .client
            .post(&self.calculate_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShippingError::Unavailable(e.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "Rate API returned an error");
            return Err(ShippingError::Unavailable(format!("status {status}")));
        }

        let services: Vec<CalculatedService> = response
            .json()
            .await
            .map_err(|e| ShippingError::InvalidResponse(e.to_string()))?;

        let options = map_services(services);
        debug!(count = options.len(), "Rate API quote");
        Ok(options)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::shipping::QuoteItem;
    use vitrine_core::ProductId;

    use super::*;

    #[test]
    fn test_request_uses_digits_and_fallback_dimensions() {
        let request = QuoteRequest {
            city: "Recife".to_owned(),
            state: "PE".to_owned(),
            postal_code: "50030-230".to_owned(),
            items: vec![QuoteItem {
                product_id: ProductId::new(4),
                quantity: 2,
                unit_price: Money::from_minor(12_990),
                dimensions: None,
            }],
            subtotal: Money::from_minor(25_980),
        };

        let json = serde_json::to_value(CalculateRequest::new("30130-010", &request)).unwrap();
        assert_eq!(json["from"]["postal_code"], "30130010");
        assert_eq!(json["to"]["postal_code"], "50030230");
        let product = &json["products"][0];
        assert_eq!(product["id"], "4");
        assert_eq!(product["insurance_value"], 129.9);
        assert_eq!(product["quantity"], 2);
        assert_eq!(product["weight"], 0.3);
    }

    #[test]
    fn test_map_services_drops_errors() {
        let services: Vec<CalculatedService> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "PAC", "price": "23.40", "delivery_time": 7,
                 "company": {"id": 1, "name": "Correios"}},
                {"id": 2, "name": "SEDEX", "price": 41.1, "delivery_time": 1,
                 "company": {"id": 1, "name": "Correios"}},
                {"id": 3, "name": ".Com", "error": "Serviço indisponível para o trecho."}
            ]"#,
        )
        .unwrap();

        let options = map_services(services);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].id, "1");
        assert_eq!(options[0].cost, Money::from_minor(2340));
        assert_eq!(options[0].delivery_time, "7 dias úteis");
        assert_eq!(options[0].note.as_deref(), Some("Correios"));
        assert_eq!(options[1].cost, Money::from_minor(4110));
        assert_eq!(options[1].delivery_time, "1 dia útil");
    }

    #[test]
    fn test_client_debug_hides_token() {
        let client = MelhorEnvioClient::new(&MelhorEnvioConfig {
            api_url: "https://sandbox.example/".to_owned(),
            token: "tok-9f8e7d".to_owned().into(),
            client_id: "123".to_owned(),
            origin_postal_code: "30130010".to_owned(),
        })
        .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("https://sandbox.example/api/v2/me/shipment/calculate"));
        assert!(!debug.contains("tok-9f8e7d"));
    }
}
