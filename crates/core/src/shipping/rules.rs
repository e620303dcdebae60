//! Rule-table shipping strategy.
//!
//! Exactly one rule fires per quote, first match wins:
//!
//! 1. destination is the seller's home city: pickup and home delivery, both free
//! 2. destination state is in the nearby region: free shipping
//! 3. subtotal strictly above the threshold: free shipping
//! 4. otherwise: flat "calculated by postal code" fallback

use serde::{Deserialize, Serialize};

use super::{QuoteRequest, ShippingOption};
use crate::types::Money;

/// Which rule produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    HomeCity,
    NearbyRegion,
    FreeAboveThreshold,
    CalculatedByPostalCode,
}

/// Configuration for the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRules {
    pub home_city: String,
    pub home_state: String,
    pub nearby_states: Vec<String>,
    pub free_shipping_threshold: Money,
    pub fallback_cost: Money,
}

impl Default for ShippingRules {
    fn default() -> Self {
        Self {
            home_city: "Belo Horizonte".to_owned(),
            home_state: "MG".to_owned(),
            nearby_states: ["PR", "SC", "RS", "SP", "RJ", "ES", "MG"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            free_shipping_threshold: Money::from_minor(39_900),
            fallback_cost: Money::from_minor(2_500),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_uppercase()
}

impl ShippingRules {
    /// Pick the rule that applies to a request.
    #[must_use]
    pub fn matching_rule(&self, request: &QuoteRequest) -> Rule {
        let city = normalize(&request.city);
        let state = normalize(&request.state);

        if city == normalize(&self.home_city) && state == normalize(&self.home_state) {
            Rule::HomeCity
        } else if self.nearby_states.iter().any(|s| normalize(s) == state) {
            Rule::NearbyRegion
        } else if request.subtotal > self.free_shipping_threshold {
            Rule::FreeAboveThreshold
        } else {
            Rule::CalculatedByPostalCode
        }
    }

    /// Options for a request.
    #[must_use]
    pub fn quote(&self, request: &QuoteRequest) -> Vec<ShippingOption> {
        match self.matching_rule(request) {
            Rule::HomeCity => vec![
                ShippingOption {
                    id: "pickup".to_owned(),
                    name: "Retirada na Loja".to_owned(),
                    cost: Money::ZERO,
                    delivery_time: "1 Dia Útil Após Confirmação do Pagamento do Pedido".to_owned(),
                    note: Some("Seg - Sex: 09:00 às 18:00".to_owned()),
                },
                ShippingOption {
                    id: "home-delivery".to_owned(),
                    name: "Receber em Casa".to_owned(),
                    cost: Money::ZERO,
                    delivery_time: "3 à 5 Dias Úteis para Entrega".to_owned(),
                    note: None,
                },
            ],
            Rule::NearbyRegion => vec![free_shipping("free-shipping-nearby")],
            Rule::FreeAboveThreshold => vec![free_shipping("free-shipping-threshold")],
            Rule::CalculatedByPostalCode => vec![ShippingOption {
                id: "calculated-by-cep".to_owned(),
                name: "Calculado Pelo CEP".to_owned(),
                cost: self.fallback_cost,
                delivery_time: "3 a 4 Dias Úteis".to_owned(),
                note: None,
            }],
        }
    }
}

fn free_shipping(id: &str) -> ShippingOption {
    ShippingOption {
        id: id.to_owned(),
        name: "Frete Grátis".to_owned(),
        cost: Money::ZERO,
        delivery_time: "3 a 4 Dias Úteis".to_owned(),
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(city: &str, state: &str, subtotal_cents: i64) -> QuoteRequest {
        QuoteRequest {
            city: city.to_owned(),
            state: state.to_owned(),
            postal_code: "00000-000".to_owned(),
            items: Vec::new(),
            subtotal: Money::from_minor(subtotal_cents),
        }
    }

    #[test]
    fn test_home_city_gives_two_free_options() {
        let rules = ShippingRules::default();
        let options = rules.quote(&request("  belo horizonte ", "mg", 1000));
        let ids: Vec<_> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["pickup", "home-delivery"]);
        assert!(options.iter().all(|o| o.cost.is_zero()));
        assert!(options[0].note.is_some());
    }

    #[test]
    fn test_home_city_wins_over_nearby_region() {
        let rules = ShippingRules::default();
        assert_eq!(
            rules.matching_rule(&request("Belo Horizonte", "MG", 0)),
            Rule::HomeCity
        );
        assert_eq!(
            rules.matching_rule(&request("Contagem", "MG", 0)),
            Rule::NearbyRegion
        );
    }

    #[test]
    fn test_nearby_region_is_free_regardless_of_subtotal() {
        let rules = ShippingRules::default();
        for subtotal in [100, 39_900, 1_000_000] {
            let options = rules.quote(&request("Curitiba", "PR", subtotal));
            assert_eq!(options.len(), 1);
            assert!(options[0].cost.is_zero());
        }
    }

    #[test]
    fn test_other_region_threshold_is_strict() {
        let rules = ShippingRules::default();

        let above = rules.quote(&request("Salvador", "BA", 39_901));
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].name, "Frete Grátis");
        assert!(above[0].cost.is_zero());

        let at = rules.quote(&request("Salvador", "BA", 39_900));
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].id, "calculated-by-cep");
        assert_eq!(at[0].cost, Money::from_minor(2_500));
    }

    #[test]
    fn test_configured_home_city() {
        let rules = ShippingRules {
            home_city: "Recife".to_owned(),
            home_state: "PE".to_owned(),
            nearby_states: vec!["PB".to_owned()],
            ..ShippingRules::default()
        };
        assert_eq!(rules.matching_rule(&request("RECIFE", "pe", 0)), Rule::HomeCity);
        assert_eq!(rules.matching_rule(&request("João Pessoa", "PB", 0)), Rule::NearbyRegion);
        assert_eq!(
            rules.matching_rule(&request("Belo Horizonte", "MG", 0)),
            Rule::CalculatedByPostalCode
        );
    }
}
