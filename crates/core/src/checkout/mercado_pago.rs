//! MercadoPago checkout preference payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CheckoutOrder, LineKind};

/// Category sent for every product line.
const PRODUCT_CATEGORY: &str = "products";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<&'static str>,
    pub quantity: u32,
    /// The API only accepts a JSON number here. Prices are whole cents, so
    /// the shortest float text is always the exact two-place amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub currency_id: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceAddress {
    pub street_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_number: Option<u32>,
    pub zip_code: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferencePayer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub address: PreferenceAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// Body for `POST /checkout/preferences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preference {
    pub items: Vec<PreferenceItem>,
    pub payer: PreferencePayer,
    pub back_urls: BackUrls,
    pub auto_return: &'static str,
    pub external_reference: String,
}

impl From<&CheckoutOrder> for Preference {
    fn from(order: &CheckoutOrder) -> Self {
        let currency = order.currency.code();
        let items = order
            .lines
            .iter()
            .map(|line| match line.kind {
                LineKind::Product => PreferenceItem {
                    id: line.id.clone(),
                    title: line.title.clone(),
                    description: Some(format!("{} - Quantity: {}", line.title, line.quantity)),
                    picture_url: line.picture_url.clone(),
                    category_id: Some(PRODUCT_CATEGORY),
                    quantity: line.quantity,
                    unit_price: line.unit_price.to_decimal(),
                    currency_id: currency,
                },
                LineKind::Shipping => PreferenceItem {
                    id: line.id.clone(),
                    title: line.title.clone(),
                    description: None,
                    picture_url: None,
                    category_id: None,
                    quantity: line.quantity,
                    unit_price: line.unit_price.to_decimal(),
                    currency_id: currency,
                },
            })
            .collect();

        let payer = &order.payer;
        Self {
            items,
            payer: PreferencePayer {
                name: payer.name.clone(),
                surname: payer.surname.clone(),
                email: payer.email.clone(),
                address: PreferenceAddress {
                    street_name: payer.address.street_name.clone(),
                    street_number: payer.address.street_number,
                    zip_code: payer.address.zip_code.clone(),
                    city: payer.address.city.clone(),
                    state: payer.address.state.clone(),
                },
            },
            back_urls: BackUrls {
                success: order.urls.success.clone(),
                failure: order.urls.failure.clone(),
                pending: order.urls.pending.clone(),
            },
            auto_return: "approved",
            external_reference: order.external_reference.to_string(),
        }
    }
}

/// Response of `POST /checkout/preferences`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreferenceResponse {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{cart_of, destination, options, resolved_with, user};
    use super::super::CheckoutContext;
    use super::*;

    #[test]
    fn test_preference_body() {
        let cart = cart_of(&[(1, 1000, 2)]);
        let shipping = resolved_with(&cart, 599, true);
        let user = user();
        let dest = destination();
        let order = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &shipping,
            cart: &cart,
        }
        .assemble(&options())
        .unwrap();

        let json = serde_json::to_value(Preference::from(&order)).unwrap();
        let items = json["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["unit_price"], 10.0);
        assert_eq!(items[0]["quantity"], 2);
        assert_eq!(items[0]["currency_id"], "BRL");
        assert_eq!(items[0]["category_id"], "products");
        assert_eq!(items[0]["description"], "Produto 1 - Quantity: 2");
        assert_eq!(items[1]["title"], "Frete: SEDEX");
        assert_eq!(items[1]["unit_price"], 5.99);
        assert!(items[1].get("category_id").is_none());

        assert_eq!(json["payer"]["surname"], "da Silva Santos");
        assert_eq!(json["payer"]["address"]["street_number"], 120);
        assert_eq!(json["auto_return"], "approved");
        assert_eq!(json["external_reference"], order.external_reference.as_str());
        assert_eq!(
            json["back_urls"]["pending"],
            "https://loja.example/checkout/return"
        );
    }

    #[test]
    fn test_unit_price_text_is_exact_cents() {
        let cart = cart_of(&[(1, 123_456_789, 1), (2, 7, 3)]);
        let shipping = resolved_with(&cart, 1_990, true);
        let user = user();
        let dest = destination();
        let order = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &shipping,
            cart: &cart,
        }
        .assemble(&options())
        .unwrap();

        let body = serde_json::to_string(&Preference::from(&order)).unwrap();
        assert!(body.contains(r#""unit_price":1234567.89,"#));
        assert!(body.contains(r#""unit_price":0.07,"#));
        assert!(body.contains(r#""unit_price":19.9,"#));
    }

    #[test]
    fn test_response_parses() {
        let response: PreferenceResponse = serde_json::from_str(
            r#"{"id":"123-abc","init_point":"https://mp.example/init","collector_id":1}"#,
        )
        .unwrap();
        assert_eq!(response.id, "123-abc");
        assert!(response.sandbox_init_point.is_none());
    }
}
