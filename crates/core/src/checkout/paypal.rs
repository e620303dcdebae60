//! PayPal Orders v2 payloads.

use serde::{Deserialize, Serialize};

use super::{CheckoutOrder, PaymentOutcome};
use crate::types::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmountValue {
    pub currency_code: &'static str,
    /// Always two decimals.
    pub value: String,
}

impl AmountValue {
    fn new(currency_code: &'static str, amount: Money) -> Self {
        Self {
            currency_code,
            value: amount.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub item_total: AmountValue,
    pub shipping: AmountValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Amount {
    pub currency_code: &'static str,
    pub value: String,
    pub breakdown: Breakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub name: String,
    pub unit_amount: AmountValue,
    /// PayPal takes quantities as strings.
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingName {
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingAddress {
    pub address_line_1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address_line_2: String,
    pub admin_area_2: String,
    pub admin_area_1: String,
    pub postal_code: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shipping {
    pub name: ShippingName,
    pub address: ShippingAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseUnit {
    pub reference_id: String,
    pub custom_id: String,
    pub amount: Amount,
    pub items: Vec<Item>,
    pub shipping: Shipping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationContext {
    pub return_url: String,
    pub cancel_url: String,
    pub shipping_preference: &'static str,
    pub user_action: &'static str,
}

/// Body for `POST /v2/checkout/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub intent: &'static str,
    pub purchase_units: Vec<PurchaseUnit>,
    pub application_context: ApplicationContext,
}

/// Two-letter country code for PayPal; Brazil unless given as ISO code.
fn country_code(country: &str) -> String {
    let country = country.trim();
    if country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()) {
        country.to_ascii_uppercase()
    } else {
        "BR".to_owned()
    }
}

impl From<&CheckoutOrder> for OrderRequest {
    fn from(order: &CheckoutOrder) -> Self {
        let currency = order.currency.code();
        let address = &order.payer.address;

        let address_line_1 = match address.street_number {
            Some(n) => format!("{}, {n}", address.street_name),
            None => address.street_name.clone(),
        };

        let unit = PurchaseUnit {
            reference_id: order.external_reference.to_string(),
            custom_id: order.external_reference.to_string(),
            amount: Amount {
                currency_code: currency,
                value: order.total.to_string(),
                breakdown: Breakdown {
                    item_total: AmountValue::new(currency, order.subtotal),
                    shipping: AmountValue::new(currency, order.shipping_cost),
                },
            },
            // Shipping travels in the breakdown, not as an item
            items: order
                .product_lines()
                .map(|line| Item {
                    name: line.title.clone(),
                    unit_amount: AmountValue::new(currency, line.unit_price),
                    quantity: line.quantity.to_string(),
                })
                .collect(),
            shipping: Shipping {
                name: ShippingName {
                    full_name: order.payer.name.clone(),
                },
                address: ShippingAddress {
                    address_line_1,
                    address_line_2: address.complement.clone(),
                    admin_area_2: address.city.clone(),
                    admin_area_1: address.state.clone(),
                    postal_code: address.zip_code.clone(),
                    country_code: country_code(&address.country),
                },
            },
        };

        Self {
            intent: "CAPTURE",
            purchase_units: vec![unit],
            application_context: ApplicationContext {
                return_url: order.urls.success.clone(),
                cancel_url: order.urls.failure.clone(),
                shipping_preference: "SET_PROVIDED_ADDRESS",
                user_action: "PAY_NOW",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// Response of order creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl OrderResponse {
    /// URL the shopper visits to approve the payment.
    #[must_use]
    pub fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "approve" || l.rel == "payer-action")
            .map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapturePurchaseUnit {
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// Response of `POST /v2/checkout/orders/{id}/capture`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptureResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub purchase_units: Vec<CapturePurchaseUnit>,
}

impl CaptureResponse {
    /// `COMPLETED` is the only approved capture status.
    #[must_use]
    pub fn outcome(&self) -> PaymentOutcome {
        if self.status == "COMPLETED" {
            PaymentOutcome::Approved
        } else {
            PaymentOutcome::Failed
        }
    }

    /// Our external reference echoed back by PayPal.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.purchase_units
            .first()
            .and_then(|u| u.reference_id.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{cart_of, destination, options, resolved_with, user};
    use super::super::CheckoutContext;
    use super::*;

    #[test]
    fn test_order_request_amounts_add_up() {
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

        let json = serde_json::to_value(OrderRequest::from(&order)).unwrap();
        assert_eq!(json["intent"], "CAPTURE");
        let unit = &json["purchase_units"][0];
        assert_eq!(unit["amount"]["value"], "25.99");
        assert_eq!(unit["amount"]["currency_code"], "BRL");
        assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "20.00");
        assert_eq!(unit["amount"]["breakdown"]["shipping"]["value"], "5.99");
        assert_eq!(unit["items"].as_array().unwrap().len(), 1);
        assert_eq!(unit["items"][0]["unit_amount"]["value"], "10.00");
        assert_eq!(unit["items"][0]["quantity"], "2");
        assert_eq!(unit["shipping"]["address"]["country_code"], "BR");
        assert_eq!(unit["shipping"]["address"]["address_line_1"], "Rua das Flores, 120");
        assert_eq!(unit["reference_id"], order.external_reference.as_str());
    }

    #[test]
    fn test_approval_url_and_capture_outcome() {
        let created: OrderResponse = serde_json::from_str(
            r#"{"id":"5O190127TN364715T","status":"CREATED","links":[
                {"href":"https://api.paypal.example/v2/checkout/orders/5O1","rel":"self","method":"GET"},
                {"href":"https://paypal.example/checkoutnow?token=5O1","rel":"approve","method":"GET"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            created.approval_url(),
            Some("https://paypal.example/checkoutnow?token=5O1")
        );

        let captured: CaptureResponse = serde_json::from_str(
            r#"{"id":"5O1","status":"COMPLETED","purchase_units":[{"reference_id":"order_1_7"}]}"#,
        )
        .unwrap();
        assert_eq!(captured.outcome(), PaymentOutcome::Approved);
        assert_eq!(captured.reference_id(), Some("order_1_7"));

        let declined: CaptureResponse =
            serde_json::from_str(r#"{"id":"5O1","status":"DECLINED"}"#).unwrap();
        assert_eq!(declined.outcome(), PaymentOutcome::Failed);
    }

    #[test]
    fn test_country_code() {
        assert_eq!(country_code("Brasil"), "BR");
        assert_eq!(country_code("us"), "US");
        assert_eq!(country_code(""), "BR");
    }
}
