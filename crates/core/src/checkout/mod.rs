//! Checkout preconditions and order assembly.
//!
//! [`CheckoutContext::assemble`] checks, in order, that the shopper is
//! logged in, that the payment provider is ready, that the destination is
//! complete and that a shipping option is chosen whenever options exist.
//! The first failing check is reported. On success it produces a
//! provider-neutral [`CheckoutOrder`], which [`mercado_pago`] and [`paypal`]
//! turn into their request bodies.
//!
//! All amounts are summed in [`Money`] minor units, so the total shown to the
//! shopper is exactly the total encoded in either payload.

pub mod mercado_pago;
pub mod paypal;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::ShippingDestination;
use crate::cart::CartStore;
use crate::shipping::{CalculationState, ShippingCalculation, ShippingOption};
use crate::types::{CurrencyCode, Email, Money, OrderStatus, UserId};

/// Why checkout cannot proceed.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please log in to continue with checkout.")]
    NotAuthenticated,
    #[error("Payment system is still loading. Please try again.")]
    ProviderLoading,
    #[error("Shipping information is incomplete. Please provide a valid address.")]
    IncompleteShipping,
    #[error("Please select a shipping option.")]
    ShippingOptionRequired,
    /// The cart changed after shipping was quoted.
    #[error("Your cart changed. Please review the shipping options again.")]
    ShippingOutdated,
    #[error("Your cart is empty.")]
    EmptyCart,
    /// Any provider failure: network, non-2xx, malformed response or timeout.
    #[error("Checkout failed. Please try again.")]
    ProviderFailed,
}

/// The logged-in shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// Redirect targets after the provider flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl CheckoutUrls {
    /// All three URLs point at the storefront return endpoint.
    #[must_use]
    pub fn for_return_endpoint(return_url: &str) -> Self {
        Self {
            success: return_url.to_owned(),
            failure: return_url.to_owned(),
            pending: return_url.to_owned(),
        }
    }
}

/// Timestamp-derived token correlating a provider attempt with an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalReference(String);

impl ExternalReference {
    /// `order_<unix millis>_<user id>`; unique per user per millisecond.
    #[must_use]
    pub fn from_timestamp(now: DateTime<Utc>, user: UserId) -> Self {
        Self(format!("order_{}_{user}", now.timestamp_millis()))
    }

    /// Wrap a reference received back from a provider.
    #[must_use]
    pub fn from_provider(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        reference
            .starts_with("order_")
            .then(|| Self(reference.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a line is a product or the synthetic shipping charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Product,
    Shipping,
}

/// One payable line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub kind: LineKind,
    pub id: String,
    pub title: String,
    pub picture_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CheckoutLine {
    #[must_use]
    pub const fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Payer address as the providers expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerAddress {
    pub street_name: String,
    /// House number, when it parses as an integer.
    pub street_number: Option<u32>,
    pub complement: String,
    pub zip_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Who pays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub address: PayerAddress,
}

/// Everything after the first word; empty for single-word names.
#[must_use]
pub fn surname_of(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a house number such as `"1500"`; `None` for `"s/n"` or `"12A"`.
#[must_use]
pub fn parse_house_number(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Provider-neutral order ready to be encoded for a payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOrder {
    pub external_reference: ExternalReference,
    pub currency: CurrencyCode,
    pub lines: Vec<CheckoutLine>,
    pub shipping: Option<ShippingOption>,
    pub payer: Payer,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub urls: CheckoutUrls,
}

impl CheckoutOrder {
    /// Product lines only.
    pub fn product_lines(&self) -> impl Iterator<Item = &CheckoutLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Product)
    }

    /// The synthetic shipping line, if an option was selected.
    #[must_use]
    pub fn shipping_line(&self) -> Option<&CheckoutLine> {
        self.lines.iter().find(|l| l.kind == LineKind::Shipping)
    }
}

/// Everything checkout looks at, borrowed from the shopper's session.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutContext<'a> {
    pub user: Option<&'a CheckoutUser>,
    pub provider_ready: bool,
    pub destination: Option<&'a ShippingDestination>,
    pub shipping: &'a ShippingCalculation,
    pub cart: &'a CartStore,
}

/// Settings that do not come from the session.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub currency: CurrencyCode,
    pub urls: CheckoutUrls,
    pub now: DateTime<Utc>,
}

struct Validated<'a> {
    user: &'a CheckoutUser,
    destination: &'a ShippingDestination,
    shipping: Option<&'a ShippingOption>,
}

impl<'a> CheckoutContext<'a> {
    /// Check preconditions without building anything.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`CheckoutError`].
    pub fn validate(&self) -> Result<(), CheckoutError> {
        self.checked().map(|_| ())
    }

    fn checked(&self) -> Result<Validated<'a>, CheckoutError> {
        let user = self.user.ok_or(CheckoutError::NotAuthenticated)?;
        if !self.provider_ready {
            return Err(CheckoutError::ProviderLoading);
        }
        let destination = self
            .destination
            .filter(|d| d.is_complete())
            .ok_or(CheckoutError::IncompleteShipping)?;
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Checkout waits for a settled calculation. Empty and failed quotes
        // need no choice and add no shipping line.
        let state = self.shipping.state();
        if matches!(
            state,
            CalculationState::Idle | CalculationState::Calculating { .. }
        ) {
            return Err(CheckoutError::ShippingOptionRequired);
        }
        if self.shipping.cart_revision() != self.cart.revision() {
            return Err(CheckoutError::ShippingOutdated);
        }
        let shipping = match state {
            CalculationState::Resolved { .. } => Some(
                self.shipping
                    .selected_option()
                    .ok_or(CheckoutError::ShippingOptionRequired)?,
            ),
            _ => None,
        };

        Ok(Validated {
            user,
            destination,
            shipping,
        })
    }

    /// Validate and build the order.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`CheckoutError`]; nothing is built then.
    pub fn assemble(&self, options: &AssembleOptions) -> Result<CheckoutOrder, CheckoutError> {
        let Validated {
            user,
            destination,
            shipping,
        } = self.checked()?;

        let mut lines: Vec<CheckoutLine> = self
            .cart
            .items()
            .iter()
            .map(|item| CheckoutLine {
                kind: LineKind::Product,
                id: item.id.to_string(),
                title: item.name.clone(),
                picture_url: item.image.clone(),
                quantity: item.quantity,
                unit_price: item.price,
            })
            .collect();

        if let Some(option) = shipping {
            lines.push(CheckoutLine {
                kind: LineKind::Shipping,
                id: option.id.clone(),
                title: format!("Frete: {}", option.name),
                picture_url: None,
                quantity: 1,
                unit_price: option.cost,
            });
        }

        let subtotal = self.cart.subtotal();
        let shipping_cost = shipping.map_or(Money::ZERO, |o| o.cost);

        let fields = destination.fields();
        let name = fields.name.unwrap_or(&user.name).trim().to_owned();
        let email = fields.email.unwrap_or(user.email.as_str()).to_owned();
        let payer = Payer {
            surname: surname_of(&name),
            name,
            email,
            address: PayerAddress {
                street_name: fields.street.to_owned(),
                street_number: parse_house_number(fields.house_number),
                complement: fields.complement.to_owned(),
                zip_code: fields.zip_code.to_owned(),
                city: fields.city.to_owned(),
                state: fields.state.to_owned(),
                country: fields.country.to_owned(),
            },
        };

        Ok(CheckoutOrder {
            external_reference: ExternalReference::from_timestamp(options.now, user.id),
            currency: options.currency,
            lines,
            shipping: shipping.cloned(),
            payer,
            subtotal,
            shipping_cost,
            total: subtotal + shipping_cost,
            urls: options.urls.clone(),
        })
    }
}

/// Final word from a payment provider about one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved,
    Failed,
}

impl PaymentOutcome {
    /// Map a MercadoPago return `status` (or `collection_status`).
    ///
    /// Pending states are not final and map to `None`.
    #[must_use]
    pub fn from_mercado_pago_status(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "rejected" | "cancelled" | "failure" | "null" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Order status after this outcome.
    #[must_use]
    pub const fn order_status(self) -> OrderStatus {
        match self {
            Self::Approved => OrderStatus::PaymentConfirmed,
            Self::Failed => OrderStatus::Cancelled,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::address::ManualAddress;
    use crate::cart::CartItem;
    use crate::shipping::ShippingError;
    use crate::types::ProductId;

    pub(crate) fn user() -> CheckoutUser {
        CheckoutUser {
            id: UserId::new(7),
            name: "Maria da Silva Santos".to_owned(),
            email: Email::parse("maria@example.com").unwrap(),
        }
    }

    pub(crate) fn destination() -> ShippingDestination {
        ShippingDestination::Manual(ManualAddress {
            street: "Rua das Flores".to_owned(),
            house_number: "120".to_owned(),
            city: "Salvador".to_owned(),
            state: "BA".to_owned(),
            zip_code: "40000-000".to_owned(),
            country: "Brasil".to_owned(),
            ..ManualAddress::default()
        })
    }

    pub(crate) fn cart_of(lines: &[(i32, i64, u32)]) -> CartStore {
        let mut cart = CartStore::new();
        for &(id, cents, quantity) in lines {
            cart.insert(CartItem {
                id: ProductId::new(id),
                name: format!("Produto {id}"),
                price: Money::from_minor(cents),
                quantity,
                image: None,
                dimensions: None,
            });
        }
        cart
    }

    pub(crate) fn resolved_with(
        cart: &CartStore,
        cost_cents: i64,
        select: bool,
    ) -> ShippingCalculation {
        let mut calc = ShippingCalculation::new();
        let token = calc.begin(cart.revision());
        calc.resolve(
            token,
            Ok(vec![ShippingOption {
                id: "sedex".to_owned(),
                name: "SEDEX".to_owned(),
                cost: Money::from_minor(cost_cents),
                delivery_time: "2 dias".to_owned(),
                note: None,
            }]),
        );
        if select {
            calc.select("sedex").unwrap();
        }
        calc
    }

    pub(crate) fn options() -> AssembleOptions {
        AssembleOptions {
            currency: CurrencyCode::BRL,
            urls: CheckoutUrls::for_return_endpoint("https://loja.example/checkout/return"),
            now: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_example_total_is_exact() {
        let cart = cart_of(&[(1, 1000, 2)]);
        let shipping = resolved_with(&cart, 599, true);
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &shipping,
            cart: &cart,
        };

        let order = ctx.assemble(&options()).unwrap();
        assert_eq!(order.total.to_string(), "25.99");
        assert_eq!(order.subtotal + order.shipping_cost, order.total);

        let product: Vec<_> = order.product_lines().collect();
        assert_eq!(product.len(), 1);
        assert_eq!((product[0].unit_price.to_string(), product[0].quantity), ("10.00".to_owned(), 2));

        let ship = order.shipping_line().unwrap();
        assert_eq!((ship.unit_price.to_string(), ship.quantity), ("5.99".to_owned(), 1));
        assert_eq!(ship.title, "Frete: SEDEX");

        let line_sum: Money = order.lines.iter().map(CheckoutLine::total).sum();
        assert_eq!(line_sum, order.total);
    }

    #[test]
    fn test_preconditions_in_order() {
        let cart = cart_of(&[(1, 1000, 1)]);
        let unselected = resolved_with(&cart, 599, false);
        let user = user();
        let dest = destination();
        let incomplete = ShippingDestination::Manual(ManualAddress::default());

        let base = CheckoutContext {
            user: None,
            provider_ready: false,
            destination: None,
            shipping: &unselected,
            cart: &cart,
        };
        assert_eq!(base.validate(), Err(CheckoutError::NotAuthenticated));

        let ctx = CheckoutContext {
            user: Some(&user),
            ..base
        };
        assert_eq!(ctx.validate(), Err(CheckoutError::ProviderLoading));

        let ctx = CheckoutContext {
            provider_ready: true,
            destination: Some(&incomplete),
            ..ctx
        };
        assert_eq!(ctx.validate(), Err(CheckoutError::IncompleteShipping));

        let ctx = CheckoutContext {
            destination: Some(&dest),
            ..ctx
        };
        assert_eq!(ctx.validate(), Err(CheckoutError::ShippingOptionRequired));
        assert_eq!(
            ctx.assemble(&options()),
            Err(CheckoutError::ShippingOptionRequired)
        );
    }

    #[test]
    fn test_no_shipping_line_when_engine_returned_nothing() {
        let cart = cart_of(&[(1, 1000, 1)]);
        let mut empty = ShippingCalculation::new();
        let t = empty.begin(cart.revision());
        empty.resolve(t, Ok(Vec::new()));
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &empty,
            cart: &cart,
        };
        let order = ctx.assemble(&options()).unwrap();
        assert!(order.shipping_line().is_none());
        assert_eq!(order.total, Money::from_minor(1000));
    }

    #[test]
    fn test_checkout_waits_for_calculation() {
        let cart = cart_of(&[(1, 1000, 1)]);
        let mut calculating = ShippingCalculation::new();
        calculating.begin(cart.revision());
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &calculating,
            cart: &cart,
        };
        assert_eq!(ctx.validate(), Err(CheckoutError::ShippingOptionRequired));
    }

    #[test]
    fn test_failed_quote_checks_out_without_shipping_line() {
        let cart = cart_of(&[(1, 1000, 2)]);
        let mut failed = ShippingCalculation::new();
        let t = failed.begin(cart.revision());
        failed.resolve(t, Err(ShippingError::Timeout));
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &failed,
            cart: &cart,
        };
        assert_eq!(ctx.validate(), Ok(()));
        let order = ctx.assemble(&options()).unwrap();
        assert!(order.shipping_line().is_none());
        assert_eq!(order.shipping_cost, Money::ZERO);
        assert_eq!(order.total, order.subtotal);
    }

    #[test]
    fn test_cart_change_after_selection_is_rejected() {
        let mut cart = cart_of(&[(1, 1000, 1)]);
        let shipping = resolved_with(&cart, 599, true);
        cart.set_quantity(ProductId::new(1), 5);
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &shipping,
            cart: &cart,
        };
        assert_eq!(ctx.validate(), Err(CheckoutError::ShippingOutdated));
        assert_eq!(
            ctx.assemble(&options()),
            Err(CheckoutError::ShippingOutdated)
        );
    }

    #[test]
    fn test_empty_cart() {
        let cart = CartStore::new();
        let shipping = ShippingCalculation::new();
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &shipping,
            cart: &cart,
        };
        assert_eq!(ctx.validate(), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_payer_falls_back_to_user_and_derives_surname() {
        let cart = cart_of(&[(1, 1000, 1)]);
        let shipping = resolved_with(&cart, 0, true);
        let user = user();
        let dest = destination();
        let ctx = CheckoutContext {
            user: Some(&user),
            provider_ready: true,
            destination: Some(&dest),
            shipping: &shipping,
            cart: &cart,
        };
        let order = ctx.assemble(&options()).unwrap();
        assert_eq!(order.payer.name, "Maria da Silva Santos");
        assert_eq!(order.payer.surname, "da Silva Santos");
        assert_eq!(order.payer.email, "maria@example.com");
        assert_eq!(order.payer.address.street_number, Some(120));
        assert_eq!(order.external_reference.as_str(), "order_1740830400000_7");
    }

    #[test]
    fn test_surname_and_house_number_helpers() {
        assert_eq!(surname_of("Joao"), "");
        assert_eq!(surname_of("  Ana   Paula  Souza "), "Paula Souza");
        assert_eq!(parse_house_number(" 42 "), Some(42));
        assert_eq!(parse_house_number("s/n"), None);
        assert_eq!(parse_house_number("12A"), None);
    }

    #[test]
    fn test_mercado_pago_outcomes() {
        assert_eq!(
            PaymentOutcome::from_mercado_pago_status("approved"),
            Some(PaymentOutcome::Approved)
        );
        assert_eq!(
            PaymentOutcome::from_mercado_pago_status("rejected"),
            Some(PaymentOutcome::Failed)
        );
        assert_eq!(PaymentOutcome::from_mercado_pago_status("pending"), None);
        assert_eq!(
            PaymentOutcome::Approved.order_status(),
            OrderStatus::PaymentConfirmed
        );
        assert_eq!(PaymentOutcome::Failed.order_status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_external_reference_from_provider() {
        assert!(ExternalReference::from_provider("order_1_2").is_some());
        assert!(ExternalReference::from_provider("something-else").is_none());
    }
}
