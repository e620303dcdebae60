//! Status enums for persisted entities.

use serde::{Deserialize, Serialize};

/// Lifecycle of an order.
///
/// Orders are created in [`OrderStatus::PendingPayment`] when the payment
/// provider accepts the checkout payload, and move forward from there either
/// through provider callbacks or by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "text", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    PaymentConfirmed,
    Processing,
    ReadyForShipping,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::PendingPayment,
        Self::PaymentConfirmed,
        Self::Processing,
        Self::ReadyForShipping,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Processing => "processing",
            Self::ReadyForShipping => "ready_for_shipping",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label shown in order history.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "Aguardando Pagamento",
            Self::PaymentConfirmed => "Pagamento Confirmado",
            Self::Processing => "Em Processamento",
            Self::ReadyForShipping => "Pronto para Envio",
            Self::Shipped => "Enviado",
            Self::Delivered => "Entregue",
            Self::Cancelled => "Cancelado",
        }
    }

    /// Whether a provider outcome may still change this order.
    ///
    /// Only orders waiting for payment accept callbacks; a repeated or late
    /// callback for a settled order is ignored.
    #[must_use]
    pub const fn awaits_payment(self) -> bool {
        matches!(self, Self::PendingPayment)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Purpose of a saved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "text", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    #[default]
    Shipping,
    Billing,
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shipping => write!(f, "shipping"),
            Self::Billing => write!(f, "billing"),
        }
    }
}

impl std::str::FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shipping" => Ok(Self::Shipping),
            "billing" => Ok(Self::Billing),
            _ => Err(format!("invalid address type: {s}")),
        }
    }
}
