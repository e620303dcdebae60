//! Shipping calculation state machine.
//!
//! ```text
//! Idle --begin--> Calculating --resolve--> Resolved | Empty | Failed
//!                      ^                                  |
//!                      +------------- begin --------------+
//! ```
//!
//! Every `begin` hands out a new [`RequestToken`] and forgets the previous
//! options and selection. A result is applied only if it carries the token
//! of the calculation still in flight, so a slow answer for an old
//! destination can never overwrite the options for the current one.
//!
//! Each calculation also remembers the cart revision it was started for, so
//! checkout can refuse options quoted for a cart that has since changed.

use serde::Serialize;

use super::{ShippingError, ShippingOption};
use crate::types::Money;

/// Identifies one calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Current calculation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalculationState {
    /// Nothing to quote (no destination, no postal code or empty cart).
    #[default]
    Idle,
    Calculating {
        token: RequestToken,
    },
    Resolved {
        options: Vec<ShippingOption>,
    },
    /// The quoter answered with no options.
    Empty,
    /// The quoter failed; shown until the destination or cart changes.
    Failed {
        message: String,
    },
}

/// Whether a result was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// A newer calculation started after this one; the result was dropped.
    Stale,
}

/// Errors selecting an option.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no shipping options available")]
    NoOptions,
    #[error("unknown shipping option: {0}")]
    UnknownOption(String),
}

/// Tracks the current calculation, its options and the shopper's choice.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShippingCalculation {
    state: CalculationState,
    #[serde(skip)]
    last_token: u64,
    #[serde(skip)]
    cart_revision: u64,
    selected: Option<String>,
}

impl ShippingCalculation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new calculation for the given cart revision, discarding
    /// options and selection.
    pub fn begin(&mut self, cart_revision: u64) -> RequestToken {
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        self.cart_revision = cart_revision;
        self.state = CalculationState::Calculating { token };
        self.selected = None;
        token
    }

    /// Go back to idle. Any calculation in flight becomes stale.
    pub fn reset(&mut self) {
        self.last_token += 1;
        self.state = CalculationState::Idle;
        self.selected = None;
    }

    /// Apply a quoter result if it belongs to the calculation in flight.
    pub fn resolve(
        &mut self,
        token: RequestToken,
        result: Result<Vec<ShippingOption>, ShippingError>,
    ) -> Applied {
        if self.state != (CalculationState::Calculating { token }) {
            return Applied::Stale;
        }
        self.state = match result {
            Ok(options) if options.is_empty() => CalculationState::Empty,
            Ok(options) => CalculationState::Resolved { options },
            Err(e) => CalculationState::Failed {
                message: e.user_message().to_owned(),
            },
        };
        Applied::Applied
    }

    /// Choose one of the resolved options.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NoOptions`] when no options are resolved and
    /// [`SelectionError::UnknownOption`] when the id is not among them.
    pub fn select(&mut self, option_id: &str) -> Result<&ShippingOption, SelectionError> {
        let CalculationState::Resolved { options } = &self.state else {
            return Err(SelectionError::NoOptions);
        };
        let option = options
            .iter()
            .find(|o| o.id == option_id)
            .ok_or_else(|| SelectionError::UnknownOption(option_id.to_owned()))?;
        self.selected = Some(option.id.clone());
        Ok(option)
    }

    #[must_use]
    pub const fn state(&self) -> &CalculationState {
        &self.state
    }

    /// Resolved options; empty in every other state.
    #[must_use]
    pub fn options(&self) -> &[ShippingOption] {
        match &self.state {
            CalculationState::Resolved { options } => options,
            _ => &[],
        }
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<&ShippingOption> {
        let id = self.selected.as_deref()?;
        self.options().iter().find(|o| o.id == id)
    }

    /// Cost of the selected option, zero when nothing is selected.
    #[must_use]
    pub fn shipping_cost(&self) -> Money {
        self.selected_option().map_or(Money::ZERO, |o| o.cost)
    }

    /// Cart revision the current calculation was started for.
    #[must_use]
    pub const fn cart_revision(&self) -> u64 {
        self.cart_revision
    }

    #[must_use]
    pub const fn is_calculating(&self) -> bool {
        matches!(self.state, CalculationState::Calculating { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn option(id: &str, cents: i64) -> ShippingOption {
        ShippingOption {
            id: id.to_owned(),
            name: id.to_owned(),
            cost: Money::from_minor(cents),
            delivery_time: "3 a 4 Dias Úteis".to_owned(),
            note: None,
        }
    }

    #[test]
    fn test_resolve_with_options() {
        let mut calc = ShippingCalculation::new();
        let token = calc.begin(0);
        assert!(calc.is_calculating());
        assert_eq!(
            calc.resolve(token, Ok(vec![option("a", 599)])),
            Applied::Applied
        );
        assert_eq!(calc.options().len(), 1);
        assert_eq!(calc.shipping_cost(), Money::ZERO);
        calc.select("a").unwrap();
        assert_eq!(calc.shipping_cost(), Money::from_minor(599));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut calc = ShippingCalculation::new();
        let old = calc.begin(0);
        let current = calc.begin(0);
        assert!(current > old);

        assert_eq!(calc.resolve(old, Ok(vec![option("old", 100)])), Applied::Stale);
        assert!(calc.is_calculating());

        calc.resolve(current, Ok(vec![option("new", 200)]));
        assert_eq!(calc.options()[0].id, "new");

        // a late duplicate of the current token after resolution is stale too
        assert_eq!(calc.resolve(current, Ok(Vec::new())), Applied::Stale);
        assert_eq!(calc.options().len(), 1);
    }

    #[test]
    fn test_reset_makes_in_flight_result_stale() {
        let mut calc = ShippingCalculation::new();
        let token = calc.begin(0);
        calc.reset();
        assert_eq!(calc.resolve(token, Ok(vec![option("a", 1)])), Applied::Stale);
        assert_eq!(calc.state(), &CalculationState::Idle);
    }

    #[test]
    fn test_selection_never_survives_recalculation() {
        let mut calc = ShippingCalculation::new();
        let t = calc.begin(0);
        calc.resolve(t, Ok(vec![option("a", 100)]));
        calc.select("a").unwrap();

        let t = calc.begin(0);
        assert!(calc.selected_option().is_none());
        calc.resolve(t, Ok(vec![option("a", 100)]));
        assert!(calc.selected_option().is_none());
    }

    #[test]
    fn test_empty_and_failed_states() {
        let mut calc = ShippingCalculation::new();
        let t = calc.begin(0);
        calc.resolve(t, Ok(Vec::new()));
        assert_eq!(calc.state(), &CalculationState::Empty);
        assert_eq!(calc.select("x"), Err(SelectionError::NoOptions));

        let t = calc.begin(0);
        calc.resolve(t, Err(ShippingError::Timeout));
        assert!(matches!(calc.state(), CalculationState::Failed { .. }));
        assert!(calc.options().is_empty());
    }

    #[test]
    fn test_begin_records_cart_revision() {
        let mut calc = ShippingCalculation::new();
        calc.begin(4);
        assert_eq!(calc.cart_revision(), 4);
        calc.begin(9);
        assert_eq!(calc.cart_revision(), 9);
    }

    #[test]
    fn test_select_unknown_option() {
        let mut calc = ShippingCalculation::new();
        let t = calc.begin(0);
        calc.resolve(t, Ok(vec![option("a", 100)]));
        assert_eq!(
            calc.select("b"),
            Err(SelectionError::UnknownOption("b".to_owned()))
        );
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let mut calc = ShippingCalculation::new();
        let t = calc.begin(0);
        calc.resolve(t, Ok(vec![option("a", 2500)]));
        let json = serde_json::to_value(&calc).unwrap();
        assert_eq!(json["state"]["status"], "resolved");
        assert_eq!(json["state"]["options"][0]["cost"], "25.00");
    }
}
