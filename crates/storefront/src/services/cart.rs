//! Per-shopper checkout state.
//!
//! Each browser session owns one [`CheckoutSession`]: the cart, the chosen
//! destination and the shipping calculation. Sessions live in a moka cache
//! keyed by a UUID stored in the tower-session, and are dropped after a week
//! without activity.
//!
//! Shipping is restarted in the same critical section as every cart or
//! destination change ([`change_and_refresh`]), so no request ever sees a
//! selection that was made for an older cart. The quoter then runs without
//! holding the session lock; the request token decides whether its result
//! is still wanted when it comes back.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_sessions::Session;
use tracing::{debug, instrument};
use uuid::Uuid;

use vitrine_core::address::ShippingDestination;
use vitrine_core::cart::{CartEvent, CartItem, CartObserver, CartStore};
use vitrine_core::shipping::{Applied, QuoteRequest, RequestToken, ShippingCalculation};
use vitrine_core::Money;

use super::shipping::ShippingQuoter;
use crate::error::add_breadcrumb;
use crate::models::session_keys;

/// Sessions idle for longer than this are forgotten.
const SESSION_IDLE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Upper bound on concurrently tracked carts.
const MAX_SESSIONS: u64 = 100_000;

/// Cart, destination and shipping of one shopper.
#[derive(Debug, Default)]
pub struct CheckoutSession {
    pub cart: CartStore,
    pub destination: Option<ShippingDestination>,
    pub shipping: ShippingCalculation,
}

/// Shared handle to a session's state.
pub type SessionHandle = Arc<Mutex<CheckoutSession>>;

/// A quote started under the session lock, to be run after releasing it.
#[derive(Debug)]
pub struct PendingQuote {
    token: RequestToken,
    request: QuoteRequest,
}

/// Logs cart changes and leaves a Sentry breadcrumb.
struct TracingObserver {
    cart_id: Uuid,
}

impl CartObserver for TracingObserver {
    fn on_change(&self, event: &CartEvent) {
        debug!(
            cart_id = %self.cart_id,
            kind = ?event.kind,
            product_id = ?event.product_id,
            item_count = event.item_count,
            subtotal = %event.subtotal,
            revision = event.revision,
            "Cart changed"
        );
        add_breadcrumb("cart", &format!("{:?}", event.kind), None);
    }
}

impl CheckoutSession {
    fn new(cart_id: Uuid) -> Self {
        let mut cart = CartStore::new();
        cart.subscribe(Arc::new(TracingObserver { cart_id }));
        Self {
            cart,
            destination: None,
            shipping: ShippingCalculation::new(),
        }
    }

    /// Restart the shipping calculation for the current cart and destination.
    ///
    /// Clears any selection. Returns the quote to run, or `None` when there
    /// is nothing to quote and the calculation went back to idle.
    pub fn restart_shipping(&mut self) -> Option<PendingQuote> {
        let request = self
            .destination
            .as_ref()
            .and_then(|d| QuoteRequest::new(d, &self.cart));
        let Some(request) = request else {
            self.shipping.reset();
            return None;
        };
        let token = self.shipping.begin(self.cart.revision());
        Some(PendingQuote { token, request })
    }

    /// Snapshot for responses.
    #[must_use]
    pub fn view(&self) -> CartView {
        let subtotal = self.cart.subtotal();
        let shipping_cost = self.shipping.shipping_cost();
        CartView {
            items: self.cart.items().to_vec(),
            item_count: self.cart.item_count(),
            subtotal,
            destination: self.destination.clone(),
            shipping: self.shipping.clone(),
            shipping_cost,
            total: subtotal + shipping_cost,
        }
    }
}

/// What the cart endpoints return.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: Money,
    pub destination: Option<ShippingDestination>,
    pub shipping: ShippingCalculation,
    pub shipping_cost: Money,
    pub total: Money,
}

/// All live checkout sessions.
#[derive(Clone)]
pub struct CartRegistry {
    sessions: Cache<Uuid, SessionHandle>,
}

impl Default for CartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CartRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(MAX_SESSIONS)
                .time_to_idle(SESSION_IDLE)
                .build(),
        }
    }

    /// The state for a cart id, created on first use.
    pub async fn get_or_create(&self, cart_id: Uuid) -> SessionHandle {
        self.sessions
            .get_with(cart_id, async move {
                Arc::new(Mutex::new(CheckoutSession::new(cart_id)))
            })
            .await
    }

    /// The state of the shopper behind a tower-session.
    ///
    /// Assigns a cart id to the session on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn for_session(
        &self,
        session: &Session,
    ) -> Result<SessionHandle, tower_sessions::session::Error> {
        let cart_id = match session.get::<Uuid>(session_keys::CART_ID).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(session_keys::CART_ID, id).await?;
                id
            }
        };
        Ok(self.get_or_create(cart_id).await)
    }
}

/// Run a quote outside the session lock and apply it if still wanted.
#[instrument(skip_all)]
pub async fn finish_quote(handle: &SessionHandle, quoter: &ShippingQuoter, pending: PendingQuote) {
    let PendingQuote { token, request } = pending;
    let result = quoter.quote(&request).await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Shipping quote failed");
    }

    let mut state = handle.lock().await;
    if state.shipping.resolve(token, result) == Applied::Stale {
        debug!(token = token.value(), "Discarded stale shipping result");
    }
}

/// Apply a change to the session and restart shipping before unlocking,
/// then quote.
pub async fn change_and_refresh<F>(handle: &SessionHandle, quoter: &ShippingQuoter, change: F)
where
    F: FnOnce(&mut CheckoutSession),
{
    let pending = {
        let mut state = handle.lock().await;
        change(&mut state);
        state.restart_shipping()
    };
    if let Some(pending) = pending {
        finish_quote(handle, quoter, pending).await;
    }
}

/// Recompute shipping options for the session's current cart and destination.
///
/// An empty cart or a destination without a postal code puts the
/// calculation back to idle without calling the quoter.
pub async fn refresh_shipping(handle: &SessionHandle, quoter: &ShippingQuoter) {
    change_and_refresh(handle, quoter, |_| ()).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::address::ManualAddress;
    use vitrine_core::shipping::{CalculationState, ShippingRules};
    use vitrine_core::ProductId;

    use super::*;

    fn item(id: i32, cents: i64) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("Camisa {id}"),
            price: Money::from_minor(cents),
            quantity: 1,
            image: None,
            dimensions: None,
        }
    }

    fn manual(city: &str, state: &str, zip: &str) -> ShippingDestination {
        ShippingDestination::Manual(ManualAddress {
            street: "Rua A".to_owned(),
            city: city.to_owned(),
            state: state.to_owned(),
            zip_code: zip.to_owned(),
            ..ManualAddress::default()
        })
    }

    #[tokio::test]
    async fn test_registry_reuses_sessions() {
        let registry = CartRegistry::new();
        let id = Uuid::new_v4();
        let a = registry.get_or_create(id).await;
        a.lock().await.cart.insert(item(1, 1000));
        let b = registry.get_or_create(id).await;
        assert_eq!(b.lock().await.cart.item_count(), 1);
        let other = registry.get_or_create(Uuid::new_v4()).await;
        assert!(other.lock().await.cart.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_resolves_home_city_options() {
        let registry = CartRegistry::new();
        let handle = registry.get_or_create(Uuid::new_v4()).await;
        {
            let mut state = handle.lock().await;
            state.cart.insert(item(1, 5000));
            state.destination = Some(manual(" belo horizonte ", "mg", "30130-010"));
        }
        refresh_shipping(&handle, &ShippingQuoter::RuleTable(ShippingRules::default())).await;

        let state = handle.lock().await;
        let options = state.shipping.options();
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| o.cost == Money::ZERO));
    }

    #[tokio::test]
    async fn test_refresh_without_postal_code_goes_idle() {
        let registry = CartRegistry::new();
        let handle = registry.get_or_create(Uuid::new_v4()).await;
        {
            let mut state = handle.lock().await;
            state.cart.insert(item(1, 5000));
            state.destination = Some(manual("Recife", "PE", " "));
        }
        refresh_shipping(&handle, &ShippingQuoter::RuleTable(ShippingRules::default())).await;
        assert_eq!(*handle.lock().await.shipping.state(), CalculationState::Idle);
    }

    #[tokio::test]
    async fn test_cart_change_clears_selection_before_quote_returns() {
        let registry = CartRegistry::new();
        let handle = registry.get_or_create(Uuid::new_v4()).await;
        let quoter = ShippingQuoter::RuleTable(ShippingRules::default());
        change_and_refresh(&handle, &quoter, |s| {
            s.cart.insert(item(1, 5000));
            s.destination = Some(manual("Recife", "PE", "50030-230"));
        })
        .await;
        {
            let mut state = handle.lock().await;
            let id = state.shipping.options()[0].id.clone();
            state.shipping.select(&id).unwrap();
        }

        let pending = {
            let mut state = handle.lock().await;
            state.cart.insert(item(2, 3000));
            state.restart_shipping().unwrap()
        };
        {
            let state = handle.lock().await;
            assert!(state.shipping.is_calculating());
            assert!(state.shipping.selected_option().is_none());
            assert_eq!(state.shipping.cart_revision(), state.cart.revision());
        }

        finish_quote(&handle, &quoter, pending).await;
        let state = handle.lock().await;
        assert!(!state.shipping.options().is_empty());
        assert!(state.shipping.selected_option().is_none());
    }

    #[tokio::test]
    async fn test_quote_started_before_a_change_is_discarded() {
        let registry = CartRegistry::new();
        let handle = registry.get_or_create(Uuid::new_v4()).await;
        let quoter = ShippingQuoter::RuleTable(ShippingRules::default());
        let old = {
            let mut state = handle.lock().await;
            state.cart.insert(item(1, 5000));
            state.destination = Some(manual("Recife", "PE", "50030-230"));
            state.restart_shipping().unwrap()
        };
        let current = {
            let mut state = handle.lock().await;
            state.destination = Some(manual("Belo Horizonte", "MG", "30130-010"));
            state.restart_shipping().unwrap()
        };

        finish_quote(&handle, &quoter, old).await;
        assert!(handle.lock().await.shipping.is_calculating());

        finish_quote(&handle, &quoter, current).await;
        let state = handle.lock().await;
        assert_eq!(state.shipping.options().len(), 2);
        assert!(state.shipping.options().iter().all(|o| o.cost == Money::ZERO));
    }

    #[tokio::test]
    async fn test_view_totals_include_selected_shipping() {
        let registry = CartRegistry::new();
        let handle = registry.get_or_create(Uuid::new_v4()).await;
        {
            let mut state = handle.lock().await;
            state.cart.insert(item(1, 10_000));
            state.destination = Some(manual("Manaus", "AM", "69000-000"));
        }
        refresh_shipping(&handle, &ShippingQuoter::RuleTable(ShippingRules::default())).await;

        let mut state = handle.lock().await;
        let id = state.shipping.options()[0].id.clone();
        state.shipping.select(&id).unwrap();
        let view = state.view();
        assert_eq!(view.subtotal, Money::from_minor(10_000));
        assert_eq!(view.shipping_cost, Money::from_minor(2_500));
        assert_eq!(view.total, Money::from_minor(12_500));
    }
}
