//! Order lifecycle: submission, history and the current order.
//!
//! Each request class (create, fetch) has its own [`RequestFence`]. A
//! resolution is applied only if it carries the latest id issued for its
//! class; anything older is dropped.

use crate::error::ServiceError;
use crate::services::{OrderService, with_timeout};
use crate::types::{CartLine, DeliveryInfo, Order, RequestFence, RequestId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// How a fetched history is combined with the local one
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicy {
    /// The fetched list replaces local history
    #[default]
    Replace,
    /// Local orders missing from the fetched list are kept in front of it
    Merge,
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "merge" => Ok(Self::Merge),
            other => Err(format!("unknown history policy: {other}")),
        }
    }
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// Request classes with independent fences
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderRequestClass {
    /// Order submission
    Create,
    /// History fetch
    Fetch,
}

/// Order history, the current order and request bookkeeping
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    /// Orders, most recent first
    pub orders: Vec<Order>,
    /// Most recently placed order
    pub current_order: Option<Order>,
    /// A request is in flight
    pub loading: bool,
    /// Last failure
    pub error: Option<ServiceError>,
    /// Fence for submissions
    pub create_fence: RequestFence,
    /// Fence for history fetches
    pub fetch_fence: RequestFence,
}

impl OrderState {
    /// Fence for a request class
    #[must_use]
    pub const fn fence(&self, class: OrderRequestClass) -> &RequestFence {
        match class {
            OrderRequestClass::Create => &self.create_fence,
            OrderRequestClass::Fetch => &self.fetch_fence,
        }
    }

    /// Find an order in history
    #[must_use]
    pub fn order(&self, id: &crate::types::OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    /// True when a created order was applied: it is current or in history
    #[must_use]
    pub fn holds(&self, id: &crate::types::OrderId) -> bool {
        self.current_order.as_ref().is_some_and(|o| &o.id == id) || self.order(id).is_some()
    }
}

/// Order commands and request lifecycle events
#[derive(Clone, Debug, PartialEq)]
pub enum OrderAction {
    // Commands
    /// Submit an order for the given lines
    PlaceOrder {
        /// Snapshot of the cart
        lines: Vec<CartLine>,
        /// Delivery metadata
        delivery: DeliveryInfo,
    },
    /// Fetch a user's order history
    LoadOrders {
        /// Whose history to fetch
        user_id: UserId,
    },

    // Lifecycle events
    /// A submission was issued
    CreateOrderRequest,
    /// A submission succeeded
    CreateOrderSuccess {
        /// Which submission
        request: RequestId,
        /// The placed order
        order: Order,
    },
    /// A submission failed
    CreateOrderFailure {
        /// Which submission
        request: RequestId,
        /// Why
        error: ServiceError,
    },
    /// A history fetch was issued
    FetchOrdersRequest,
    /// A history fetch succeeded
    FetchOrdersSuccess {
        /// Which fetch
        request: RequestId,
        /// Fetched orders, most recent first
        orders: Vec<Order>,
    },
    /// A history fetch failed
    FetchOrdersFailure {
        /// Which fetch
        request: RequestId,
        /// Why
        error: ServiceError,
    },
    /// Forget the current order
    ClearCurrentOrder,
}

impl OrderAction {
    /// True when this action resolves `request` of the given class
    #[must_use]
    pub fn resolves(&self, class: OrderRequestClass, request: RequestId) -> bool {
        match (class, self) {
            (
                OrderRequestClass::Create,
                Self::CreateOrderSuccess { request: r, .. }
                | Self::CreateOrderFailure { request: r, .. },
            )
            | (
                OrderRequestClass::Fetch,
                Self::FetchOrdersSuccess { request: r, .. }
                | Self::FetchOrdersFailure { request: r, .. },
            ) => *r == request,
            _ => false,
        }
    }
}

/// Dependencies of the order reducer
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Order collaborator
    pub orders: Arc<dyn OrderService>,
    /// Upper bound for each collaborator call
    pub request_timeout: Duration,
    /// How fetched history is applied
    pub history_policy: HistoryPolicy,
}

impl OrderEnvironment {
    /// Creates an environment with the default history policy
    #[must_use]
    pub fn new(orders: Arc<dyn OrderService>, request_timeout: Duration) -> Self {
        Self {
            orders,
            request_timeout,
            history_policy: HistoryPolicy::default(),
        }
    }

    /// Sets the history policy
    #[must_use]
    pub const fn with_history_policy(mut self, history_policy: HistoryPolicy) -> Self {
        self.history_policy = history_policy;
        self
    }
}

/// Reducer for [`OrderState`]
#[derive(Clone, Debug, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Creates a new `OrderReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn begin(state: &mut OrderState, class: OrderRequestClass) -> RequestId {
        state.loading = true;
        state.error = None;
        match class {
            OrderRequestClass::Create => state.create_fence.issue(),
            OrderRequestClass::Fetch => state.fetch_fence.issue(),
        }
    }

    fn is_current(state: &OrderState, class: OrderRequestClass, request: RequestId) -> bool {
        let current = state.fence(class).is_current(request);
        if !current {
            tracing::debug!(
                ?class,
                %request,
                latest = %state.fence(class).latest(),
                "Discarding stale order resolution"
            );
        }
        current
    }

    fn apply_history(state: &mut OrderState, fetched: Vec<Order>, policy: HistoryPolicy) {
        match policy {
            HistoryPolicy::Replace => state.orders = fetched,
            HistoryPolicy::Merge => {
                let fetched_ids: HashSet<_> = fetched.iter().map(|o| o.id.clone()).collect();
                let mut merged: Vec<Order> = state
                    .orders
                    .drain(..)
                    .filter(|o| !fetched_ids.contains(&o.id))
                    .collect();
                merged.extend(fetched);
                state.orders = merged;
            },
        }
    }
}

impl Reducer for OrderReducer {
    type State = OrderState;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            OrderAction::PlaceOrder { lines, delivery } => {
                let request = Self::begin(state, OrderRequestClass::Create);
                tracing::info!(%request, lines = lines.len(), "Submitting order");

                let orders = Arc::clone(&env.orders);
                let timeout = env.request_timeout;
                smallvec![Effect::future(async move {
                    match with_timeout(timeout, orders.submit_order(lines, delivery)).await {
                        Ok(order) => OrderAction::CreateOrderSuccess { request, order },
                        Err(error) => OrderAction::CreateOrderFailure { request, error },
                    }
                })]
            },
            OrderAction::LoadOrders { user_id } => {
                let request = Self::begin(state, OrderRequestClass::Fetch);
                tracing::info!(%request, %user_id, "Fetching order history");

                let orders = Arc::clone(&env.orders);
                let timeout = env.request_timeout;
                smallvec![Effect::future(async move {
                    match with_timeout(timeout, orders.fetch_order_history(user_id)).await {
                        Ok(orders) => OrderAction::FetchOrdersSuccess { request, orders },
                        Err(error) => OrderAction::FetchOrdersFailure { request, error },
                    }
                })]
            },
            OrderAction::CreateOrderRequest => {
                Self::begin(state, OrderRequestClass::Create);
                SmallVec::new()
            },
            OrderAction::CreateOrderSuccess { request, order } => {
                if Self::is_current(state, OrderRequestClass::Create, request) {
                    tracing::info!(order_id = %order.id, total = %order.total_price, "Order placed");
                    state.loading = false;
                    state.orders.insert(0, order.clone());
                    state.current_order = Some(order);
                }
                SmallVec::new()
            },
            OrderAction::CreateOrderFailure { request, error } => {
                if Self::is_current(state, OrderRequestClass::Create, request) {
                    tracing::warn!(%request, %error, "Order submission failed");
                    state.loading = false;
                    state.error = Some(error);
                }
                SmallVec::new()
            },
            OrderAction::FetchOrdersRequest => {
                Self::begin(state, OrderRequestClass::Fetch);
                SmallVec::new()
            },
            OrderAction::FetchOrdersSuccess { request, orders } => {
                if Self::is_current(state, OrderRequestClass::Fetch, request) {
                    state.loading = false;
                    Self::apply_history(state, orders, env.history_policy);
                }
                SmallVec::new()
            },
            OrderAction::FetchOrdersFailure { request, error } => {
                if Self::is_current(state, OrderRequestClass::Fetch, request) {
                    tracing::warn!(%request, %error, "Order history fetch failed");
                    state.loading = false;
                    state.error = Some(error);
                }
                SmallVec::new()
            },
            OrderAction::ClearCurrentOrder => {
                state.current_order = None;
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceFuture;
    use crate::types::{Money, OrderId, OrderStatus, Product, TrackingSnapshot};
    use chrono::{TimeZone, Utc};
    use storefront_testing::{ReducerTest, assertions, run_effects};

    /// Order service that answers with canned results
    struct StubOrders {
        delay: Duration,
        fail: bool,
    }

    impl OrderService for StubOrders {
        fn submit_order(&self, lines: Vec<CartLine>, delivery: DeliveryInfo) -> ServiceFuture<Order> {
            let delay = self.delay;
            let fail = self.fail;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(ServiceError::RequestFailed("backend down".into()));
                }
                Ok(order_with("order_stub", lines, Some(delivery)))
            })
        }

        fn fetch_order_history(&self, _user_id: UserId) -> ServiceFuture<Vec<Order>> {
            Box::pin(async { Ok(vec![order("order_remote")]) })
        }

        fn track_order(&self, order_id: OrderId) -> ServiceFuture<TrackingSnapshot> {
            Box::pin(async move {
                Ok(TrackingSnapshot {
                    order_id,
                    status: OrderStatus::InTransit,
                    current_location: "On the way".into(),
                    estimated_arrival: Utc::now(),
                })
            })
        }
    }

    fn env(delay_ms: u64, fail: bool) -> OrderEnvironment {
        OrderEnvironment::new(
            Arc::new(StubOrders {
                delay: Duration::from_millis(delay_ms),
                fail,
            }),
            Duration::from_millis(200),
        )
    }

    fn order_with(id: &str, lines: Vec<CartLine>, delivery: Option<DeliveryInfo>) -> Order {
        let total_price = crate::types::lines_total(&lines);
        Order {
            id: OrderId::new(id),
            lines,
            delivery,
            status: OrderStatus::Confirmed,
            total_price,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            estimated_delivery: None,
        }
    }

    fn order(id: &str) -> Order {
        let product = Product::new("g1", "Fresh Apples", "fruits", Money::from_minor(299));
        order_with(id, vec![CartLine::new(product, 1)], None)
    }

    #[test]
    fn request_sets_loading_and_clears_error() {
        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState {
                error: Some(ServiceError::validation("Cart is empty")),
                ..OrderState::default()
            })
            .when_action(OrderAction::CreateOrderRequest)
            .then_state(|state| {
                assert!(state.loading);
                assert!(state.error.is_none());
                assert_eq!(state.create_fence.latest(), RequestId::new(1));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn success_prepends_and_sets_current() {
        let older = order("order_1");
        let placed = order("order_2");
        let expected = placed.clone();

        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState {
                orders: vec![older],
                ..OrderState::default()
            })
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::CreateOrderSuccess {
                request: RequestId::new(1),
                order: placed,
            })
            .then_state(move |state| {
                assert!(!state.loading);
                assert_eq!(state.orders.len(), 2);
                assert_eq!(state.orders[0], expected);
                assert_eq!(state.current_order.as_ref(), Some(&expected));
            })
            .run();
    }

    #[test]
    fn failure_leaves_history_and_current_untouched() {
        let existing = order("order_1");
        let before = existing.clone();

        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState {
                orders: vec![existing.clone()],
                current_order: Some(existing),
                ..OrderState::default()
            })
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::CreateOrderFailure {
                request: RequestId::new(1),
                error: ServiceError::validation("Cart is empty"),
            })
            .then_state(move |state| {
                assert!(!state.loading);
                assert_eq!(state.error, Some(ServiceError::validation("Cart is empty")));
                assert_eq!(state.orders, vec![before.clone()]);
                assert_eq!(state.current_order, Some(before));
            })
            .run();
    }

    #[test]
    fn stale_resolution_is_discarded() {
        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState::default())
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::CreateOrderSuccess {
                request: RequestId::new(1),
                order: order("order_stale"),
            })
            .then_state(|state| {
                assert!(state.loading, "newer request still in flight");
                assert!(state.orders.is_empty());
                assert!(state.current_order.is_none());
            })
            .run();
    }

    #[test]
    fn applied_order_stays_held_after_newer_request() {
        let placed_id = OrderId::new("order_a");
        let stale_id = OrderId::new("order_stale");

        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState::default())
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::CreateOrderSuccess {
                request: RequestId::new(1),
                order: order("order_a"),
            })
            // another checkout starts right after the first one resolved
            .when_action(OrderAction::CreateOrderRequest)
            .then_state(move |state| {
                assert!(!state.create_fence.is_current(RequestId::new(1)));
                assert!(state.holds(&placed_id));
            })
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::CreateOrderSuccess {
                request: RequestId::new(2),
                order: order("order_stale"),
            })
            .then_state(move |state| assert!(!state.holds(&stale_id)))
            .run();
    }

    #[test]
    fn fences_are_independent_per_class() {
        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState::default())
            .when_action(OrderAction::CreateOrderRequest)
            .when_action(OrderAction::FetchOrdersRequest)
            .when_action(OrderAction::FetchOrdersRequest)
            .when_action(OrderAction::CreateOrderSuccess {
                request: RequestId::new(1),
                order: order("order_9"),
            })
            .then_state(|state| {
                assert_eq!(state.fetch_fence.latest(), RequestId::new(2));
                assert_eq!(state.orders.len(), 1);
            })
            .run();
    }

    #[test]
    fn replace_policy_overwrites_history() {
        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState {
                orders: vec![order("order_local")],
                ..OrderState::default()
            })
            .when_action(OrderAction::FetchOrdersRequest)
            .when_action(OrderAction::FetchOrdersSuccess {
                request: RequestId::new(1),
                orders: vec![order("order_remote")],
            })
            .then_state(|state| {
                let ids: Vec<_> = state.orders.iter().map(|o| o.id.as_str()).collect();
                assert_eq!(ids, vec!["order_remote"]);
            })
            .run();
    }

    #[test]
    fn merge_policy_keeps_local_only_orders_in_front() {
        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false).with_history_policy(HistoryPolicy::Merge))
            .given_state(OrderState {
                orders: vec![order("order_local"), order("order_shared")],
                ..OrderState::default()
            })
            .when_action(OrderAction::FetchOrdersRequest)
            .when_action(OrderAction::FetchOrdersSuccess {
                request: RequestId::new(1),
                orders: vec![order("order_shared"), order("order_remote")],
            })
            .then_state(|state| {
                let ids: Vec<_> = state.orders.iter().map(|o| o.id.as_str()).collect();
                assert_eq!(ids, vec!["order_local", "order_shared", "order_remote"]);
            })
            .run();
    }

    #[test]
    fn clear_current_order() {
        ReducerTest::new(OrderReducer::new())
            .with_env(env(0, false))
            .given_state(OrderState {
                current_order: Some(order("order_1")),
                ..OrderState::default()
            })
            .when_action(OrderAction::ClearCurrentOrder)
            .then_state(|state| assert!(state.current_order.is_none()))
            .run();
    }

    #[tokio::test]
    async fn place_order_effect_resolves_with_request_id() {
        let mut state = OrderState::default();
        let product = Product::new("g1", "Fresh Apples", "fruits", Money::from_minor(499));
        let effects = OrderReducer::new().reduce(
            &mut state,
            OrderAction::PlaceOrder {
                lines: vec![CartLine::new(product, 3)],
                delivery: DeliveryInfo::default(),
            },
            &env(0, false),
        );
        assert!(state.loading);
        assertions::assert_single_future(&effects);

        let actions = run_effects(effects).await;
        assert_eq!(actions.len(), 1);
        assert!(actions[0].resolves(OrderRequestClass::Create, RequestId::new(1)));
        assert!(!actions[0].resolves(OrderRequestClass::Fetch, RequestId::new(1)));
    }

    #[tokio::test]
    async fn slow_submission_times_out() {
        let mut state = OrderState::default();
        let effects = OrderReducer::new().reduce(
            &mut state,
            OrderAction::PlaceOrder {
                lines: vec![],
                delivery: DeliveryInfo::default(),
            },
            &env(5_000, false),
        );

        let actions = run_effects(effects).await;
        assert_eq!(
            actions,
            vec![OrderAction::CreateOrderFailure {
                request: RequestId::new(1),
                error: ServiceError::Timeout(Duration::from_millis(200)),
            }]
        );
    }

    #[tokio::test]
    async fn failing_submission_resolves_to_failure() {
        let mut state = OrderState::default();
        let env = env(0, true);
        let reducer = OrderReducer::new();
        let effects = reducer.reduce(
            &mut state,
            OrderAction::PlaceOrder {
                lines: vec![],
                delivery: DeliveryInfo::default(),
            },
            &env,
        );

        for action in run_effects(effects).await {
            let _ = reducer.reduce(&mut state, action, &env);
        }
        assert!(!state.loading);
        assert!(matches!(state.error, Some(ServiceError::RequestFailed(_))));
    }

    #[test]
    fn history_policy_parses() {
        assert_eq!("Merge".parse::<HistoryPolicy>(), Ok(HistoryPolicy::Merge));
        assert_eq!(HistoryPolicy::default(), HistoryPolicy::Replace);
        assert!("append".parse::<HistoryPolicy>().is_err());
    }
}
