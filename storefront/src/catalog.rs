//! Product catalogs for both namespaces and the category filter.

use crate::error::ServiceError;
use crate::services::{CatalogService, with_timeout};
use crate::types::{Namespace, Product, RequestFence, RequestId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Category filter applied to the catalog views
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// No filtering
    #[default]
    All,
    /// Only products in this category
    Category(String),
}

impl CategoryFilter {
    /// Parse a UI selection; `all` (any case) means no filter
    #[must_use]
    pub fn from_selection(selection: &str) -> Self {
        if selection.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Category(selection.to_string())
        }
    }

    /// True when the product passes the filter
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => &product.category == category,
        }
    }
}

/// Fetch bookkeeping for one namespace
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFetch {
    /// Fence for this namespace's fetches
    pub fence: RequestFence,
    /// Request whose products are currently held (`RequestId::default()` if none)
    pub loaded: RequestId,
    /// The latest fetch has not resolved yet
    pub in_flight: bool,
}

impl CatalogFetch {
    /// True when the held products come from `request` or a newer fetch
    #[must_use]
    pub fn holds(&self, request: RequestId) -> bool {
        request.seq() != 0 && self.loaded.seq() >= request.seq()
    }
}

/// Fetched catalogs plus UI filter state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    /// Grocery products
    pub grocery: Vec<Product>,
    /// Apartment-food products
    pub apartment: Vec<Product>,
    /// Selected category
    pub selected: CategoryFilter,
    /// Some namespace has a fetch in flight
    pub loading: bool,
    /// Last failure
    pub error: Option<ServiceError>,
    /// Grocery fetches
    pub grocery_fetch: CatalogFetch,
    /// Apartment-food fetches
    pub apartment_fetch: CatalogFetch,
}

impl CatalogState {
    /// All products of a namespace
    #[must_use]
    pub fn products(&self, namespace: Namespace) -> &[Product] {
        match namespace {
            Namespace::Grocery => &self.grocery,
            Namespace::Apartment => &self.apartment,
        }
    }

    /// Fetch bookkeeping of a namespace
    #[must_use]
    pub const fn fetch(&self, namespace: Namespace) -> &CatalogFetch {
        match namespace {
            Namespace::Grocery => &self.grocery_fetch,
            Namespace::Apartment => &self.apartment_fetch,
        }
    }

    const fn fetch_mut(&mut self, namespace: Namespace) -> &mut CatalogFetch {
        match namespace {
            Namespace::Grocery => &mut self.grocery_fetch,
            Namespace::Apartment => &mut self.apartment_fetch,
        }
    }

    /// Distinct categories of a namespace, in first-seen order
    #[must_use]
    pub fn categories(&self, namespace: Namespace) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for product in self.products(namespace) {
            if !categories.contains(&product.category.as_str()) {
                categories.push(&product.category);
            }
        }
        categories
    }

    /// Products of a namespace that pass the selected category
    #[must_use]
    pub fn filtered_products(&self, namespace: Namespace) -> Vec<&Product> {
        self.products(namespace)
            .iter()
            .filter(|p| self.selected.matches(p))
            .collect()
    }

    fn refresh_loading(&mut self) {
        self.loading = self.grocery_fetch.in_flight || self.apartment_fetch.in_flight;
    }
}

/// Catalog commands and request lifecycle events
#[derive(Clone, Debug, PartialEq)]
pub enum CatalogAction {
    /// Fetch a namespace's catalog
    LoadCatalog {
        /// Which catalog
        namespace: Namespace,
    },
    /// A fetch was issued
    FetchProductsRequest {
        /// Which catalog
        namespace: Namespace,
    },
    /// A fetch succeeded
    FetchProductsSuccess {
        /// Which fetch
        request: RequestId,
        /// Which catalog
        namespace: Namespace,
        /// Its products
        products: Vec<Product>,
    },
    /// A fetch failed
    FetchProductsFailure {
        /// Which fetch
        request: RequestId,
        /// Which catalog
        namespace: Namespace,
        /// Why
        error: ServiceError,
    },
    /// Change the category filter
    SetSelectedCategory(CategoryFilter),
}

impl CatalogAction {
    /// True when this action resolves `request` of `namespace`
    #[must_use]
    pub fn resolves(&self, namespace: Namespace, request: RequestId) -> bool {
        match self {
            Self::FetchProductsSuccess {
                request: r,
                namespace: ns,
                ..
            }
            | Self::FetchProductsFailure {
                request: r,
                namespace: ns,
                ..
            } => *ns == namespace && *r == request,
            _ => false,
        }
    }
}

/// Dependencies of the catalog reducer
#[derive(Clone)]
pub struct CatalogEnvironment {
    /// Catalog collaborator
    pub catalog: Arc<dyn CatalogService>,
    /// Upper bound for each collaborator call
    pub request_timeout: Duration,
}

/// Reducer for [`CatalogState`]
///
/// Each namespace is fenced on its own: a grocery fetch never supersedes an
/// apartment fetch.
#[derive(Clone, Debug, Default)]
pub struct CatalogReducer;

impl CatalogReducer {
    /// Creates a new `CatalogReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn begin(state: &mut CatalogState, namespace: Namespace) -> RequestId {
        state.error = None;
        let fetch = state.fetch_mut(namespace);
        fetch.in_flight = true;
        let request = fetch.fence.issue();
        state.refresh_loading();
        request
    }

    /// Settle `request` if it is the latest of its namespace
    fn settle(state: &mut CatalogState, namespace: Namespace, request: RequestId) -> bool {
        let fetch = state.fetch_mut(namespace);
        if !fetch.fence.is_current(request) {
            tracing::debug!(%request, %namespace, "Discarding stale catalog resolution");
            return false;
        }
        fetch.in_flight = false;
        state.refresh_loading();
        true
    }
}

impl Reducer for CatalogReducer {
    type State = CatalogState;
    type Action = CatalogAction;
    type Environment = CatalogEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CatalogAction::LoadCatalog { namespace } => {
                let request = Self::begin(state, namespace);
                tracing::debug!(%request, %namespace, "Fetching catalog");

                let catalog = Arc::clone(&env.catalog);
                let timeout = env.request_timeout;
                smallvec![Effect::future(async move {
                    match with_timeout(timeout, catalog.fetch_catalog(namespace)).await {
                        Ok(products) => CatalogAction::FetchProductsSuccess {
                            request,
                            namespace,
                            products,
                        },
                        Err(error) => CatalogAction::FetchProductsFailure {
                            request,
                            namespace,
                            error,
                        },
                    }
                })]
            },
            CatalogAction::FetchProductsRequest { namespace } => {
                Self::begin(state, namespace);
                SmallVec::new()
            },
            CatalogAction::FetchProductsSuccess {
                request,
                namespace,
                products,
            } => {
                if Self::settle(state, namespace, request) {
                    state.fetch_mut(namespace).loaded = request;
                    match namespace {
                        Namespace::Grocery => state.grocery = products,
                        Namespace::Apartment => state.apartment = products,
                    }
                }
                SmallVec::new()
            },
            CatalogAction::FetchProductsFailure {
                request,
                namespace,
                error,
            } => {
                if Self::settle(state, namespace, request) {
                    tracing::warn!(%error, %namespace, "Catalog fetch failed");
                    state.error = Some(error);
                }
                SmallVec::new()
            },
            CatalogAction::SetSelectedCategory(filter) => {
                state.selected = filter;
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceFuture;
    use crate::types::{Money, ProductId};
    use storefront_testing::{ReducerTest, run_effects};

    struct StubCatalog;

    impl CatalogService for StubCatalog {
        fn fetch_catalog(&self, namespace: Namespace) -> ServiceFuture<Vec<Product>> {
            Box::pin(async move { Ok(products(namespace)) })
        }

        fn product_by_id(&self, _namespace: Namespace, id: ProductId) -> ServiceFuture<Product> {
            Box::pin(async move { Err(ServiceError::NotFound(id.to_string())) })
        }
    }

    fn env() -> CatalogEnvironment {
        CatalogEnvironment {
            catalog: Arc::new(StubCatalog),
            request_timeout: Duration::from_secs(1),
        }
    }

    fn products(namespace: Namespace) -> Vec<Product> {
        match namespace {
            Namespace::Grocery => vec![
                Product::new("g1", "Apples", "fruits", Money::from_minor(299)),
                Product::new("g2", "Milk", "dairy", Money::from_minor(349)),
                Product::new("g3", "Bananas", "fruits", Money::from_minor(199)),
            ],
            Namespace::Apartment => vec![Product::new("a1", "Biryani", "main-course", Money::from_minor(1299))],
        }
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        let state = CatalogState {
            grocery: products(Namespace::Grocery),
            ..CatalogState::default()
        };
        assert_eq!(state.categories(Namespace::Grocery), vec!["fruits", "dairy"]);
        assert!(state.categories(Namespace::Apartment).is_empty());
    }

    #[test]
    fn category_filter_narrows_products() {
        ReducerTest::new(CatalogReducer::new())
            .with_env(env())
            .given_state(CatalogState {
                grocery: products(Namespace::Grocery),
                ..CatalogState::default()
            })
            .when_action(CatalogAction::SetSelectedCategory(CategoryFilter::from_selection("fruits")))
            .then_state(|state| {
                let names: Vec<_> = state
                    .filtered_products(Namespace::Grocery)
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect();
                assert_eq!(names, vec!["Apples", "Bananas"]);
            })
            .run();
    }

    #[test]
    fn all_selection_clears_filter() {
        assert_eq!(CategoryFilter::from_selection("All"), CategoryFilter::All);
        let state = CatalogState {
            grocery: products(Namespace::Grocery),
            selected: CategoryFilter::from_selection("all"),
            ..CatalogState::default()
        };
        assert_eq!(state.filtered_products(Namespace::Grocery).len(), 3);
    }

    #[test]
    fn stale_fetch_is_discarded() {
        ReducerTest::new(CatalogReducer::new())
            .with_env(env())
            .given_state(CatalogState::default())
            .when_action(CatalogAction::FetchProductsRequest {
                namespace: Namespace::Grocery,
            })
            .when_action(CatalogAction::FetchProductsRequest {
                namespace: Namespace::Grocery,
            })
            .when_action(CatalogAction::FetchProductsSuccess {
                request: RequestId::new(1),
                namespace: Namespace::Grocery,
                products: products(Namespace::Grocery),
            })
            .then_state(|state| {
                assert!(state.loading);
                assert!(state.grocery.is_empty());
                assert!(!state.grocery_fetch.holds(RequestId::new(1)));
            })
            .run();
    }

    #[test]
    fn namespaces_are_fenced_independently() {
        ReducerTest::new(CatalogReducer::new())
            .with_env(env())
            .given_state(CatalogState::default())
            .when_action(CatalogAction::FetchProductsRequest {
                namespace: Namespace::Grocery,
            })
            .when_action(CatalogAction::FetchProductsRequest {
                namespace: Namespace::Apartment,
            })
            .when_action(CatalogAction::FetchProductsSuccess {
                request: RequestId::new(1),
                namespace: Namespace::Grocery,
                products: products(Namespace::Grocery),
            })
            .then_state(|state| {
                assert_eq!(state.grocery.len(), 3);
                assert!(state.grocery_fetch.holds(RequestId::new(1)));
                // apartment is still in flight
                assert!(state.loading);
            })
            .when_action(CatalogAction::FetchProductsSuccess {
                request: RequestId::new(1),
                namespace: Namespace::Apartment,
                products: products(Namespace::Apartment),
            })
            .then_state(|state| {
                assert_eq!(state.apartment.len(), 1);
                assert!(!state.loading);
            })
            .run();
    }

    #[test]
    fn failure_is_recorded_for_current_fetch() {
        ReducerTest::new(CatalogReducer::new())
            .with_env(env())
            .given_state(CatalogState::default())
            .when_action(CatalogAction::FetchProductsRequest {
                namespace: Namespace::Apartment,
            })
            .when_action(CatalogAction::FetchProductsFailure {
                request: RequestId::new(1),
                namespace: Namespace::Apartment,
                error: ServiceError::RequestFailed("offline".to_string()),
            })
            .then_state(|state| {
                assert!(!state.loading);
                assert_eq!(
                    state.error,
                    Some(ServiceError::RequestFailed("offline".to_string()))
                );
                assert!(!state.apartment_fetch.holds(RequestId::new(1)));
            })
            .run();
    }

    #[tokio::test]
    async fn load_catalog_fills_namespace() {
        let reducer = CatalogReducer::new();
        let env = env();
        let mut state = CatalogState::default();

        let effects = reducer.reduce(
            &mut state,
            CatalogAction::LoadCatalog {
                namespace: Namespace::Apartment,
            },
            &env,
        );
        for action in run_effects(effects).await {
            let _ = reducer.reduce(&mut state, action, &env);
        }

        assert!(!state.loading);
        assert_eq!(state.apartment.len(), 1);
        assert!(state.grocery.is_empty());
    }
}
