//! The storefront facade.
//!
//! Owns one [`Store`] per state container plus the collaborators, and
//! orchestrates flows that span several stores (checkout clears the cart
//! only after its order is placed).

use crate::cart::{CartAction, CartReducer, CartState};
use crate::catalog::{CatalogAction, CatalogEnvironment, CatalogReducer, CatalogState, CategoryFilter};
use crate::config::StorefrontConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::mock_backend::MockBackend;
use crate::orders::{OrderAction, OrderEnvironment, OrderReducer, OrderRequestClass, OrderState};
use crate::services::{Services, with_timeout};
use crate::session::{SessionAction, SessionEnvironment, SessionReducer, SessionState};
use crate::types::{
    Cart, DeliveryInfo, Namespace, Order, OrderId, Product, ProductId, TrackingSnapshot, User,
};
use std::time::Duration;
use storefront_runtime::Store;

/// Store holding both carts
pub type CartStore = Store<CartState, CartAction, (), CartReducer>;
/// Store holding order history
pub type OrderStore = Store<OrderState, OrderAction, OrderEnvironment, OrderReducer>;
/// Store holding the catalogs
pub type CatalogStore = Store<CatalogState, CatalogAction, CatalogEnvironment, CatalogReducer>;
/// Store holding the session
pub type SessionStore = Store<SessionState, SessionAction, SessionEnvironment, SessionReducer>;

/// Slack on top of the collaborator timeout when waiting for a resolution
const RESOLUTION_SLACK: Duration = Duration::from_secs(1);

/// Client-side storefront
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct Storefront {
    config: StorefrontConfig,
    services: Services,
    cart: CartStore,
    orders: OrderStore,
    catalog: CatalogStore,
    session: SessionStore,
}

impl Storefront {
    /// Build the stores around the given collaborators
    #[must_use]
    pub fn new(config: StorefrontConfig, services: Services) -> Self {
        let request_timeout = config.request_timeout();

        let orders = Store::new(
            OrderState::default(),
            OrderReducer::new(),
            OrderEnvironment::new(services.orders.clone(), request_timeout)
                .with_history_policy(config.history_policy),
        );
        let catalog = Store::new(
            CatalogState::default(),
            CatalogReducer::new(),
            CatalogEnvironment {
                catalog: services.catalog.clone(),
                request_timeout,
            },
        );
        let session = Store::new(
            SessionState::default(),
            SessionReducer::new(),
            SessionEnvironment {
                auth: services.auth.clone(),
                request_timeout,
            },
        );

        tracing::info!(
            request_timeout_ms = config.request_timeout_ms,
            history_policy = %config.history_policy,
            "Storefront initialised"
        );

        Self {
            config,
            services,
            cart: Store::new(CartState::default(), CartReducer::new(), ()),
            orders,
            catalog,
            session,
        }
    }

    /// Build a storefront backed by [`MockBackend`] with the configured latency
    #[must_use]
    pub fn with_mock_backend(config: StorefrontConfig) -> Self {
        let backend = MockBackend::with_clock(
            std::sync::Arc::new(storefront_core::environment::SystemClock),
            config.latency(),
        )
        .shared();
        Self::new(config, Services::shared(backend))
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    fn resolution_timeout(&self) -> Duration {
        self.config.request_timeout() + RESOLUTION_SLACK
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Sign in
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error, or [`ServiceError::RequestFailed`]
    /// if the store could not process the request.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<User> {
        let action = SessionAction::Login {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate(action).await
    }

    /// Create an account and sign in
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error, or [`ServiceError::RequestFailed`]
    /// if the store could not process the request.
    #[tracing::instrument(skip(self, password))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
        phone: Option<&str>,
    ) -> ServiceResult<User> {
        let action = SessionAction::Signup {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            phone: phone.map(str::to_string),
        };
        self.authenticate(action).await
    }

    async fn authenticate(&self, action: SessionAction) -> ServiceResult<User> {
        let resolution = self
            .session
            .send_tagged_and_wait_for(
                action,
                |s| s.fence.latest(),
                |request, a| a.resolves(*request),
                self.resolution_timeout(),
            )
            .await?;

        match resolution {
            SessionAction::LoginSuccess { session, .. }
            | SessionAction::SignupSuccess { session, .. } => Ok(session.user),
            SessionAction::LoginFailure { error, .. }
            | SessionAction::SignupFailure { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Sign out
    ///
    /// Local state is cleared at once; the backend call runs in the background.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn logout(&self) -> ServiceResult<()> {
        self.session.send(SessionAction::Logout).await?;
        Ok(())
    }

    /// Snapshot of the session
    pub async fn session(&self) -> SessionState {
        self.session.state(Clone::clone).await
    }

    /// Signed-in user, if any
    pub async fn current_user(&self) -> Option<User> {
        self.session.state(|s| s.user.clone()).await
    }

    async fn require_user(&self) -> ServiceResult<User> {
        self.current_user().await.ok_or_else(|| {
            tracing::warn!("Operation refused without a signed-in user");
            ServiceError::Unauthenticated
        })
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Fetch a namespace's catalog into the catalog store
    ///
    /// Returns the products the store holds once the fetch resolves.
    ///
    /// # Errors
    ///
    /// - the collaborator's error, including [`ServiceError::Timeout`]
    /// - [`ServiceError::RequestFailed`] if a newer fetch of the same
    ///   namespace superseded this one before any result was applied
    #[tracing::instrument(skip(self))]
    pub async fn load_catalog(&self, namespace: Namespace) -> ServiceResult<Vec<Product>> {
        let resolution = self
            .catalog
            .send_tagged_and_wait_for(
                CatalogAction::LoadCatalog { namespace },
                move |s| s.fetch(namespace).fence.latest(),
                move |request, a| a.resolves(namespace, *request),
                self.resolution_timeout(),
            )
            .await?;

        match resolution {
            CatalogAction::FetchProductsSuccess { request, .. } => self
                .catalog
                .state(move |s| {
                    s.fetch(namespace)
                        .holds(request)
                        .then(|| s.products(namespace).to_vec())
                })
                .await
                .ok_or_else(|| {
                    ServiceError::RequestFailed(format!(
                        "{namespace} catalog request {request} was superseded"
                    ))
                }),
            CatalogAction::FetchProductsFailure { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Fetch both catalogs concurrently
    ///
    /// # Errors
    ///
    /// Returns the first failure; every failure is also recorded in the
    /// catalog store.
    pub async fn load_all_catalogs(&self) -> ServiceResult<()> {
        futures::future::try_join_all(Namespace::ALL.into_iter().map(|ns| self.load_catalog(ns)))
            .await?;
        Ok(())
    }

    /// Look up one product
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the id is unknown.
    pub async fn product(&self, namespace: Namespace, id: ProductId) -> ServiceResult<Product> {
        with_timeout(
            self.config.request_timeout(),
            self.services.catalog.product_by_id(namespace, id),
        )
        .await
    }

    /// Change the category filter (`all` clears it)
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn select_category(&self, selection: &str) -> ServiceResult<()> {
        self.catalog
            .send(CatalogAction::SetSelectedCategory(CategoryFilter::from_selection(selection)))
            .await?;
        Ok(())
    }

    /// Snapshot of the catalog store
    pub async fn catalog(&self) -> CatalogState {
        self.catalog.state(Clone::clone).await
    }

    /// Products of a namespace that pass the selected category
    pub async fn visible_products(&self, namespace: Namespace) -> Vec<Product> {
        self.catalog
            .state(|s| s.filtered_products(namespace).into_iter().cloned().collect())
            .await
    }

    /// Distinct categories of a loaded namespace
    pub async fn categories(&self, namespace: Namespace) -> Vec<String> {
        self.catalog
            .state(|s| s.categories(namespace).into_iter().map(str::to_string).collect())
            .await
    }

    // ------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------

    async fn update_cart(&self, namespace: Namespace, action: CartAction) -> ServiceResult<Cart> {
        let (_, cart) = self
            .cart
            .send_and_read(action, |s| s.cart(namespace).clone())
            .await?;
        Ok(cart)
    }

    /// Add a product to a cart and return the updated cart
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn add_to_cart(
        &self,
        namespace: Namespace,
        product: Product,
        quantity: i64,
    ) -> ServiceResult<Cart> {
        self.update_cart(
            namespace,
            CartAction::AddToCart {
                namespace,
                product,
                quantity,
            },
        )
        .await
    }

    /// Remove a product's line and return the updated cart
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn remove_from_cart(
        &self,
        namespace: Namespace,
        product_id: ProductId,
    ) -> ServiceResult<Cart> {
        self.update_cart(
            namespace,
            CartAction::RemoveFromCart {
                namespace,
                product_id,
            },
        )
        .await
    }

    /// Set a line's quantity (floored at 1) and return the updated cart
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn update_quantity(
        &self,
        namespace: Namespace,
        product_id: ProductId,
        quantity: i64,
    ) -> ServiceResult<Cart> {
        self.update_cart(
            namespace,
            CartAction::UpdateQuantity {
                namespace,
                product_id,
                quantity,
            },
        )
        .await
    }

    /// Empty a cart
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn clear_cart(&self, namespace: Namespace) -> ServiceResult<Cart> {
        self.update_cart(namespace, CartAction::ClearCart { namespace })
            .await
    }

    /// Snapshot of one cart
    pub async fn cart(&self, namespace: Namespace) -> Cart {
        self.cart.state(|s| s.cart(namespace).clone()).await
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Place an order for the current contents of a cart
    ///
    /// The cart is snapshotted when the order is submitted and cleared only
    /// once the order is confirmed. The cart stays editable meanwhile; edits
    /// made during submission are lost on success.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthenticated`] without a signed-in user
    /// - [`ServiceError::Validation`] for an empty cart
    /// - [`ServiceError::Timeout`] if the backend does not answer in time
    /// - [`ServiceError::RequestFailed`] if a newer checkout superseded this one
    #[tracing::instrument(skip(self, delivery))]
    pub async fn checkout(
        &self,
        namespace: Namespace,
        delivery: DeliveryInfo,
    ) -> ServiceResult<Order> {
        self.require_user().await?;

        let lines = self.cart.state(|s| s.cart(namespace).lines.clone()).await;
        let resolution = self
            .orders
            .send_tagged_and_wait_for(
                OrderAction::PlaceOrder { lines, delivery },
                |s| s.create_fence.latest(),
                |request, a| a.resolves(OrderRequestClass::Create, *request),
                self.resolution_timeout(),
            )
            .await?;

        match resolution {
            OrderAction::CreateOrderSuccess { request, order } => {
                let id = order.id.clone();
                let applied = self.orders.state(move |s| s.holds(&id)).await;
                if !applied {
                    return Err(ServiceError::RequestFailed(format!(
                        "order request {request} was superseded by a newer checkout"
                    )));
                }

                self.cart.send(CartAction::ClearCart { namespace }).await?;
                tracing::info!(order_id = %order.id, %namespace, "Checkout complete");
                Ok(order)
            },
            OrderAction::CreateOrderFailure { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Fetch the signed-in user's order history
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthenticated`] without a signed-in user
    /// - the collaborator's error otherwise
    #[tracing::instrument(skip(self))]
    pub async fn load_orders(&self) -> ServiceResult<Vec<Order>> {
        let user = self.require_user().await?;

        let resolution = self
            .orders
            .send_tagged_and_wait_for(
                OrderAction::LoadOrders { user_id: user.id },
                |s| s.fetch_fence.latest(),
                |request, a| a.resolves(OrderRequestClass::Fetch, *request),
                self.resolution_timeout(),
            )
            .await?;

        match resolution {
            OrderAction::FetchOrdersSuccess { .. } => {
                Ok(self.orders.state(|s| s.orders.clone()).await)
            },
            OrderAction::FetchOrdersFailure { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Fetch a tracking snapshot; nothing is stored
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error, including [`ServiceError::Timeout`].
    pub async fn track_order(&self, order_id: OrderId) -> ServiceResult<TrackingSnapshot> {
        with_timeout(
            self.config.request_timeout(),
            self.services.orders.track_order(order_id),
        )
        .await
    }

    /// Forget the current order
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if the store is shutting down.
    pub async fn clear_current_order(&self) -> ServiceResult<()> {
        self.orders.send(OrderAction::ClearCurrentOrder).await?;
        Ok(())
    }

    /// Snapshot of the order store
    pub async fn orders(&self) -> OrderState {
        self.orders.state(Clone::clone).await
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Stop accepting actions and wait for in-flight requests
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestFailed`] if some store still had
    /// running effects when the shutdown timeout expired.
    pub async fn shutdown(&self) -> ServiceResult<()> {
        let timeout = self.config.shutdown_timeout();
        futures::future::try_join4(
            self.cart.shutdown(timeout),
            self.orders.shutdown(timeout),
            self.catalog.shutdown(timeout),
            self.session.shutdown(timeout),
        )
        .await?;
        Ok(())
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn unexpected<A: std::fmt::Debug>(action: &A) -> ServiceError {
    tracing::error!(?action, "Resolution matched an unexpected action");
    ServiceError::RequestFailed("unexpected resolution".to_string())
}
