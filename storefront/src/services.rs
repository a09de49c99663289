//! Collaborator traits for the remote storefront service.
//!
//! Reducers never talk to the network directly. They return effects that
//! call one of these traits, injected through the store environment.

use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    AuthSession, CartLine, DeliveryInfo, Namespace, Order, OrderId, Product, ProductId,
    TrackingSnapshot, UserId,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by collaborator methods
pub type ServiceFuture<T> = Pin<Box<dyn Future<Output = ServiceResult<T>> + Send>>;

/// Product catalog collaborator
pub trait CatalogService: Send + Sync {
    /// Fetch every product of a namespace
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be fetched
    fn fetch_catalog(&self, namespace: Namespace) -> ServiceFuture<Vec<Product>>;

    /// Look up one product by id
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the id is not in the catalog
    fn product_by_id(&self, namespace: Namespace, id: ProductId) -> ServiceFuture<Product>;
}

/// Order submission, history and tracking collaborator
pub trait OrderService: Send + Sync {
    /// Submit an order built from cart lines
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for an empty line list
    fn submit_order(
        &self,
        lines: Vec<CartLine>,
        delivery: DeliveryInfo,
    ) -> ServiceFuture<Order>;

    /// Fetch the order history of a user, most recent first
    ///
    /// # Errors
    ///
    /// Returns error if the history cannot be fetched
    fn fetch_order_history(&self, user_id: UserId) -> ServiceFuture<Vec<Order>>;

    /// Fetch a tracking snapshot for an order
    ///
    /// # Errors
    ///
    /// Returns error if the order cannot be tracked
    fn track_order(&self, order_id: OrderId) -> ServiceFuture<TrackingSnapshot>;
}

/// Login/signup collaborator
pub trait AuthService: Send + Sync {
    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when a field is missing
    fn login(&self, email: String, password: String) -> ServiceFuture<AuthSession>;

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when a required field is missing
    fn signup(
        &self,
        email: String,
        password: String,
        name: String,
        phone: Option<String>,
    ) -> ServiceFuture<AuthSession>;

    /// Sign out
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the logout
    fn logout(&self) -> ServiceFuture<()>;
}

/// Bound a collaborator call by `timeout`
///
/// # Errors
///
/// Returns [`ServiceError::Timeout`] if the call does not finish in time,
/// otherwise whatever the call itself returned.
pub async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = ServiceResult<T>>,
) -> ServiceResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis(), "Collaborator call timed out");
            Err(ServiceError::Timeout(timeout))
        },
    }
}

/// The three collaborators, shared between stores
#[derive(Clone)]
pub struct Services {
    /// Catalog collaborator
    pub catalog: Arc<dyn CatalogService>,
    /// Order collaborator
    pub orders: Arc<dyn OrderService>,
    /// Auth collaborator
    pub auth: Arc<dyn AuthService>,
}

impl Services {
    /// Use one backend for all three collaborators
    #[must_use]
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: CatalogService + OrderService + AuthService + 'static,
    {
        Self {
            catalog: backend.clone(),
            orders: backend.clone(),
            auth: backend,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_passes_through_fast_calls() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, ServiceError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn with_timeout_reports_slow_calls() {
        let result: ServiceResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(ServiceError::Timeout(Duration::from_millis(10))));
    }
}
