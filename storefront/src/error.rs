//! Error taxonomy for collaborator calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use storefront_runtime::StoreError;
use thiserror::Error;

/// Result type returned by every collaborator
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors reported by catalog, order and auth collaborators
///
/// Reducers never fail; they record one of these in state instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    /// Input rejected before any work was done
    #[error("{0}")]
    Validation(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The collaborator could not complete the request
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The collaborator did not answer in time
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The operation needs a signed-in user
    #[error("Please sign in to continue")]
    Unauthenticated,
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Validation`]
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        Self::RequestFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_displays_bare_message() {
        assert_eq!(
            ServiceError::validation("Cart is empty").to_string(),
            "Cart is empty"
        );
    }

    #[test]
    fn timeout_displays_millis() {
        let error = ServiceError::Timeout(Duration::from_millis(1500));
        assert_eq!(error.to_string(), "Request timed out after 1500ms");
    }

    #[test]
    fn store_errors_become_request_failures() {
        let error = ServiceError::from(StoreError::Timeout);
        assert!(matches!(error, ServiceError::RequestFailed(_)));
    }
}
