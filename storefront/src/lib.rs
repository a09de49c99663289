//! # Storefront
//!
//! State core of a mobile storefront client: two product catalogs (grocery and
//! peer-to-peer apartment food), one cart per catalog, order placement and
//! tracking, all behind a login/signup gate.
//!
//! Each piece of state lives in its own reducer-driven store:
//!
//! - [`cart`]: per-namespace carts with derived totals
//! - [`orders`]: order history and the fenced submission/fetch lifecycle
//! - [`catalog`]: fetched products and the category filter
//! - [`session`]: the signed-in user
//!
//! [`Storefront`] wires the stores to the [`services`] collaborators and runs
//! the cross-store flows such as checkout.
//!
//! ## Example
//!
//! ```ignore
//! let storefront = Storefront::with_mock_backend(StorefrontConfig::from_env());
//! storefront.login("jane@example.com", "secret").await?;
//!
//! let products = storefront.load_catalog(Namespace::Grocery).await?;
//! storefront.add_to_cart(Namespace::Grocery, products[0].clone(), 2).await?;
//!
//! let order = storefront
//!     .checkout(Namespace::Grocery, DeliveryInfo::default())
//!     .await?;
//! ```

pub mod app;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod formatters;
pub mod mock_backend;
pub mod orders;
pub mod services;
pub mod session;
pub mod types;

pub use app::Storefront;
pub use config::StorefrontConfig;
pub use error::{ServiceError, ServiceResult};
pub use mock_backend::{Latency, MockBackend};
pub use services::Services;
pub use types::*;
