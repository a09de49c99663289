//! In-memory backend used by the demo binary and the tests.
//!
//! Implements every collaborator trait against fixed catalogs, with a
//! configurable simulated network latency.

use crate::error::ServiceError;
use crate::services::{AuthService, CatalogService, OrderService, ServiceFuture};
use crate::types::{
    AuthSession, AuthToken, CartLine, DeliveryInfo, Money, Namespace, Order, OrderId, OrderStatus,
    Product, ProductId, TrackingSnapshot, User, UserId, lines_total,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use storefront_core::environment::{Clock, SystemClock};

/// Simulated network latency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Latency {
    /// A per-call delay resembling a real mobile backend
    Realistic,
    /// The same delay for every call
    Fixed(Duration),
}

impl Latency {
    /// No delay at all
    pub const NONE: Self = Self::Fixed(Duration::ZERO);

    fn for_call(self, call: Call) -> Duration {
        match self {
            Self::Fixed(delay) => delay,
            Self::Realistic => Duration::from_millis(match call {
                Call::Login => 1200,
                Call::Signup => 1500,
                Call::Logout => 500,
                Call::GroceryCatalog => 800,
                Call::ApartmentCatalog => 1000,
                Call::Product => 600,
                Call::SubmitOrder => 2000,
                Call::OrderHistory => 1000,
                Call::TrackOrder => 800,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Call {
    Login,
    Signup,
    Logout,
    GroceryCatalog,
    ApartmentCatalog,
    Product,
    SubmitOrder,
    OrderHistory,
    TrackOrder,
}

/// Mock storefront backend
#[derive(Clone)]
pub struct MockBackend {
    clock: Arc<dyn Clock>,
    latency: Latency,
    order_seq: Arc<AtomicU64>,
}

impl MockBackend {
    /// Creates a backend with the system clock and realistic latency
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), Latency::Realistic)
    }

    /// Creates a backend with an injected clock and latency
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, latency: Latency) -> Self {
        Self {
            clock,
            latency,
            order_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn delay(&self, call: Call) -> Duration {
        self.latency.for_call(call)
    }

    fn catalog(namespace: Namespace) -> Vec<Product> {
        match namespace {
            Namespace::Grocery => grocery_products(),
            Namespace::Apartment => apartment_food(),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("latency", &self.latency)
            .field("orders_placed", &self.order_seq.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn grocery_products() -> Vec<Product> {
    let item = |id: &str, name: &str, category: &str, price: Money, description: &str, seller: &str| {
        Product::new(id, name, category, price)
            .with_description(description)
            .with_image(format!("https://via.placeholder.com/200?text={}", image_text(name)))
            .with_seller(seller)
    };

    vec![
        item("g1", "Organic Apples", "fruits", Money::from_minor(499), "Fresh organic apples from local farms", "Fresh Farms Co."),
        item("g2", "Whole Wheat Bread", "bakery", Money::from_minor(299), "Freshly baked whole wheat bread", "Daily Bakery"),
        item("g3", "Organic Milk", "dairy", Money::from_minor(349), "Pure organic milk from grass-fed cows", "Dairy Delights"),
        item("g4", "Cheddar Cheese", "dairy", Money::from_minor(699), "Aged cheddar cheese block", "Dairy Delights"),
        item("g5", "Spinach Bundle", "vegetables", Money::from_minor(249), "Fresh spinach greens", "Fresh Farms Co."),
        item("g6", "Tomatoes", "vegetables", Money::from_minor(399), "Ripe red tomatoes", "Fresh Farms Co."),
    ]
}

fn apartment_food() -> Vec<Product> {
    let dish = |id: &str,
                name: &str,
                category: &str,
                price: Money,
                description: &str,
                prepare: &str,
                store: &str,
                rating: f32| {
        Product::new(id, name, category, price)
            .with_description(description)
            .with_image(format!("https://via.placeholder.com/200?text={}", image_text(name)))
            .with_store(store, prepare, rating)
    };

    vec![
        dish("f1", "Margherita Pizza", "pizza", Money::from_minor(1299), "Classic margherita pizza with fresh basil", "30 mins", "Pizza Palace", 4.5),
        dish("f2", "Chicken Biryani", "indian", Money::from_minor(1099), "Aromatic basmati rice with tender chicken", "35 mins", "Spice Route", 4.7),
        dish("f3", "Pad Thai", "asian", Money::from_minor(999), "Stir-fried noodles with shrimp and vegetables", "25 mins", "Thai Express", 4.4),
        dish("f4", "Burger Deluxe", "burgers", Money::from_minor(1199), "Double patty burger with cheese and bacon", "20 mins", "Burger House", 4.6),
        dish("f5", "Sushi Roll Combo", "sushi", Money::from_minor(1499), "Assorted fresh sushi rolls", "15 mins", "Sushi Bay", 4.8),
        dish("f6", "Caesar Salad", "salads", Money::from_minor(799), "Fresh romaine with parmesan and croutons", "10 mins", "Healthy Kitchen", 4.3),
    ]
}

/// Placeholder image text for a product name
fn image_text(name: &str) -> String {
    name.replace(' ', "+")
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl CatalogService for MockBackend {
    fn fetch_catalog(&self, namespace: Namespace) -> ServiceFuture<Vec<Product>> {
        let delay = self.delay(match namespace {
            Namespace::Grocery => Call::GroceryCatalog,
            Namespace::Apartment => Call::ApartmentCatalog,
        });
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            let products = Self::catalog(namespace);
            tracing::debug!(%namespace, count = products.len(), "Mock catalog served");
            Ok(products)
        })
    }

    fn product_by_id(&self, namespace: Namespace, id: ProductId) -> ServiceFuture<Product> {
        let delay = self.delay(Call::Product);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Self::catalog(namespace)
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))
        })
    }
}

impl OrderService for MockBackend {
    fn submit_order(&self, lines: Vec<CartLine>, delivery: DeliveryInfo) -> ServiceFuture<Order> {
        let delay = self.delay(Call::SubmitOrder);
        let clock = Arc::clone(&self.clock);
        let order_seq = Arc::clone(&self.order_seq);
        Box::pin(async move {
            tokio::time::sleep(delay).await;

            if lines.is_empty() {
                return Err(ServiceError::validation("Cart is empty"));
            }

            let now = clock.now();
            let seq = order_seq.fetch_add(1, Ordering::Relaxed);
            let order = Order {
                id: OrderId::new(format!("order_{}_{seq}", now.timestamp_millis())),
                total_price: lines_total(&lines),
                lines,
                delivery: Some(delivery),
                status: OrderStatus::Confirmed,
                created_at: now,
                estimated_delivery: Some(now + chrono::Duration::minutes(30)),
            };

            tracing::info!(
                order_id = %order.id,
                total = %order.total_price,
                "Mock order created"
            );
            Ok(order)
        })
    }

    fn fetch_order_history(&self, user_id: UserId) -> ServiceFuture<Vec<Order>> {
        let delay = self.delay(Call::OrderHistory);
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            tokio::time::sleep(delay).await;

            let now = clock.now();
            let grocery = grocery_products();
            let apartment = apartment_food();
            let delivered = |id: &str, lines: Vec<CartLine>, days_ago: i64| Order {
                id: OrderId::new(id),
                total_price: lines_total(&lines),
                lines,
                delivery: None,
                status: OrderStatus::Delivered,
                created_at: now - chrono::Duration::days(days_ago),
                estimated_delivery: None,
            };

            let mut history = Vec::with_capacity(2);
            if let [apples, bread, ..] = grocery.as_slice() {
                history.push(delivered(
                    "order_2",
                    vec![CartLine::new(apples.clone(), 2), CartLine::new(bread.clone(), 1)],
                    3,
                ));
            }
            if let Some(pizza) = apartment.first() {
                history.push(delivered("order_1", vec![CartLine::new(pizza.clone(), 1)], 7));
            }

            tracing::debug!(%user_id, count = history.len(), "Mock order history served");
            Ok(history)
        })
    }

    fn track_order(&self, order_id: OrderId) -> ServiceFuture<TrackingSnapshot> {
        let delay = self.delay(Call::TrackOrder);
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(TrackingSnapshot {
                order_id,
                status: OrderStatus::InTransit,
                current_location: "On the way".to_string(),
                estimated_arrival: clock.now() + chrono::Duration::minutes(15),
            })
        })
    }
}

impl AuthService for MockBackend {
    fn login(&self, email: String, password: String) -> ServiceFuture<AuthSession> {
        let delay = self.delay(Call::Login);
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            tokio::time::sleep(delay).await;

            if is_blank(&email) || is_blank(&password) {
                return Err(ServiceError::validation("Email and password are required"));
            }

            let name = email.split('@').next().unwrap_or_default().to_string();
            Ok(AuthSession {
                user: User {
                    id: UserId::new("user_123"),
                    email,
                    name,
                    phone: Some("+1234567890".to_string()),
                },
                token: AuthToken::new(format!("mock_jwt_token_{}", clock.now().timestamp_millis())),
            })
        })
    }

    fn signup(
        &self,
        email: String,
        password: String,
        name: String,
        phone: Option<String>,
    ) -> ServiceFuture<AuthSession> {
        let delay = self.delay(Call::Signup);
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            tokio::time::sleep(delay).await;

            if is_blank(&email) || is_blank(&password) || is_blank(&name) {
                return Err(ServiceError::validation("Email, password and name are required"));
            }

            let millis = clock.now().timestamp_millis();
            Ok(AuthSession {
                user: User {
                    id: UserId::new(format!("user_{millis}")),
                    email,
                    name,
                    phone,
                },
                token: AuthToken::new(format!("mock_jwt_token_{millis}")),
            })
        })
    }

    fn logout(&self) -> ServiceFuture<()> {
        let delay = self.delay(Call::Logout);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("Mock logout acknowledged");
            Ok(())
        })
    }
}
