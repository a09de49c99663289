//! Core domain types for the storefront.
//!
//! Products come from one of two catalogs (namespaces). Each namespace has its
//! own cart; checking a cart out produces an [`Order`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// One of the two fixed catalog/cart partitions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Grocery shopping
    #[default]
    Grocery,
    /// Peer-to-peer apartment food
    Apartment,
}

impl Namespace {
    /// Both namespaces, in display order
    pub const ALL: [Self; 2] = [Self::Grocery, Self::Apartment];

    /// Lowercase name used in logs and config
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grocery => "grocery",
            Self::Apartment => "apartment",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grocery" => Ok(Self::Grocery),
            "apartment" => Ok(Self::Apartment),
            other => Err(format!("unknown namespace: {other}")),
        }
    }
}

/// Unique identifier for a product
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new `ProductId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative decimal currency amount
///
/// Backed by [`Decimal`], so `4.99 × 3` is exactly `14.97`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a money amount from a decimal
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a money amount from minor units (hundredths)
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// Returns the decimal amount
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true for a zero amount
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiplies the amount by a quantity, saturating at [`Decimal::MAX`]
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
        )
    }
}

/// Saturates at [`Decimal::MAX`] instead of overflowing
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Immutable catalog entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Category used by the catalog filter
    pub category: String,
    /// Unit price
    pub price: Money,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Seller (grocery catalog)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    /// Store name (apartment catalog)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Preparation time, e.g. "30 mins" (apartment catalog)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare_time: Option<String>,
    /// Average rating out of 5 (apartment catalog)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl Product {
    /// Creates a product with the required fields
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Money,
    ) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.into(),
            category: category.into(),
            price,
            description: String::new(),
            image: None,
            seller: None,
            store: None,
            prepare_time: None,
            rating: None,
        }
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the image URL
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the grocery seller
    #[must_use]
    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.seller = Some(seller.into());
        self
    }

    /// Sets the apartment-food store details
    #[must_use]
    pub fn with_store(
        mut self,
        store: impl Into<String>,
        prepare_time: impl Into<String>,
        rating: f32,
    ) -> Self {
        self.store = Some(store.into());
        self.prepare_time = Some(prepare_time.into());
        self.rating = Some(rating);
        self
    }
}

/// One product + quantity pairing within a cart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product
    pub product: Product,
    /// Quantity, always at least 1
    pub quantity: u32,
}

impl CartLine {
    /// Creates a line, raising a zero quantity to 1
    #[must_use]
    pub fn new(product: Product, quantity: u32) -> Self {
        Self {
            product,
            quantity: quantity.max(1),
        }
    }

    /// Price × quantity for this line
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// Sum of price × quantity over lines
pub fn lines_total(lines: &[CartLine]) -> Money {
    lines.iter().map(CartLine::subtotal).sum()
}

/// Cart for one namespace
///
/// `total_items` and `total_price` are derived: every mutation goes through
/// [`Cart::recompute_totals`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in insertion order
    pub lines: Vec<CartLine>,
    /// Sum of line quantities
    pub total_items: u64,
    /// Sum of line subtotals
    pub total_price: Money,
}

impl Cart {
    /// Creates an empty cart
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line for a product
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product.id == product_id)
    }

    pub(crate) fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| &l.product.id == product_id)
    }

    /// Recompute both totals from the current lines
    pub fn recompute_totals(&mut self) {
        self.total_items = self.lines.iter().map(|l| u64::from(l.quantity)).sum();
        self.total_price = lines_total(&self.lines);
    }

    /// Remove every line and zero the totals
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recompute_totals();
    }
}

/// Unique identifier for an order
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new `OrderId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Accepted by the backend
    Confirmed,
    /// On its way
    InTransit,
    /// Handed over
    Delivered,
    /// Cancelled
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::InTransit => write!(f, "in-transit"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Delivery metadata attached to an order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    /// Delivery address
    pub address: String,
    /// Contact phone
    pub phone: String,
    /// Free-form instructions for the courier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A placed order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Cart lines at submission time
    pub lines: Vec<CartLine>,
    /// Delivery metadata, absent on some historical orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryInfo>,
    /// Current status
    pub status: OrderStatus,
    /// Sum of price × quantity over `lines`
    pub total_price: Money,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Estimated delivery time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl Order {
    /// Number of units across all lines
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// Transient tracking information for an order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    /// Tracked order
    pub order_id: OrderId,
    /// Status reported by the tracker
    pub status: OrderStatus,
    /// Human-readable location
    pub current_location: String,
    /// Estimated arrival
    pub estimated_arrival: DateTime<Utc>,
}

/// Unique identifier for a user
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub id: UserId,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Opaque credential returned by the auth collaborator
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a raw token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Result of a successful login or signup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// The user
    pub user: User,
    /// Their credential
    pub token: AuthToken,
}

/// Sequence number of an issued request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a request id from its sequence number
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the sequence number
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-class request fence
///
/// Issues monotonically increasing [`RequestId`]s. Only a resolution tagged
/// with the latest issued id may be applied; older ones are stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFence {
    latest: RequestId,
}

impl RequestFence {
    /// Issue the next request id
    pub fn issue(&mut self) -> RequestId {
        self.latest = RequestId(self.latest.0 + 1);
        self.latest
    }

    /// Latest issued id (`RequestId::default()` before the first request)
    #[must_use]
    pub const fn latest(&self) -> RequestId {
        self.latest
    }

    /// True when `request` is the latest issued id
    #[must_use]
    pub fn is_current(&self, request: RequestId) -> bool {
        request.0 != 0 && request == self.latest
    }
}
