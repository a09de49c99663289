//! Per-namespace shopping carts.
//!
//! Pure and synchronous: the cart reducer never returns effects.

use crate::types::{Cart, CartLine, Namespace, Product, ProductId};
use serde::{Deserialize, Serialize};
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer};

/// Both carts
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    /// Grocery cart
    pub grocery: Cart,
    /// Apartment-food cart
    pub apartment: Cart,
}

impl CartState {
    /// Cart for a namespace
    #[must_use]
    pub const fn cart(&self, namespace: Namespace) -> &Cart {
        match namespace {
            Namespace::Grocery => &self.grocery,
            Namespace::Apartment => &self.apartment,
        }
    }

    /// Mutable cart for a namespace
    pub const fn cart_mut(&mut self, namespace: Namespace) -> &mut Cart {
        match namespace {
            Namespace::Grocery => &mut self.grocery,
            Namespace::Apartment => &mut self.apartment,
        }
    }
}

/// Cart intents
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CartAction {
    /// Add a product, merging with an existing line
    AddToCart {
        /// Target cart
        namespace: Namespace,
        /// Product to add
        product: Product,
        /// Units to add; values below 1 are raised to 1
        quantity: i64,
    },
    /// Remove a product's line
    RemoveFromCart {
        /// Target cart
        namespace: Namespace,
        /// Product to remove
        product_id: ProductId,
    },
    /// Set a line's quantity, floored at 1
    UpdateQuantity {
        /// Target cart
        namespace: Namespace,
        /// Product whose line changes
        product_id: ProductId,
        /// New quantity
        quantity: i64,
    },
    /// Empty a cart
    ClearCart {
        /// Target cart
        namespace: Namespace,
    },
}

/// Clamp a requested quantity into the valid line range
fn floor_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(1)).unwrap_or(u32::MAX)
}

/// Reducer for [`CartState`]
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new `CartReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::AddToCart {
                namespace,
                product,
                quantity,
            } => {
                if quantity < 1 {
                    tracing::warn!(
                        %namespace,
                        product_id = %product.id,
                        quantity,
                        "Non-positive quantity added to cart, using 1"
                    );
                }
                let quantity = floor_quantity(quantity);
                let cart = state.cart_mut(namespace);

                match cart.line_mut(&product.id) {
                    Some(line) => line.quantity = line.quantity.saturating_add(quantity),
                    None => cart.lines.push(CartLine::new(product, quantity)),
                }
                cart.recompute_totals();
            },
            CartAction::RemoveFromCart {
                namespace,
                product_id,
            } => {
                let cart = state.cart_mut(namespace);
                cart.lines.retain(|line| line.product.id != product_id);
                cart.recompute_totals();
            },
            CartAction::UpdateQuantity {
                namespace,
                product_id,
                quantity,
            } => {
                let cart = state.cart_mut(namespace);
                if let Some(line) = cart.line_mut(&product_id) {
                    line.quantity = floor_quantity(quantity);
                }
                cart.recompute_totals();
            },
            CartAction::ClearCart { namespace } => {
                state.cart_mut(namespace).clear();
            },
        }

        SmallVec::new()
    }
}
