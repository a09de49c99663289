//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront state core.
//!
//! This crate provides:
//! - Deterministic clocks for reducers that stamp time
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Effect helpers to drive `Effect::Future` values without a Store
//!
//! ## Example
//!
//! ```ignore
//! use storefront_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(CartReducer::new())
//!     .with_env(())
//!     .given_state(CartState::default())
//!     .when_action(CartAction::ClearCart { namespace: Namespace::Grocery })
//!     .then_state(|state| assert!(state.cart(Namespace::Grocery).is_empty()))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every read
    ///
    /// Handy when a collaborator derives identifiers from the current time
    /// and a test needs them to differ.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: chrono::Duration,
    }

    impl SteppingClock {
        /// Create a clock starting at `start` that moves forward by `step`
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = match self.next.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use storefront_core::effect::Effect;

    /// Install a `tracing` subscriber for tests, honouring `RUST_LOG`
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }

    /// Drive every `Effect::Future` in `effects` and collect the produced actions
    ///
    /// Nested `Parallel`/`Sequential` effects are flattened in order.
    /// `Delay` effects yield their action without sleeping.
    pub async fn run_effects<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
        let mut pending: Vec<Effect<A>> = effects.into_iter().collect();
        pending.reverse();
        let mut actions = Vec::new();

        while let Some(effect) = pending.pop() {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    if let Some(action) = fut.await {
                        actions.push(action);
                    }
                },
                Effect::Delay { action, .. } => actions.push(*action),
                Effect::Parallel(inner) | Effect::Sequential(inner) => {
                    pending.extend(inner.into_iter().rev());
                },
            }
        }

        actions
    }
}

// Re-export commonly used items
pub use helpers::{init_test_tracing, run_effects};
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::effect::Effect;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_stepping_clock_advances() {
        let start = test_clock().now();
        let clock = SteppingClock::new(start, chrono::Duration::milliseconds(5));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + chrono::Duration::milliseconds(5));
    }

    #[tokio::test]
    async fn test_run_effects_flattens_in_order() {
        let effects = vec![
            Effect::future(async { 1 }),
            Effect::Sequential(vec![Effect::None, Effect::future(async { 2 })]),
            Effect::Delay {
                duration: std::time::Duration::from_secs(60),
                action: Box::new(3),
            },
        ];

        assert_eq!(run_effects(effects).await, vec![1, 2, 3]);
    }
}
