//! Configuration management for the storefront.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::formatters::RUPEE;
use crate::mock_backend::Latency;
use crate::orders::HistoryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Storefront configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Fixed mock backend latency in milliseconds (unset: realistic per-call delays)
    pub latency_ms: Option<u64>,
    /// Upper bound for each collaborator call, in milliseconds
    pub request_timeout_ms: u64,
    /// How fetched order history is applied
    pub history_policy: HistoryPolicy,
    /// Symbol used when formatting prices
    pub currency_symbol: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            latency_ms: None,
            request_timeout_ms: 10_000,
            history_policy: HistoryPolicy::Replace,
            currency_symbol: RUPEE.to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Unset or unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            latency_ms: lookup("STOREFRONT_LATENCY_MS").and_then(|s| s.parse().ok()),
            request_timeout_ms: lookup("STOREFRONT_REQUEST_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.request_timeout_ms),
            history_policy: lookup("STOREFRONT_HISTORY_POLICY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.history_policy),
            currency_symbol: lookup("STOREFRONT_CURRENCY_SYMBOL")
                .unwrap_or(defaults.currency_symbol),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            shutdown_timeout_ms: lookup("STOREFRONT_SHUTDOWN_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.shutdown_timeout_ms),
        }
    }

    /// Mock backend latency
    #[must_use]
    pub fn latency(&self) -> Latency {
        self.latency_ms
            .map_or(Latency::Realistic, |ms| Latency::Fixed(Duration::from_millis(ms)))
    }

    /// Collaborator call timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Graceful shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = StorefrontConfig::from_lookup(lookup(&[]));
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.latency(), Latency::Realistic);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.currency_symbol, "₹");
    }

    #[test]
    fn reads_every_knob() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("STOREFRONT_LATENCY_MS", "0"),
            ("STOREFRONT_REQUEST_TIMEOUT_MS", "250"),
            ("STOREFRONT_HISTORY_POLICY", "merge"),
            ("STOREFRONT_CURRENCY_SYMBOL", "Rs "),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.latency(), Latency::NONE);
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.history_policy, HistoryPolicy::Merge);
        assert_eq!(config.currency_symbol, "Rs ");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("STOREFRONT_LATENCY_MS", "fast"),
            ("STOREFRONT_REQUEST_TIMEOUT_MS", "0"),
            ("STOREFRONT_HISTORY_POLICY", "append"),
        ]));
        assert_eq!(config.latency_ms, None);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.history_policy, HistoryPolicy::Replace);
    }
}
