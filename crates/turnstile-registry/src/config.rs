//! Configuration for the reference registry backend.

use std::env;

const DEFAULT_REGISTER_RETRY_BUDGET: u32 = 100;

/// Tunables for [`InMemoryRegistry`](crate::memory::InMemoryRegistry).
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How many times a single registration may retry after losing the
    /// optimistic compare-and-swap before the registry tells it to give up.
    pub register_retry_budget: u32,
}

impl RegistryConfig {
    /// Read configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `TURNSTILE_REGISTER_RETRY_BUDGET`.
    pub fn from_env() -> Self {
        let register_retry_budget = env::var("TURNSTILE_REGISTER_RETRY_BUDGET")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REGISTER_RETRY_BUDGET);

        Self {
            register_retry_budget,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            register_retry_budget: DEFAULT_REGISTER_RETRY_BUDGET,
        }
    }
}
