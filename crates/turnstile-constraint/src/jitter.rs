//! Retry pause source for the registration loop.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Upper bound of the pause between lost compare-and-swap attempts.
const MAX_RETRY_JITTER_MS: u64 = 10;

/// Source of the pause inserted between optimistic-retry attempts.
///
/// Injected into [`Constraint`](crate::constraint::Constraint) rather than
/// drawn from process-global state so that retry behavior is deterministic
/// under test.
#[async_trait]
pub trait RetryJitter: Send + Sync {
    async fn pause(&self);
}

/// Default jitter: a uniform random 0–10 ms sleep, spreading racing writers
/// apart so they stop colliding on the same occupancy witness.
#[derive(Debug, Clone, Default)]
pub struct RandomJitter;

#[async_trait]
impl RetryJitter for RandomJitter {
    async fn pause(&self) {
        let delay_ms = rand::rng().random_range(0..=MAX_RETRY_JITTER_MS);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

/// Zero-delay source for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct NoJitter;

#[async_trait]
impl RetryJitter for NoJitter {
    async fn pause(&self) {}
}
