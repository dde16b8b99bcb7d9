//! Shared test doubles for the constraint layer.
//!
//! Both wrappers delegate to an [`InMemoryRegistry`] and bend exactly one
//! part of the port contract: `ScopeAwareRegistry` supplies a meaningful
//! `overlapping_scope` (the reference backend opts out), and
//! `ConflictingRegistry` makes the conditional append lose a configurable
//! number of races so the retry loop can be driven deterministically.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use turnstile_core::models::{
    Consumer, ConsumerContext, ConsumerId, ConstraintId, ConstraintSpec, ConstraintUnit,
};
use turnstile_core::RegistryResult;
use turnstile_registry::{ConstraintRegistry, InMemoryRegistry};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Registry that treats two consumers as overlapping when both carry the
/// same scope descriptor and the other side is still in line or running:
/// one reasonable definition of "same pipeline execution".
pub struct ScopeAwareRegistry {
    inner: InMemoryRegistry,
}

impl ScopeAwareRegistry {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRegistry::new(),
        }
    }
}

#[async_trait]
impl ConstraintRegistry for ScopeAwareRegistry {
    async fn save(&self, id: &ConstraintId, spec: &ConstraintSpec) -> RegistryResult<()> {
        self.inner.save(id, spec).await
    }

    async fn load(&self, id: &ConstraintId) -> RegistryResult<Option<ConstraintSpec>> {
        self.inner.load(id).await
    }

    async fn load_consumers(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> RegistryResult<Vec<Consumer>> {
        self.inner.load_consumers(id, unit).await
    }

    async fn register_consumer(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer: Consumer,
        expected_used_permits: u32,
    ) -> RegistryResult<bool> {
        self.inner
            .register_consumer(id, unit, consumer, expected_used_permits)
            .await
    }

    async fn adjust_register_consumer_context(
        &self,
        id: &ConstraintId,
        context: &mut ConsumerContext,
    ) -> RegistryResult<bool> {
        self.inner.adjust_register_consumer_context(id, context).await
    }

    async fn consumer_unblocked(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
    ) -> RegistryResult<bool> {
        self.inner
            .consumer_unblocked(id, unit, consumer_id, context)
            .await
    }

    async fn consumer_finished(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
    ) -> RegistryResult<bool> {
        self.inner
            .consumer_finished(id, unit, consumer_id, context)
            .await
    }

    fn overlapping_scope(&self, consumer: &Consumer, other: &Consumer) -> bool {
        if other.state.is_terminal() {
            return false;
        }
        match (&consumer.context.scope, &other.context.scope) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Registry whose conditional append loses the first `failures` races, then
/// behaves normally. `ConflictingRegistry::always(...)` never stops losing,
/// which drives the retry loop into the registry's budget.
pub struct ConflictingRegistry {
    inner: InMemoryRegistry,
    failures_left: AtomicU64,
    pub attempts: AtomicU64,
}

impl ConflictingRegistry {
    pub fn failing(inner: InMemoryRegistry, failures: u64) -> Self {
        Self {
            inner,
            failures_left: AtomicU64::new(failures),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn always(inner: InMemoryRegistry) -> Self {
        Self::failing(inner, u64::MAX)
    }
}

#[async_trait]
impl ConstraintRegistry for ConflictingRegistry {
    async fn save(&self, id: &ConstraintId, spec: &ConstraintSpec) -> RegistryResult<()> {
        self.inner.save(id, spec).await
    }

    async fn load(&self, id: &ConstraintId) -> RegistryResult<Option<ConstraintSpec>> {
        self.inner.load(id).await
    }

    async fn load_consumers(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> RegistryResult<Vec<Consumer>> {
        self.inner.load_consumers(id, unit).await
    }

    async fn register_consumer(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer: Consumer,
        expected_used_permits: u32,
    ) -> RegistryResult<bool> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let lost = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if lost {
            return Ok(false);
        }
        self.inner
            .register_consumer(id, unit, consumer, expected_used_permits)
            .await
    }

    async fn adjust_register_consumer_context(
        &self,
        id: &ConstraintId,
        context: &mut ConsumerContext,
    ) -> RegistryResult<bool> {
        self.inner.adjust_register_consumer_context(id, context).await
    }

    async fn consumer_unblocked(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
    ) -> RegistryResult<bool> {
        self.inner
            .consumer_unblocked(id, unit, consumer_id, context)
            .await
    }

    async fn consumer_finished(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
    ) -> RegistryResult<bool> {
        self.inner
            .consumer_finished(id, unit, consumer_id, context)
            .await
    }

    fn overlapping_scope(&self, consumer: &Consumer, other: &Consumer) -> bool {
        self.inner.overlapping_scope(consumer, other)
    }
}
