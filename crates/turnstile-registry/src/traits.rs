//! Registry abstraction trait
//!
//! This module defines the `ConstraintRegistry` trait that all registry
//! backends must implement. The trait carries two distinct concerns on one
//! port: plain storage (`save`, `load`, `load_consumers`) and the
//! optimistic-concurrency primitives (`register_consumer`'s expected-count
//! witness and the state-transition swaps). A relational backend satisfies
//! the latter with a conditional `UPDATE ... WHERE`, a document store with a
//! version field, the in-process reference backend with a single monitor:
//! whatever provides atomicity per (constraint, unit).

use async_trait::async_trait;
use turnstile_core::models::{
    Consumer, ConsumerContext, ConsumerId, ConstraintId, ConstraintSpec, ConstraintUnit,
};
use turnstile_core::RegistryResult;

/// Storage and atomic state-transition port for constraints.
///
/// Per (constraint, unit) the registry owns an ordered consumer list and is
/// the sole source of linearizability for it: every mutation below is atomic
/// and gated on an expected prior state, so racing writers are serialized by
/// the backend rather than by the callers.
///
/// The core never expires anything. A consumer that never finishes holds its
/// permits forever unless the backend implements lease/TTL eviction; that
/// boundary is deliberate and backends for unreliable callers should sweep
/// abandoned consumers themselves.
#[async_trait]
pub trait ConstraintRegistry: Send + Sync {
    /// Persist a new constraint spec. Create-once semantics: fails with
    /// `RegistryError::ConstraintAlreadyExists` if the id is taken.
    async fn save(&self, id: &ConstraintId, spec: &ConstraintSpec) -> RegistryResult<()>;

    /// Fetch a constraint spec, or `None` if the id was never saved.
    async fn load(&self, id: &ConstraintId) -> RegistryResult<Option<ConstraintSpec>>;

    /// The unit's consumer list in submission order. Empty for a unit that
    /// has never seen a registration.
    async fn load_consumers(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> RegistryResult<Vec<Consumer>>;

    /// Atomically append `consumer` to the unit's list, but only if the
    /// unit's current active-permit total still equals
    /// `expected_used_permits`. Returns `Ok(false)` when the witness no
    /// longer matches (another writer changed occupancy first); the caller
    /// re-reads and retries.
    async fn register_consumer(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer: Consumer,
        expected_used_permits: u32,
    ) -> RegistryResult<bool>;

    /// Retry governor for the registration loop. Called after every lost
    /// compare-and-swap; returning `Ok(false)` tells the caller to stop
    /// retrying and fail the registration. The backend may mutate `context`
    /// (e.g. keep an attempt counter in its `extra` map) to implement a
    /// retry budget or refresh caller-scoped data.
    async fn adjust_register_consumer_context(
        &self,
        id: &ConstraintId,
        context: &mut ConsumerContext,
    ) -> RegistryResult<bool>;

    /// Atomic `Blocked -> Active` transition. Returns `Ok(false)` without
    /// mutating anything when the consumer is missing or not `Blocked`.
    async fn consumer_unblocked(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
    ) -> RegistryResult<bool>;

    /// Atomic `Active -> Finished` transition. Returns `Ok(false)` without
    /// mutating anything when the consumer is missing or not `Active`.
    async fn consumer_finished(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
    ) -> RegistryResult<bool>;

    /// Whether two consumers wait under the same release scope, for the
    /// permanently-blocked check. There is no generic definition: each
    /// backend must decide what overlap means in its domain (an overly
    /// narrow predicate misses real deadlocks, an overly broad one rejects
    /// satisfiable requests). Returning `false` opts out of deadlock
    /// detection entirely.
    fn overlapping_scope(&self, consumer: &Consumer, other: &Consumer) -> bool;
}
