//! In-process reference registry.
//!
//! The minimum viable backend: every constraint lives in one map guarded by
//! a single coarse lock, and the compare-and-swap contract is satisfied by
//! re-checking state under that lock, the in-process analogue of a
//! database `UPDATE ... WHERE version = ?` conditional write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use turnstile_core::models::{
    used_permits, Consumer, ConsumerContext, ConsumerId, ConsumerState, ConstraintId,
    ConstraintSpec, ConstraintUnit,
};
use turnstile_core::{RegistryError, RegistryResult};

use crate::config::RegistryConfig;
use crate::traits::ConstraintRegistry;

/// Key under which the registration attempt counter is kept in
/// `ConsumerContext::extra`.
const REGISTER_ATTEMPTS_KEY: &str = "register_attempts";

struct StoredConstraint {
    spec: ConstraintSpec,
    units: HashMap<ConstraintUnit, Vec<Consumer>>,
}

#[derive(Default)]
struct RegistryState {
    constraints: HashMap<ConstraintId, StoredConstraint>,
}

/// Reference [`ConstraintRegistry`] for single-process use.
///
/// All state sits behind one `tokio::sync::Mutex`, which makes every
/// operation trivially atomic per process. `overlapping_scope` always
/// returns `false`: the reference backend opts out of deadlock detection,
/// and real backends must supply a domain-meaningful predicate.
///
/// Consumers are never evicted here; hosts that keep a registry alive for
/// long should reclaim spent entries with [`prune_terminal`](Self::prune_terminal).
#[derive(Clone)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
    register_retry_budget: u32,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            register_retry_budget: config.register_retry_budget,
        }
    }

    /// Drop `Finished` and `Rejected` consumers from a unit's list and
    /// return how many were removed. Terminal consumers hold no permits and
    /// block nobody; they are kept only as a record until pruned.
    pub async fn prune_terminal(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> RegistryResult<usize> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.constraints.get_mut(id) else {
            return Ok(0);
        };
        let Some(consumers) = stored.units.get_mut(unit) else {
            return Ok(0);
        };

        let before = consumers.len();
        consumers.retain(|c| !c.state.is_terminal());
        let removed = before - consumers.len();
        if removed > 0 {
            tracing::debug!(
                constraint_id = %id,
                unit = %unit,
                removed = removed,
                "Pruned terminal consumers"
            );
        }
        Ok(removed)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the first consumer matching `consumer_id` in state `from` with a
/// copy in state `to`. A miss (absent consumer or wrong prior state) leaves
/// the list untouched and reports `false`.
fn transition(
    consumers: &mut [Consumer],
    consumer_id: &ConsumerId,
    from: ConsumerState,
    to: ConsumerState,
) -> bool {
    match consumers.iter_mut().find(|c| &c.id == consumer_id) {
        Some(consumer) if consumer.state == from => {
            let next = consumer.with_state(to);
            *consumer = next;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl ConstraintRegistry for InMemoryRegistry {
    async fn save(&self, id: &ConstraintId, spec: &ConstraintSpec) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        if state.constraints.contains_key(id) {
            return Err(RegistryError::ConstraintAlreadyExists(id.clone()));
        }
        state.constraints.insert(
            id.clone(),
            StoredConstraint {
                spec: *spec,
                units: HashMap::new(),
            },
        );
        tracing::debug!(constraint_id = %id, strategy = %spec.strategy, limits = spec.limits, "Constraint saved");
        Ok(())
    }

    async fn load(&self, id: &ConstraintId) -> RegistryResult<Option<ConstraintSpec>> {
        let state = self.state.lock().await;
        Ok(state.constraints.get(id).map(|stored| stored.spec))
    }

    async fn load_consumers(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> RegistryResult<Vec<Consumer>> {
        let state = self.state.lock().await;
        Ok(state
            .constraints
            .get(id)
            .and_then(|stored| stored.units.get(unit))
            .cloned()
            .unwrap_or_default())
    }

    async fn register_consumer(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer: Consumer,
        expected_used_permits: u32,
    ) -> RegistryResult<bool> {
        let mut state = self.state.lock().await;
        let stored = state
            .constraints
            .get_mut(id)
            .ok_or_else(|| RegistryError::ConstraintNotFound(id.clone()))?;
        let limits = stored.spec.limits;
        let consumers = stored.units.entry(unit.clone()).or_default();

        let actual = used_permits(consumers);
        if actual != expected_used_permits {
            tracing::trace!(
                constraint_id = %id,
                unit = %unit,
                consumer_id = %consumer.id,
                expected = expected_used_permits,
                actual = actual,
                "Register witness mismatch"
            );
            return Ok(false);
        }
        // The witness matched, but an Active append must still fit: the
        // invariant (active permits <= limits) holds for every committed
        // state, whoever the caller is.
        if consumer.is_active() && actual + consumer.permits > limits {
            return Ok(false);
        }

        tracing::trace!(
            constraint_id = %id,
            unit = %unit,
            consumer_id = %consumer.id,
            state = %consumer.state,
            permits = consumer.permits,
            "Consumer registered"
        );
        consumers.push(consumer);
        Ok(true)
    }

    async fn adjust_register_consumer_context(
        &self,
        id: &ConstraintId,
        context: &mut ConsumerContext,
    ) -> RegistryResult<bool> {
        let attempts = context
            .extra
            .get(REGISTER_ATTEMPTS_KEY)
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
            + 1;
        context
            .extra
            .insert(REGISTER_ATTEMPTS_KEY.to_owned(), attempts.into());

        if attempts > u64::from(self.register_retry_budget) {
            tracing::debug!(
                constraint_id = %id,
                attempts = attempts,
                budget = self.register_retry_budget,
                "Register retry budget exhausted"
            );
            return Ok(false);
        }
        Ok(true)
    }

    async fn consumer_unblocked(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        _context: &ConsumerContext,
    ) -> RegistryResult<bool> {
        let mut state = self.state.lock().await;
        let Some(consumers) = state
            .constraints
            .get_mut(id)
            .and_then(|stored| stored.units.get_mut(unit))
        else {
            return Ok(false);
        };
        Ok(transition(
            consumers,
            consumer_id,
            ConsumerState::Blocked,
            ConsumerState::Active,
        ))
    }

    async fn consumer_finished(
        &self,
        id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        _context: &ConsumerContext,
    ) -> RegistryResult<bool> {
        let mut state = self.state.lock().await;
        let Some(consumers) = state
            .constraints
            .get_mut(id)
            .and_then(|stored| stored.units.get_mut(unit))
        else {
            return Ok(false);
        };
        Ok(transition(
            consumers,
            consumer_id,
            ConsumerState::Active,
            ConsumerState::Finished,
        ))
    }

    fn overlapping_scope(&self, _consumer: &Consumer, _other: &Consumer) -> bool {
        false
    }
}
