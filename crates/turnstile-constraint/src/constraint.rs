//! The constraint policy layer.

use std::sync::Arc;

use turnstile_core::constants::BLOCKED_QUEUE_CAP;
use turnstile_core::models::{
    blocked_count, used_permits, Consumer, ConsumerContext, ConsumerId, ConsumerState,
    ConstraintId, ConstraintSpec, ConstraintUnit, RunnableConsumers,
};
use turnstile_core::{ConstraintError, ConstraintResult, RegistryError};
use turnstile_registry::ConstraintRegistry;

use crate::jitter::{RandomJitter, RetryJitter};
use crate::policy::{policy_for, PromotionFlow};

/// A named resource type with a fixed capacity and an admission policy.
///
/// Immutable once created: a constraint is `create`d exactly once and
/// thereafter only `load`ed, possibly by many processes at once. All shared
/// state lives in the registry; a `Constraint` value is just the spec plus
/// the algorithms that drive it, so cloning one is cheap and any number of
/// callers can hold one concurrently.
#[derive(Clone)]
pub struct Constraint {
    id: ConstraintId,
    spec: ConstraintSpec,
    jitter: Arc<dyn RetryJitter>,
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl Constraint {
    /// Register a new constraint. Fails with `UnableToSaveConstraint` when
    /// the id is already taken; `load` it instead in that case.
    pub async fn create(
        id: ConstraintId,
        spec: ConstraintSpec,
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<Self> {
        match registry.save(&id, &spec).await {
            Ok(()) => {
                tracing::info!(
                    constraint_id = %id,
                    strategy = %spec.strategy,
                    limits = spec.limits,
                    "Constraint created"
                );
                Ok(Self::assemble(id, spec))
            }
            Err(RegistryError::ConstraintAlreadyExists(_)) => {
                Err(ConstraintError::UnableToSaveConstraint(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load an existing constraint by id.
    pub async fn load(
        id: ConstraintId,
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<Self> {
        match registry.load(&id).await? {
            Some(spec) => Ok(Self::assemble(id, spec)),
            None => Err(ConstraintError::UnableToLoadConstraint(id)),
        }
    }

    fn assemble(id: ConstraintId, spec: ConstraintSpec) -> Self {
        Self {
            id,
            spec,
            jitter: Arc::new(RandomJitter),
        }
    }

    /// Swap the retry jitter source. Tests inject [`NoJitter`](crate::jitter::NoJitter)
    /// to make the registration loop deterministic.
    pub fn with_jitter(mut self, jitter: Arc<dyn RetryJitter>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn id(&self) -> &ConstraintId {
        &self.id
    }

    pub fn spec(&self) -> &ConstraintSpec {
        &self.spec
    }

    /// Request `permits` permits of `unit` and commit the resulting consumer.
    ///
    /// The returned state tells the caller what to do next: proceed on
    /// `Active`, park and wait for promotion on `Blocked`, fail fast on
    /// `Rejected`.
    ///
    /// The commit is optimistic: occupancy is read, the admission decision is
    /// computed against that snapshot, and the registry only appends if the
    /// snapshot still holds. A lost race re-reads and retries after a short
    /// jittered pause, until the registry's retry governor calls a halt
    /// (`UnableToRegisterConsumer`).
    #[tracing::instrument(
        skip_all,
        fields(constraint_id = %self.id, unit = %unit, consumer_id = %consumer_id, permits = permits)
    )]
    pub async fn register_consumer(
        &self,
        unit: &ConstraintUnit,
        consumer_id: ConsumerId,
        permits: u32,
        mut context: ConsumerContext,
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<ConsumerState> {
        if permits == 0 || permits > self.spec.limits {
            return Err(ConstraintError::InvalidPermits {
                requested: permits,
                limits: self.spec.limits,
            });
        }

        let policy = policy_for(self.spec.strategy);
        loop {
            let consumers = registry.load_consumers(&self.id, unit).await?;
            let used = used_permits(&consumers);

            let mut state = policy.admission_state(&self.spec, &consumers, used, permits);
            if context.enforce_queue_cap && blocked_count(&consumers) >= BLOCKED_QUEUE_CAP {
                state = ConsumerState::Rejected;
            }

            let consumer = Consumer::new(consumer_id.clone(), permits, state, context.clone());

            if state == ConsumerState::Blocked {
                self.check_satisfiable(&consumer, &consumers, registry)?;
            }

            if registry
                .register_consumer(&self.id, unit, consumer, used)
                .await?
            {
                tracing::debug!(state = %state, used_permits = used, "Consumer registered");
                return Ok(state);
            }

            // Lost the race: another writer changed the unit's occupancy
            // between the read and the conditional append.
            if !registry
                .adjust_register_consumer_context(&self.id, &mut context)
                .await?
            {
                return Err(ConstraintError::UnableToRegisterConsumer(consumer_id));
            }
            tracing::debug!("Occupancy changed concurrently, retrying registration");
            self.jitter.pause().await;
        }
    }

    /// A consumer about to wait must be satisfiable at all: summed with every
    /// other consumer in an overlapping scope, its demand has to fit the
    /// limit, or the wait can never resolve no matter what unrelated
    /// consumers do.
    fn check_satisfiable(
        &self,
        candidate: &Consumer,
        consumers: &[Consumer],
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<()> {
        let mut demand = candidate.permits;
        for other in consumers {
            if registry.overlapping_scope(candidate, other) {
                demand += other.permits;
            }
        }
        if demand > self.spec.limits {
            return Err(ConstraintError::PermanentlyBlockedConsumer {
                consumer_id: candidate.id.clone(),
                demand,
                limits: self.spec.limits,
            });
        }
        Ok(())
    }

    /// Promote a blocked consumer. Returns whether the `Blocked -> Active`
    /// swap took effect; `false` means someone else already moved it (or it
    /// never existed), which a polling orchestrator treats as "nothing to
    /// do".
    #[tracing::instrument(
        skip_all,
        fields(constraint_id = %self.id, unit = %unit, consumer_id = %consumer_id)
    )]
    pub async fn consumer_unblocked(
        &self,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        context: &ConsumerContext,
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<bool> {
        let promoted = registry
            .consumer_unblocked(&self.id, unit, consumer_id, context)
            .await?;
        if promoted {
            tracing::debug!("Consumer promoted");
        }
        Ok(promoted)
    }

    /// Release a consumer's permits. Returns whether the
    /// `Active -> Finished` swap took effect. Meant to be called by the same
    /// layer that issued the registration, when the admitted work completes.
    #[tracing::instrument(
        skip_all,
        fields(constraint_id = %self.id, unit = %unit, consumer_id = %consumer_id)
    )]
    pub async fn consumer_finished(
        &self,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<bool> {
        let finished = registry
            .consumer_finished(&self.id, unit, consumer_id, &ConsumerContext::default())
            .await?;
        if finished {
            tracing::debug!("Consumer finished, permits released");
        }
        Ok(finished)
    }

    /// Which blocked consumers of `unit` could run right now.
    ///
    /// Scans in submission order, fitting each blocked consumer against the
    /// remaining capacity. Under FIFO the first consumer that does not fit
    /// ends the scan (head-of-line blocking); under ASAP it is skipped and
    /// later, smaller consumers may still be picked. The result is a pure
    /// computation: the caller promotes each returned id via
    /// [`consumer_unblocked`](Self::consumer_unblocked).
    #[tracing::instrument(skip_all, fields(constraint_id = %self.id, unit = %unit))]
    pub async fn runnable_consumers(
        &self,
        unit: &ConstraintUnit,
        registry: &dyn ConstraintRegistry,
    ) -> ConstraintResult<RunnableConsumers> {
        let consumers = registry.load_consumers(&self.id, unit).await?;
        let policy = policy_for(self.spec.strategy);

        let occupancy = used_permits(&consumers);
        // running total the fit test is made against, counting the
        // promotions this scan has already picked
        let mut used = occupancy;
        let mut consumer_ids = Vec::new();
        for consumer in consumers.iter().filter(|c| c.is_blocked()) {
            if self.spec.limits.saturating_sub(used) < consumer.permits {
                match policy.when_blocked_does_not_fit() {
                    PromotionFlow::Stop => break,
                    PromotionFlow::SkipOne => continue,
                }
            }
            consumer_ids.push(consumer.id.clone());
            used += consumer.permits;
        }

        tracing::trace!(
            runnable = consumer_ids.len(),
            used_permits = occupancy,
            "Computed runnable consumers"
        );
        Ok(RunnableConsumers {
            used_permits: occupancy,
            consumer_ids,
        })
    }
}
