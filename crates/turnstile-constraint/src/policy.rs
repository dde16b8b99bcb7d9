//! Admission policies.
//!
//! The strategy-specific rules live behind a small trait so the registration
//! and promotion loops in [`constraint`](crate::constraint) stay
//! policy-agnostic; a new fairness policy is a new implementation here, not
//! a new branch in the core loop.

use turnstile_core::models::{blocked_count, Consumer, ConsumerState, ConstraintSpec, Strategy};

/// What the promotion scan does when the next blocked consumer does not fit
/// the remaining capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionFlow {
    /// Stop the scan: nobody behind this consumer may be promoted this
    /// round.
    Stop,
    /// Skip this consumer and keep scanning later ones.
    SkipOne,
}

/// Strategy-specific admission rules.
pub trait AdmissionPolicy: Send + Sync {
    /// State assigned to a new registration given the unit's current
    /// consumer list and occupancy.
    fn admission_state(
        &self,
        spec: &ConstraintSpec,
        consumers: &[Consumer],
        used_permits: u32,
        requested: u32,
    ) -> ConsumerState;

    /// Scan behavior when a blocked consumer cannot be promoted.
    fn when_blocked_does_not_fit(&self) -> PromotionFlow;
}

/// Best-fit admission: a request runs whenever its permits fit the free
/// capacity, with no ordering fairness of any kind.
pub struct AsapPolicy;

impl AdmissionPolicy for AsapPolicy {
    fn admission_state(
        &self,
        spec: &ConstraintSpec,
        _consumers: &[Consumer],
        used_permits: u32,
        requested: u32,
    ) -> ConsumerState {
        if spec.limits.saturating_sub(used_permits) >= requested {
            ConsumerState::Active
        } else {
            ConsumerState::Blocked
        }
    }

    fn when_blocked_does_not_fit(&self) -> PromotionFlow {
        PromotionFlow::SkipOne
    }
}

/// Strict line-forming: once anyone is waiting, later arrivals queue behind
/// them even when they would individually fit.
pub struct FifoPolicy;

impl AdmissionPolicy for FifoPolicy {
    fn admission_state(
        &self,
        spec: &ConstraintSpec,
        consumers: &[Consumer],
        used_permits: u32,
        requested: u32,
    ) -> ConsumerState {
        if blocked_count(consumers) == 0 && spec.limits.saturating_sub(used_permits) >= requested {
            ConsumerState::Active
        } else {
            ConsumerState::Blocked
        }
    }

    fn when_blocked_does_not_fit(&self) -> PromotionFlow {
        PromotionFlow::Stop
    }
}

/// The policy backing a stored strategy.
pub fn policy_for(strategy: Strategy) -> &'static dyn AdmissionPolicy {
    match strategy {
        Strategy::Asap => &AsapPolicy,
        Strategy::Fifo => &FifoPolicy,
    }
}
