//! Turnstile Constraint Library
//!
//! The policy/algorithm layer of Turnstile: the [`Constraint`] type owns the
//! admission decision, the optimistic-retry registration protocol, and the
//! promotion algorithm. It depends on the registry only through the
//! `ConstraintRegistry` port, so the same logic drives an in-process map or
//! a shared transactional store.
//!
//! Nothing here spawns tasks or threads; every operation is a plain async
//! call made by the hosting orchestrator. The expected call pattern:
//! register a consumer and act on the returned state (proceed on `Active`,
//! park on `Blocked`, fail fast on `Rejected`); periodically ask
//! [`Constraint::runnable_consumers`] per unit and promote each returned id
//! with [`Constraint::consumer_unblocked`]; release permits with
//! [`Constraint::consumer_finished`] when work completes.

pub mod constraint;
pub mod jitter;
pub mod policy;

// Re-export commonly used types
pub use constraint::Constraint;
pub use jitter::{NoJitter, RandomJitter, RetryJitter};
pub use policy::{policy_for, AdmissionPolicy, AsapPolicy, FifoPolicy, PromotionFlow};
