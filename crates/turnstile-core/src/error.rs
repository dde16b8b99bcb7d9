//! Error types module
//!
//! This module provides the two error families used throughout Turnstile:
//! `RegistryError` for failures raised by a registry backend, and
//! `ConstraintError` for the conditions the policy layer surfaces to callers.
//! Backend failures are never wrapped or swallowed by the policy layer; they
//! propagate through `ConstraintError::Registry` as-is.

use crate::models::{ConstraintId, ConsumerId};

/// Errors raised by a registry backend.
///
/// Backends signal contract-level conditions (`ConstraintAlreadyExists`,
/// `ConstraintNotFound`) with dedicated variants so the policy layer can map
/// them; everything else (storage outage, poisoned state, transaction
/// aborts) travels through `Backend`.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("constraint {0} already exists")]
    ConstraintAlreadyExists(ConstraintId),

    #[error("constraint {0} not found")]
    ConstraintNotFound(ConstraintId),

    #[error("registry backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by the constraint policy layer.
#[derive(Debug, thiserror::Error)]
pub enum ConstraintError {
    /// The caller requested zero permits or more permits than the constraint
    /// can ever grant. Non-retryable: this is a caller bug, not contention.
    #[error("invalid permits {requested}: must be between 1 and {limits}")]
    InvalidPermits { requested: u32, limits: u32 },

    /// `create` was called for an id that already exists; `load` it instead.
    #[error("unable to save constraint {0}: id already exists")]
    UnableToSaveConstraint(ConstraintId),

    #[error("unable to load constraint {0}: not found")]
    UnableToLoadConstraint(ConstraintId),

    /// The registry declined further optimistic retries. The caller may
    /// reattempt the registration later as a fresh operation.
    #[error("unable to register consumer {0}: registry declined further retries")]
    UnableToRegisterConsumer(ConsumerId),

    /// Admitting this consumer as `Blocked` would create a wait that can
    /// never be satisfied: the aggregate permit demand of its scope exceeds
    /// the constraint's limit even with every unrelated consumer gone.
    #[error(
        "consumer {consumer_id} is permanently blocked: its scope demands {demand} permits \
         but the constraint only has {limits}"
    )]
    PermanentlyBlockedConsumer {
        consumer_id: ConsumerId,
        demand: u32,
        limits: u32,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result type for constraint operations
pub type ConstraintResult<T> = Result<T, ConstraintError>;
