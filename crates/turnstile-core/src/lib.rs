//! Turnstile Core Library
//!
//! This crate provides the domain models and error types shared across all
//! Turnstile components: constraint and consumer values, the admission state
//! machine, and the error taxonomy surfaced to callers.

pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{ConstraintError, ConstraintResult, RegistryError, RegistryResult};
pub use models::{
    blocked_count, used_permits, Consumer, ConsumerContext, ConsumerId, ConsumerScope,
    ConsumerState, ConstraintId, ConstraintSpec, ConstraintUnit, RunnableConsumers, Strategy,
};
