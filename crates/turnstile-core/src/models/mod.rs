//! Data models for the constraint domain
//!
//! This module contains the value types tracked by a constraint registry,
//! organized by concern: identities, the constraint specification, consumer
//! values and their state machine, the registration context, and the
//! promotion result.

mod constraint;
mod consumer;
mod context;
mod ids;
mod runnable;

// Re-export all models for convenient imports
pub use constraint::*;
pub use consumer::*;
pub use context::*;
pub use ids::*;
pub use runnable::*;
