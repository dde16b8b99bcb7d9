//! Turnstile Registry Library
//!
//! This crate provides the registry abstraction for Turnstile: the
//! `ConstraintRegistry` trait every storage backend must implement, and the
//! in-process reference backend used as the baseline correctness model.
//!
//! A registry is the sole owner of shared mutable state. For a given
//! (constraint, unit) it serializes concurrent writers through its atomic,
//! expected-state-gated operations; the policy layer never mutates registry
//! state directly. Single-process hosts can use [`InMemoryRegistry`];
//! multi-process hosts must supply a backend over a transactional or
//! conditional-write store that honors the same contract.

pub mod config;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use memory::InMemoryRegistry;
pub use traits::ConstraintRegistry;
