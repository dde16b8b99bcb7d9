//! Library-wide constants.

/// Maximum number of `Blocked` consumers a unit may accumulate before a
/// registration that opts into queue capping is turned away as `Rejected`.
///
/// The cap only applies to consumers whose context sets
/// [`enforce_queue_cap`](crate::models::ConsumerContext::enforce_queue_cap);
/// registrations without the flag may queue past it.
pub const BLOCKED_QUEUE_CAP: usize = 20;
