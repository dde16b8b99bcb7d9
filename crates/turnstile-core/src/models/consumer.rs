use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::models::{ConsumerContext, ConsumerId};

/// State of one admission request.
///
/// The initial state is decided at registration time (there is no separate
/// pending state). The only transitions are `Blocked -> Active` (promotion)
/// and `Active -> Finished` (release); `Finished` and `Rejected` are
/// terminal. Cancelling or expiring a blocked consumer is a registry-backend
/// responsibility, not part of this state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    Blocked,
    Active,
    Finished,
    Rejected,
}

impl ConsumerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsumerState::Finished | ConsumerState::Rejected)
    }
}

impl Display for ConsumerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConsumerState::Blocked => write!(f, "blocked"),
            ConsumerState::Active => write!(f, "active"),
            ConsumerState::Finished => write!(f, "finished"),
            ConsumerState::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ConsumerState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocked" => Ok(ConsumerState::Blocked),
            "active" => Ok(ConsumerState::Active),
            "finished" => Ok(ConsumerState::Finished),
            "rejected" => Ok(ConsumerState::Rejected),
            _ => Err(anyhow::anyhow!("Invalid consumer state: {}", s)),
        }
    }
}

/// One request for `permits` permits of a constrained resource.
///
/// A consumer is an immutable value: a state transition produces a new value
/// via [`with_state`](Consumer::with_state), never an in-place mutation.
/// `queued_at` records submission time so callers can observe how long a
/// consumer waited before promotion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consumer {
    pub id: ConsumerId,
    pub permits: u32,
    pub state: ConsumerState,
    pub context: ConsumerContext,
    pub queued_at: DateTime<Utc>,
}

impl Consumer {
    pub fn new(
        id: ConsumerId,
        permits: u32,
        state: ConsumerState,
        context: ConsumerContext,
    ) -> Self {
        Self {
            id,
            permits,
            state,
            context,
            queued_at: Utc::now(),
        }
    }

    /// The same consumer in a new state. Everything else, including the
    /// submission timestamp, is carried over.
    pub fn with_state(&self, state: ConsumerState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ConsumerState::Active
    }

    pub fn is_blocked(&self) -> bool {
        self.state == ConsumerState::Blocked
    }
}

/// Sum of permits held by `Active` consumers.
///
/// This is the occupancy figure every admission decision is made against and
/// the compare-and-swap witness passed to the registry: for any reachable
/// registry state it must not exceed the constraint's `limits`.
pub fn used_permits(consumers: &[Consumer]) -> u32 {
    consumers
        .iter()
        .filter(|c| c.is_active())
        .map(|c| c.permits)
        .sum()
}

/// Number of consumers currently waiting in line.
pub fn blocked_count(consumers: &[Consumer]) -> usize {
    consumers.iter().filter(|c| c.is_blocked()).count()
}
