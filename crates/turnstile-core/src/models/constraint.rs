use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Admission fairness policy for a constraint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Best-fit: a request is admitted whenever its permits fit the free
    /// capacity, regardless of who is already waiting.
    Asap,
    /// Strict line-forming: once anyone is waiting, later arrivals queue
    /// behind them even if they would individually fit.
    Fifo,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Strategy::Asap => write!(f, "asap"),
            Strategy::Fifo => write!(f, "fifo"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asap" => Ok(Strategy::Asap),
            "fifo" => Ok(Strategy::Fifo),
            _ => Err(anyhow::anyhow!("Invalid strategy: {}", s)),
        }
    }
}

/// Specification of a constraint: its fairness policy and total capacity.
///
/// `limits` is the number of permits that may be concurrently held across
/// all active consumers of a unit and must be greater than zero. A spec is
/// written once at `create` time and never mutated afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintSpec {
    pub strategy: Strategy,
    pub limits: u32,
}

impl ConstraintSpec {
    pub fn new(strategy: Strategy, limits: u32) -> Self {
        Self { strategy, limits }
    }
}
