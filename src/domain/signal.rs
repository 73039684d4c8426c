//! Directional signals and fusion policy.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::strategy::StrategyKind;

/// Directional vote of a strategy at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    pub fn is_flat(&self) -> bool {
        matches!(self, Direction::Flat)
    }

    /// The direction that closes a position opened in `self`.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
            Direction::Flat => Direction::Flat,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
            Direction::Flat => write!(f, "flat"),
        }
    }
}

/// One strategy's vote for one symbol/timestamp. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub strategy: StrategyKind,
    pub direction: Direction,
    pub ts: NaiveDateTime,
}

/// How the combiner fuses votes from the active strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    /// First non-flat vote in configured order wins; a long/short conflict
    /// resolves to flat: ambiguity means "do nothing".
    Any,
    /// Every active strategy must agree on a non-flat direction.
    All,
}

impl FromStr for StrategyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(StrategyMode::Any),
            "all" => Ok(StrategyMode::All),
            other => Err(format!("unknown strategy mode: {other}")),
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyMode::Any => write!(f, "any"),
            StrategyMode::All => write!(f, "all"),
        }
    }
}
