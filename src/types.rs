//! Core value types shared by the environment, the engines and the orchestrator.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Identifier of a task instance (e.g. a maze layout).
pub type ContextId = usize;

/// Index of a cluster within a [`crate::assignments::ClusterAssignment`].
pub type ClusterId = usize;

/// Index of a grid cell in the flattened state space.
pub type StateIndex = usize;

/// A cell on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Displacement from `self` to `other`.
    pub fn delta_to(&self, other: &Location) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Parses `x,y`, optionally wrapped in parentheses as [`Display`](fmt::Display) writes it.
impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let coordinate = |part: &str| part.trim().parse::<i32>().ok();
        inner
            .split_once(',')
            .and_then(|(x, y)| Some(Self::new(coordinate(x)?, coordinate(y)?)))
            .ok_or_else(|| Error::config(format!("expected a cell like '3,4', got '{s}'")))
    }
}

impl From<(i32, i32)> for Location {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// What the agent sees at each step: where it is, and which context it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub location: Location,
    pub state: StateIndex,
    pub context: ContextId,
}

/// One transition produced by the environment.
///
/// `abstract_action` is the cardinal move the pressed key maps to under the
/// current trial's action map, independent of whether a wall blocked it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub start: Observation,
    pub primitive_action: usize,
    pub abstract_action: usize,
    pub reward: f64,
    pub end: Observation,
}

impl Experience {
    /// Context the outcome was observed in.
    pub fn context(&self) -> ContextId {
        self.end.context
    }
}

/// Result of the two-stage action selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionChoice {
    pub primitive: usize,
    /// Intended direction; `None` when the key was drawn uniformly.
    pub abstract_action: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_delta_and_display() {
        let a = Location::new(1, 2);
        let b = Location::from((2, 2));
        assert_eq!(a.delta_to(&b), (1, 0));
        assert_eq!(b.to_string(), "(2, 2)");
    }

    #[test]
    fn locations_parse_from_pairs_and_display() {
        assert_eq!("3,4".parse::<Location>().unwrap(), Location::new(3, 4));
        assert_eq!(" (5, -1) ".parse::<Location>().unwrap(), Location::new(5, -1));
        let shown = Location::new(2, 7).to_string();
        assert_eq!(shown.parse::<Location>().unwrap(), Location::new(2, 7));
        for bad in ["", "3", "a,b", "1,2,3"] {
            assert!(bad.parse::<Location>().is_err(), "{bad}");
        }
    }
}
