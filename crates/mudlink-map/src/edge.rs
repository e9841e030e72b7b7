//! Directed edges between rooms.

use serde::{Deserialize, Serialize};

use crate::{Direction, RoomId};

/// A directed connection `from_room --direction--> to_room`.
///
/// The graph holds at most one edge per `(from_room, direction)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from_room: RoomId,
    pub to_room: RoomId,
    pub direction: Direction,
    /// Cost for weighted search.
    #[serde(default = "unit_cost")]
    pub cost: f64,
    /// Whether adding this edge also set the reverse exit.
    #[serde(default)]
    pub bidirectional: bool,
    /// Blocked edges are never traversed by weighted search.
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub notes: String,
}

fn unit_cost() -> f64 {
    1.0
}

impl Edge {
    /// Creates a one-way, unblocked edge of cost 1.
    pub fn new(from: impl Into<RoomId>, to: impl Into<RoomId>, direction: Direction) -> Self {
        Self {
            from_room: from.into(),
            to_room: to.into(),
            direction,
            cost: 1.0,
            bidirectional: false,
            blocked: false,
            notes: String::new(),
        }
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn bidirectional(mut self, on: bool) -> Self {
        self.bidirectional = on;
        self
    }

    pub fn blocked(mut self, on: bool) -> Self {
        self.blocked = on;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
