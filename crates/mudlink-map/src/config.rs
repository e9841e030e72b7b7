//! World graph configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`WorldGraph`](crate::WorldGraph).
///
/// ```
/// use mudlink_map::MapConfig;
///
/// let config = MapConfig::default().name("arrakis").default_cost(2.0);
/// assert_eq!(config.name, "arrakis");
/// assert!(config.bidirectional_exits);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Name recorded in saved maps.
    pub name: String,

    /// Cost of an exit that has no explicit edge cost.
    pub default_cost: f64,

    /// Whether exits learned from room facts also set the reverse exit on
    /// the destination room.
    pub bidirectional_exits: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            name: "world".to_string(),
            default_cost: 1.0,
            bidirectional_exits: true,
        }
    }
}

impl MapConfig {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn default_cost(mut self, cost: f64) -> Self {
        self.default_cost = cost;
        self
    }

    pub fn bidirectional_exits(mut self, on: bool) -> Self {
        self.bidirectional_exits = on;
        self
    }
}
