//! World graph for Mudlink.
//!
//! A directed graph of explored rooms, built up one "you are here, these
//! are the exits" fact at a time, plus the navigation queries a client
//! needs to get back somewhere.
//!
//! # Key types
//!
//! - [`WorldGraph`] — rooms, edges, current room; every query and mutation
//! - [`Room`] / [`RoomId`] — a location and what has been seen there
//! - [`Edge`] — a directed exit with a cost and a blocked flag
//! - [`Direction`] — the closed direction vocabulary (`n`, `ne`, `u`, ...)
//! - [`MapConfig`] — graph name, default edge cost, exit mirroring
//!
//! ```
//! use mudlink_map::{RoomFacts, WorldGraph};
//!
//! let mut map = WorldGraph::new("arrakis");
//! map.upsert_room_and_exits(&RoomFacts::new("1", "Spaceport").exit("north", "2"));
//! map.upsert_room_and_exits(&RoomFacts::new("2", "Market").exit("east", "3"));
//! map.upsert_room_and_exits(&RoomFacts::new("3", "Bazaar"));
//!
//! assert_eq!(map.route_string("1", "3").unwrap().as_deref(), Some("n;e"));
//! ```

mod config;
mod direction;
mod edge;
mod error;
mod export;
mod graph;
mod layout;
mod path;
mod persist;
mod room;
mod route;

pub use config::MapConfig;
pub use direction::Direction;
pub use edge::Edge;
pub use error::MapError;
pub use export::{MapVisualization, VisualEdge, VisualRoom};
pub use graph::{MapStats, Neighbor, RoomFacts, WorldGraph};
pub use path::{coordinate_heuristic, PathStep, WeightedStep};
pub use room::{Room, RoomId, RoomItem, RoomNpc, RoomPatch};
pub use route::{compress_route, parse_route};
