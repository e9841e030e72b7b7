//! Views of the graph for external renderers.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::{Direction, RoomId, WorldGraph};

/// A flattened, laid-out snapshot of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapVisualization {
    pub name: String,
    pub current_room: Option<RoomId>,
    pub rooms: Vec<VisualRoom>,
    pub edges: Vec<VisualEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualRoom {
    pub id: RoomId,
    pub name: String,
    pub area: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub visit_count: u32,
    pub tags: Vec<String>,
    pub placeholder: bool,
}

/// One exit between two known rooms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualEdge {
    pub from: RoomId,
    pub to: RoomId,
    pub direction: Direction,
    pub blocked: bool,
}

impl WorldGraph {
    /// Flattens the graph for drawing, running [`auto_layout`] first if no
    /// room has coordinates yet. Unplaced rooms are reported at the origin.
    ///
    /// [`auto_layout`]: WorldGraph::auto_layout
    pub fn visualization(&mut self) -> MapVisualization {
        if !self.has_layout() {
            // Only fails for an explicit unknown origin, which None is not.
            let _ = self.auto_layout(None);
        }

        let rooms = self
            .rooms
            .values()
            .map(|room| VisualRoom {
                id: room.id.clone(),
                name: room.name.clone(),
                area: room.area.clone(),
                x: room.x.unwrap_or(0),
                y: room.y.unwrap_or(0),
                z: room.z.unwrap_or(0),
                visit_count: room.visit_count,
                tags: room.tags.clone(),
                placeholder: room.placeholder,
            })
            .collect();

        let edges = self
            .exit_arcs()
            .map(|(from, direction, to)| VisualEdge {
                from: from.clone(),
                to: to.clone(),
                direction,
                blocked: self
                    .edge(from.as_str(), direction)
                    .is_some_and(|e| e.blocked),
            })
            .collect();

        MapVisualization {
            name: self.name.clone(),
            current_room: self.current_room_id.clone(),
            rooms,
            edges,
        }
    }

    /// Renders the graph in Graphviz DOT.
    ///
    /// One node per room, labelled with its name; the current room is
    /// filled. One arc per ordered pair of rooms, labelled with every
    /// direction that leads from the first to the second (`"n/u"`).
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape(&self.name));

        for room in self.rooms.values() {
            let current = self
                .current_room_id
                .as_ref()
                .is_some_and(|c| *c == room.id);
            let style = if current {
                ", style=filled, fillcolor=lightblue"
            } else if room.placeholder {
                ", style=dashed"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\"{style}];",
                escape(room.id.as_str()),
                escape(&room.name)
            );
        }

        let mut arcs: BTreeMap<(&RoomId, &RoomId), Vec<&str>> = BTreeMap::new();
        for (from, direction, to) in self.exit_arcs() {
            arcs.entry((from, to)).or_default().push(direction.token());
        }
        for ((from, to), labels) in arcs {
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                escape(from.as_str()),
                escape(to.as_str()),
                labels.join("/")
            );
        }

        out.push_str("}\n");
        out
    }

    // Every exit whose destination is a known room.
    fn exit_arcs(&self) -> impl Iterator<Item = (&RoomId, Direction, &RoomId)> {
        self.rooms.values().flat_map(move |room| {
            room.exits
                .iter()
                .filter(move |(_, to)| self.rooms.contains_key(*to))
                .map(move |(&dir, to)| (&room.id, dir, to))
        })
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
