//! The world graph: rooms, edges, and the current-room pointer.
//!
//! Exploration is incremental. Exits are usually seen before the rooms
//! they lead to, so an edge into an unknown room creates a *placeholder*
//! room instead of failing. Placeholders are filled in the first time the
//! room itself is observed.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Direction, Edge, MapConfig, MapError, Room, RoomId, RoomPatch};

/// Format version written into saved maps.
pub(crate) const FORMAT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// RoomFacts
// ---------------------------------------------------------------------------

/// What the game reported on entering a room.
///
/// Exit directions are raw tokens as the server sent them (`"north"`,
/// `"n"`, `"NE"`); unknown tokens are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomFacts {
    pub id: String,
    pub name: String,
    pub area: String,
    pub environment: String,
    pub description: String,
    pub exits: BTreeMap<String, String>,
}

impl RoomFacts {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn exit(mut self, direction: impl Into<String>, target: impl Into<String>) -> Self {
        self.exits.insert(direction.into(), target.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Stats and neighbors
// ---------------------------------------------------------------------------

/// Summary counts returned by [`WorldGraph::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStats {
    pub total_rooms: usize,
    pub total_edges: usize,
    pub placeholders: usize,
    /// Rooms per area; rooms without one are counted under `"Unknown"`.
    pub areas: BTreeMap<String, usize>,
    pub current_room: Option<RoomId>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// One exit of a room, with the destination if it is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub direction: Direction,
    pub room_id: &'a RoomId,
    pub room: Option<&'a Room>,
}

// ---------------------------------------------------------------------------
// WorldGraph
// ---------------------------------------------------------------------------

/// A directed graph of explored rooms.
///
/// Rooms are keyed by id. Edges live in a list with an index from
/// `(from, direction)` to position, so there is never more than one edge
/// per room and direction.
#[derive(Debug, Clone)]
pub struct WorldGraph {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_modified: DateTime<Utc>,
    pub(crate) current_room_id: Option<RoomId>,
    pub(crate) rooms: BTreeMap<RoomId, Room>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) edge_index: HashMap<(RoomId, Direction), usize>,
    pub(crate) config: MapConfig,
}

impl Default for WorldGraph {
    fn default() -> Self {
        Self::with_config(MapConfig::default())
    }
}

impl WorldGraph {
    /// Creates an empty graph with default settings and the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(MapConfig::default().name(name))
    }

    pub fn with_config(config: MapConfig) -> Self {
        let now = Utc::now();
        Self {
            name: config.name.clone(),
            version: FORMAT_VERSION.to_string(),
            created_at: now,
            last_modified: now,
            current_room_id: None,
            rooms: BTreeMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Replaces the settings, keeping the graph's recorded name.
    pub fn set_config(&mut self, config: MapConfig) {
        self.config = config;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Mutable access to a room's contents (items, NPCs, tags, notes).
    ///
    /// Use [`add_edge`](Self::add_edge) rather than editing `exits` here;
    /// the edge list would not follow.
    pub fn room_mut(&mut self, id: &str) -> Option<&mut Room> {
        let room = self.rooms.get_mut(id)?;
        self.last_modified = Utc::now();
        Some(room)
    }

    pub fn contains_room(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    /// All rooms in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Inserts a room, replacing any room with the same id.
    pub fn add_room(&mut self, room: Room) {
        tracing::debug!(id = %room.id, name = %room.name, "room added");
        self.rooms.insert(room.id.clone(), room);
        self.touch();
    }

    /// Creates the room if absent. Non-empty fields overwrite the stored
    /// ones; empty fields leave them alone. Contents (items, NPCs, tags,
    /// notes) are never touched.
    pub fn upsert_room(&mut self, id: &str, name: &str, area: &str, environment: &str) -> &mut Room {
        self.last_modified = Utc::now();
        let room = self
            .rooms
            .entry(RoomId::from(id))
            .or_insert_with(|| Room::new(id, name));
        if !name.is_empty() {
            room.name = name.to_string();
        }
        if !area.is_empty() {
            room.area = area.to_string();
        }
        if !environment.is_empty() {
            room.environment = environment.to_string();
        }
        room.placeholder = false;
        room
    }

    /// Applies a [`RoomPatch`] to an existing room.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if the room is unknown; nothing changes.
    pub fn update_room(&mut self, id: &str, patch: RoomPatch) -> Result<&Room, MapError> {
        let room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| MapError::RoomNotFound(id.into()))?;
        patch.apply(room);
        self.last_modified = Utc::now();
        Ok(room)
    }

    /// Forgets a room.
    ///
    /// Every edge into or out of it is removed and the current-room pointer
    /// is cleared if it pointed here. Exits of other rooms that lead here
    /// are kept; they become unexplored again.
    pub fn remove_room(&mut self, id: &str) -> Option<Room> {
        let room = self.rooms.remove(id)?;
        self.edges
            .retain(|e| e.from_room != *id && e.to_room != *id);
        self.rebuild_index();
        if self.current_room_id.as_ref().is_some_and(|c| c == id) {
            self.current_room_id = None;
        }
        self.touch();
        tracing::info!(%id, "room removed");
        Some(room)
    }

    fn ensure_room(&mut self, id: &RoomId) {
        if !self.rooms.contains_key(id) {
            tracing::warn!(%id, "room not yet seen, creating placeholder");
            self.rooms.insert(id.clone(), Room::placeholder(id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // Current room
    // -----------------------------------------------------------------------

    /// Moves the current-room pointer and records a visit.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if the room is unknown; the pointer is
    /// left where it was.
    pub fn set_current_room(&mut self, id: &str) -> Result<&Room, MapError> {
        let room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| MapError::RoomNotFound(id.into()))?;
        room.record_visit();
        self.current_room_id = Some(room.id.clone());
        tracing::debug!(%id, visits = room.visit_count, "current room");
        Ok(room)
    }

    pub fn current_room_id(&self) -> Option<&RoomId> {
        self.current_room_id.as_ref()
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.current_room_id
            .as_ref()
            .and_then(|id| self.rooms.get(id))
    }

    /// Follows an exit from the current room.
    ///
    /// Returns the new current room, or `None` (pointer unchanged) if there
    /// is no current room, no exit that way, or the exit leads somewhere
    /// not in the graph.
    pub fn step(&mut self, direction: Direction) -> Option<&Room> {
        let target = self.current_room()?.exit(direction)?.clone();
        let room = self.rooms.get_mut(&target)?;
        room.record_visit();
        self.current_room_id = Some(target);
        Some(room)
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Adds an edge from a direction token, using the configured default
    /// cost.
    ///
    /// Unknown tokens are logged and ignored (`None`).
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        direction: &str,
        bidirectional: bool,
    ) -> Option<&Edge> {
        let Some(direction) = Direction::parse(direction) else {
            tracing::warn!(%from, token = %direction, "unknown direction, exit ignored");
            return None;
        };
        let edge = Edge::new(from, to, direction)
            .cost(self.config.default_cost)
            .bidirectional(bidirectional);
        Some(self.insert_edge(edge))
    }

    /// Adds or replaces the edge for `(edge.from_room, edge.direction)`.
    ///
    /// Missing endpoint rooms are created as placeholders. The source
    /// room's exit is set; a bidirectional edge also sets the destination's
    /// exit in the opposite direction, unless the destination already has
    /// its own edge that way to somewhere else. If the replaced edge
    /// pointed at a different room whose mirrored exit led back here, that
    /// stale exit is removed.
    pub fn insert_edge(&mut self, edge: Edge) -> &Edge {
        self.ensure_room(&edge.from_room);
        self.ensure_room(&edge.to_room);

        let key = (edge.from_room.clone(), edge.direction);
        let reverse = edge.direction.opposite();

        if let Some(&pos) = self.edge_index.get(&key) {
            let old_target = self.edges[pos].to_room.clone();
            if old_target != edge.to_room {
                self.drop_mirror(&old_target, reverse, &edge.from_room);
            }
        }

        if let Some(from) = self.rooms.get_mut(&edge.from_room) {
            from.exits.insert(edge.direction, edge.to_room.clone());
        }
        if edge.bidirectional {
            let owner = self
                .exit_owner(&edge.to_room, reverse)
                .filter(|owner| **owner != edge.from_room)
                .cloned();
            if let Some(owner) = owner {
                tracing::debug!(
                    room = %edge.to_room,
                    direction = %reverse,
                    to = %owner,
                    "exit has its own edge, not mirrored"
                );
            } else if let Some(to) = self.rooms.get_mut(&edge.to_room) {
                to.exits.insert(reverse, edge.from_room.clone());
            }
        }

        tracing::debug!(
            from = %edge.from_room,
            to = %edge.to_room,
            direction = %edge.direction,
            "edge"
        );

        let pos = match self.edge_index.get(&key) {
            Some(&pos) => {
                self.edges[pos] = edge;
                pos
            }
            None => {
                self.edges.push(edge);
                let pos = self.edges.len() - 1;
                self.edge_index.insert(key, pos);
                pos
            }
        };
        self.touch();
        &self.edges[pos]
    }

    /// Removes the edge leaving `from` in `direction`, and its exit.
    ///
    /// For a bidirectional edge the reverse exit is removed too, if it
    /// still points back.
    pub fn remove_edge(&mut self, from: &str, direction: Direction) -> Option<Edge> {
        let pos = *self.edge_index.get(&(RoomId::from(from), direction))?;
        let edge = self.edges.remove(pos);
        self.rebuild_index();

        if let Some(room) = self.rooms.get_mut(from) {
            room.exits.remove(&direction);
        }
        if edge.bidirectional {
            self.drop_mirror(&edge.to_room, direction.opposite(), &edge.from_room);
        }
        self.touch();
        Some(edge)
    }

    // Destination of the edge record owning `room`'s exit `direction`.
    fn exit_owner(&self, room: &RoomId, direction: Direction) -> Option<&RoomId> {
        self.edge_index
            .get(&(room.clone(), direction))
            .map(|&pos| &self.edges[pos].to_room)
    }

    // Removes `room`'s exit `direction` if it is a mirror pointing at `back_to`.
    fn drop_mirror(&mut self, room: &RoomId, direction: Direction, back_to: &RoomId) {
        if self.exit_owner(room, direction).is_some() {
            return;
        }
        if let Some(target) = self.rooms.get_mut(room) {
            if target.exits.get(&direction) == Some(back_to) {
                target.exits.remove(&direction);
            }
        }
    }

    pub fn edge(&self, from: &str, direction: Direction) -> Option<&Edge> {
        self.edge_index
            .get(&(RoomId::from(from), direction))
            .map(|&pos| &self.edges[pos])
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge_mut(&mut self, from: &str, direction: Direction) -> Result<&mut Edge, MapError> {
        match self.edge_index.get(&(RoomId::from(from), direction)) {
            Some(&pos) => Ok(&mut self.edges[pos]),
            None => Err(MapError::EdgeNotFound {
                from: from.into(),
                direction,
            }),
        }
    }

    /// # Errors
    /// [`MapError::EdgeNotFound`] if there is no such edge.
    pub fn set_edge_cost(&mut self, from: &str, direction: Direction, cost: f64) -> Result<(), MapError> {
        self.edge_mut(from, direction)?.cost = cost;
        self.touch();
        Ok(())
    }

    /// Marks an edge impassable (a locked door, a guard) or clears it.
    ///
    /// # Errors
    /// [`MapError::EdgeNotFound`] if there is no such edge.
    pub fn set_edge_blocked(&mut self, from: &str, direction: Direction, blocked: bool) -> Result<(), MapError> {
        self.edge_mut(from, direction)?.blocked = blocked;
        self.touch();
        Ok(())
    }

    /// Exits of a room, in direction order.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if the room is unknown.
    pub fn adjacent_rooms(&self, id: &str) -> Result<Vec<Neighbor<'_>>, MapError> {
        let room = self.require(id)?;
        Ok(room
            .exits
            .iter()
            .map(|(&direction, room_id)| Neighbor {
                direction,
                room_id,
                room: self.rooms.get(room_id),
            })
            .collect())
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.edge_index = self
            .edges
            .iter()
            .enumerate()
            .map(|(pos, e)| ((e.from_room.clone(), e.direction), pos))
            .collect();
    }

    pub(crate) fn require(&self, id: &str) -> Result<&Room, MapError> {
        self.rooms
            .get(id)
            .ok_or_else(|| MapError::RoomNotFound(id.into()))
    }

    // -----------------------------------------------------------------------
    // Facts from the game
    // -----------------------------------------------------------------------

    /// Records "you are now in this room, with these exits".
    ///
    /// Upserts the room, makes it current, and adds an edge per exit
    /// (bidirectional per [`MapConfig::bidirectional_exits`]). Safe to
    /// repeat: revisiting a room changes nothing but its visit counter.
    pub fn upsert_room_and_exits(&mut self, facts: &RoomFacts) -> &Room {
        let room = self.upsert_room(&facts.id, &facts.name, &facts.area, &facts.environment);
        if !facts.description.is_empty() {
            room.description = facts.description.clone();
        }

        let bidirectional = self.config.bidirectional_exits;
        for (token, target) in &facts.exits {
            if target.is_empty() {
                continue;
            }
            self.add_edge(&facts.id, target, token, bidirectional);
        }

        let id = RoomId::from(facts.id.as_str());
        if let Some(room) = self.rooms.get_mut(&id) {
            room.record_visit();
        }
        tracing::info!(id = %id, name = %facts.name, exits = facts.exits.len(), "entered room");
        self.current_room_id = Some(id.clone());
        self.touch();
        &self.rooms[&id]
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Rooms whose area matches, ignoring case.
    pub fn rooms_in_area(&self, area: &str) -> Vec<&Room> {
        self.rooms
            .values()
            .filter(|r| r.area.eq_ignore_ascii_case(area))
            .collect()
    }

    pub fn rooms_with_tag(&self, tag: &str) -> Vec<&Room> {
        self.rooms.values().filter(|r| r.has_tag(tag)).collect()
    }

    /// Rooms whose name contains `partial`, ignoring case.
    pub fn rooms_by_name(&self, partial: &str) -> Vec<&Room> {
        let needle = partial.to_lowercase();
        self.rooms
            .values()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Exits leading into the fog: to rooms the graph does not know, or to
    /// placeholders never observed. Limited to one room when `room` is set.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if `room` names an unknown room.
    pub fn unexplored_exits(&self, room: Option<&str>) -> Result<Vec<(RoomId, Direction)>, MapError> {
        let rooms: Vec<&Room> = match room {
            Some(id) => vec![self.require(id)?],
            None => self.rooms.values().collect(),
        };
        Ok(rooms
            .into_iter()
            .flat_map(|room| {
                room.exits
                    .iter()
                    .filter(|(_, target)| self.rooms.get(*target).is_none_or(|t| t.placeholder))
                    .map(|(&dir, _)| (room.id.clone(), dir))
            })
            .collect())
    }

    /// Every unexplored exit in the graph.
    pub fn unexplored_frontier(&self) -> Vec<(RoomId, Direction)> {
        self.unexplored_exits(None).unwrap_or_default()
    }

    pub fn stats(&self) -> MapStats {
        let mut areas = BTreeMap::new();
        for room in self.rooms.values() {
            let area = if room.area.is_empty() {
                "Unknown".to_string()
            } else {
                room.area.clone()
            };
            *areas.entry(area).or_insert(0) += 1;
        }
        MapStats {
            total_rooms: self.rooms.len(),
            total_edges: self.edges.len(),
            placeholders: self.rooms.values().filter(|r| r.placeholder).count(),
            areas,
            current_room: self.current_room_id.clone(),
            created_at: self.created_at,
            last_modified: self.last_modified,
        }
    }
}
