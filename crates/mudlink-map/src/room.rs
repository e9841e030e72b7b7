//! Rooms and what has been observed in them.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Direction;

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Opaque room identifier assigned by the game server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RoomId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RoomId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ---------------------------------------------------------------------------
// Contents
// ---------------------------------------------------------------------------

/// An item seen lying in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "one")]
    pub quantity: u32,
    pub last_seen: DateTime<Utc>,
}

fn one() -> u32 {
    1
}

impl RoomItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            quantity: 1,
            last_seen: Utc::now(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// A creature seen in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomNpc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form difficulty label ("easy", "hard", ...).
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub hostile: bool,
    pub last_seen: DateTime<Utc>,
}

impl RoomNpc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            level: String::new(),
            hostile: false,
            last_seen: Utc::now(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn hostile(mut self, hostile: bool) -> Self {
        self.hostile = hostile;
        self
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A location in the world graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "room_id")]
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub description: String,
    /// At most one destination per direction.
    #[serde(default)]
    pub exits: BTreeMap<Direction, RoomId>,
    #[serde(default)]
    pub items: Vec<RoomItem>,
    #[serde(default)]
    pub npcs: Vec<RoomNpc>,
    /// Case-insensitively unique.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub visit_count: u32,
    pub first_visited: DateTime<Utc>,
    pub last_visited: DateTime<Utc>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub z: Option<i32>,
    /// Created only because an exit pointed here; never observed.
    #[serde(default)]
    pub placeholder: bool,
}

impl Room {
    /// Creates a room with the given id and name. An empty name becomes
    /// `"Room <id>"`.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        let id = id.into();
        let mut name = name.into();
        if name.is_empty() {
            name = format!("Room {id}");
        }
        let now = Utc::now();
        Self {
            id,
            name,
            area: String::new(),
            environment: String::new(),
            description: String::new(),
            exits: BTreeMap::new(),
            items: Vec::new(),
            npcs: Vec::new(),
            tags: Vec::new(),
            notes: String::new(),
            visit_count: 0,
            first_visited: now,
            last_visited: now,
            image_path: None,
            image_prompt: None,
            x: None,
            y: None,
            z: None,
            placeholder: false,
        }
    }

    pub(crate) fn placeholder(id: impl Into<RoomId>) -> Self {
        Self {
            placeholder: true,
            ..Self::new(id, "")
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

    pub fn exit(&self, direction: Direction) -> Option<&RoomId> {
        self.exits.get(&direction)
    }

    /// Adds or replaces an item; names compare case-insensitively.
    pub fn add_item(&mut self, item: RoomItem) {
        match self
            .items
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(&item.name))
        {
            Some(slot) => *slot = item,
            None => self.items.push(item),
        }
    }

    /// Returns `true` if an item of that name was present.
    pub fn remove_item(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !i.name.eq_ignore_ascii_case(name));
        self.items.len() != before
    }

    /// Adds or replaces an NPC; names compare case-insensitively.
    pub fn add_npc(&mut self, npc: RoomNpc) {
        match self
            .npcs
            .iter_mut()
            .find(|n| n.name.eq_ignore_ascii_case(&npc.name))
        {
            Some(slot) => *slot = npc,
            None => self.npcs.push(npc),
        }
    }

    pub fn remove_npc(&mut self, name: &str) -> bool {
        let before = self.npcs.len();
        self.npcs.retain(|n| !n.name.eq_ignore_ascii_case(name));
        self.npcs.len() != before
    }

    /// Returns `false` if the room already had the tag.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| !t.eq_ignore_ascii_case(tag));
        self.tags.len() != before
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Appends a line to the notes.
    pub fn append_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    pub fn record_visit(&mut self) {
        let now = Utc::now();
        if self.visit_count == 0 {
            self.first_visited = now;
        }
        self.visit_count += 1;
        self.last_visited = now;
    }

    /// Laid-out coordinates, if the room has been placed.
    pub fn coordinates(&self) -> Option<(i32, i32, i32)> {
        Some((self.x?, self.y?, self.z.unwrap_or(0)))
    }
}

/// Optional field overrides for [`WorldGraph::update_room`](crate::WorldGraph::update_room).
///
/// `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub area: Option<String>,
    pub environment: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole tag list.
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub image_path: Option<String>,
    pub image_prompt: Option<String>,
}

impl RoomPatch {
    pub(crate) fn apply(self, room: &mut Room) {
        if let Some(name) = self.name {
            room.name = name;
        }
        if let Some(area) = self.area {
            room.area = area;
        }
        if let Some(environment) = self.environment {
            room.environment = environment;
        }
        if let Some(description) = self.description {
            room.description = description;
        }
        if let Some(tags) = self.tags {
            room.tags.clear();
            for tag in tags {
                room.add_tag(tag);
            }
        }
        if let Some(notes) = self.notes {
            room.notes = notes;
        }
        if let Some(path) = self.image_path {
            room.image_path = Some(path);
        }
        if let Some(prompt) = self.image_prompt {
            room.image_prompt = Some(prompt);
        }
    }
}
