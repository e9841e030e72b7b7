//! JSON persistence.
//!
//! The saved form is a single object:
//!
//! ```text
//! { "name", "version": "1.0", "created_at", "last_modified",
//!   "current_room_id", "rooms": { id: room, ... }, "edges": [ ... ] }
//! ```
//!
//! The `(room, direction)` edge index is never written; it is rebuilt on
//! load. New fields may be added under the same major version; a file from
//! a different major version is refused.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::FORMAT_VERSION;
use crate::{Edge, MapConfig, MapError, Room, RoomId, WorldGraph};

#[derive(Serialize)]
struct MapDocumentRef<'a> {
    name: &'a str,
    version: &'a str,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    current_room_id: Option<&'a RoomId>,
    rooms: &'a BTreeMap<RoomId, Room>,
    edges: &'a [Edge],
}

#[derive(Deserialize)]
struct MapDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "legacy_version")]
    version: String,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    last_modified: DateTime<Utc>,
    #[serde(default)]
    current_room_id: Option<RoomId>,
    #[serde(default)]
    rooms: BTreeMap<RoomId, Room>,
    #[serde(default)]
    edges: Vec<Edge>,
}

fn legacy_version() -> String {
    FORMAT_VERSION.to_string()
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

impl WorldGraph {
    /// Serializes the whole graph as pretty-printed JSON.
    ///
    /// # Errors
    /// [`MapError::Serialization`] if a value cannot be represented.
    pub fn to_json(&self) -> Result<String, MapError> {
        let doc = MapDocumentRef {
            name: &self.name,
            version: &self.version,
            created_at: self.created_at,
            last_modified: self.last_modified,
            current_room_id: self.current_room_id.as_ref(),
            rooms: &self.rooms,
            edges: &self.edges,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Rebuilds a graph from [`to_json`](Self::to_json) output.
    ///
    /// Edges naming rooms missing from the file get placeholder rooms, a
    /// later duplicate `(room, direction)` edge replaces an earlier one, and
    /// a current-room id that is not in the file is dropped.
    ///
    /// # Errors
    /// [`MapError::Serialization`] for malformed JSON;
    /// [`MapError::UnsupportedVersion`] for an incompatible format.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let doc: MapDocument = serde_json::from_str(json)?;
        if major(&doc.version) != major(FORMAT_VERSION) {
            return Err(MapError::UnsupportedVersion(doc.version));
        }

        let config = match doc.name {
            Some(name) => MapConfig::default().name(name),
            None => MapConfig::default(),
        };
        let mut graph = WorldGraph::with_config(config);
        graph.version = doc.version;
        graph.created_at = doc.created_at;
        graph.rooms = doc.rooms;

        let mut seen: HashMap<(RoomId, crate::Direction), usize> = HashMap::new();
        for edge in doc.edges {
            for id in [&edge.from_room, &edge.to_room] {
                if !graph.rooms.contains_key(id) {
                    tracing::warn!(%id, "edge names a room missing from the file");
                    graph.rooms.insert(id.clone(), Room::placeholder(id.clone()));
                }
            }
            match seen.get(&(edge.from_room.clone(), edge.direction)) {
                Some(&pos) => graph.edges[pos] = edge,
                None => {
                    seen.insert((edge.from_room.clone(), edge.direction), graph.edges.len());
                    graph.edges.push(edge);
                }
            }
        }
        graph.rebuild_index();

        // Edge records own their exit slot.
        for edge in &graph.edges {
            if let Some(room) = graph.rooms.get_mut(&edge.from_room) {
                if room.exits.get(&edge.direction) != Some(&edge.to_room) {
                    tracing::warn!(
                        room = %edge.from_room,
                        direction = %edge.direction,
                        to = %edge.to_room,
                        "exit disagrees with its edge, using the edge"
                    );
                    room.exits.insert(edge.direction, edge.to_room.clone());
                }
            }
        }

        graph.current_room_id = doc
            .current_room_id
            .filter(|id| graph.rooms.contains_key(id));
        graph.last_modified = doc.last_modified;
        Ok(graph)
    }

    /// Writes the graph to `path`, creating parent directories.
    ///
    /// # Errors
    /// [`MapError::Io`] or [`MapError::Serialization`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::info!(
            path = %path.display(),
            rooms = self.rooms.len(),
            edges = self.edges.len(),
            "map saved"
        );
        Ok(())
    }

    /// Reads a graph written by [`save`](Self::save).
    ///
    /// # Errors
    /// [`MapError::Io`] if the file cannot be read, plus everything
    /// [`from_json`](Self::from_json) can return.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let graph = Self::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(
            path = %path.display(),
            rooms = graph.rooms.len(),
            edges = graph.edges.len(),
            "map loaded"
        );
        Ok(graph)
    }
}
