//! Grid coordinates for drawing the map.
//!
//! Coordinates are cosmetic. Nothing in pathfinding reads them except the
//! optional [`coordinate_heuristic`](crate::coordinate_heuristic).

use std::collections::{HashSet, VecDeque};

use crate::{MapError, RoomId, WorldGraph};

impl WorldGraph {
    /// Assigns integer coordinates breadth-first from an origin room.
    ///
    /// The origin is `origin`, else the current room, else the first room
    /// by id; it lands on `(0, 0, 0)`. Each exit moves by its direction's
    /// unit offset, and the first placement of a room wins. Rooms not
    /// reachable from the origin are laid out as separate islands to the
    /// right of everything placed so far. Returns the number of rooms
    /// placed.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if `origin` names an unknown room.
    pub fn auto_layout(&mut self, origin: Option<&str>) -> Result<usize, MapError> {
        let first = match origin {
            Some(id) => Some(self.require(id)?.id.clone()),
            None => self
                .current_room_id
                .clone()
                .or_else(|| self.rooms.keys().next().cloned()),
        };
        let Some(first) = first else {
            return Ok(0);
        };

        for room in self.rooms.values_mut() {
            room.x = None;
            room.y = None;
            room.z = None;
        }

        let mut placed: HashSet<RoomId> = HashSet::new();
        let mut next_origin = Some(first);
        let mut offset_x = 0;
        let mut islands = 0;

        while let Some(origin) = next_origin {
            let max_x = self.place_from(&origin, offset_x, &mut placed);
            islands += 1;
            offset_x = max_x + 2;
            next_origin = self
                .rooms
                .keys()
                .find(|id| !placed.contains(*id))
                .cloned();
        }

        tracing::debug!(rooms = placed.len(), islands, "auto layout");
        self.touch();
        Ok(placed.len())
    }

    // Places every room reachable from `origin` not yet placed; returns the
    // largest x used.
    fn place_from(&mut self, origin: &RoomId, offset_x: i32, placed: &mut HashSet<RoomId>) -> i32 {
        let mut max_x = offset_x;
        let mut queue = VecDeque::from([(origin.clone(), (offset_x, 0, 0))]);
        placed.insert(origin.clone());

        while let Some((id, (x, y, z))) = queue.pop_front() {
            let Some(room) = self.rooms.get_mut(&id) else {
                continue;
            };
            room.x = Some(x);
            room.y = Some(y);
            room.z = Some(z);
            max_x = max_x.max(x);

            let exits: Vec<_> = room
                .exits
                .iter()
                .map(|(dir, target)| (dir.offset(), target.clone()))
                .collect();
            for ((dx, dy, dz), target) in exits {
                if !self.rooms.contains_key(&target) || !placed.insert(target.clone()) {
                    continue;
                }
                queue.push_back((target, (x + dx, y + dy, z + dz)));
            }
        }
        max_x
    }

    /// Whether any room has been given coordinates.
    pub fn has_layout(&self) -> bool {
        self.rooms.values().any(|r| r.coordinates().is_some())
    }
}
