//! Pathfinding over the exit map.
//!
//! Every query here takes room ids and distinguishes two outcomes: an
//! unknown id is a caller error (`Err(MapError::RoomNotFound)`), while two
//! known rooms with no route between them is `Ok(None)`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use serde::Serialize;

use crate::{compress_route, Direction, MapError, Room, RoomId, WorldGraph};

/// One move of an unweighted path: go `direction`, arrive in `room_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub direction: Direction,
    pub room_id: RoomId,
}

/// One move of a weighted path, with the total cost so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedStep {
    pub direction: Direction,
    pub room_id: RoomId,
    pub cost: f64,
}

/// Straight-line estimate between two laid-out rooms.
///
/// Uses Chebyshev distance, since a diagonal exit moves one unit on both
/// axes at once. Rooms without coordinates estimate zero, which reduces
/// the search to plain Dijkstra for them.
pub fn coordinate_heuristic(from: &Room, to: &Room) -> f64 {
    match (from.coordinates(), to.coordinates()) {
        (Some((x1, y1, z1)), Some((x2, y2, z2))) => {
            let d = (x1 - x2).abs().max((y1 - y2).abs()).max((z1 - z2).abs());
            f64::from(d)
        }
        _ => 0.0,
    }
}

// Frontier entry for the weighted search. Ordered so that BinaryHeap (a
// max-heap) pops the smallest estimate first, oldest first on ties.
struct Frontier {
    estimate: f64,
    seq: u64,
    room: RoomId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl WorldGraph {
    /// Fewest-steps path from `from` to `to` over known exits.
    ///
    /// Breadth-first; every room is visited at most once, so cycles are
    /// harmless. `from == to` gives an empty path.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if either room is unknown.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<Option<Vec<PathStep>>, MapError> {
        self.require(from)?;
        self.require(to)?;
        Ok(self.bfs(from, |room| room.id == to).map(|(_, path)| path))
    }

    /// The closest room (fewest steps) carrying `tag`, and the path to it.
    ///
    /// A tagged origin is its own answer with an empty path.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if `from` is unknown.
    pub fn nearest_by_tag(
        &self,
        from: &str,
        tag: &str,
    ) -> Result<Option<(RoomId, Vec<PathStep>)>, MapError> {
        self.require(from)?;
        Ok(self.bfs(from, |room| room.has_tag(tag)))
    }

    /// The shortest path as a compressed speedwalk string (`"2n;3e"`).
    ///
    /// `from == to` gives `Some("")`; no route gives `None`.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if either room is unknown.
    pub fn route_string(&self, from: &str, to: &str) -> Result<Option<String>, MapError> {
        Ok(self.shortest_path(from, to)?.map(|path| {
            let dirs: Vec<Direction> = path.iter().map(|s| s.direction).collect();
            compress_route(&dirs)
        }))
    }

    /// Cheapest path by edge cost, never crossing a blocked edge.
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if either room is unknown.
    pub fn weighted_path(&self, from: &str, to: &str) -> Result<Option<Vec<WeightedStep>>, MapError> {
        self.weighted_path_with(from, to, |_, _| 0.0)
    }

    /// Best-first search guided by `heuristic(room, goal)`.
    ///
    /// With a heuristic that never overestimates the remaining cost (such
    /// as [`coordinate_heuristic`] on unit-cost maps) this is A*; with one
    /// that always returns zero it is Dijkstra. Exits with no edge record
    /// cost [`MapConfig::default_cost`](crate::MapConfig::default_cost).
    ///
    /// # Errors
    /// [`MapError::RoomNotFound`] if either room is unknown.
    pub fn weighted_path_with<H>(
        &self,
        from: &str,
        to: &str,
        heuristic: H,
    ) -> Result<Option<Vec<WeightedStep>>, MapError>
    where
        H: Fn(&Room, &Room) -> f64,
    {
        let start = self.require(from)?;
        let goal = self.require(to)?;

        let mut best: HashMap<RoomId, f64> = HashMap::new();
        let mut parent: HashMap<RoomId, (RoomId, Direction)> = HashMap::new();
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        best.insert(start.id.clone(), 0.0);
        heap.push(Frontier {
            estimate: heuristic(start, goal),
            seq,
            room: start.id.clone(),
        });

        while let Some(Frontier { estimate, room: current, .. }) = heap.pop() {
            if current == goal.id {
                return Ok(Some(unwind_weighted(&parent, &goal.id, &best)));
            }
            let Some(room) = self.rooms.get(&current) else {
                continue;
            };
            let so_far = best.get(&current).copied().unwrap_or(f64::INFINITY);
            // Stale heap entry: a cheaper route to this room was found later.
            if estimate - heuristic(room, goal) > so_far + f64::EPSILON {
                continue;
            }

            for (&direction, target) in &room.exits {
                let Some(next) = self.rooms.get(target) else {
                    continue;
                };
                let cost = match self.edge(room.id.as_str(), direction) {
                    Some(edge) if edge.blocked => continue,
                    Some(edge) => edge.cost,
                    None => self.config.default_cost,
                };
                let total = so_far + cost;
                if best.get(target).is_some_and(|&b| b <= total) {
                    continue;
                }
                best.insert(target.clone(), total);
                parent.insert(target.clone(), (current.clone(), direction));
                seq += 1;
                heap.push(Frontier {
                    estimate: total + heuristic(next, goal),
                    seq,
                    room: target.clone(),
                });
            }
        }

        tracing::debug!(%from, %to, "no weighted path");
        Ok(None)
    }

    // Breadth-first search from `from` until `is_goal` accepts a room.
    fn bfs<F>(&self, from: &str, is_goal: F) -> Option<(RoomId, Vec<PathStep>)>
    where
        F: Fn(&Room) -> bool,
    {
        let start = self.rooms.get(from)?;
        if is_goal(start) {
            return Some((start.id.clone(), Vec::new()));
        }

        let mut parent: HashMap<&RoomId, (&RoomId, Direction)> = HashMap::new();
        let mut queue = VecDeque::from([&start.id]);
        parent.insert(&start.id, (&start.id, Direction::North));

        while let Some(current) = queue.pop_front() {
            let Some(room) = self.rooms.get(current) else {
                continue;
            };
            for (&direction, target) in &room.exits {
                if parent.contains_key(target) {
                    continue;
                }
                let Some(next) = self.rooms.get(target) else {
                    continue;
                };
                parent.insert(&next.id, (current, direction));
                if is_goal(next) {
                    return Some((next.id.clone(), unwind(&parent, &start.id, &next.id)));
                }
                queue.push_back(&next.id);
            }
        }
        None
    }
}

fn unwind_weighted(
    parent: &HashMap<RoomId, (RoomId, Direction)>,
    goal: &RoomId,
    best: &HashMap<RoomId, f64>,
) -> Vec<WeightedStep> {
    let mut steps = Vec::new();
    let mut at = goal;
    while let Some((prev, direction)) = parent.get(at) {
        steps.push(WeightedStep {
            direction: *direction,
            room_id: at.clone(),
            cost: best.get(at).copied().unwrap_or_default(),
        });
        at = prev;
    }
    steps.reverse();
    steps
}

fn unwind(
    parent: &HashMap<&RoomId, (&RoomId, Direction)>,
    start: &RoomId,
    goal: &RoomId,
) -> Vec<PathStep> {
    let mut steps = Vec::new();
    let mut at = goal;
    while at != start {
        let Some(&(prev, direction)) = parent.get(at) else {
            break;
        };
        steps.push(PathStep {
            direction,
            room_id: at.clone(),
        });
        at = prev;
    }
    steps.reverse();
    steps
}
