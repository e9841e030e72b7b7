//! The direction vocabulary shared by exits, edges, and routes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::MapError;

/// One of the twelve travel directions.
///
/// Stored and serialized as its short token (`"n"`, `"ne"`, `"u"`,
/// `"enter"`, ...). Full words parse to the same variant, so an exit map
/// can never hold both `"north"` and `"n"`.
///
/// The derived ordering follows declaration order; exit maps iterate in
/// that order, which keeps searches deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Up,
    Down,
    Enter,
    Out,
}

impl Direction {
    pub const ALL: [Direction; 12] = [
        Self::North,
        Self::South,
        Self::East,
        Self::West,
        Self::NorthEast,
        Self::NorthWest,
        Self::SouthEast,
        Self::SouthWest,
        Self::Up,
        Self::Down,
        Self::Enter,
        Self::Out,
    ];

    /// The canonical short token.
    pub fn token(self) -> &'static str {
        match self {
            Self::North => "n",
            Self::South => "s",
            Self::East => "e",
            Self::West => "w",
            Self::NorthEast => "ne",
            Self::NorthWest => "nw",
            Self::SouthEast => "se",
            Self::SouthWest => "sw",
            Self::Up => "u",
            Self::Down => "d",
            Self::Enter => "enter",
            Self::Out => "out",
        }
    }

    /// The full-word form.
    pub fn name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::NorthEast => "northeast",
            Self::NorthWest => "northwest",
            Self::SouthEast => "southeast",
            Self::SouthWest => "southwest",
            Self::Up => "up",
            Self::Down => "down",
            Self::Enter => "enter",
            Self::Out => "out",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::NorthEast => Self::SouthWest,
            Self::SouthWest => Self::NorthEast,
            Self::NorthWest => Self::SouthEast,
            Self::SouthEast => Self::NorthWest,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Enter => Self::Out,
            Self::Out => Self::Enter,
        }
    }

    /// Parses a short token or full word, ignoring case and surrounding
    /// whitespace.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.token() == token || d.name() == token)
    }

    /// Unit grid offset `(dx, dy, dz)` used for auto-layout. North is -y.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::North => (0, -1, 0),
            Self::South => (0, 1, 0),
            Self::East => (1, 0, 0),
            Self::West => (-1, 0, 0),
            Self::NorthEast => (1, -1, 0),
            Self::NorthWest => (-1, -1, 0),
            Self::SouthEast => (1, 1, 0),
            Self::SouthWest => (-1, 1, 0),
            Self::Up => (0, 0, 1),
            Self::Down => (0, 0, -1),
            Self::Enter | Self::Out => (0, 0, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Direction {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| MapError::UnknownDirection(s.to_string()))
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown direction {token:?}")))
    }
}
