//! Strongly-typed wrappers for game concepts
//!
//! Newtypes keep unit names, player names, team numbers and facings from
//! being mixed up with bare strings and integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit designation (e.g. "Atlas AS7-D", "Rifle Platoon 2")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitName(String);

impl UnitName {
    pub fn new(s: impl Into<String>) -> Self {
        UnitName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UnitName {
    fn from(s: String) -> Self {
        UnitName(s)
    }
}

impl From<&str> for UnitName {
    fn from(s: &str) -> Self {
        UnitName(s.to_string())
    }
}

/// Player display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: impl Into<String>) -> Self {
        PlayerName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerName {
    fn from(s: String) -> Self {
        PlayerName(s)
    }
}

impl From<&str> for PlayerName {
    fn from(s: &str) -> Self {
        PlayerName(s.to_string())
    }
}

/// Team number. Players sharing a team share initiative and victory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team {}", self.0)
    }
}

/// One of the six hex directions, 0 = north, increasing clockwise
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Facing(u8);

impl Facing {
    pub const NORTH: Facing = Facing(0);
    pub const NORTHEAST: Facing = Facing(1);
    pub const SOUTHEAST: Facing = Facing(2);
    pub const SOUTH: Facing = Facing(3);
    pub const SOUTHWEST: Facing = Facing(4);
    pub const NORTHWEST: Facing = Facing(5);

    pub fn new(value: i32) -> Self {
        Facing(value.rem_euclid(6) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Rotate clockwise by `steps` hexsides (negative = counter-clockwise)
    pub fn rotate(self, steps: i32) -> Self {
        Facing::new(self.0 as i32 + steps)
    }

    pub fn opposite(self) -> Self {
        self.rotate(3)
    }

    pub fn all() -> [Facing; 6] {
        [
            Facing(0),
            Facing(1),
            Facing(2),
            Facing(3),
            Facing(4),
            Facing(5),
        ]
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "N",
            1 => "NE",
            2 => "SE",
            3 => "S",
            4 => "SW",
            _ => "NW",
        };
        write!(f, "{}", name)
    }
}
