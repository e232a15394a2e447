//! Board, terrain, buildings and minefields
//!
//! The board is the map provider the hazard resolvers read and mutate:
//! building construction factors drop as they take damage, minefield
//! densities decay as they detonate, and collapsed buildings become rubble.

use crate::core::PlayerId;
use crate::map::HexCoord;
use crate::{Result, SimError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Clear,
    LightWoods,
    HeavyWoods,
    Rough,
    Rubble,
    Pavement,
    Ice,
    Water,
}

impl Terrain {
    /// Extra movement points to enter
    pub fn move_cost(&self) -> u32 {
        match self {
            Terrain::Clear | Terrain::Pavement => 0,
            Terrain::LightWoods | Terrain::Rough | Terrain::Rubble => 1,
            Terrain::HeavyWoods => 2,
            Terrain::Ice => 1,
            Terrain::Water => 1,
        }
    }

    /// To-hit modifier for a target standing in this terrain
    pub fn to_hit_modifier(&self) -> i32 {
        match self {
            Terrain::LightWoods => 1,
            Terrain::HeavyWoods => 2,
            _ => 0,
        }
    }

    pub fn is_slippery(&self) -> bool {
        matches!(self, Terrain::Pavement | Terrain::Ice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MineKind {
    Conventional,
    Vibrabomb,
    Command,
    Active,
    Inferno,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minefield {
    pub kind: MineKind,
    pub density: u32,
    pub owner: PlayerId,
    /// Vibrabomb tonnage setting
    #[serde(default)]
    pub setting: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub name: String,
    /// Current construction factor
    pub cf: u32,
    pub initial_cf: u32,
    /// Height in levels above the hex floor
    pub height: i32,
    #[serde(default)]
    pub collapsed: bool,
}

impl Building {
    pub fn new(name: impl Into<String>, cf: u32, height: i32) -> Self {
        Building {
            name: name.into(),
            cf,
            initial_cf: cf,
            height,
            collapsed: false,
        }
    }

    /// Damage absorbed by the building before a shot reaches a unit inside
    pub fn absorption(&self) -> u32 {
        self.cf / 10
    }

    /// Apply damage and return true if the building must collapse
    pub fn damage(&mut self, amount: u32) -> bool {
        self.cf = self.cf.saturating_sub(amount);
        self.cf == 0 && !self.collapsed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hex {
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub elevation: i32,
    /// Water depth in levels (only meaningful for water hexes)
    #[serde(default)]
    pub depth: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<Building>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub minefields: Vec<Minefield>,
    #[serde(default)]
    pub on_fire: bool,
}

impl Hex {
    pub fn is_water(&self) -> bool {
        self.terrain == Terrain::Water && self.depth > 0
    }

    /// Level a unit stands at when entering the hex
    pub fn floor(&self) -> i32 {
        if self.is_water() {
            self.elevation - self.depth
        } else {
            self.elevation
        }
    }

    /// Highest level of the hex (rooftop if a standing building is present)
    pub fn ceiling(&self) -> i32 {
        match &self.building {
            Some(b) if !b.collapsed => self.elevation + b.height,
            _ => self.elevation,
        }
    }

    pub fn has_building(&self) -> bool {
        matches!(&self.building, Some(b) if !b.collapsed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub width: i32,
    pub height: i32,
    hexes: Vec<Hex>,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Board {
            width,
            height,
            hexes: vec![Hex::default(); (width * height) as usize],
        }
    }

    pub fn contains(&self, coord: HexCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: HexCoord) -> Option<usize> {
        self.contains(coord)
            .then(|| (coord.y * self.width + coord.x) as usize)
    }

    pub fn hex(&self, coord: HexCoord) -> Option<&Hex> {
        self.index(coord).and_then(|i| self.hexes.get(i))
    }

    pub fn hex_mut(&mut self, coord: HexCoord) -> Option<&mut Hex> {
        self.index(coord).and_then(move |i| self.hexes.get_mut(i))
    }

    pub fn hex_or_err(&self, coord: HexCoord) -> Result<&Hex> {
        self.hex(coord)
            .ok_or_else(|| SimError::InvalidPosition(format!("hex {} is off the board", coord)))
    }

    pub fn set_hex(&mut self, coord: HexCoord, hex: Hex) -> Result<()> {
        let slot = self
            .hex_mut(coord)
            .ok_or_else(|| SimError::InvalidPosition(format!("hex {} is off the board", coord)))?;
        *slot = hex;
        Ok(())
    }

    pub fn is_edge(&self, coord: HexCoord) -> bool {
        self.contains(coord)
            && (coord.x == 0 || coord.y == 0 || coord.x == self.width - 1 || coord.y == self.height - 1)
    }

    pub fn coords(&self) -> impl Iterator<Item = HexCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| HexCoord::new(x, y)))
    }

    pub fn has_minefields(&self, coord: HexCoord) -> bool {
        self.hex(coord).is_some_and(|h| !h.minefields.is_empty())
    }

    /// Place a minefield, merging density with an existing field of the same kind
    pub fn add_minefield(&mut self, coord: HexCoord, field: Minefield) -> Result<()> {
        let hex = self
            .hex_mut(coord)
            .ok_or_else(|| SimError::InvalidPosition(format!("hex {} is off the board", coord)))?;
        if let Some(existing) = hex
            .minefields
            .iter_mut()
            .find(|m| m.kind == field.kind && m.owner == field.owner)
        {
            existing.density = (existing.density + field.density).min(30);
        } else {
            hex.minefields.push(field);
        }
        Ok(())
    }

    /// Turn a collapsed building hex into rubble
    pub fn collapse_building(&mut self, coord: HexCoord) {
        if let Some(hex) = self.hex_mut(coord) {
            if let Some(b) = hex.building.as_mut() {
                b.collapsed = true;
                b.cf = 0;
            }
            hex.terrain = Terrain::Rubble;
        }
    }
}
