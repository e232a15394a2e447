//! Hex grid coordinates
//!
//! Boards use flat-topped hexes addressed by column/row offset coordinates
//! with odd columns shifted half a hex down. Distance and neighbor math goes
//! through axial coordinates.

use crate::core::Facing;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct HexCoord {
    pub x: i32,
    pub y: i32,
}

// Axial (q, r) offsets per facing: N, NE, SE, S, SW, NW
const AXIAL_DIRECTIONS: [(i32, i32); 6] = [(0, -1), (1, -1), (1, 0), (0, 1), (-1, 1), (-1, 0)];

impl HexCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        HexCoord { x, y }
    }

    fn to_axial(self) -> (i32, i32) {
        let q = self.x;
        let r = self.y - (self.x - (self.x & 1)) / 2;
        (q, r)
    }

    fn from_axial(q: i32, r: i32) -> Self {
        HexCoord {
            x: q,
            y: r + (q - (q & 1)) / 2,
        }
    }

    pub fn neighbor(self, facing: Facing) -> HexCoord {
        let (q, r) = self.to_axial();
        let (dq, dr) = AXIAL_DIRECTIONS[facing.value() as usize];
        HexCoord::from_axial(q + dq, r + dr)
    }

    /// Hex reached by moving `steps` hexes in a straight line
    pub fn translated(self, facing: Facing, steps: u32) -> HexCoord {
        (0..steps).fold(self, |h, _| h.neighbor(facing))
    }

    pub fn neighbors(self) -> [HexCoord; 6] {
        Facing::all().map(|f| self.neighbor(f))
    }

    pub fn distance(self, other: HexCoord) -> u32 {
        let (q1, r1) = self.to_axial();
        let (q2, r2) = other.to_axial();
        let dq = q1 - q2;
        let dr = r1 - r2;
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    pub fn is_adjacent(self, other: HexCoord) -> bool {
        self.distance(other) == 1
    }

    /// Nearest hexside direction from this hex toward `other`
    pub fn direction_to(self, other: HexCoord) -> Facing {
        let (q1, r1) = self.to_axial();
        let (q2, r2) = other.to_axial();
        let dq = (q2 - q1) as f64;
        let dr = (r2 - r1) as f64;
        // Pixel offset of a flat-topped axial step, y grows southward
        let px = 1.5 * dq;
        let py = 3f64.sqrt() * (dr + dq / 2.0);
        if px == 0.0 && py == 0.0 {
            return Facing::NORTH;
        }
        let angle = px.atan2(-py).to_degrees().rem_euclid(360.0);
        Facing::new(((angle / 60.0).round() as i32) % 6)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.x + 1, self.y + 1)
    }
}
