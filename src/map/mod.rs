//! Map provider: hex coordinates and board state

pub mod board;
pub mod hex;

pub use board::{Board, Building, Hex, MineKind, Minefield, Terrain};
pub use hex::HexCoord;
