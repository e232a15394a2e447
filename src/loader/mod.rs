//! Scenario loaders
//!
//! Scenarios are JSON documents describing the board, the players, their
//! forces and the game options. Loading validates every name and position
//! before a [`GameState`](crate::game::GameState) is built.

pub mod scenario;

pub use scenario::{
    load_options, BoardSpec, BuildingSpec, ChassisKind, HexSpec, Mount, PlayerSpec, Scenario,
    ScenarioLoader, UnitSpec,
};
