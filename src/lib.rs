//! skirmish-core - authoritative simulation core for a hex-map tactical wargame
//!
//! The engine owns match state and every rule decision: phase sequencing,
//! turn order, movement hazards and the damage/critical-hit pipeline.
//! Transports, map generation and rendering live outside this crate and talk
//! to it through [`server`] and [`game::Engine`].

pub mod batch;
pub mod core;
pub mod damage;
pub mod delta;
pub mod error;
pub mod game;
pub mod hazards;
pub mod loader;
pub mod map;
pub mod server;

pub use error::{Result, SimError};
