//! Game snapshots for stop-and-resume play
//!
//! Snapshots are taken at round boundaries, when no resolution is suspended
//! and no attacks are pending. Loading re-derives the carrier/passenger and
//! player/team links and validates them before the engine may resume.

use crate::core::PlayerId;
use crate::game::controller::PlayerController;
use crate::game::random_controller::RandomController;
use crate::game::state::GameState;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Controller state that can be preserved across snapshot/resume
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "controller_type")]
pub enum ControllerState {
    /// Stateless, always takes the first candidate
    Zero { player: PlayerId },

    /// Random controller with its own RNG state
    Random(RandomController),
}

/// A game saved between rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// The complete game state
    pub game_state: GameState,

    /// Round number when this snapshot was created
    pub round: u32,

    /// Controllers to rebuild on resume, one per player that had one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controllers: Vec<ControllerState>,
}

impl GameSnapshot {
    pub fn new(game_state: GameState) -> Self {
        let round = game_state.round;
        GameSnapshot {
            game_state,
            round,
            controllers: Vec::new(),
        }
    }

    pub fn with_controllers(mut self, controllers: Vec<ControllerState>) -> Self {
        self.controllers = controllers;
        self
    }

    /// Refuse to capture a state that is mid-resolution
    pub fn check_capturable(state: &GameState) -> Result<(), SnapshotError> {
        if !state.attacks.is_empty() || !state.pending_psrs.is_empty() || !state.pending_collapses.is_empty() {
            return Err(SnapshotError::InvalidState(format!(
                "round {} has unresolved attacks or hazards",
                state.round
            )));
        }
        Ok(())
    }

    /// Save this snapshot to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        Self::check_capturable(&self.game_state)?;
        let json = serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        std::fs::write(path.as_ref(), json).map_err(|e| SnapshotError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file and restore its references
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| SnapshotError::Io(e.to_string()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let mut snapshot: GameSnapshot =
            serde_json::from_str(json).map_err(|e| SnapshotError::Deserialization(e.to_string()))?;
        snapshot
            .game_state
            .restore_references()
            .map_err(|e| SnapshotError::InvalidState(e.to_string()))?;
        Ok(snapshot)
    }

    pub fn controller_for(&self, player: PlayerId) -> Option<&ControllerState> {
        self.controllers.iter().find(|c| match c {
            ControllerState::Zero { player: p } => *p == player,
            ControllerState::Random(r) => r.player_id() == player,
        })
    }
}

/// Errors that can occur during snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialization(String),

    #[error("Failed to deserialize snapshot: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid snapshot state: {0}")]
    InvalidState(String),
}

impl From<SnapshotError> for crate::SimError {
    fn from(e: SnapshotError) -> Self {
        crate::SimError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, Facing, LocationKind, TeamId};
    use crate::game::state::PendingPsr;
    use crate::game::GameOptions;
    use crate::map::{Board, HexCoord};

    fn state_with_carrier() -> GameState {
        let mut state = GameState::new(Board::new(8, 8), GameOptions::default());
        let a = state.add_player("Alpha", TeamId(1));
        state.add_player("Bravo", TeamId(2));
        let apc = state.add_unit(ChassisBuilder::mech("Carrier", 50, 4).build(a));
        let rider = state.add_unit(
            ChassisBuilder::mech("Rider", 20, 6)
                .weapon("Medium Laser", LocationKind::RightArm)
                .build(a),
        );
        state.unit_mut(apc).unwrap().transport.carried.push(rider);
        state.unit_mut(rider).unwrap().transport.carrier = Some(apc);
        state.unit_mut(apc).unwrap().deployed = true;
        state.place_unit(apc, HexCoord::new(2, 2), Facing::NORTH, 0).unwrap();
        state.round = 3;
        state
    }

    #[test]
    fn test_round_trip_restores_references() {
        let state = state_with_carrier();
        let a = state.players[0].id;
        let snapshot = GameSnapshot::new(state)
            .with_controllers(vec![ControllerState::Random(RandomController::with_seed(a, 9))]);
        let json = serde_json::to_string(&snapshot).unwrap();

        // Team rosters are rebuilt from the players on load
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for team in value["game_state"]["teams"].as_array_mut().unwrap() {
            team["members"] = serde_json::json!([]);
        }
        let loaded = GameSnapshot::from_json(&value.to_string()).unwrap();

        assert_eq!(loaded.round, 3);
        assert_eq!(loaded.game_state.teams[0].members, vec![a]);
        let carrier = loaded.game_state.units.values().find(|u| u.name.as_str() == "Carrier").unwrap();
        assert_eq!(carrier.transport.carried.len(), 1);
        match loaded.controller_for(a) {
            Some(ControllerState::Random(r)) => assert_eq!(r.player_id(), a),
            other => panic!("unexpected controller {:?}", other),
        }
    }

    #[test]
    fn test_unknown_owner_fails_validation() {
        let state = state_with_carrier();
        let mut value = serde_json::to_value(GameSnapshot::new(state)).unwrap();
        value["game_state"]["players"].as_array_mut().unwrap().clear();
        let err = GameSnapshot::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidState(_)));
    }

    #[test]
    fn test_mid_resolution_state_is_not_saved() {
        let mut state = state_with_carrier();
        let unit = state.units.ids_sorted()[0];
        state.pending_psrs.push(PendingPsr {
            unit,
            modifier: 0,
            reason: "test".into(),
        });
        let dir = std::env::temp_dir().join("skirmish_snapshot_mid_resolution.json");
        let err = GameSnapshot::new(state).save_to_file(&dir).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidState(_)));
    }
}
