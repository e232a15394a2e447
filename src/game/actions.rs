//! Actions players submit to the engine

use crate::core::{Facing, LocationKind, UnitId};
use crate::map::{HexCoord, MineKind};
use serde::{Deserialize, Serialize};

/// One step of a movement path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStep {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    GoProne,
    GetUp,
    /// Board a carrier in the current hex
    Load(UnitId),
    /// Drop a carried unit into the current hex
    Unload(UnitId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePathMode {
    Walk,
    Run,
    Jump,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePath {
    pub unit: UnitId,
    pub mode: MovePathMode,
    pub steps: Vec<MoveStep>,
}

impl MovePath {
    pub fn new(unit: UnitId, mode: MovePathMode) -> Self {
        MovePath {
            unit,
            mode,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: MoveStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn forward(self, hexes: u32) -> Self {
        (0..hexes).fold(self, |p, _| p.step(MoveStep::Forward))
    }

    pub fn hexes_entered(&self) -> u32 {
        self.steps
            .iter()
            .filter(|s| matches!(s, MoveStep::Forward | MoveStep::Backward))
            .count() as u32
    }
}

/// A declared attack, resolved when its phase ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackDeclaration {
    Weapon {
        /// Index into the attacker's equipment
        weapon: usize,
        target: UnitId,
    },
    Artillery {
        weapon: usize,
        hex: HexCoord,
    },
    Punch {
        target: UnitId,
        arm: LocationKind,
    },
    Kick {
        target: UnitId,
    },
    Push {
        target: UnitId,
    },
    Charge {
        target: UnitId,
    },
}

impl AttackDeclaration {
    pub fn target(&self) -> Option<UnitId> {
        match self {
            AttackDeclaration::Weapon { target, .. }
            | AttackDeclaration::Punch { target, .. }
            | AttackDeclaration::Kick { target }
            | AttackDeclaration::Push { target }
            | AttackDeclaration::Charge { target } => Some(*target),
            AttackDeclaration::Artillery { .. } => None,
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            AttackDeclaration::Punch { .. }
                | AttackDeclaration::Kick { .. }
                | AttackDeclaration::Push { .. }
                | AttackDeclaration::Charge { .. }
        )
    }
}

/// Inbound game actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Ready to leave the lounge or a report phase
    Done,
    DeployMinefield {
        hex: HexCoord,
        kind: MineKind,
        density: u32,
        #[serde(default)]
        setting: u32,
    },
    /// Finish placing minefields this turn
    EndMinefields,
    SetArtilleryAutoHit { hexes: Vec<HexCoord> },
    Deploy {
        unit: UnitId,
        hex: HexCoord,
        facing: Facing,
    },
    Move(MovePath),
    Attack {
        unit: UnitId,
        attacks: Vec<AttackDeclaration>,
    },
    /// Give up the current turn; with a unit, that unit is done for the phase
    SkipTurn { unit: Option<UnitId> },
}

impl PlayerAction {
    pub fn unit(&self) -> Option<UnitId> {
        match self {
            PlayerAction::Deploy { unit, .. } | PlayerAction::Attack { unit, .. } => Some(*unit),
            PlayerAction::Move(path) => Some(path.unit),
            PlayerAction::SkipTurn { unit } => *unit,
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PlayerAction::Done => "done".to_string(),
            PlayerAction::DeployMinefield { hex, kind, density, .. } => {
                format!("minefield {:?} ({}) at {}", kind, density, hex)
            }
            PlayerAction::EndMinefields => "end minefields".to_string(),
            PlayerAction::SetArtilleryAutoHit { hexes } => {
                format!("{} artillery auto-hit hexes", hexes.len())
            }
            PlayerAction::Deploy { unit, hex, facing } => {
                format!("deploy unit {} at {} facing {}", unit, hex, facing)
            }
            PlayerAction::Move(path) => format!(
                "move unit {} {:?} {} steps",
                path.unit,
                path.mode,
                path.steps.len()
            ),
            PlayerAction::Attack { unit, attacks } => {
                format!("unit {} declares {} attacks", unit, attacks.len())
            }
            PlayerAction::SkipTurn { unit: Some(unit) } => format!("unit {} skips", unit),
            PlayerAction::SkipTurn { unit: None } => "skip turn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_builder_counts_hexes() {
        let path = MovePath::new(UnitId::new(1), MovePathMode::Walk)
            .forward(2)
            .step(MoveStep::TurnLeft)
            .step(MoveStep::Backward);
        assert_eq!(path.hexes_entered(), 3);
        assert_eq!(path.steps.len(), 4);
    }

    #[test]
    fn test_action_round_trips_through_json() {
        let action = PlayerAction::Attack {
            unit: UnitId::new(4),
            attacks: vec![AttackDeclaration::Kick {
                target: UnitId::new(7),
            }],
        };
        let json = serde_json::to_string(&action).unwrap();
        let back: PlayerAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
        assert_eq!(back.unit(), Some(UnitId::new(4)));
    }
}
