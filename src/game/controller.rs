//! Player controller trait and game state view
//!
//! This module defines the interface between the headless game loop and
//! player controllers (bots, scripted test players). The loop asks the
//! controller whose turn it is to pick one of the candidate actions, and the
//! controller inspects a read-only view of the game state to make its choice.

use crate::core::{LocationKind, PlayerId, Unit, UnitId};
use crate::game::actions::{AttackDeclaration, MovePath, MovePathMode, MoveStep, PlayerAction};
use crate::game::attacks::validate_attacks;
use crate::game::events::FeedbackRequest;
use crate::game::movement::plan_move;
use crate::game::snapshot::ControllerState;
use crate::game::turn::TurnDescriptor;
use crate::game::turn_order::is_eligible;
use crate::game::{GameLogger, GameState, Phase};
use crate::map::{Board, HexCoord, MineKind};

/// Deployment hexes offered per unit
const DEPLOY_CANDIDATES: usize = 6;

/// Read-only view of game state for controllers
///
/// This provides access to game information without allowing mutation.
/// Controllers should only inspect this view to make decisions.
pub struct GameStateView<'a> {
    game: &'a GameState,
    player_id: PlayerId,
}

impl<'a> GameStateView<'a> {
    /// Create a new view of the game state from a player's perspective
    pub fn new(game: &'a GameState, player_id: PlayerId) -> Self {
        GameStateView { game, player_id }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn phase(&self) -> Phase {
        self.game.phase
    }

    pub fn round(&self) -> u32 {
        self.game.round
    }

    pub fn board(&self) -> &Board {
        &self.game.board
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.game.unit(id).ok()
    }

    /// Units this player owns that are still alive
    pub fn own_units(&self) -> impl Iterator<Item = &Unit> + '_ {
        let player = self.player_id;
        self.game
            .units
            .values()
            .filter(move |u| u.owner == player && u.is_alive())
    }

    /// Enemy units currently on the board
    pub fn enemy_units(&self) -> impl Iterator<Item = &Unit> + '_ {
        let team = self.game.team_of(self.player_id);
        self.game.units.values().filter(move |u| {
            u.is_active() && u.position.is_some() && self.game.team_of(u.owner) != team
        })
    }

    /// Closest enemy to `hex`, lowest id on ties
    pub fn nearest_enemy(&self, hex: HexCoord) -> Option<&Unit> {
        self.enemy_units()
            .filter_map(|u| u.position.map(|p| (u, p)))
            .min_by_key(|(u, p)| (hex.distance(*p), u.id))
            .map(|(u, _)| u)
    }

    /// Controllers log their reasoning through the game logger
    pub fn logger(&self) -> &GameLogger {
        &self.game.logger
    }

    /// Candidate actions for the current turn
    pub fn available_actions(&self, turn: &TurnDescriptor) -> Vec<PlayerAction> {
        available_actions(self.game, self.player_id, turn)
    }
}

/// Player controller trait
///
/// Implement this trait to create bots or connect scripted players.
/// The game loop calls these methods whenever this player has to decide.
pub trait PlayerController {
    /// Get the player ID this controller is responsible for
    fn player_id(&self) -> PlayerId;

    /// Choose an action for the open turn
    ///
    /// `available_actions` never contains a bare skip; returning None skips
    /// the turn.
    fn choose_action(
        &mut self,
        view: &GameStateView,
        turn: &TurnDescriptor,
        available_actions: &[PlayerAction],
    ) -> Option<PlayerAction>;

    /// Answer a suspended resolution; the index must be below `request.kind.choices()`
    fn choose_feedback(&mut self, _view: &GameStateView, request: &FeedbackRequest) -> usize {
        request.kind.default_choice()
    }

    /// Called when the game ends (for cleanup/logging)
    fn on_game_end(&mut self, _view: &GameStateView, _won: bool) {}

    /// State to carry in a snapshot; None if the controller cannot be rebuilt
    fn saved_state(&self) -> Option<ControllerState> {
        None
    }
}

/// Every action worth considering for `player` on `turn`
///
/// Candidates are checked with the same validators the engine uses, so each
/// one would be accepted if submitted against the current state.
pub fn available_actions(state: &GameState, player: PlayerId, turn: &TurnDescriptor) -> Vec<PlayerAction> {
    let mut actions = Vec::new();
    if turn.player != player {
        return actions;
    }
    let phase = state.phase;
    let units: Vec<&Unit> = state
        .units
        .values()
        .filter(|u| turn.accepts(u) && is_eligible(state, phase, u))
        .collect();

    match phase {
        Phase::DeployMinefields => {
            if let Ok(p) = state.player(player) {
                if p.mines.total() > 0 {
                    let center = HexCoord::new(state.board.width / 2, state.board.height / 2);
                    let kinds = [
                        (MineKind::Conventional, p.mines.conventional),
                        (MineKind::Vibrabomb, p.mines.vibrabomb),
                        (MineKind::Command, p.mines.command),
                        (MineKind::Active, p.mines.active),
                        (MineKind::Inferno, p.mines.inferno),
                    ];
                    for (kind, left) in kinds {
                        if left > 0 && state.board.contains(center) {
                            actions.push(PlayerAction::DeployMinefield {
                                hex: center,
                                kind,
                                density: 10,
                                setting: 0,
                            });
                        }
                    }
                }
            }
            actions.push(PlayerAction::EndMinefields);
        }
        Phase::SetArtilleryTargets => {
            actions.push(PlayerAction::SetArtilleryAutoHit { hexes: Vec::new() });
        }
        Phase::Deployment => {
            for unit in units {
                deploy_candidates(state, player, unit, &mut actions);
            }
        }
        Phase::Movement => {
            for unit in units {
                move_candidates(state, unit, &mut actions);
            }
        }
        Phase::Firing => {
            for unit in units {
                fire_candidates(state, unit, &mut actions);
            }
        }
        Phase::Physical => {
            for unit in units {
                physical_candidates(state, unit, &mut actions);
            }
        }
        Phase::Targeting | Phase::Offboard => {
            for unit in units {
                artillery_candidates(state, unit, &mut actions);
            }
        }
        _ => {}
    }
    actions
}

fn deploy_candidates(state: &GameState, player: PlayerId, unit: &Unit, actions: &mut Vec<PlayerAction>) {
    let Ok(p) = state.player(player) else {
        return;
    };
    let center = HexCoord::new(state.board.width / 2, state.board.height / 2);
    let hexes = state
        .board
        .coords()
        .filter(|&hex| p.can_deploy_at(hex) && state.can_occupy(unit.id, hex))
        .filter(|&hex| {
            state
                .board
                .hex(hex)
                .is_some_and(|h| !h.is_water() || unit.movement.can_enter_water())
        })
        .take(DEPLOY_CANDIDATES);
    for hex in hexes {
        let facing = if hex == center {
            unit.facing
        } else {
            hex.direction_to(center)
        };
        actions.push(PlayerAction::Deploy {
            unit: unit.id,
            hex,
            facing,
        });
    }
}

fn move_candidates(state: &GameState, unit: &Unit, actions: &mut Vec<PlayerAction>) {
    let Some(pos) = unit.position else {
        return;
    };
    let mut paths = Vec::new();
    if unit.prone {
        paths.push(MovePath::new(unit.id, MovePathMode::Walk).step(MoveStep::GetUp));
    }

    // Head for the nearest enemy first
    let view = GameStateView::new(state, unit.owner);
    if let Some(target) = view.nearest_enemy(pos).and_then(|e| e.position) {
        let wanted = pos.direction_to(target);
        let right = (i32::from(wanted.value()) - i32::from(unit.facing.value())).rem_euclid(6);
        let (turn, count) = if right <= 3 {
            (MoveStep::TurnRight, right)
        } else {
            (MoveStep::TurnLeft, 6 - right)
        };
        let stop = pos.distance(target).saturating_sub(1);
        for mode in [MovePathMode::Run, MovePathMode::Walk] {
            for hexes in (1..=stop).rev() {
                let mut path = MovePath::new(unit.id, mode);
                if unit.prone {
                    path = path.step(MoveStep::GetUp);
                }
                for _ in 0..count {
                    path = path.step(turn);
                }
                paths.push(path.forward(hexes));
            }
        }
    }
    for hexes in (1..=unit.walk_mp).rev() {
        paths.push(MovePath::new(unit.id, MovePathMode::Walk).forward(hexes));
    }
    for turn in [MoveStep::TurnLeft, MoveStep::TurnRight] {
        paths.push(MovePath::new(unit.id, MovePathMode::Walk).step(turn).forward(1));
    }

    for path in paths {
        if !path.steps.is_empty() && plan_move(state, &path).is_ok() {
            let action = PlayerAction::Move(path);
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
    }
}

fn fire_candidates(state: &GameState, unit: &Unit, actions: &mut Vec<PlayerAction>) {
    let view = GameStateView::new(state, unit.owner);
    let mut enemies: Vec<&Unit> = view.enemy_units().collect();
    if let Some(pos) = unit.position {
        enemies.sort_by_key(|e| (e.position.map_or(u32::MAX, |p| pos.distance(p)), e.id));
    }
    for enemy in enemies {
        let attacks: Vec<AttackDeclaration> = unit
            .ready_weapons()
            .into_iter()
            .map(|weapon| AttackDeclaration::Weapon {
                weapon,
                target: enemy.id,
            })
            .filter(|d| validate_attacks(state, unit.id, std::slice::from_ref(d)).is_ok())
            .collect();
        if !attacks.is_empty() {
            actions.push(PlayerAction::Attack {
                unit: unit.id,
                attacks,
            });
        }
    }
}

fn physical_candidates(state: &GameState, unit: &Unit, actions: &mut Vec<PlayerAction>) {
    let view = GameStateView::new(state, unit.owner);
    let Some(pos) = unit.position else {
        return;
    };
    for enemy in view.enemy_units() {
        if !enemy.position.is_some_and(|p| p.is_adjacent(pos)) {
            continue;
        }
        let target = enemy.id;
        let options = [
            vec![AttackDeclaration::Kick { target }],
            vec![
                AttackDeclaration::Punch {
                    target,
                    arm: LocationKind::LeftArm,
                },
                AttackDeclaration::Punch {
                    target,
                    arm: LocationKind::RightArm,
                },
            ],
            vec![AttackDeclaration::Push { target }],
        ];
        for attacks in options {
            if validate_attacks(state, unit.id, &attacks).is_ok() {
                actions.push(PlayerAction::Attack {
                    unit: unit.id,
                    attacks,
                });
            }
        }
    }
}

fn artillery_candidates(state: &GameState, unit: &Unit, actions: &mut Vec<PlayerAction>) {
    let view = GameStateView::new(state, unit.owner);
    let targets: Vec<HexCoord> = view.enemy_units().filter_map(|e| e.position).collect();
    for weapon in unit.ready_weapons() {
        for &hex in &targets {
            let attacks = vec![AttackDeclaration::Artillery { weapon, hex }];
            if validate_attacks(state, unit.id, &attacks).is_ok() {
                actions.push(PlayerAction::Attack {
                    unit: unit.id,
                    attacks,
                });
            }
        }
    }
}
