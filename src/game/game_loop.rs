//! Headless game loop
//!
//! Drives an [`Engine`] to completion with one [`PlayerController`] per
//! player: readies everyone through the lounge and report phases, hands each
//! open turn to its owner's controller and answers suspended resolutions.
//! Used by the CLI, batch runs, benchmarks and the end-to-end tests.

use crate::core::{PlayerId, TeamId};
use crate::game::actions::PlayerAction;
use crate::game::controller::{available_actions, GameStateView, PlayerController};
use crate::game::engine::{ActionOutcome, Engine};
use crate::game::events::{FeedbackResponse, Outbound};
use crate::game::logger::VerbosityLevel;
use crate::game::snapshot::{ControllerState, GameSnapshot};
use crate::game::state_hash::{compute_state_hash, format_hash};
use crate::log_verbose;
use crate::{Result, SimError};
use std::path::PathBuf;

/// Result of running a game to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// Winning team (None for a draw or an unfinished game)
    pub winner: Option<TeamId>,
    pub rounds_played: u32,
    /// Actions the engine accepted
    pub actions: u32,
    pub end_reason: GameEndReason,
}

/// Reason the game ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEndReason {
    Victory(TeamId),
    Draw,
    /// Game reached the round limit
    RoundLimit,
    /// Game was stopped to save a snapshot
    Snapshot,
}

/// Where and when to stop for a snapshot
#[derive(Debug, Clone)]
struct SnapshotStop {
    after_round: u32,
    path: PathBuf,
}

/// Game loop manager
pub struct GameLoop<'a> {
    pub engine: &'a mut Engine,
    max_rounds: u32,
    pub verbosity: VerbosityLevel,
    actions: u32,
    snapshot: Option<SnapshotStop>,
}

impl<'a> GameLoop<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        let verbosity = engine.state.logger.verbosity();
        GameLoop {
            engine,
            max_rounds: 100,
            verbosity,
            actions: 0,
            snapshot: None,
        }
    }

    /// Set maximum rounds before the game is called
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set verbosity on the loop and on the game's logger
    pub fn with_verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.verbosity = verbosity;
        self.engine.state.logger.set_verbosity(verbosity);
        self
    }

    /// Stop and save a snapshot once `round` has been played
    pub fn with_snapshot_after(mut self, round: u32, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(SnapshotStop {
            after_round: round,
            path: path.into(),
        });
        self
    }

    /// Run the game with the given player controllers
    ///
    /// Players without a controller skip every turn and take default answers.
    pub fn run_game(&mut self, controllers: &mut [&mut dyn PlayerController]) -> Result<GameResult> {
        if self.engine.state.phase == crate::game::Phase::Lounge {
            self.engine.start()?;
        } else {
            self.engine.resume()?;
        }

        let result = loop {
            self.pump_outbox();
            if self.engine.is_over() {
                let victory = self.engine.state.victory.clone().unwrap_or_default();
                break self.result(match victory.winner {
                    Some(team) => GameEndReason::Victory(team),
                    None => GameEndReason::Draw,
                });
            }
            if self.engine.state.round > self.max_rounds {
                break self.result(GameEndReason::RoundLimit);
            }
            if self.at_snapshot_point() {
                self.save_snapshot(controllers)?;
                return Ok(self.result(GameEndReason::Snapshot));
            }
            self.step(controllers)?;
        };

        self.notify_game_end(controllers, result.winner);
        Ok(result)
    }

    /// Advance the engine by one decision
    fn step(&mut self, controllers: &mut [&mut dyn PlayerController]) -> Result<()> {
        if let Some(request) = self.engine.awaiting().cloned() {
            let choice = match find(controllers, request.player) {
                Some(c) => c.choose_feedback(&GameStateView::new(&self.engine.state, request.player), &request),
                None => request.kind.default_choice(),
            };
            let response = FeedbackResponse {
                token: request.token,
                choice,
            };
            if let ActionOutcome::Rejected(_) = self.engine.resume_feedback(request.player, response)? {
                let fallback = FeedbackResponse {
                    token: request.token,
                    choice: request.kind.default_choice(),
                };
                self.engine.resume_feedback(request.player, fallback)?;
            }
            return Ok(());
        }

        let phase = self.engine.phase();
        if phase.waits_for_ready() {
            let waiting: Vec<PlayerId> = self
                .engine
                .state
                .players
                .iter()
                .filter(|p| !p.ghost && !p.done)
                .map(|p| p.id)
                .collect();
            if waiting.is_empty() {
                return Err(SimError::InvalidAction(format!("{} is waiting on nobody", phase)));
            }
            for player in waiting {
                self.submit(player, PlayerAction::Done)?;
            }
            return Ok(());
        }

        let Some(turn) = self.engine.current_turn() else {
            return Err(SimError::InvalidAction(format!("{} has no open turn", phase)));
        };
        let action = match find(controllers, turn.player) {
            Some(controller) => {
                let state = &self.engine.state;
                let candidates = available_actions(state, turn.player, &turn);
                let view = GameStateView::new(state, turn.player);
                let choice = controller.choose_action(&view, &turn, &candidates);
                if let Some(action) = &choice {
                    state.logger.decision("controller", &action.describe());
                }
                choice
            }
            None => None,
        };
        let action = action.unwrap_or(PlayerAction::SkipTurn { unit: None });
        if !self.submit(turn.player, action)? {
            // A refused choice costs the turn rather than stalling the loop
            if !self.submit(turn.player, PlayerAction::SkipTurn { unit: None })? {
                return Err(SimError::InvalidAction(format!("turn {} cannot be skipped", turn)));
            }
        }
        Ok(())
    }

    /// Hand one action to the engine; false if it was rejected
    fn submit(&mut self, player: PlayerId, action: PlayerAction) -> Result<bool> {
        match self.engine.handle_action(player, action)? {
            ActionOutcome::Rejected(reason) => {
                log_verbose!(self.engine.state.logger, "rejected: {}", reason);
                Ok(false)
            }
            ActionOutcome::Accepted | ActionOutcome::Pending(_) => {
                self.actions += 1;
                Ok(true)
            }
        }
    }

    /// Narrate what the engine produced and drop the rest
    fn pump_outbox(&mut self) {
        for event in self.engine.drain_outbox() {
            let logger = &self.engine.state.logger;
            match event {
                Outbound::Reports(batch) => {
                    for report in batch {
                        logger.normal(&report.to_string());
                    }
                }
                Outbound::GameOver(result) => {
                    logger.minimal(&format!("Game over: {}", result.reason));
                }
                Outbound::PhaseChanged { phase, round } => {
                    log_verbose!(logger, "round {} phase {}", round, phase);
                    if logger.debug_state_hash_enabled() {
                        let hash = compute_state_hash(&self.engine.state);
                        logger.verbose(&format!("state hash {}", format_hash(hash)));
                    }
                }
                _ => {}
            }
        }
    }

    fn at_snapshot_point(&self) -> bool {
        let Some(stop) = &self.snapshot else {
            return false;
        };
        let state = &self.engine.state;
        state.round > stop.after_round
            && self.engine.awaiting().is_none()
            && GameSnapshot::check_capturable(state).is_ok()
    }

    fn save_snapshot(&mut self, controllers: &mut [&mut dyn PlayerController]) -> Result<()> {
        let Some(stop) = self.snapshot.clone() else {
            return Ok(());
        };
        let states: Vec<ControllerState> = controllers.iter().filter_map(|c| c.saved_state()).collect();
        GameSnapshot::new(self.engine.state.clone())
            .with_controllers(states)
            .save_to_file(&stop.path)?;
        let state = &self.engine.state;
        state
            .logger
            .minimal(&format!("Snapshot saved to {} at round {}", stop.path.display(), state.round));
        Ok(())
    }

    fn result(&self, end_reason: GameEndReason) -> GameResult {
        let winner = match end_reason {
            GameEndReason::Victory(team) => Some(team),
            _ => None,
        };
        GameResult {
            winner,
            rounds_played: self.engine.state.round,
            actions: self.actions,
            end_reason,
        }
    }

    fn notify_game_end(&self, controllers: &mut [&mut dyn PlayerController], winner: Option<TeamId>) {
        let state = &self.engine.state;
        for controller in controllers.iter_mut() {
            let player = controller.player_id();
            let won = winner.is_some_and(|t| t == state.team_of(player));
            controller.on_game_end(&GameStateView::new(state, player), won);
        }
    }
}

fn find<'c, 'a>(
    controllers: &'c mut [&'a mut dyn PlayerController],
    player: PlayerId,
) -> Option<&'c mut (dyn PlayerController + 'a)> {
    controllers
        .iter_mut()
        .find(|c| c.player_id() == player)
        .map(|c| &mut **c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, LocationKind};
    use crate::game::random_controller::RandomController;
    use crate::game::zero_controller::ZeroController;
    use crate::game::{GameOptions, GameState};
    use crate::map::Board;

    fn duel(seed: u64) -> (Engine, PlayerId, PlayerId) {
        let mut state = GameState::new(Board::new(10, 10), GameOptions::default());
        state.seed(seed);
        state.logger.set_verbosity(VerbosityLevel::Silent);
        let a = state.add_player("Alpha", TeamId(1));
        let b = state.add_player("Bravo", TeamId(2));
        state.player_mut(a).unwrap().deploy_columns = Some((0, 1));
        state.player_mut(b).unwrap().deploy_columns = Some((8, 9));
        for (owner, name) in [(a, "Hunchback"), (b, "Enforcer")] {
            state.add_unit(
                ChassisBuilder::mech(name, 50, 4)
                    .weapon("AC/20", LocationKind::RightTorso)
                    .ammo("AC20", LocationKind::RightTorso)
                    .weapon("Medium Laser", LocationKind::LeftArm)
                    .weapon("Medium Laser", LocationKind::RightArm)
                    .build(owner),
            );
        }
        (Engine::new(state), a, b)
    }

    #[test]
    fn test_zero_controllers_play_to_a_result() {
        let (mut engine, a, b) = duel(11);
        let mut p1 = ZeroController::new(a);
        let mut p2 = ZeroController::new(b);
        let result = GameLoop::new(&mut engine)
            .with_max_rounds(60)
            .run_game(&mut [&mut p1, &mut p2])
            .unwrap();
        assert!(result.rounds_played >= 1);
        assert!(result.actions > 0);
        assert!(matches!(
            result.end_reason,
            GameEndReason::Victory(_) | GameEndReason::Draw | GameEndReason::RoundLimit
        ));
    }

    #[test]
    fn test_same_seed_same_game() {
        let run = |seed| {
            let (mut engine, a, b) = duel(seed);
            let mut p1 = RandomController::with_seed(a, 1);
            let mut p2 = RandomController::with_seed(b, 2);
            let result = GameLoop::new(&mut engine)
                .with_max_rounds(8)
                .run_game(&mut [&mut p1, &mut p2])
                .unwrap();
            (result, compute_state_hash(&engine.state))
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn test_round_limit() {
        let (mut engine, _, _) = duel(3);
        // Nobody controls anything: every turn is skipped
        let result = GameLoop::new(&mut engine).with_max_rounds(2).run_game(&mut []).unwrap();
        assert_eq!(result.end_reason, GameEndReason::RoundLimit);
        assert_eq!(result.winner, None);
        assert_eq!(result.rounds_played, 3);
    }

    #[test]
    fn test_snapshot_stop_and_resume() {
        let path = std::env::temp_dir().join("skirmish_game_loop_snapshot.json");
        let (mut engine, a, b) = duel(21);
        let mut p1 = ZeroController::new(a);
        let mut p2 = ZeroController::new(b);
        let stopped = GameLoop::new(&mut engine)
            .with_snapshot_after(1, &path)
            .run_game(&mut [&mut p1, &mut p2])
            .unwrap();
        assert_eq!(stopped.end_reason, GameEndReason::Snapshot);

        let snapshot = GameSnapshot::load_from_file(&path).unwrap();
        assert_eq!(snapshot.round, 2);
        assert_eq!(snapshot.controllers.len(), 2);
        let mut resumed = Engine::new(snapshot.game_state);
        let result = GameLoop::new(&mut resumed)
            .with_max_rounds(4)
            .run_game(&mut [&mut p1, &mut p2])
            .unwrap();
        assert!(result.rounds_played >= 2);
        let _ = std::fs::remove_file(&path);
    }
}
