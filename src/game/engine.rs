//! Phase state machine and action dispatch
//!
//! The [`Engine`] owns the game state and is the only thing that mutates it.
//! Each inbound action runs to completion: it is validated against the
//! current phase and turn, resolved (possibly through the damage pipeline
//! and the hazard resolvers), and then control returns here to pick the next
//! turn or phase.
//!
//! Phase changes are driven by an explicit loop over [`Flow`] values rather
//! than recursion, so a chain of phases that end immediately (no turns, auto
//! advancing reports) never grows the stack.
//!
//! Attack resolution may suspend on a participant's choice (manual AMS). The
//! engine then returns a [`FeedbackRequest`] and accepts nothing but the
//! matching [`FeedbackResponse`] until the choice is made, defaulted on
//! disconnect, or forced by an admin command.

use crate::core::{PlayerId, UnitId};
use crate::game::actions::PlayerAction;
use crate::game::attacks::{self, AttackSummary};
use crate::game::events::{AmsOption, FeedbackKind, FeedbackRequest, FeedbackResponse, Outbound};
use crate::game::heat::resolve_end_phase;
use crate::game::movement::{deploy_unit, execute_move, plan_move};
use crate::game::turn::TurnDescriptor;
use crate::game::turn_order::{build_turns, group_followups, is_eligible, roll_initiative};
use crate::game::{GameState, Phase, Subject};
use crate::hazards::psr;
use crate::log_verbose;
use crate::map::Minefield;
use crate::{Result, SimError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Result of handing the engine one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Accepted,
    /// Nothing was mutated
    Rejected(String),
    /// Resolution is suspended until the request is answered
    Pending(FeedbackRequest),
}

/// Operator commands from the command dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminCommand {
    ForceAdvancePhase,
    ResetRound,
    ForceSkipTurn,
    /// Back to the lounge
    Reset,
}

/// Next step of the phase machine
#[derive(Debug)]
enum Flow {
    /// Waiting on participants
    Wait,
    EndPhase,
    Enter(Phase),
    Suspend(FeedbackRequest),
}

/// Attack resolution waiting on AMS assignments
#[derive(Debug, Default)]
struct AmsResolution {
    queue: VecDeque<(UnitId, Vec<AmsOption>)>,
    /// Defender -> index of the engaged attack
    chosen: FxHashMap<UnitId, usize>,
    waiting: Option<FeedbackRequest>,
}

impl AmsResolution {
    fn record(&mut self, kind: &FeedbackKind, choice: usize) {
        let FeedbackKind::AmsTarget { defender, options } = kind;
        if let Some(option) = options.get(choice) {
            self.chosen.insert(*defender, option.attack);
        }
    }
}

pub struct Engine {
    pub state: GameState,
    outbox: Vec<Outbound>,
    ams: Option<AmsResolution>,
    next_token: u64,
    /// Summary of the most recent attack resolution
    last_attacks: Option<AttackSummary>,
}

impl Engine {
    pub fn new(state: GameState) -> Self {
        Engine {
            state,
            outbox: Vec::new(),
            ams: None,
            next_token: 1,
            last_attacks: None,
        }
    }

    /// Open the lounge of a fresh game
    pub fn start(&mut self) -> Result<Option<FeedbackRequest>> {
        self.drive(Flow::Enter(Phase::Lounge))
    }

    /// Pick up a restored game where its snapshot left off
    pub fn resume(&mut self) -> Result<Option<FeedbackRequest>> {
        let phase = self.state.phase;
        self.outbox.push(Outbound::PhaseChanged {
            phase,
            round: self.state.round,
        });
        let flow = if phase.has_turns() {
            self.push_turn_queue();
            self.settle_turn()
        } else if phase.waits_for_ready() && self.all_ready() {
            Flow::EndPhase
        } else {
            Flow::Wait
        };
        self.drive(flow)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_over(&self) -> bool {
        self.state.phase == Phase::Victory
    }

    pub fn current_turn(&self) -> Option<TurnDescriptor> {
        if self.state.phase.has_turns() {
            self.state.turns.current().copied()
        } else {
            None
        }
    }

    /// The feedback request resolution is suspended on, if any
    pub fn awaiting(&self) -> Option<&FeedbackRequest> {
        self.ams.as_ref().and_then(|a| a.waiting.as_ref())
    }

    pub fn last_attacks(&self) -> Option<&AttackSummary> {
        self.last_attacks.as_ref()
    }

    /// Take everything queued for collaborators, journal and reports included
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        self.flush();
        std::mem::take(&mut self.outbox)
    }

    /// Validate and resolve one participant action
    pub fn handle_action(&mut self, player: PlayerId, action: PlayerAction) -> Result<ActionOutcome> {
        log_verbose!(self.state.logger, "player {} -> {}", player, action.describe());
        let flow = match self.apply_action(player, action) {
            Ok(flow) => flow,
            Err(e) => return Ok(self.reject(player, e)),
        };
        Ok(match self.drive(flow)? {
            Some(request) => ActionOutcome::Pending(request),
            None => ActionOutcome::Accepted,
        })
    }

    /// Answer the suspended feedback request
    pub fn resume_feedback(&mut self, player: PlayerId, response: FeedbackResponse) -> Result<ActionOutcome> {
        let check = match self.awaiting() {
            Some(req) if req.token != response.token => Err(SimError::UnknownFeedbackToken(response.token)),
            Some(req) if req.player != player => Err(SimError::InvalidAction(format!(
                "feedback {} is addressed to player {}",
                req.token, req.player
            ))),
            Some(req) if response.choice >= req.kind.choices() => Err(SimError::InvalidAction(format!(
                "choice {} out of {}",
                response.choice,
                req.kind.choices()
            ))),
            Some(_) => Ok(()),
            None => Err(SimError::UnknownFeedbackToken(response.token)),
        };
        if let Err(e) = check {
            return Ok(self.reject(player, e));
        }
        if let Some(ams) = self.ams.as_mut() {
            if let Some(req) = ams.waiting.take() {
                ams.record(&req.kind, response.choice);
            }
        }
        let flow = self.continue_ams(false)?;
        Ok(match self.drive(flow)? {
            Some(request) => ActionOutcome::Pending(request),
            None => ActionOutcome::Accepted,
        })
    }

    pub fn player_connected(&mut self, player: PlayerId) -> Result<()> {
        self.state.player_mut(player)?.ghost = false;
        Ok(())
    }

    /// Mark a player as a ghost, skipping their turn and defaulting anything
    /// they were asked
    pub fn player_disconnected(&mut self, player: PlayerId) -> Result<Option<FeedbackRequest>> {
        let p = self.state.player_mut(player)?;
        p.ghost = true;
        let name = p.name.clone();
        let team = p.team;
        self.state.report(
            Subject::player(player, team),
            format!("{} disconnected", name),
        );

        let flow = if self.awaiting().is_some_and(|r| r.player == player) {
            if let Some(ams) = self.ams.as_mut() {
                if let Some(req) = ams.waiting.take() {
                    ams.record(&req.kind, req.kind.default_choice());
                }
            }
            self.continue_ams(false)?
        } else if self.ams.is_some() {
            Flow::Wait
        } else if self.current_turn().is_some_and(|t| t.player == player) {
            self.state.turns.advance();
            self.settle_turn()
        } else if self.state.phase.waits_for_ready() && self.all_ready() {
            Flow::EndPhase
        } else {
            Flow::Wait
        };
        self.drive(flow)
    }

    pub fn admin(&mut self, command: AdminCommand) -> Result<Option<FeedbackRequest>> {
        self.state.report(Subject::public(), format!("Admin: {:?}", command));
        let flow = match command {
            AdminCommand::ForceAdvancePhase => {
                if self.ams.is_some() {
                    self.continue_ams(true)?
                } else if self.is_over() {
                    Flow::Wait
                } else {
                    Flow::EndPhase
                }
            }
            AdminCommand::ForceSkipTurn => {
                if self.ams.is_none() && self.current_turn().is_some() {
                    self.state.turns.advance();
                    self.settle_turn()
                } else {
                    Flow::Wait
                }
            }
            AdminCommand::ResetRound => {
                self.discard_round();
                self.state.round = self.state.round.saturating_sub(1);
                Flow::Enter(Phase::Initiative)
            }
            AdminCommand::Reset => {
                self.discard_round();
                let s = &mut self.state;
                s.round = 0;
                s.artillery.clear();
                s.victory = None;
                s.initiative_order.clear();
                Flow::Enter(Phase::Lounge)
            }
        };
        self.drive(flow)
    }

    fn discard_round(&mut self) {
        self.ams = None;
        let s = &mut self.state;
        s.attacks.clear();
        s.pending_psrs.clear();
        s.turns.clear();
        for unit in s.units.values_mut() {
            unit.reset_round();
        }
    }

    fn reject(&mut self, player: PlayerId, error: SimError) -> ActionOutcome {
        let reason = error.to_string();
        log_verbose!(self.state.logger, "rejected for player {}: {}", player, reason);
        self.outbox.push(Outbound::Rejected {
            player,
            reason: reason.clone(),
            turns: self.state.turns.turns().to_vec(),
            index: self.state.turns.index(),
        });
        ActionOutcome::Rejected(reason)
    }

    fn all_ready(&self) -> bool {
        self.state.players.iter().filter(|p| !p.ghost).all(|p| p.done)
    }

    fn flush(&mut self) {
        for delta in self.state.journal.drain() {
            self.outbox.push(Outbound::UnitUpdate(delta));
        }
        let reports = self.state.reports.flush();
        if !reports.is_empty() {
            self.outbox.push(Outbound::Reports(reports));
        }
    }

    fn push_turn_queue(&mut self) {
        self.outbox.push(Outbound::TurnQueue {
            turns: self.state.turns.turns().to_vec(),
            index: self.state.turns.index(),
        });
    }

    fn drive(&mut self, mut flow: Flow) -> Result<Option<FeedbackRequest>> {
        loop {
            flow = match flow {
                Flow::Wait => return Ok(None),
                Flow::Suspend(request) => return Ok(Some(request)),
                Flow::EndPhase => self.end_phase()?,
                Flow::Enter(phase) => self.enter_phase(phase)?,
            };
        }
    }

    /// Validate and apply an action. Errors leave the state untouched.
    fn apply_action(&mut self, player: PlayerId, action: PlayerAction) -> Result<Flow> {
        if self.ams.is_some() {
            return Err(SimError::InvalidAction("waiting for a feedback response".into()));
        }
        let phase = self.state.phase;
        self.state.player(player)?;

        if action == PlayerAction::Done {
            if !phase.waits_for_ready() {
                return Err(SimError::WrongPhase(phase.to_string()));
            }
            self.state.player_mut(player)?.done = true;
            return Ok(if self.all_ready() { Flow::EndPhase } else { Flow::Wait });
        }

        if !phase.has_turns() {
            return Err(SimError::WrongPhase(phase.to_string()));
        }
        let turn = self
            .state
            .turns
            .current()
            .copied()
            .ok_or_else(|| SimError::InvalidAction("no turn is open".into()))?;
        if turn.player != player {
            return Err(SimError::NotYourTurn {
                player: player.as_u32(),
                turn_index: self.state.turns.index(),
            });
        }
        if let Some(unit) = action.unit() {
            self.check_unit(&turn, unit)?;
        }

        match (phase, action) {
            (Phase::DeployMinefields, PlayerAction::DeployMinefield { hex, kind, density, setting }) => {
                if !self.state.board.contains(hex) {
                    return Err(SimError::InvalidPosition(format!("{} is off the board", hex)));
                }
                if density == 0 {
                    return Err(SimError::InvalidAction("minefield density must be positive".into()));
                }
                if !self.state.player_mut(player)?.mines.take(kind) {
                    return Err(SimError::InvalidAction(format!("no {:?} minefields left", kind)));
                }
                self.state.board.add_minefield(
                    hex,
                    Minefield {
                        kind,
                        density,
                        owner: player,
                        setting,
                    },
                )?;
                let team = self.state.team_of(player);
                self.state.report(
                    Subject::player(player, team),
                    format!("Player {} lays a {:?} minefield in {}", player, kind, hex),
                );
            }
            (Phase::DeployMinefields, PlayerAction::EndMinefields) => {
                self.state.player_mut(player)?.mines = Default::default();
            }
            (Phase::SetArtilleryTargets, PlayerAction::SetArtilleryAutoHit { hexes }) => {
                if let Some(hex) = hexes.iter().find(|h| !self.state.board.contains(**h)) {
                    return Err(SimError::InvalidPosition(format!("{} is off the board", hex)));
                }
                let p = self.state.player_mut(player)?;
                p.auto_hit_hexes = hexes;
                p.artillery_designated = true;
            }
            (Phase::Deployment, PlayerAction::Deploy { unit, hex, facing }) => {
                deploy_unit(&mut self.state, unit, hex, facing)?;
            }
            (Phase::Movement, PlayerAction::Move(path)) => {
                let plan = plan_move(&self.state, &path)?;
                let outcome = execute_move(&mut self.state, &plan)?;
                log_verbose!(
                    self.state.logger,
                    "unit {} moved {} hex(es), {} hazard event(s)",
                    path.unit,
                    outcome.hexes_moved,
                    outcome.hazards.events
                );
                let followups = match self.state.unit(path.unit) {
                    Ok(mover) => group_followups(&self.state, &turn, mover),
                    Err(_) => Vec::new(),
                };
                if !followups.is_empty() {
                    self.state.turns.insert_after_current(followups);
                }
            }
            (p, PlayerAction::Attack { unit, attacks }) if p.is_attack_phase() => {
                attacks::declare_attacks(&mut self.state, unit, attacks)?;
            }
            (_, PlayerAction::SkipTurn { unit }) => {
                if let Some(unit) = unit {
                    if phase != Phase::Deployment {
                        self.state.unit_mut(unit)?.round.done = true;
                    }
                }
            }
            (phase, action) => {
                return Err(SimError::WrongPhase(format!("{} during {}", action.describe(), phase)));
            }
        }
        self.state.turns.advance();
        Ok(self.settle_turn())
    }

    /// Does the current turn let `unit` act
    fn check_unit(&self, turn: &TurnDescriptor, unit: UnitId) -> Result<()> {
        let u = self.state.unit(unit)?;
        if !turn.accepts(u) {
            return Err(SimError::InvalidAction(format!(
                "{} may not act on turn {}",
                u.name, turn
            )));
        }
        if !is_eligible(&self.state, self.state.phase, u) {
            return Err(SimError::InvalidAction(format!(
                "{} cannot act in the {} phase",
                u.name, self.state.phase
            )));
        }
        Ok(())
    }

    /// Move past turns nobody can take. An exhausted queue ends the phase.
    fn settle_turn(&mut self) -> Flow {
        loop {
            let Some(turn) = self.state.turns.current().copied() else {
                return Flow::EndPhase;
            };
            let ghost = self.state.player(turn.player).map_or(true, |p| p.ghost);
            if ghost || !turn.is_valid(&self.state) {
                log_verbose!(self.state.logger, "skipping turn {}", turn);
                self.state.turns.advance();
                continue;
            }
            self.push_turn_queue();
            return Flow::Wait;
        }
    }

    fn enter_phase(&mut self, phase: Phase) -> Result<Flow> {
        self.flush();
        self.state.phase = phase;
        self.state.logger.set_phase_header(format!("== Round {} {} ==", self.state.round, phase));
        log_verbose!(self.state.logger, "entering {}", phase);
        self.outbox.push(Outbound::PhaseChanged {
            phase,
            round: self.state.round,
        });

        if phase.waits_for_ready() {
            for p in self.state.players.iter_mut() {
                p.done = false;
            }
            let auto = phase.is_report() && self.state.options.auto_advance_reports;
            return Ok(if auto || self.all_ready() { Flow::EndPhase } else { Flow::Wait });
        }

        match phase {
            Phase::Initiative => {
                self.state.round += 1;
                self.state.reports.new_round();
                roll_initiative(&mut self.state);
                Ok(Flow::EndPhase)
            }
            Phase::End => {
                resolve_end_phase(&mut self.state)?;
                Ok(Flow::EndPhase)
            }
            Phase::Victory => {
                self.flush();
                let result = self.state.victory.clone().unwrap_or_default();
                self.outbox.push(Outbound::GameOver(result));
                Ok(Flow::Wait)
            }
            p if p.has_turns() => {
                for unit in self.state.units.values_mut() {
                    unit.round.done = false;
                }
                let turns = build_turns(&self.state, p);
                self.state.turns.reset(turns);
                Ok(self.settle_turn())
            }
            _ => Ok(Flow::EndPhase),
        }
    }

    fn end_phase(&mut self) -> Result<Flow> {
        let phase = self.state.phase;
        if phase == Phase::Victory {
            return Ok(Flow::Wait);
        }
        if phase.is_attack_phase() {
            let queue = attacks::ams_candidates(&self.state).into();
            self.ams = Some(AmsResolution {
                queue,
                ..Default::default()
            });
            return self.continue_ams(false);
        }
        self.finish_phase()
    }

    /// Work through the AMS assignments, asking the defender's owner when
    /// there is a real choice, then resolve the phase's attacks
    fn continue_ams(&mut self, force_defaults: bool) -> Result<Flow> {
        let Some(mut ams) = self.ams.take() else {
            return self.finish_phase();
        };
        if let Some(req) = ams.waiting.take() {
            if !force_defaults {
                self.ams = Some(AmsResolution {
                    waiting: Some(req.clone()),
                    ..ams
                });
                return Ok(Flow::Suspend(req));
            }
            ams.record(&req.kind, req.kind.default_choice());
        }
        while let Some((defender, options)) = ams.queue.pop_front() {
            let kind = FeedbackKind::AmsTarget { defender, options };
            let owner = self.state.unit(defender)?.owner;
            let ghost = self.state.player(owner).map_or(true, |p| p.ghost);
            let ask = self.state.options.manual_ams && !force_defaults && !ghost && kind.choices() > 1;
            if ask {
                let request = FeedbackRequest {
                    token: self.next_token,
                    player: owner,
                    kind,
                };
                self.next_token += 1;
                self.outbox.push(Outbound::FeedbackRequested(request.clone()));
                ams.waiting = Some(request.clone());
                self.ams = Some(ams);
                return Ok(Flow::Suspend(request));
            }
            let choice = kind.default_choice();
            ams.record(&kind, choice);
        }
        let summary = attacks::resolve_attacks(&mut self.state, &ams.chosen)?;
        log_verbose!(
            self.state.logger,
            "{} attack(s) hit, {} missed",
            summary.hits,
            summary.misses
        );
        self.last_attacks = Some(summary);
        self.finish_phase()
    }

    fn finish_phase(&mut self) -> Result<Flow> {
        let phase = self.state.phase;
        if phase == Phase::Offboard {
            attacks::land_artillery(&mut self.state)?;
        }
        if matches!(phase, Phase::Movement | Phase::Firing | Phase::Physical) {
            psr::resolve_pending(&mut self.state)?;
        }
        if phase.has_turns() {
            self.state.turns.clear();
        }
        let next = phase.next(&self.state.phase_context());
        Ok(Flow::Enter(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, EquipmentKind, Equipment, Facing, LocationKind, TeamId};
    use crate::game::actions::{AttackDeclaration, MovePath, MovePathMode};
    use crate::game::GameOptions;
    use crate::map::{Board, HexCoord, MineKind};

    struct Setup {
        engine: Engine,
        a: PlayerId,
        b: PlayerId,
        hunter: UnitId,
        prey: UnitId,
    }

    fn setup(options: GameOptions) -> Setup {
        let mut state = GameState::new(Board::new(12, 12), options);
        state.seed(7);
        let a = state.add_player("Alpha", TeamId(1));
        let b = state.add_player("Bravo", TeamId(2));
        let hunter = state.add_unit(
            ChassisBuilder::mech("Griffin", 55, 5)
                .weapon("LRM 10", LocationKind::RightTorso)
                .weapon("Medium Laser", LocationKind::LeftArm)
                .ammo("LRM", LocationKind::RightTorso)
                .build(a),
        );
        let prey = state.add_unit(ChassisBuilder::mech("Wolverine", 55, 5).build(b));
        Setup {
            engine: Engine::new(state),
            a,
            b,
            hunter,
            prey,
        }
    }

    fn auto_reports() -> GameOptions {
        GameOptions::default()
    }

    fn ready_all(s: &mut Setup) {
        for p in [s.a, s.b] {
            s.engine.handle_action(p, PlayerAction::Done).unwrap();
        }
    }

    /// Deploy both units facing each other three hexes apart
    fn deploy(s: &mut Setup) {
        while s.engine.phase() == Phase::Deployment {
            let turn = s.engine.current_turn().unwrap();
            let (unit, hex, facing) = if turn.player == s.a {
                (s.hunter, HexCoord::new(5, 8), Facing::NORTH)
            } else {
                (s.prey, HexCoord::new(5, 5), Facing::SOUTH)
            };
            let outcome = s
                .engine
                .handle_action(turn.player, PlayerAction::Deploy { unit, hex, facing })
                .unwrap();
            assert_eq!(outcome, ActionOutcome::Accepted);
        }
    }

    fn skip_phase(s: &mut Setup, phase: Phase) {
        while s.engine.phase() == phase {
            let turn = s.engine.current_turn().unwrap();
            s.engine
                .handle_action(turn.player, PlayerAction::SkipTurn { unit: None })
                .unwrap();
        }
    }

    #[test]
    fn test_lounge_waits_for_everyone() {
        let mut s = setup(auto_reports());
        s.engine.start().unwrap();
        assert_eq!(s.engine.phase(), Phase::Lounge);
        s.engine.handle_action(s.a, PlayerAction::Done).unwrap();
        assert_eq!(s.engine.phase(), Phase::Lounge);
        s.engine.handle_action(s.b, PlayerAction::Done).unwrap();
        // Initiative and its report pass straight through
        assert_eq!(s.engine.phase(), Phase::Deployment);
        assert_eq!(s.engine.state.round, 1);
        assert_eq!(s.engine.state.turns.len(), 2);
    }

    #[test]
    fn test_wrong_player_is_rejected_without_mutation() {
        let mut s = setup(auto_reports());
        s.engine.start().unwrap();
        ready_all(&mut s);
        let turn = s.engine.current_turn().unwrap();
        let other = if turn.player == s.a { s.b } else { s.a };
        let unit = if other == s.a { s.hunter } else { s.prey };
        s.engine.drain_outbox();
        let outcome = s
            .engine
            .handle_action(
                other,
                PlayerAction::Deploy {
                    unit,
                    hex: HexCoord::new(3, 3),
                    facing: Facing::NORTH,
                },
            )
            .unwrap();
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert!(!s.engine.state.unit(unit).unwrap().deployed);
        let out = s.engine.drain_outbox();
        assert!(matches!(out.as_slice(), [Outbound::Rejected { player, .. }] if *player == other));
    }

    #[test]
    fn test_round_runs_through_every_phase() {
        let mut s = setup(auto_reports());
        s.engine.start().unwrap();
        ready_all(&mut s);
        deploy(&mut s);
        // No artillery: targeting and offboard have no turns
        assert_eq!(s.engine.phase(), Phase::Movement);
        skip_phase(&mut s, Phase::Movement);
        assert_eq!(s.engine.phase(), Phase::Firing);

        let laser = s
            .engine
            .state
            .unit(s.hunter)
            .unwrap()
            .equipment
            .iter()
            .position(|e| e.name == "Medium Laser")
            .unwrap();
        while s.engine.phase() == Phase::Firing {
            let turn = s.engine.current_turn().unwrap();
            let action = if turn.player == s.a {
                PlayerAction::Attack {
                    unit: s.hunter,
                    attacks: vec![AttackDeclaration::Weapon {
                        weapon: laser,
                        target: s.prey,
                    }],
                }
            } else {
                PlayerAction::SkipTurn { unit: Some(s.prey) }
            };
            s.engine.handle_action(turn.player, action).unwrap();
        }
        // Not adjacent: no physical turns, then End and the next round
        assert_eq!(s.engine.phase(), Phase::Movement);
        assert_eq!(s.engine.state.round, 2);
        assert!(s.engine.last_attacks().is_some());
        let out = s.engine.drain_outbox();
        assert!(out
            .iter()
            .any(|o| matches!(o, Outbound::PhaseChanged { phase: Phase::End, .. })));
        assert!(out.iter().any(|o| matches!(o, Outbound::Reports(_))));
    }

    #[test]
    fn test_move_action_updates_position() {
        let mut s = setup(auto_reports());
        s.engine.start().unwrap();
        ready_all(&mut s);
        deploy(&mut s);
        while s.engine.phase() == Phase::Movement {
            let turn = s.engine.current_turn().unwrap();
            let action = if turn.player == s.a {
                PlayerAction::Move(MovePath::new(s.hunter, MovePathMode::Walk).forward(2))
            } else {
                PlayerAction::SkipTurn { unit: Some(s.prey) }
            };
            assert_eq!(
                s.engine.handle_action(turn.player, action).unwrap(),
                ActionOutcome::Accepted
            );
        }
        let hunter = s.engine.state.unit(s.hunter).unwrap();
        assert_eq!(hunter.position, Some(HexCoord::new(5, 6)));
    }

    #[test]
    fn test_manual_ams_suspends_until_answered() {
        let options = GameOptions {
            manual_ams: true,
            ..auto_reports()
        };
        let mut s = setup(options);
        {
            let state = &mut s.engine.state;
            let second = state.add_unit(
                ChassisBuilder::mech("Archer", 70, 4)
                    .weapon("LRM 20", LocationKind::LeftTorso)
                    .ammo("LRM", LocationKind::LeftTorso)
                    .build(s.a),
            );
            state.place_unit(second, HexCoord::new(6, 9), Facing::NORTH, 0).unwrap();
            state.unit_mut(second).unwrap().deployed = true;
            state.unit_mut(s.prey).unwrap().equipment.push(Equipment::new(
                "AMS",
                EquipmentKind::AntiMissile,
                LocationKind::CenterTorso,
            ));
        }
        s.engine.start().unwrap();
        ready_all(&mut s);
        deploy(&mut s);
        skip_phase(&mut s, Phase::Movement);

        let mut pending = None;
        while s.engine.phase() == Phase::Firing && pending.is_none() {
            let turn = s.engine.current_turn().unwrap();
            let action = if turn.player == s.a {
                let unit = s
                    .engine
                    .state
                    .units
                    .values()
                    .find(|u| turn.accepts(u) && is_eligible(&s.engine.state, Phase::Firing, u))
                    .map(|u| u.id)
                    .unwrap();
                let weapon = s.engine.state.unit(unit).unwrap().equipment.iter()
                    .position(|e| e.name.starts_with("LRM"))
                    .unwrap();
                PlayerAction::Attack {
                    unit,
                    attacks: vec![AttackDeclaration::Weapon { weapon, target: s.prey }],
                }
            } else {
                PlayerAction::SkipTurn { unit: Some(s.prey) }
            };
            if let ActionOutcome::Pending(req) = s.engine.handle_action(turn.player, action).unwrap() {
                pending = Some(req);
            }
        }
        let req = pending.expect("AMS choice requested");
        assert_eq!(req.player, s.b);
        assert_eq!(s.engine.phase(), Phase::Firing);

        // Other actions wait
        let refused = s.engine.handle_action(s.a, PlayerAction::Done).unwrap();
        assert!(matches!(refused, ActionOutcome::Rejected(_)));
        let wrong = s
            .engine
            .resume_feedback(s.b, FeedbackResponse { token: req.token + 1, choice: 0 })
            .unwrap();
        assert!(matches!(wrong, ActionOutcome::Rejected(_)));

        // Every attack hits, so the engaged rack reaches its cluster roll
        s.engine.state.dice.script(&[5; 60]);
        let done = s
            .engine
            .resume_feedback(s.b, FeedbackResponse { token: req.token, choice: 0 })
            .unwrap();
        assert_eq!(done, ActionOutcome::Accepted);
        assert!(s.engine.awaiting().is_none());
        let engaged = s.engine.drain_outbox().iter().any(|o| match o {
            Outbound::Reports(batch) => batch.iter().any(|r| r.text.contains("with its AMS")),
            _ => false,
        });
        assert!(engaged);
    }

    #[test]
    fn test_disconnect_skips_turns_and_ready_checks() {
        let mut s = setup(GameOptions {
            auto_advance_reports: false,
            ..GameOptions::default()
        });
        s.engine.start().unwrap();
        s.engine.handle_action(s.a, PlayerAction::Done).unwrap();
        s.engine.player_disconnected(s.b).unwrap();
        // Initiative report waits on the only connected player
        assert_eq!(s.engine.phase(), Phase::InitiativeReport);
        s.engine.handle_action(s.a, PlayerAction::Done).unwrap();
        assert_eq!(s.engine.phase(), Phase::Deployment);
        let turn = s.engine.current_turn().unwrap();
        assert_eq!(turn.player, s.a);
    }

    #[test]
    fn test_minefield_phase_at_game_start() {
        let mut s = setup(auto_reports());
        s.engine.state.player_mut(s.a).unwrap().mines.conventional = 2;
        s.engine.start().unwrap();
        ready_all(&mut s);
        assert_eq!(s.engine.phase(), Phase::DeployMinefields);
        let hex = HexCoord::new(4, 4);
        s.engine
            .handle_action(
                s.a,
                PlayerAction::DeployMinefield {
                    hex,
                    kind: MineKind::Conventional,
                    density: 10,
                    setting: 0,
                },
            )
            .unwrap();
        assert!(s.engine.state.board.has_minefields(hex));
        s.engine.handle_action(s.a, PlayerAction::EndMinefields).unwrap();
        assert_eq!(s.engine.phase(), Phase::Deployment);
    }

    #[test]
    fn test_admin_force_advance_and_reset() {
        let mut s = setup(auto_reports());
        s.engine.start().unwrap();
        ready_all(&mut s);
        assert_eq!(s.engine.phase(), Phase::Deployment);
        s.engine.admin(AdminCommand::ForceAdvancePhase).unwrap();
        // Nobody deployed, so nothing can move, fire or fight
        assert_eq!(s.engine.phase(), Phase::Deployment);
        assert_eq!(s.engine.state.round, 2);

        s.engine.admin(AdminCommand::Reset).unwrap();
        assert_eq!(s.engine.phase(), Phase::Lounge);
        assert_eq!(s.engine.state.round, 0);
    }
}
