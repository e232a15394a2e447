//! Main game state structure

use crate::core::{
    Dice, EntityStore, Facing, Player, PlayerId, PlayerName, Team, TeamId, Unit, UnitId,
};
use crate::delta::{DeltaJournal, UnitDelta};
use crate::game::actions::AttackDeclaration;
use crate::game::report::{ReportLog, Subject};
use crate::game::{GameLogger, GameOptions, Phase, PhaseContext, TurnQueue, VictoryResult};
use crate::map::{Board, HexCoord};
use crate::{Result, SimError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// An attack declared this phase, resolved when the phase ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttack {
    pub attacker: UnitId,
    pub declaration: AttackDeclaration,
}

/// An artillery shell in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtilleryShell {
    pub attacker: UnitId,
    pub owner: PlayerId,
    pub weapon: String,
    pub hex: HexCoord,
    pub damage: u32,
    /// Round in which the shell lands
    pub lands: u32,
    pub to_hit: i32,
}

/// A piloting skill roll waiting to be made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPsr {
    pub unit: UnitId,
    pub modifier: i32,
    pub reason: String,
}

/// Complete game state
///
/// This is the single source of truth for a match. Everything that mutates
/// it runs inside the engine, one action at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// All units in the game, including destroyed ones
    pub units: EntityStore<Unit>,

    /// All players (Vec for stable ordering, small count)
    pub players: Vec<Player>,

    pub teams: Vec<Team>,

    pub board: Board,

    pub options: GameOptions,

    pub phase: Phase,

    /// Current round (0 while in the lounge)
    pub round: u32,

    pub turns: TurnQueue,

    /// Initiative order of the round, lowest first. Each entry lists the
    /// players acting for it (a whole team, or one player under individual
    /// initiative).
    #[serde(default)]
    pub initiative_order: Vec<Vec<PlayerId>>,

    /// Dice for all rules resolution (serializable for deterministic replay)
    pub dice: Dice,

    pub reports: ReportLog,

    #[serde(default)]
    pub journal: DeltaJournal,

    /// Attacks declared in the current phase, in declaration order
    #[serde(default)]
    pub attacks: Vec<PendingAttack>,

    #[serde(default)]
    pub artillery: Vec<ArtilleryShell>,

    /// Piloting rolls queued by damage and hazards
    #[serde(default)]
    pub pending_psrs: Vec<PendingPsr>,

    /// Building hexes whose construction factor gave out
    #[serde(default)]
    pub pending_collapses: Vec<HexCoord>,

    /// Units that left play, in order
    #[serde(default)]
    pub graveyard: Vec<UnitId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victory: Option<VictoryResult>,

    /// Centralized logger for game events
    pub logger: GameLogger,
}

impl GameState {
    pub fn new(board: Board, options: GameOptions) -> Self {
        GameState {
            units: EntityStore::new(),
            players: Vec::new(),
            teams: Vec::new(),
            board,
            options,
            phase: Phase::Lounge,
            round: 0,
            turns: TurnQueue::default(),
            initiative_order: Vec::new(),
            dice: Dice::seeded(0),
            reports: ReportLog::new(),
            journal: DeltaJournal::new(),
            attacks: Vec::new(),
            artillery: Vec::new(),
            pending_psrs: Vec::new(),
            pending_collapses: Vec::new(),
            graveyard: Vec::new(),
            victory: None,
            logger: GameLogger::new(),
        }
    }

    /// Set the dice seed for deterministic play
    pub fn seed(&mut self, seed: u64) {
        self.dice.reseed(seed);
    }

    pub fn add_player(&mut self, name: impl Into<PlayerName>, team: TeamId) -> PlayerId {
        let id = PlayerId::new(self.players.len() as u32);
        self.players.push(Player::new(id, name, team));
        self.rebuild_teams();
        id
    }

    /// Insert a unit, assigning it a fresh id
    pub fn add_unit(&mut self, mut unit: Unit) -> UnitId {
        let id = self.units.next_id();
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Recompute team membership from the players' team fields
    pub fn rebuild_teams(&mut self) {
        let mut teams: Vec<Team> = Vec::new();
        for player in &self.players {
            match teams.iter_mut().find(|t| t.id == player.team) {
                Some(team) => team.members.push(player.id),
                None => {
                    let mut team = Team::new(player.team);
                    team.members.push(player.id);
                    teams.push(team);
                }
            }
        }
        for team in teams.iter_mut() {
            if let Some(old) = self.teams.iter().find(|t| t.id == team.id) {
                team.initiative = old.initiative.clone();
            }
        }
        teams.sort_by_key(|t| t.id);
        self.teams = teams;
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(SimError::PlayerNotFound(id.as_u32()))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(SimError::PlayerNotFound(id.as_u32()))
    }

    pub fn team_of(&self, player: PlayerId) -> TeamId {
        self.player(player).map(|p| p.team).unwrap_or_default()
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units.get(id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units.get_mut(id)
    }

    pub fn unit_team(&self, id: UnitId) -> Option<TeamId> {
        self.units.get(id).ok().map(|u| self.team_of(u.owner))
    }

    pub fn are_enemies(&self, a: UnitId, b: UnitId) -> bool {
        match (self.unit_team(a), self.unit_team(b)) {
            (Some(x), Some(y)) => x != y,
            _ => false,
        }
    }

    /// Active, positioned units standing in a hex, ascending id
    pub fn units_at(&self, hex: HexCoord) -> SmallVec<[UnitId; 4]> {
        let mut ids: SmallVec<[UnitId; 4]> = self
            .units
            .values()
            .filter(|u| u.is_active() && !u.is_carried() && u.position == Some(hex))
            .map(|u| u.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Can `unit` end its move in `hex` without breaking stacking rules
    pub fn can_occupy(&self, unit: UnitId, hex: HexCoord) -> bool {
        if !self.board.contains(hex) {
            return false;
        }
        let others = self.units_at(hex).iter().filter(|&&u| u != unit).count();
        others < self.options.stacking_limit
    }

    /// Does the player still have something to do in a player-level phase
    pub fn player_has_phase_action(&self, player: &Player) -> bool {
        match self.phase {
            Phase::DeployMinefields => player.mines.total() > 0,
            Phase::SetArtilleryTargets => {
                !player.artillery_designated
                    && self
                        .units
                        .values()
                        .any(|u| u.owner == player.id && u.is_alive() && u.has_artillery())
            }
            _ => false,
        }
    }

    pub fn phase_context(&self) -> PhaseContext {
        PhaseContext {
            mines_to_place: self.round == 0 && self.players.iter().any(|p| p.mines.total() > 0),
            artillery_present: self.round == 0
                && self.units.values().any(|u| u.is_alive() && u.has_artillery()),
            units_to_deploy: self.units.values().any(|u| {
                u.is_alive() && !u.deployed && !u.is_carried() && u.deploy_round <= self.round
            }),
            game_over: self.victory.as_ref().is_some_and(|v| v.is_over),
        }
    }

    /// Append a report entry for the current round and phase
    pub fn report(&mut self, subject: Subject, text: impl Into<String>) {
        let text = text.into();
        self.logger.normal(&text);
        self.reports.push(self.round, self.phase, subject, text);
    }

    /// Report about a unit, attributed to its owner
    pub fn report_unit(&mut self, unit: UnitId, text: impl Into<String>) {
        let subject = match self.units.get(unit) {
            Ok(u) => Subject::unit(unit, u.owner, self.team_of(u.owner)),
            Err(_) => Subject::public(),
        };
        self.report(subject, text);
    }

    pub fn unit_label(&self, unit: UnitId) -> String {
        match self.units.get(unit) {
            Ok(u) => format!("{} ({})", u.name, u.id),
            Err(_) => format!("unit {}", unit),
        }
    }

    pub fn queue_psr(&mut self, unit: UnitId, modifier: i32, reason: impl Into<String>) {
        let applies = self
            .units
            .get(unit)
            .is_ok_and(|u| u.is_active() && u.is_walker() && !u.prone);
        if applies {
            self.pending_psrs.push(PendingPsr {
                unit,
                modifier,
                reason: reason.into(),
            });
        }
    }

    /// Move a unit and journal the change
    pub fn place_unit(&mut self, id: UnitId, hex: HexCoord, facing: Facing, elevation: i32) -> Result<()> {
        let unit = self.units.get_mut(id)?;
        let from = unit.position;
        unit.position = Some(hex);
        unit.facing = facing;
        unit.elevation = elevation;
        let prone = unit.prone;
        let carried = unit.transport.carried.clone();
        for passenger in carried {
            if let Ok(p) = self.units.get_mut(passenger) {
                p.position = Some(hex);
            }
        }
        self.journal.log(UnitDelta::Moved {
            unit: id,
            from,
            to: hex,
            facing,
            elevation,
            prone,
        });
        Ok(())
    }

    /// Alive units of a team (deployed or not)
    pub fn team_units(&self, team: TeamId) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .values()
            .filter(move |u| u.is_alive() && self.team_of(u.owner) == team)
    }

    /// Check cross-references after loading a snapshot
    ///
    /// Carrier and passenger links must agree, every unit must have an owner
    /// and every player must be a member of its team.
    pub fn validate_references(&self) -> Result<()> {
        for id in self.units.ids_sorted() {
            let unit = self.units.get(id)?;
            self.player(unit.owner)?;
            if unit.id != id {
                return Err(SimError::Scenario(format!(
                    "unit stored as {} claims id {}",
                    id, unit.id
                )));
            }
            if let Some(carrier) = unit.transport.carrier {
                let c = self.units.get(carrier)?;
                if !c.transport.carried.contains(&id) {
                    return Err(SimError::Scenario(format!(
                        "unit {} rides carrier {} which does not list it",
                        id, carrier
                    )));
                }
            }
            for &passenger in &unit.transport.carried {
                let p = self.units.get(passenger)?;
                if p.transport.carrier != Some(id) {
                    return Err(SimError::Scenario(format!(
                        "carrier {} lists passenger {} which rides elsewhere",
                        id, passenger
                    )));
                }
            }
        }
        for player in &self.players {
            let member = self
                .teams
                .iter()
                .any(|t| t.id == player.team && t.members.contains(&player.id));
            if !member {
                return Err(SimError::Scenario(format!(
                    "player {} is missing from {}",
                    player.id, player.team
                )));
            }
        }
        Ok(())
    }

    /// Re-derive references that can be recomputed from owned data
    pub fn restore_references(&mut self) -> Result<()> {
        self.rebuild_teams();
        let ids = self.units.ids_sorted();
        for id in &ids {
            let carrier = self.units.get(*id)?.transport.carrier;
            if let Some(carrier) = carrier {
                let c = self.units.get_mut(carrier)?;
                if !c.transport.carried.contains(id) {
                    c.transport.carried.push(*id);
                }
            }
        }
        self.validate_references()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChassisBuilder;

    fn two_player_state() -> (GameState, PlayerId, PlayerId) {
        let mut state = GameState::new(Board::new(10, 10), GameOptions::default());
        let a = state.add_player("Alice", TeamId(1));
        let b = state.add_player("Bob", TeamId(2));
        (state, a, b)
    }

    #[test]
    fn test_players_and_teams() {
        let (mut state, a, b) = two_player_state();
        let c = state.add_player("Carol", TeamId(1));
        assert_eq!(state.teams.len(), 2);
        assert_eq!(state.teams[0].members, vec![a, c]);
        assert_eq!(state.team_of(b), TeamId(2));
        assert!(state.player(PlayerId::new(9)).is_err());
    }

    #[test]
    fn test_stacking_limit() {
        let (mut state, a, b) = two_player_state();
        let hex = HexCoord::new(3, 3);
        let u1 = state.add_unit(ChassisBuilder::mech("Commando", 25, 6).build(a));
        let u2 = state.add_unit(ChassisBuilder::mech("Jenner", 35, 7).build(b));
        state.unit_mut(u1).unwrap().deployed = true;
        state.unit_mut(u2).unwrap().deployed = true;
        state.place_unit(u1, hex, Facing::NORTH, 0).unwrap();
        assert!(!state.can_occupy(u2, hex));
        assert!(state.can_occupy(u1, hex));
        assert!(state.are_enemies(u1, u2));
        assert_eq!(state.units_at(hex).as_slice(), &[u1]);
        assert_eq!(state.journal.len(), 1);
    }

    #[test]
    fn test_validate_references_catches_broken_transport() {
        let (mut state, a, _) = two_player_state();
        let apc = state.add_unit(
            ChassisBuilder::vehicle("APC", 10, 5, crate::core::MovementMode::Wheeled)
                .capacity(5)
                .build(a),
        );
        let inf = state.add_unit(ChassisBuilder::infantry("Rifles", 28, 1).build(a));
        state.unit_mut(inf).unwrap().transport.carrier = Some(apc);
        assert!(state.validate_references().is_err());
        state.restore_references().unwrap();
        assert_eq!(state.unit(apc).unwrap().transport.carried, vec![inf]);
    }

    #[test]
    fn test_report_carries_subject() {
        let (mut state, a, _) = two_player_state();
        let u = state.add_unit(ChassisBuilder::mech("Wasp", 20, 6).build(a));
        state.logger.enable_capture();
        state.report_unit(u, "Wasp walks");
        let entry = &state.reports.entries()[0];
        assert_eq!(entry.unit, Some(u));
        assert_eq!(entry.player, Some(a));
        assert_eq!(state.logger.logs().len(), 1);
    }
}
