//! Movement and deployment
//!
//! A path is checked in full before anything changes, so a rejected move
//! leaves the game untouched. The checked plan is then walked step by step;
//! hazards met on the way (minefields, skids, a failed attempt to stand) are
//! resolved as they happen and can cut the move short.

use crate::core::{Facing, MoveMode, UnitId};
use crate::delta::UnitDelta;
use crate::game::actions::{MovePath, MovePathMode, MoveStep};
use crate::game::GameState;
use crate::hazards::{self, check_building_load, roll_psr, HazardEvent, HazardOutcome};
use crate::map::HexCoord;
use crate::{Result, SimError};

/// Largest level change a unit can make entering one hex
fn max_level_change(walker: bool) -> i32 {
    if walker {
        2
    } else {
        1
    }
}

/// One validated step with the position it leaves the unit in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: MoveStep,
    pub hex: HexCoord,
    pub facing: Facing,
    /// Movement points spent on this step
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub unit: UnitId,
    pub mode: MoveMode,
    pub steps: Vec<PlannedStep>,
    pub mp_used: u32,
    pub hexes: u32,
}

impl MovePlan {
    pub fn destination(&self) -> Option<(HexCoord, Facing)> {
        self.steps.last().map(|s| (s.hex, s.facing))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MoveOutcome {
    pub hexes_moved: u32,
    pub mp_used: u32,
    /// False when a hazard ended the move early
    pub completed: bool,
    pub hazards: HazardOutcome,
}

fn invalid(msg: impl Into<String>) -> SimError {
    SimError::InvalidAction(msg.into())
}

/// Check a path against the unit and the board without mutating anything
pub fn plan_move(state: &GameState, path: &MovePath) -> Result<MovePlan> {
    let unit = state.unit(path.unit)?;
    if !unit.can_act() {
        return Err(invalid(format!("{} cannot act", unit.name)));
    }
    let mode = match path.mode {
        MovePathMode::Walk => MoveMode::Walk,
        MovePathMode::Run => MoveMode::Run,
        MovePathMode::Jump => MoveMode::Jump,
    };
    let jumping = mode == MoveMode::Jump;
    if path.hexes_entered() > 0 && !unit.can_move() {
        return Err(invalid(format!("{} is immobile", unit.name)));
    }
    if jumping && (unit.jump_mp == 0 || unit.prone) {
        return Err(invalid(format!("{} cannot jump", unit.name)));
    }
    let Some(mut hex) = unit.position else {
        return Err(SimError::InvalidPosition(format!("{} is not on the board", unit.name)));
    };

    let walker = unit.is_walker();
    let mut facing = unit.facing;
    let mut prone = unit.prone;
    let mut level = state.board.hex_or_err(hex)?.floor() + unit.elevation;
    let mut steps = Vec::with_capacity(path.steps.len());
    let mut mp_used = 0;
    let mut hexes = 0;

    for (i, &step) in path.steps.iter().enumerate() {
        let cost = match step {
            MoveStep::Forward | MoveStep::Backward => {
                if step == MoveStep::Backward && mode != MoveMode::Walk {
                    return Err(invalid("only walking units may back up"));
                }
                if prone {
                    return Err(invalid(format!("{} must stand before moving", unit.name)));
                }
                let dir = if step == MoveStep::Forward {
                    facing
                } else {
                    facing.opposite()
                };
                let next = hex.neighbor(dir);
                let target = state.board.hex_or_err(next)?;
                let cost = if jumping {
                    1
                } else {
                    if target.is_water() && !unit.movement.can_enter_water() {
                        return Err(invalid(format!("{} cannot enter water at {}", unit.name, next)));
                    }
                    if target.has_building() && !walker {
                        return Err(invalid(format!("{} cannot enter the building at {}", unit.name, next)));
                    }
                    let change = target.floor() - level;
                    if change.abs() > max_level_change(walker) {
                        return Err(invalid(format!(
                            "level change of {} into {} is too steep",
                            change, next
                        )));
                    }
                    let enemy = state
                        .units_at(next)
                        .iter()
                        .any(|&o| state.are_enemies(o, unit.id));
                    if enemy {
                        return Err(invalid(format!("{} is held by an enemy unit", next)));
                    }
                    1 + target.terrain.move_cost()
                        + change.max(0) as u32
                        + u32::from(target.has_building())
                };
                level = target.floor();
                hex = next;
                hexes += 1;
                cost
            }
            MoveStep::TurnLeft | MoveStep::TurnRight => {
                facing = facing.rotate(if step == MoveStep::TurnLeft { -1 } else { 1 });
                u32::from(!jumping)
            }
            MoveStep::GoProne => {
                if jumping || !walker || prone {
                    return Err(invalid(format!("{} cannot go prone", unit.name)));
                }
                prone = true;
                1
            }
            MoveStep::GetUp => {
                if jumping || !prone {
                    return Err(invalid(format!("{} is not prone", unit.name)));
                }
                prone = false;
                2
            }
            MoveStep::Load(carrier) => {
                if jumping || i + 1 != path.steps.len() {
                    return Err(invalid("boarding must be the last step of a walk"));
                }
                let c = state.unit(carrier)?;
                if c.id == unit.id || !c.is_active() || c.position != Some(hex) {
                    return Err(invalid(format!("{} is not here to board", c.name)));
                }
                if state.team_of(c.owner) != state.team_of(unit.owner) {
                    return Err(invalid(format!("{} is not a friendly carrier", c.name)));
                }
                let carried: u32 = c
                    .transport
                    .carried
                    .iter()
                    .filter_map(|&p| state.unit(p).ok())
                    .map(|p| p.tonnage)
                    .sum();
                if carried + unit.tonnage > c.transport.capacity {
                    return Err(invalid(format!("{} has no room for {}", c.name, unit.name)));
                }
                1
            }
            MoveStep::Unload(passenger) => {
                if jumping {
                    return Err(invalid("cannot unload while jumping"));
                }
                let p = state.unit(passenger)?;
                if p.transport.carrier != Some(unit.id) {
                    return Err(invalid(format!("{} is not carried by {}", p.name, unit.name)));
                }
                let others = state
                    .units_at(hex)
                    .iter()
                    .filter(|&&o| o != unit.id && o != passenger)
                    .count();
                if others + 2 > state.options.stacking_limit {
                    return Err(invalid(format!("no room to unload {} at {}", p.name, hex)));
                }
                1
            }
        };
        mp_used += cost;
        steps.push(PlannedStep {
            step,
            hex,
            facing,
            cost,
        });
    }

    let allowed = unit.mp_for(mode);
    if mp_used > allowed {
        return Err(invalid(format!(
            "{} needs {} MP but has {} for {:?}",
            unit.name, mp_used, allowed, mode
        )));
    }
    let boarding = matches!(path.steps.last(), Some(MoveStep::Load(_)));
    if hexes > 0 && !boarding && !state.can_occupy(unit.id, hex) {
        return Err(invalid(format!("{} cannot end its move in {}", unit.name, hex)));
    }
    Ok(MovePlan {
        unit: unit.id,
        mode,
        steps,
        mp_used,
        hexes,
    })
}

/// Carry out a validated plan
pub fn execute_move(state: &mut GameState, plan: &MovePlan) -> Result<MoveOutcome> {
    let id = plan.unit;
    let label = state.unit_label(id);
    let mut outcome = MoveOutcome {
        completed: true,
        ..MoveOutcome::default()
    };

    if plan.mode == MoveMode::Jump {
        if let Some((hex, facing)) = plan.destination() {
            state.place_unit(id, hex, facing, 0)?;
            outcome.hexes_moved = plan.hexes;
            outcome.mp_used = plan.mp_used;
            if plan.hexes > 0 && state.board.has_minefields(hex) {
                let out = hazards::resolve(
                    state,
                    [HazardEvent::Minefield {
                        unit: id,
                        hex,
                        jumped: true,
                    }],
                )?;
                outcome.hazards.merge(out);
            }
        }
    } else {
        for planned in &plan.steps {
            if !state.unit(id)?.is_active() {
                outcome.completed = false;
                break;
            }
            if !execute_step(state, id, plan, planned, &mut outcome)? {
                outcome.completed = false;
                break;
            }
        }
    }

    finish_move(state, id, plan, &outcome)?;
    state.report_unit(
        id,
        format!(
            "{} {} {} hex(es) using {} MP",
            label,
            match plan.mode {
                MoveMode::Stationary => "holds",
                MoveMode::Walk => "walks",
                MoveMode::Run => "runs",
                MoveMode::Jump => "jumps",
            },
            outcome.hexes_moved,
            outcome.mp_used
        ),
    );

    if let Some(hex) = state.unit(id)?.position {
        check_building_load(state, hex);
    }
    // Drains any collapse queued by the move
    let out = hazards::resolve(state, Vec::new())?;
    outcome.hazards.merge(out);
    Ok(outcome)
}

/// Returns false when the move has to stop here
fn execute_step(
    state: &mut GameState,
    id: UnitId,
    plan: &MovePlan,
    planned: &PlannedStep,
    outcome: &mut MoveOutcome,
) -> Result<bool> {
    let label = state.unit_label(id);
    match planned.step {
        MoveStep::Forward | MoveStep::Backward => {
            state.place_unit(id, planned.hex, planned.facing, 0)?;
            outcome.hexes_moved += 1;
            if state.board.has_minefields(planned.hex) {
                let out = hazards::resolve(
                    state,
                    [HazardEvent::Minefield {
                        unit: id,
                        hex: planned.hex,
                        jumped: false,
                    }],
                )?;
                outcome.hazards.merge(out);
                let u = state.unit(id)?;
                if !u.is_active() || u.prone {
                    return Ok(false);
                }
            }
        }
        MoveStep::TurnLeft | MoveStep::TurnRight => {
            let u = state.unit(id)?;
            let travel = u.facing;
            let slippery = state
                .board
                .hex(planned.hex)
                .is_some_and(|h| h.terrain.is_slippery());
            if plan.mode == MoveMode::Run
                && state.options.skid_on_pavement
                && slippery
                && outcome.hexes_moved > 0
                && !roll_psr(state, id, 0, "turning on a slippery surface")?
            {
                let out = hazards::resolve(
                    state,
                    [HazardEvent::Skid {
                        unit: id,
                        direction: travel,
                        distance: outcome.hexes_moved / 2,
                    }],
                )?;
                outcome.hazards.merge(out);
                return Ok(false);
            }
            state.place_unit(id, planned.hex, planned.facing, 0)?;
        }
        MoveStep::GoProne => {
            state.unit_mut(id)?.prone = true;
            state.place_unit(id, planned.hex, planned.facing, 0)?;
            state.report_unit(id, format!("{} drops prone", label));
        }
        MoveStep::GetUp => {
            if !roll_psr(state, id, 0, "standing up")? {
                let out = hazards::resolve(
                    state,
                    [HazardEvent::Fall {
                        unit: id,
                        hex: planned.hex,
                        levels: 0,
                        modifier: 0,
                    }],
                )?;
                outcome.hazards.merge(out);
                return Ok(false);
            }
            state.unit_mut(id)?.prone = false;
            state.place_unit(id, planned.hex, planned.facing, 0)?;
        }
        MoveStep::Load(carrier) => {
            state.unit_mut(id)?.transport.carrier = Some(carrier);
            state.unit_mut(carrier)?.transport.carried.push(id);
            state.journal.log(UnitDelta::Loaded {
                unit: id,
                carrier: Some(carrier),
            });
            let carrier_label = state.unit_label(carrier);
            state.report_unit(id, format!("{} boards {}", label, carrier_label));
        }
        MoveStep::Unload(passenger) => {
            state.unit_mut(id)?.transport.carried.retain(|&p| p != passenger);
            {
                let p = state.unit_mut(passenger)?;
                p.transport.carrier = None;
                p.deployed = true;
                p.round.done = true;
            }
            state.journal.log(UnitDelta::Loaded {
                unit: passenger,
                carrier: None,
            });
            state.place_unit(passenger, planned.hex, planned.facing, 0)?;
            let passenger_label = state.unit_label(passenger);
            state.report_unit(
                passenger,
                format!("{} unloads {} at {}", label, passenger_label, planned.hex),
            );
        }
    }
    outcome.mp_used += planned.cost;
    Ok(true)
}

/// Round bookkeeping and movement heat
fn finish_move(state: &mut GameState, id: UnitId, plan: &MovePlan, outcome: &MoveOutcome) -> Result<()> {
    let unit = state.unit_mut(id)?;
    let moved = if plan.mp_used == 0 {
        MoveMode::Stationary
    } else {
        plan.mode
    };
    unit.round.moved = moved;
    unit.round.hexes_moved = outcome.hexes_moved;
    unit.round.done = true;
    if unit.tracks_heat() {
        unit.heat_buildup += match moved {
            MoveMode::Stationary => 0,
            MoveMode::Walk => 1,
            MoveMode::Run => 2,
            MoveMode::Jump => plan.hexes.max(3),
        };
    }
    Ok(())
}

/// Place an undeployed unit on the board
pub fn deploy_unit(state: &mut GameState, unit: UnitId, hex: HexCoord, facing: Facing) -> Result<()> {
    let u = state.unit(unit)?;
    if u.deployed || !u.is_alive() || u.is_carried() || u.deploy_round > state.round {
        return Err(invalid(format!("{} cannot deploy now", u.name)));
    }
    let player = state.player(u.owner)?;
    if !player.can_deploy_at(hex) {
        return Err(SimError::InvalidPosition(format!(
            "{} is outside the deployment zone of {}",
            hex, player.name
        )));
    }
    let target = state.board.hex_or_err(hex)?;
    if target.is_water() && !u.movement.can_enter_water() {
        return Err(SimError::InvalidPosition(format!("{} cannot deploy into water", u.name)));
    }
    if !state.can_occupy(unit, hex) {
        return Err(SimError::InvalidPosition(format!("{} is full", hex)));
    }

    let passengers = u.transport.carried.clone();
    {
        let u = state.unit_mut(unit)?;
        u.deployed = true;
        u.round.done = true;
    }
    for p in passengers {
        state.unit_mut(p)?.deployed = true;
    }
    state.place_unit(unit, hex, facing, 0)?;
    state.journal.log(UnitDelta::Deployed { unit, hex, facing });
    let label = state.unit_label(unit);
    state.report_unit(unit, format!("{} deploys to {} facing {}", label, hex, facing));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, MovementMode, TeamId};
    use crate::game::GameOptions;
    use crate::map::{Board, Building, MineKind, Minefield, Terrain};

    fn setup() -> GameState {
        let mut state = GameState::new(Board::new(12, 12), GameOptions::default());
        state.add_player("A", TeamId(1));
        state.add_player("B", TeamId(2));
        state
    }

    fn place(state: &mut GameState, builder: ChassisBuilder, owner: usize, hex: HexCoord) -> UnitId {
        let player = state.players[owner].id;
        let id = state.add_unit(builder.build(player));
        state.unit_mut(id).unwrap().deployed = true;
        state.place_unit(id, hex, Facing::NORTH, 0).unwrap();
        id
    }

    fn start() -> HexCoord {
        HexCoord::new(5, 9)
    }

    #[test]
    fn test_walk_moves_and_marks_round() {
        let mut state = setup();
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        let path = MovePath::new(id, MovePathMode::Walk)
            .forward(2)
            .step(MoveStep::TurnRight);
        let plan = plan_move(&state, &path).unwrap();
        assert_eq!(plan.mp_used, 3);
        let out = execute_move(&mut state, &plan).unwrap();
        assert!(out.completed);
        let unit = state.unit(id).unwrap();
        assert_eq!(unit.position, Some(start().translated(Facing::NORTH, 2)));
        assert_eq!(unit.facing, Facing::NORTHEAST);
        assert_eq!(unit.round.moved, MoveMode::Walk);
        assert_eq!(unit.round.hexes_moved, 2);
        assert!(unit.round.done);
        assert_eq!(unit.heat_buildup, 1);
    }

    #[test]
    fn test_path_over_budget_is_rejected_without_changes() {
        let mut state = setup();
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        let woods = start().neighbor(Facing::NORTH);
        state.board.hex_mut(woods).unwrap().terrain = Terrain::HeavyWoods;
        let journal_len = state.journal.len();
        // 3 MP into heavy woods, then 2 more hexes
        let path = MovePath::new(id, MovePathMode::Walk).forward(3);
        assert!(plan_move(&state, &path).is_err());
        assert_eq!(state.journal.len(), journal_len);
        assert_eq!(state.unit(id).unwrap().position, Some(start()));

        let run = MovePath::new(id, MovePathMode::Run).forward(3);
        assert_eq!(plan_move(&state, &run).unwrap().mp_used, 5);
    }

    #[test]
    fn test_running_backwards_is_illegal() {
        let mut state = setup();
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        let path = MovePath::new(id, MovePathMode::Run).step(MoveStep::Backward);
        assert!(plan_move(&state, &path).is_err());
    }

    #[test]
    fn test_steep_climb_and_vehicle_water_rejected() {
        let mut state = setup();
        let mech = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        let cliff = start().neighbor(Facing::NORTH);
        state.board.hex_mut(cliff).unwrap().elevation = 3;
        let path = MovePath::new(mech, MovePathMode::Walk).forward(1);
        assert!(plan_move(&state, &path).is_err());

        let car = place(
            &mut state,
            ChassisBuilder::vehicle("Scout Car", 20, 6, MovementMode::Wheeled),
            0,
            HexCoord::new(2, 9),
        );
        let lake = HexCoord::new(2, 9).neighbor(Facing::NORTH);
        {
            let h = state.board.hex_mut(lake).unwrap();
            h.terrain = Terrain::Water;
            h.depth = 1;
        }
        let path = MovePath::new(car, MovePathMode::Walk).forward(1);
        assert!(plan_move(&state, &path).is_err());
    }

    #[test]
    fn test_cannot_walk_through_enemies_or_end_stacked() {
        let mut state = setup();
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        let ahead = start().neighbor(Facing::NORTH);
        place(&mut state, ChassisBuilder::mech("Hunchback", 50, 4), 1, ahead);
        let through = MovePath::new(id, MovePathMode::Walk).forward(2);
        assert!(plan_move(&state, &through).is_err());

        let mut state = setup();
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        place(&mut state, ChassisBuilder::mech("Trooper", 50, 4), 0, ahead);
        let onto = MovePath::new(id, MovePathMode::Walk).forward(1);
        assert!(plan_move(&state, &onto).is_err());
        let past = MovePath::new(id, MovePathMode::Walk).forward(2);
        assert!(plan_move(&state, &past).is_ok());
    }

    #[test]
    fn test_jump_ignores_terrain_and_builds_heat() {
        let mut state = setup();
        let id = place(
            &mut state,
            ChassisBuilder::mech("Phoenix Hawk", 45, 6).jump(6),
            0,
            start(),
        );
        let tower = start().neighbor(Facing::NORTH);
        state.board.hex_mut(tower).unwrap().building = Some(Building::new("Tower", 90, 5));
        let path = MovePath::new(id, MovePathMode::Jump).forward(2);
        let plan = plan_move(&state, &path).unwrap();
        execute_move(&mut state, &plan).unwrap();
        let unit = state.unit(id).unwrap();
        assert_eq!(unit.position, Some(start().translated(Facing::NORTH, 2)));
        assert_eq!(unit.round.moved, MoveMode::Jump);
        assert_eq!(unit.heat_buildup, 3);
    }

    #[test]
    fn test_minefield_on_the_way_is_resolved() {
        let mut state = setup();
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        let b = state.players[1].id;
        let mined = start().neighbor(Facing::NORTH);
        state
            .board
            .add_minefield(
                mined,
                Minefield {
                    kind: MineKind::Conventional,
                    density: 10,
                    owner: b,
                    setting: 0,
                },
            )
            .unwrap();
        // Mine fails to trigger
        state.dice.script(&[1, 1]);
        let path = MovePath::new(id, MovePathMode::Walk).forward(2);
        let plan = plan_move(&state, &path).unwrap();
        let out = execute_move(&mut state, &plan).unwrap();
        assert!(out.completed);
        assert_eq!(out.hazards.events, 1);
        assert_eq!(
            state.unit(id).unwrap().position,
            Some(start().translated(Facing::NORTH, 2))
        );
    }

    #[test]
    fn test_failed_turn_on_pavement_skids() {
        let mut options = GameOptions::default();
        options.skid_on_pavement = true;
        let mut state = GameState::new(Board::new(12, 12), options);
        state.add_player("A", TeamId(1));
        let id = place(&mut state, ChassisBuilder::mech("Centurion", 50, 4), 0, start());
        for hex in [
            start().neighbor(Facing::NORTH),
            start().translated(Facing::NORTH, 2),
        ] {
            state.board.hex_mut(hex).unwrap().terrain = Terrain::Pavement;
        }
        let path = MovePath::new(id, MovePathMode::Run)
            .forward(2)
            .step(MoveStep::TurnLeft);
        let plan = plan_move(&state, &path).unwrap();
        // piloting check fails with a 2
        state.dice.script(&[1, 1]);
        let out = execute_move(&mut state, &plan).unwrap();
        assert!(!out.completed);
        assert!(!out.hazards.stages(id, crate::hazards::HazardKind::Skid).is_empty());
        assert!(state.unit(id).unwrap().prone);
    }

    #[test]
    fn test_load_and_unload() {
        let mut state = setup();
        let apc = place(
            &mut state,
            ChassisBuilder::vehicle("APC", 10, 5, MovementMode::Tracked).capacity(5),
            0,
            start(),
        );
        state.options.stacking_limit = 2;
        let squad_hex = start().neighbor(Facing::SOUTH);
        let squad = place(&mut state, ChassisBuilder::infantry("Rifles", 3, 1), 0, squad_hex);
        let board = MovePath::new(squad, MovePathMode::Walk)
            .forward(1)
            .step(MoveStep::Load(apc));
        assert!(plan_move(&state, &board).is_err(), "infantry lacks the MP");

        state.unit_mut(squad).unwrap().walk_mp = 2;
        let plan = plan_move(&state, &board).unwrap();
        execute_move(&mut state, &plan).unwrap();
        assert_eq!(state.unit(squad).unwrap().transport.carrier, Some(apc));
        assert!(state.units_at(start()).iter().all(|&u| u != squad));

        let drop = MovePath::new(apc, MovePathMode::Walk)
            .forward(1)
            .step(MoveStep::Unload(squad));
        let plan = plan_move(&state, &drop).unwrap();
        execute_move(&mut state, &plan).unwrap();
        let dest = start().neighbor(Facing::NORTH);
        assert_eq!(state.unit(squad).unwrap().position, Some(dest));
        assert!(state.unit(apc).unwrap().transport.carried.is_empty());
        assert!(state.units_at(dest).contains(&squad));
    }

    #[test]
    fn test_deploy_respects_zone_and_stacking() {
        let mut state = setup();
        let a = state.players[0].id;
        state.player_mut(a).unwrap().deploy_columns = Some((0, 2));
        let id = state.add_unit(ChassisBuilder::mech("Valkyrie", 30, 5).build(a));
        assert!(deploy_unit(&mut state, id, HexCoord::new(6, 6), Facing::NORTH).is_err());
        deploy_unit(&mut state, id, HexCoord::new(1, 6), Facing::SOUTH).unwrap();
        let unit = state.unit(id).unwrap();
        assert!(unit.deployed);
        assert_eq!(unit.position, Some(HexCoord::new(1, 6)));
        assert!(state
            .journal
            .entries()
            .iter()
            .any(|d| matches!(d, UnitDelta::Deployed { .. })));

        let other = state.add_unit(ChassisBuilder::mech("Commando", 25, 6).build(a));
        assert!(deploy_unit(&mut state, other, HexCoord::new(1, 6), Facing::SOUTH).is_err());
    }
}
