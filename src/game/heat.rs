//! End phase: heat, crew recovery, withdrawal and cleanup
//!
//! Everything here runs once per round, unit by unit in id order, after the
//! physical attacks have resolved.

use crate::core::{Disposition, EquipmentKind, UnitId};
use crate::damage::critical::{explode, CritResult};
use crate::damage::{apply_damage, crew_hit, remove_unit};
use crate::delta::UnitDelta;
use crate::game::victory::{check_victory, VictoryResult};
use crate::game::{GameState, Subject};
use crate::Result;

/// Heat from standing in a burning hex
const FIRE_HEAT: u32 = 5;
/// Heat per engine critical
const ENGINE_HIT_HEAT: u32 = 5;
/// Heat at which a unit shuts down without a roll
const AUTO_SHUTDOWN: u32 = 30;

/// Shutdown avoidance: (heat at or above, target number)
const SHUTDOWN_AVOID: [(u32, i32); 4] = [(26, 10), (22, 8), (18, 6), (14, 4)];
/// Ammunition explosion avoidance
const AMMO_AVOID: [(u32, i32); 3] = [(28, 8), (23, 6), (19, 4)];
/// Heat at which a damaged life support injures the crew
const LIFE_SUPPORT_HEAT: u32 = 15;

fn threshold(table: &[(u32, i32)], heat: u32) -> Option<i32> {
    table.iter().find(|(h, _)| heat >= *h).map(|(_, t)| *t)
}

/// What the end of the round did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfRound {
    pub shutdowns: Vec<UnitId>,
    pub restarts: Vec<UnitId>,
    pub explosions: Vec<UnitId>,
    pub recovered: Vec<UnitId>,
    pub withdrawn: Vec<UnitId>,
    pub removed: Vec<UnitId>,
    pub victory: Option<VictoryResult>,
}

/// Run the end-of-round sequence and the victory check
pub fn resolve_end_phase(state: &mut GameState) -> Result<EndOfRound> {
    let mut out = EndOfRound::default();
    let ids: Vec<UnitId> = state.units.ids_sorted();

    for &id in &ids {
        if state.unit(id)?.is_active() && state.unit(id)?.tracks_heat() {
            resolve_heat(state, id, &mut out)?;
        }
    }
    for &id in &ids {
        recover_crew(state, id, &mut out)?;
    }
    if state.options.forced_withdrawal {
        for &id in &ids {
            forced_withdrawal(state, id, &mut out)?;
        }
    }
    remove_doomed(state, &ids, &mut out)?;

    for &id in &ids {
        state.unit_mut(id)?.reset_round();
    }
    let result = check_victory(state);
    if result.is_over {
        state.victory = Some(result.clone());
        out.victory = Some(result);
    }
    crate::log_verbose!(
        state.logger,
        "end of round {}: {} shutdown(s), {} removal(s)",
        state.round,
        out.shutdowns.len(),
        out.removed.len()
    );
    Ok(out)
}

/// Net heat change for the round, before any rolls
pub fn heat_delta(state: &GameState, id: UnitId) -> Result<i64> {
    let u = state.unit(id)?;
    let hex = u.position.and_then(|p| state.board.hex(p));
    let fire = if hex.is_some_and(|h| h.on_fire) { FIRE_HEAT } else { 0 };
    let mut dissipation = u.heat_dissipation();
    if hex.is_some_and(|h| h.is_water()) {
        dissipation *= 2;
    }
    let gained = u.heat_buildup + ENGINE_HIT_HEAT * u.engine_hits() + fire;
    Ok(gained as i64 + state.options.conditions.heat_modifier() as i64 - dissipation as i64)
}

fn resolve_heat(state: &mut GameState, id: UnitId, out: &mut EndOfRound) -> Result<()> {
    let delta = heat_delta(state, id)?;
    let label = state.unit_label(id);
    let u = state.unit_mut(id)?;
    let before = u.heat;
    u.heat = (u.heat as i64 + delta).max(0) as u32;
    u.heat_buildup = 0;
    let heat = u.heat;
    let was_shutdown = u.shutdown;
    let life_support = u.life_support_hit();
    if heat != before {
        state.journal.log(UnitDelta::Heat { unit: id, heat });
        state.report_unit(id, format!("{} heat {} -> {}", label, before, heat));
    }

    if was_shutdown {
        let restart = if heat >= AUTO_SHUTDOWN {
            false
        } else {
            match threshold(&SHUTDOWN_AVOID, heat) {
                Some(target) => {
                    let roll = state.dice.roll_2d6();
                    state.report_unit(
                        id,
                        format!("{} restart roll needs {}, rolls {}", label, target, roll),
                    );
                    roll.succeeds(target)
                }
                None => true,
            }
        };
        if restart {
            set_shutdown(state, id, false)?;
            state.report_unit(id, format!("{} restarts", label));
            out.restarts.push(id);
        }
    } else if heat >= AUTO_SHUTDOWN {
        set_shutdown(state, id, true)?;
        state.report_unit(id, format!("{} shuts down automatically", label));
        out.shutdowns.push(id);
    } else if let Some(target) = threshold(&SHUTDOWN_AVOID, heat) {
        let roll = state.dice.roll_2d6();
        if !roll.succeeds(target) {
            set_shutdown(state, id, true)?;
            state.report_unit(
                id,
                format!("{} fails to avoid shutdown (needs {}, rolls {})", label, target, roll),
            );
            out.shutdowns.push(id);
        }
    }

    if let Some(target) = threshold(&AMMO_AVOID, heat) {
        let roll = state.dice.roll_2d6();
        if !roll.succeeds(target) {
            state.report_unit(
                id,
                format!("{} fails to avoid an ammunition explosion (needs {}, rolls {})", label, target, roll),
            );
            if cook_off(state, id)? {
                out.explosions.push(id);
            }
        }
    }

    if life_support && heat >= LIFE_SUPPORT_HEAT && state.unit(id)?.is_alive() {
        let hits = if heat >= 25 { 2 } else { 1 };
        crew_hit(state, id, hits, "heat with damaged life support")?;
    }
    Ok(())
}

fn set_shutdown(state: &mut GameState, id: UnitId, shutdown: bool) -> Result<()> {
    state.unit_mut(id)?.shutdown = shutdown;
    state.journal.log(UnitDelta::Shutdown { unit: id, shutdown });
    Ok(())
}

/// Detonate the most dangerous ammunition bin. False when the unit carries
/// nothing that can explode.
fn cook_off(state: &mut GameState, id: UnitId) -> Result<bool> {
    let u = state.unit(id)?;
    let Some(index) = u
        .equipment
        .iter()
        .enumerate()
        .filter(|&(i, e)| matches!(e.kind, EquipmentKind::Ammo(_)) && u.can_explode(i))
        .max_by_key(|(i, e)| (e.explosion_damage(), std::cmp::Reverse(*i)))
        .map(|(i, _)| i)
    else {
        return Ok(false);
    };
    let mut result = CritResult::default();
    explode(state, id, index, &mut result)?;
    for request in result.secondary {
        apply_damage(state, request)?;
    }
    Ok(true)
}

fn recover_crew(state: &mut GameState, id: UnitId, out: &mut EndOfRound) -> Result<()> {
    let u = state.units.get_mut(id)?;
    if !u.is_alive() {
        return Ok(());
    }
    u.vehicle_damage.stunned = u.vehicle_damage.stunned.saturating_sub(1);
    if u.crew.is_active() || u.crew.is_dead() {
        return Ok(());
    }
    if u.crew.try_recover(&mut state.dice) {
        let conscious = u.crew.is_active();
        let hits = u.crew.total_hits();
        state.journal.log(UnitDelta::CrewHit {
            unit: id,
            hits,
            conscious,
        });
        let label = state.unit_label(id);
        state.report_unit(id, format!("{} crew regains consciousness", label));
        out.recovered.push(id);
    }
    Ok(())
}

fn forced_withdrawal(state: &mut GameState, id: UnitId, out: &mut EndOfRound) -> Result<()> {
    let u = state.unit(id)?;
    if !u.is_active() || u.is_carried() {
        return Ok(());
    }
    let crippled = u.is_crippled();
    let first_time = crippled && !u.crippled;
    let on_edge = u.position.is_some_and(|p| state.board.is_edge(p));
    let label = state.unit_label(id);
    state.unit_mut(id)?.crippled = crippled;
    if first_time {
        state.report_unit(id, format!("{} is crippled and must withdraw", label));
    }
    if crippled && on_edge {
        out.withdrawn
            .extend(remove_unit(state, id, Disposition::Retreated, "forced withdrawal")?);
    }
    Ok(())
}

fn remove_doomed(state: &mut GameState, ids: &[UnitId], out: &mut EndOfRound) -> Result<()> {
    for &id in ids {
        let u = state.unit(id)?;
        if u.disposition.is_some() {
            continue;
        }
        let reason = if u.crew.is_dead() {
            Some((Disposition::Salvage, "crew killed"))
        } else if u.doomed || u.destroyed {
            Some((Disposition::Graveyard, "destroyed"))
        } else {
            None
        };
        if let Some((disposition, reason)) = reason {
            out.removed.extend(remove_unit(state, id, disposition, reason)?);
        }
    }
    if !out.removed.is_empty() {
        state.report(
            Subject::public(),
            format!("{} unit(s) removed at the end of the round", out.removed.len()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, Facing, LocationKind, TeamId};
    use crate::game::GameOptions;
    use crate::map::{Board, HexCoord, Terrain};

    fn setup() -> (GameState, UnitId, UnitId) {
        let mut state = GameState::new(Board::new(10, 10), GameOptions::default());
        let a = state.add_player("A", TeamId(1));
        let b = state.add_player("B", TeamId(2));
        let hot = state.add_unit(
            ChassisBuilder::mech("Warhammer", 70, 4)
                .ammo("SRM", LocationKind::RightTorso)
                .build(a),
        );
        let other = state.add_unit(ChassisBuilder::mech("Rifleman", 60, 4).build(b));
        for (id, hex) in [(hot, HexCoord::new(4, 4)), (other, HexCoord::new(6, 4))] {
            state.unit_mut(id).unwrap().deployed = true;
            state.place_unit(id, hex, Facing::NORTH, 0).unwrap();
        }
        (state, hot, other)
    }

    #[test]
    fn test_heat_sinks_dissipate() {
        let (mut state, hot, _) = setup();
        state.unit_mut(hot).unwrap().heat_buildup = 12;
        resolve_end_phase(&mut state).unwrap();
        let u = state.unit(hot).unwrap();
        assert_eq!(u.heat, 2);
        assert_eq!(u.heat_buildup, 0);
        assert!(!u.shutdown);
    }

    #[test]
    fn test_water_doubles_dissipation() {
        let (mut state, hot, _) = setup();
        let hex = state.unit(hot).unwrap().position.unwrap();
        {
            let h = state.board.hex_mut(hex).unwrap();
            h.terrain = Terrain::Water;
            h.depth = 1;
        }
        state.unit_mut(hot).unwrap().heat_buildup = 20;
        resolve_end_phase(&mut state).unwrap();
        assert_eq!(state.unit(hot).unwrap().heat, 0);
    }

    #[test]
    fn test_failed_avoid_roll_shuts_down() {
        let (mut state, hot, _) = setup();
        state.unit_mut(hot).unwrap().heat_buildup = 25;
        // heat 15: shutdown avoid fails
        state.dice.script(&[1, 2]);
        let out = resolve_end_phase(&mut state).unwrap();
        assert_eq!(out.shutdowns, vec![hot]);
        assert!(state.unit(hot).unwrap().shutdown);
        assert!(state
            .journal
            .drain()
            .iter()
            .any(|d| *d == UnitDelta::Shutdown { unit: hot, shutdown: true }));
    }

    #[test]
    fn test_auto_shutdown_and_restart() {
        let (mut state, hot, _) = setup();
        state.unit_mut(hot).unwrap().heat_buildup = 40;
        // ammo explosion avoid at 30 passes
        state.dice.script(&[6, 6]);
        resolve_end_phase(&mut state).unwrap();
        assert!(state.unit(hot).unwrap().shutdown);
        assert_eq!(state.unit(hot).unwrap().heat, 30);

        // heat drops to 20: the restart roll needs 6, ammo avoid needs 4
        state.dice.script(&[3, 3, 6, 6]);
        let out = resolve_end_phase(&mut state).unwrap();
        assert_eq!(out.restarts, vec![hot]);
        assert!(!state.unit(hot).unwrap().shutdown);
    }

    #[test]
    fn test_heat_cooks_off_ammunition() {
        let (mut state, hot, _) = setup();
        state.unit_mut(hot).unwrap().heat_buildup = 30;
        // heat 20: shutdown avoid passes, ammo avoid fails
        state.dice.script(&[6, 6, 1, 1]);
        let out = resolve_end_phase(&mut state).unwrap();
        assert_eq!(out.explosions, vec![hot]);
        let u = state.unit(hot).unwrap();
        let bin = u.equipment.iter().find(|e| e.ammo().is_some()).unwrap();
        assert!(bin.exploded);
        assert!(state.reports.contains("explodes"));
    }

    #[test]
    fn test_ammo_in_a_destroyed_location_does_not_cook_off() {
        let (mut state, hot, _) = setup();
        {
            let u = state.unit_mut(hot).unwrap();
            u.location_mut(LocationKind::RightTorso).unwrap().destroy();
            for e in u.equipment.iter_mut().filter(|e| e.location == LocationKind::RightTorso) {
                e.destroyed = true;
            }
            u.heat_buildup = 30;
        }
        // heat 20: shutdown avoid passes, ammo avoid fails
        state.dice.script(&[6, 6, 1, 1]);
        let out = resolve_end_phase(&mut state).unwrap();

        assert!(out.explosions.is_empty());
        let u = state.unit(hot).unwrap();
        let bin = u.equipment.iter().find(|e| e.ammo().is_some()).unwrap();
        assert!(!bin.exploded);
        assert!(!state.reports.contains("explodes"));
        assert!(u.is_alive());
    }

    #[test]
    fn test_forced_withdrawal_at_the_edge() {
        let (mut state, _, other) = setup();
        state.options.forced_withdrawal = true;
        state
            .place_unit(other, HexCoord::new(9, 4), Facing::NORTH, 0)
            .unwrap();
        for e in state.unit_mut(other).unwrap().equipment.iter_mut() {
            if e.kind == EquipmentKind::Engine {
                e.hits = 2;
            }
        }
        let out = resolve_end_phase(&mut state).unwrap();
        assert_eq!(out.withdrawn, vec![other]);
        let u = state.unit(other).unwrap();
        assert_eq!(u.disposition, Some(Disposition::Retreated));
        assert!(!u.destroyed);
    }

    #[test]
    fn test_dead_crew_is_removed_and_game_ends() {
        let (mut state, hot, other) = setup();
        state.unit_mut(other).unwrap().crew.kill();
        let out = resolve_end_phase(&mut state).unwrap();
        assert_eq!(out.removed, vec![other]);
        assert_eq!(
            state.unit(other).unwrap().disposition,
            Some(Disposition::Salvage)
        );
        let victory = out.victory.unwrap();
        assert!(victory.is_over);
        assert_eq!(victory.winner, state.unit_team(hot));
        assert!(state.victory.is_some());
    }

    #[test]
    fn test_round_state_resets() {
        let (mut state, hot, _) = setup();
        state.unit_mut(hot).unwrap().round.hexes_moved = 4;
        state.unit_mut(hot).unwrap().round.done = true;
        resolve_end_phase(&mut state).unwrap();
        assert_eq!(state.unit(hot).unwrap().round, Default::default());
    }
}
