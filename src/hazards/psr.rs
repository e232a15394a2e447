//! Piloting skill rolls

use super::{resolve, HazardEvent, HazardOutcome};
use crate::core::{Unit, UnitId};
use crate::game::GameState;
use crate::Result;

/// Target number for a piloting roll
pub fn piloting_target(unit: &Unit, modifier: i32) -> i32 {
    unit.crew.piloting + unit.leg_damage_modifier() + modifier
}

/// Make a piloting roll now. Returns true on success.
pub fn roll_psr(state: &mut GameState, unit: UnitId, modifier: i32, reason: &str) -> Result<bool> {
    let u = state.unit(unit)?;
    let label = state.unit_label(unit);
    if u.gyro_hits() >= 2 {
        state.report_unit(
            unit,
            format!("{} cannot keep its footing ({}): gyro destroyed", label, reason),
        );
        return Ok(false);
    }
    let target = piloting_target(u, modifier);
    let roll = state.dice.roll_2d6();
    let ok = roll.succeeds(target);
    state.report_unit(
        unit,
        format!(
            "{} piloting roll ({}) needs {}, rolls {}: {}",
            label,
            reason,
            target,
            roll,
            if ok { "succeeds" } else { "falls" }
        ),
    );
    Ok(ok)
}

/// Roll every queued piloting check; the first failure per unit becomes a fall
pub fn resolve_pending(state: &mut GameState) -> Result<HazardOutcome> {
    let pending = std::mem::take(&mut state.pending_psrs);
    let mut fallen: Vec<UnitId> = Vec::new();
    let mut falls = Vec::new();
    for psr in pending {
        if fallen.contains(&psr.unit) {
            continue;
        }
        let Ok(u) = state.unit(psr.unit) else {
            continue;
        };
        if !u.is_active() || u.prone {
            continue;
        }
        let Some(hex) = u.position else {
            continue;
        };
        if !roll_psr(state, psr.unit, psr.modifier, &psr.reason)? {
            fallen.push(psr.unit);
            falls.push(HazardEvent::Fall {
                unit: psr.unit,
                hex,
                levels: 0,
                modifier: psr.modifier,
            });
        }
    }
    resolve(state, falls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, EquipmentKind, Facing, TeamId};
    use crate::game::GameOptions;
    use crate::map::{Board, HexCoord};

    fn setup() -> (GameState, UnitId) {
        let mut state = GameState::new(Board::new(6, 6), GameOptions::default());
        let a = state.add_player("A", TeamId(1));
        let id = state.add_unit(ChassisBuilder::mech("Griffin", 55, 5).skills(4, 5).build(a));
        state.unit_mut(id).unwrap().deployed = true;
        state
            .place_unit(id, HexCoord::new(2, 2), Facing::NORTH, 0)
            .unwrap();
        (state, id)
    }

    #[test]
    fn test_target_includes_leg_damage() {
        let (mut state, id) = setup();
        assert_eq!(piloting_target(state.unit(id).unwrap(), 1), 6);
        state
            .unit_mut(id)
            .unwrap()
            .location_mut(crate::core::LocationKind::LeftLeg)
            .unwrap()
            .destroy();
        assert_eq!(piloting_target(state.unit(id).unwrap(), 0), 10);
    }

    #[test]
    fn test_failed_check_becomes_fall() {
        let (mut state, id) = setup();
        state.queue_psr(id, 1, "20+ damage");
        state.queue_psr(id, 0, "kicked");
        // 2 fails the first check; the second is skipped for the fallen unit
        state.dice.script(&[1, 1]);
        let out = resolve_pending(&mut state).unwrap();
        assert!(state.pending_psrs.is_empty());
        assert!(state.unit(id).unwrap().prone);
        assert_eq!(out.events, 1);
    }

    #[test]
    fn test_destroyed_gyro_fails_automatically() {
        let (mut state, id) = setup();
        for e in state.unit_mut(id).unwrap().equipment.iter_mut() {
            if e.kind == EquipmentKind::Gyro {
                e.hits = 2;
            }
        }
        let before = state.dice.thrown();
        assert!(!roll_psr(&mut state, id, 0, "standing").unwrap());
        assert_eq!(state.dice.thrown(), before);
    }
}
