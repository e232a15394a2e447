//! Minefield detonation and decay

use super::{HazardContext, HazardKind, HazardStage};
use crate::core::{AttackDirection, DamageClass, HitTable, UnitId};
use crate::damage::{apply_clusters, apply_damage, DamageFlags, DamageRequest};
use crate::game::{GameState, Subject};
use crate::map::{HexCoord, MineKind, Minefield};
use crate::Result;

/// Density lost when a detonation roll decays the field
const DECAY_STEP: u32 = 5;
/// Fields thinner than this are cleared
const MIN_DENSITY: u32 = 5;

/// Does this field go off under the unit
fn triggers(state: &mut GameState, field: &Minefield, tonnage: u32, jumped: bool) -> bool {
    match field.kind {
        MineKind::Conventional | MineKind::Inferno => state.dice.roll_2d6().total() >= 9,
        MineKind::Vibrabomb => tonnage >= field.setting,
        MineKind::Active => jumped && state.dice.roll_2d6().total() >= 9,
        MineKind::Command => false,
    }
}

pub(super) fn resolve(
    state: &mut GameState,
    ctx: &mut HazardContext,
    unit: UnitId,
    hex: HexCoord,
    jumped: bool,
) -> Result<()> {
    ctx.stage(HazardKind::Minefield, HazardStage::Entry, Some(unit));
    let u = state.unit(unit)?;
    if !u.is_active() {
        ctx.stage(HazardKind::Minefield, HazardStage::Terminal, Some(unit));
        return Ok(());
    }
    let tonnage = u.tonnage;
    let label = state.unit_label(unit);
    let fields = state
        .board
        .hex(hex)
        .map(|h| h.minefields.clone())
        .unwrap_or_default();
    ctx.stage(HazardKind::Minefield, HazardStage::Destination, Some(unit));

    let mut remaining = Vec::with_capacity(fields.len());
    let mut detonated = false;
    for mut field in fields {
        if !state.unit(unit)?.is_active() || !triggers(state, &field, tonnage, jumped) {
            remaining.push(field);
            continue;
        }
        detonated = true;
        state.report_unit(
            unit,
            format!(
                "{} sets off a {:?} minefield (density {}) in {}",
                label, field.kind, field.density, hex
            ),
        );
        let out = if field.kind == MineKind::Inferno {
            let roll = state.dice.d6();
            let hit = state
                .unit(unit)?
                .layout
                .hit_location(HitTable::Kick, AttackDirection::Front, roll);
            apply_damage(
                state,
                DamageRequest::new(unit, hit, field.density, DamageClass::Heat),
            )?
        } else {
            apply_clusters(
                state,
                unit,
                HitTable::Kick,
                AttackDirection::Front,
                field.density,
                5,
                DamageClass::Explosive,
                DamageFlags::default(),
            )?
        };
        ctx.record(out);
        state.queue_psr(unit, 0, "minefield detonation");

        if state.dice.roll_2d6().total() >= 10 {
            field.density = field.density.saturating_sub(DECAY_STEP);
        }
        if field.density >= MIN_DENSITY {
            remaining.push(field);
        } else {
            state.report(Subject::public(), format!("The minefield in {} is cleared", hex));
        }
    }
    if let Some(h) = state.board.hex_mut(hex) {
        h.minefields = remaining;
    }
    if detonated {
        ctx.stage(HazardKind::Minefield, HazardStage::Damage, Some(unit));
    }
    ctx.stage(HazardKind::Minefield, HazardStage::Terminal, Some(unit));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::{ChassisBuilder, Facing, PlayerId, TeamId, UnitId};
    use crate::game::{GameOptions, GameState};
    use crate::hazards::{resolve, HazardEvent, HazardKind, HazardStage};
    use crate::map::{Board, HexCoord, MineKind, Minefield};

    fn setup(kind: MineKind, density: u32, setting: u32) -> (GameState, UnitId, HexCoord) {
        let mut state = GameState::new(Board::new(6, 6), GameOptions::default());
        let a = state.add_player("A", TeamId(1));
        let b = state.add_player("B", TeamId(2));
        let id = state.add_unit(ChassisBuilder::mech("Shadow Hawk", 55, 5).build(a));
        let hex = HexCoord::new(2, 2);
        state.unit_mut(id).unwrap().deployed = true;
        state.place_unit(id, hex, Facing::NORTH, 0).unwrap();
        state
            .board
            .add_minefield(hex, field(kind, density, setting, b))
            .unwrap();
        (state, id, hex)
    }

    fn field(kind: MineKind, density: u32, setting: u32, owner: PlayerId) -> Minefield {
        Minefield {
            kind,
            density,
            owner,
            setting,
        }
    }

    fn enter(unit: UnitId, hex: HexCoord, jumped: bool) -> HazardEvent {
        HazardEvent::Minefield { unit, hex, jumped }
    }

    #[test]
    fn test_conventional_detonation_damages_and_decays() {
        let (mut state, id, hex) = setup(MineKind::Conventional, 10, 0);
        let armor = state.unit(id).unwrap().total_armor();
        // trigger 5+5, one kick-table cluster per 5 points, then decay 6+6
        state.dice.script(&[5, 5, 3, 3, 6, 6]);
        let out = resolve(&mut state, [enter(id, hex, false)]).unwrap();
        assert_eq!(armor - state.unit(id).unwrap().total_armor(), 10);
        assert_eq!(state.board.hex(hex).unwrap().minefields[0].density, 5);
        assert_eq!(state.pending_psrs.len(), 1);
        assert!(out
            .stages(id, HazardKind::Minefield)
            .contains(&HazardStage::Damage));
    }

    #[test]
    fn test_failed_trigger_leaves_field_untouched() {
        let (mut state, id, hex) = setup(MineKind::Conventional, 10, 0);
        state.dice.script(&[2, 3]);
        let out = resolve(&mut state, [enter(id, hex, false)]).unwrap();
        assert_eq!(state.board.hex(hex).unwrap().minefields[0].density, 10);
        assert!(out.damage.steps.is_empty());
    }

    #[test]
    fn test_thin_field_is_cleared_after_decay() {
        let (mut state, id, hex) = setup(MineKind::Conventional, 5, 0);
        state.dice.script(&[6, 6, 3, 6, 5]);
        resolve(&mut state, [enter(id, hex, false)]).unwrap();
        assert!(!state.board.has_minefields(hex));
        assert!(state.reports.contains("is cleared"));
    }

    #[test]
    fn test_vibrabomb_uses_tonnage_setting() {
        let (mut state, id, hex) = setup(MineKind::Vibrabomb, 10, 60);
        resolve(&mut state, [enter(id, hex, false)]).unwrap();
        assert_eq!(state.board.hex(hex).unwrap().minefields[0].density, 10);
        assert!(state.pending_psrs.is_empty());

        let (mut state, id, hex) = setup(MineKind::Vibrabomb, 10, 50);
        state.dice.script(&[3, 3, 3, 3, 1, 1]);
        resolve(&mut state, [enter(id, hex, false)]).unwrap();
        assert_eq!(state.pending_psrs.len(), 1);
    }

    #[test]
    fn test_active_mines_only_catch_jumpers() {
        let (mut state, id, hex) = setup(MineKind::Active, 10, 0);
        let before = state.dice.thrown();
        resolve(&mut state, [enter(id, hex, false)]).unwrap();
        assert_eq!(state.dice.thrown(), before);

        let (mut state, id, hex) = setup(MineKind::Active, 10, 0);
        state.dice.script(&[6, 6, 3, 3, 1, 1]);
        resolve(&mut state, [enter(id, hex, true)]).unwrap();
        assert_eq!(state.pending_psrs.len(), 1);
    }

    #[test]
    fn test_inferno_mines_add_heat() {
        let (mut state, id, hex) = setup(MineKind::Inferno, 10, 0);
        let armor = state.unit(id).unwrap().total_armor();
        state.dice.script(&[6, 6, 3, 1, 1]);
        resolve(&mut state, [enter(id, hex, false)]).unwrap();
        let unit = state.unit(id).unwrap();
        assert_eq!(unit.heat_buildup, 10);
        assert_eq!(unit.total_armor(), armor);
    }

    #[test]
    fn test_command_mines_never_trigger() {
        let (mut state, id, hex) = setup(MineKind::Command, 10, 0);
        let out = resolve(&mut state, [enter(id, hex, true)]).unwrap();
        assert!(out.damage.steps.is_empty());
        assert!(state.board.has_minefields(hex));
    }
}
