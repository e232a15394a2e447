//! Falling

use super::{psr, HazardContext, HazardEvent, HazardKind, HazardStage};
use crate::core::{AttackDirection, DamageClass, HitTable, UnitId};
use crate::damage::{apply_clusters, crew_hit, DamageFlags};
use crate::game::GameState;
use crate::map::HexCoord;
use crate::Result;

/// Damage for a fall of `levels`, scaled by gravity and halved into water
pub fn fall_damage(tonnage: u32, levels: u32, gravity: f64, into_water: bool) -> u32 {
    let base = tonnage.div_ceil(10) * (levels + 1);
    let scaled = (base as f64 * gravity).round().max(0.0) as u32;
    if into_water {
        scaled.div_ceil(2)
    } else {
        scaled
    }
}

/// Side the unit lands on for a d6 roll
pub fn fall_direction(roll: u32) -> AttackDirection {
    match roll {
        1 => AttackDirection::Front,
        2 | 3 => AttackDirection::Right,
        4 => AttackDirection::Rear,
        _ => AttackDirection::Left,
    }
}

pub(super) fn resolve(
    state: &mut GameState,
    ctx: &mut HazardContext,
    unit: UnitId,
    hex: HexCoord,
    levels: u32,
    modifier: i32,
) -> Result<()> {
    ctx.stage(HazardKind::Fall, HazardStage::Entry, Some(unit));
    let u = state.unit(unit)?;
    if !u.is_active() {
        ctx.stage(HazardKind::Fall, HazardStage::Terminal, Some(unit));
        return Ok(());
    }
    let tonnage = u.tonnage;
    let walker = u.is_walker();
    let facing = u.facing;

    // Destination
    let roll = state.dice.d6();
    let direction = fall_direction(roll);
    let new_facing = facing.rotate(roll as i32 - 1);
    let into_water = state.board.hex(hex).is_some_and(|h| h.is_water());
    let below: Vec<UnitId> = state
        .units_at(hex)
        .into_iter()
        .filter(|&o| o != unit)
        .collect();
    {
        let u = state.unit_mut(unit)?;
        u.prone = walker;
        u.round.fell = true;
    }
    state.place_unit(unit, hex, new_facing, 0)?;
    ctx.stage(HazardKind::Fall, HazardStage::Destination, Some(unit));

    // Damage
    let damage = fall_damage(tonnage, levels, state.options.conditions.gravity, into_water);
    let label = state.unit_label(unit);
    state.report_unit(
        unit,
        format!(
            "{} falls {} level(s) into {}, landing on its {:?} side",
            label, levels, hex, direction
        ),
    );
    let out = apply_clusters(
        state,
        unit,
        HitTable::Standard,
        direction,
        damage,
        5,
        DamageClass::Fall,
        DamageFlags::default(),
    )?;
    ctx.record(out);
    if state.unit(unit)?.is_alive() {
        let avoid = levels as i32 + modifier;
        if !psr::roll_psr(state, unit, avoid, "avoid pilot damage")? {
            crew_hit(state, unit, 1, "fall")?;
        }
    }
    ctx.stage(HazardKind::Fall, HazardStage::Damage, Some(unit));

    // Secondary: whoever was underneath takes the hit and is pushed aside
    if !below.is_empty() {
        let crush = tonnage.div_ceil(10);
        for other in below {
            if !state.unit(other)?.is_active() {
                continue;
            }
            let other_label = state.unit_label(other);
            state.report_unit(
                other,
                format!("{} is struck by {} falling from above", other_label, label),
            );
            let out = apply_clusters(
                state,
                other,
                HitTable::Punch,
                AttackDirection::Front,
                crush,
                5,
                DamageClass::Fall,
                DamageFlags::default(),
            )?;
            ctx.record(out);
            ctx.push(HazardEvent::Displacement {
                unit: other,
                direction: new_facing,
                reason: format!("{} fell on it", label),
            });
        }
        ctx.stage(HazardKind::Fall, HazardStage::Secondary, Some(unit));
    }
    ctx.stage(HazardKind::Fall, HazardStage::Terminal, Some(unit));
    Ok(())
}
