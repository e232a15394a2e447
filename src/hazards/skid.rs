//! Skidding

use super::{HazardContext, HazardEvent, HazardKind, HazardStage};
use crate::core::{AttackDirection, DamageClass, Facing, HitTable, UnitId};
use crate::damage::{apply_clusters, DamageFlags};
use crate::game::GameState;
use crate::Result;

pub(super) fn resolve(
    state: &mut GameState,
    ctx: &mut HazardContext,
    unit: UnitId,
    direction: Facing,
    distance: u32,
) -> Result<()> {
    ctx.stage(HazardKind::Skid, HazardStage::Entry, Some(unit));
    let u = state.unit(unit)?;
    let Some(mut hex) = u.position.filter(|_| u.is_active()) else {
        ctx.stage(HazardKind::Skid, HazardStage::Terminal, Some(unit));
        return Ok(());
    };
    let tonnage = u.tonnage;
    let facing = u.facing;
    let walker = u.is_walker();
    let label = state.unit_label(unit);
    state.report_unit(
        unit,
        format!("{} skids {} hex(es) toward {}", label, distance, direction),
    );

    let mut fell = false;
    let mut travelled = 0;
    for _ in 0..distance {
        let level = state.board.hex(hex).map_or(0, |h| h.floor()) + state.unit(unit)?.elevation;
        let next = hex.neighbor(direction);
        let Some(target) = state.board.hex(next) else {
            state.report_unit(unit, format!("{} stops at the board edge", label));
            break;
        };
        let (floor, ceiling, building, water) =
            (target.floor(), target.ceiling(), target.has_building(), target.is_water());

        if building || ceiling > level {
            // Collision with a wall or building
            let damage = tonnage.div_ceil(10);
            state.report_unit(
                unit,
                format!("{} slams into an obstacle at {} ({} damage)", label, next, damage),
            );
            let out = apply_clusters(
                state,
                unit,
                HitTable::Standard,
                AttackDirection::Front,
                damage,
                5,
                DamageClass::Physical,
                DamageFlags::default(),
            )?;
            ctx.record(out);
            if building {
                if let Some(b) = state.board.hex_mut(next).and_then(|h| h.building.as_mut()) {
                    if b.damage(damage) {
                        state.pending_collapses.push(next);
                    }
                }
            }
            ctx.stage(HazardKind::Skid, HazardStage::Damage, Some(unit));
            break;
        }

        if !state.can_occupy(unit, next) {
            let struck = state.units_at(next).into_iter().find(|&o| o != unit);
            if let Some(struck) = struck {
                accidental_charge(state, ctx, unit, struck, direction, tonnage)?;
            }
            break;
        }

        ctx.stage(HazardKind::Skid, HazardStage::Destination, Some(unit));
        state.place_unit(unit, next, facing, 0)?;
        hex = next;
        travelled += 1;

        if floor < level {
            ctx.push(HazardEvent::Fall {
                unit,
                hex: next,
                levels: (level - floor) as u32,
                modifier: 0,
            });
            fell = true;
            break;
        }
        if state.board.has_minefields(next) {
            ctx.push(HazardEvent::Minefield {
                unit,
                hex: next,
                jumped: false,
            });
        }
        if water {
            state.report_unit(unit, format!("{} skids into water and stops", label));
            break;
        }
    }

    if walker && !fell && state.unit(unit)?.is_active() {
        ctx.push(HazardEvent::Fall {
            unit,
            hex,
            levels: 0,
            modifier: 0,
        });
    }
    crate::log_verbose!(state.logger, "skid of unit {} covered {} hex(es)", unit, travelled);
    ctx.stage(HazardKind::Skid, HazardStage::Terminal, Some(unit));
    Ok(())
}

/// The skidding unit runs into an occupied hex: both take damage and the
/// struck unit is pushed on
fn accidental_charge(
    state: &mut GameState,
    ctx: &mut HazardContext,
    unit: UnitId,
    struck: UnitId,
    direction: Facing,
    tonnage: u32,
) -> Result<()> {
    let struck_tonnage = state.unit(struck)?.tonnage;
    let label = state.unit_label(unit);
    let struck_label = state.unit_label(struck);
    state.report_unit(unit, format!("{} skids into {}", label, struck_label));
    let to_struck = tonnage.div_ceil(10);
    let to_skidder = struck_tonnage.div_ceil(10);
    let out = apply_clusters(
        state,
        struck,
        HitTable::Standard,
        AttackDirection::Front,
        to_struck,
        5,
        DamageClass::Physical,
        DamageFlags::default(),
    )?;
    ctx.record(out);
    let out = apply_clusters(
        state,
        unit,
        HitTable::Standard,
        AttackDirection::Front,
        to_skidder,
        5,
        DamageClass::Physical,
        DamageFlags::default(),
    )?;
    ctx.record(out);
    ctx.stage(HazardKind::Skid, HazardStage::Damage, Some(unit));
    ctx.push(HazardEvent::Displacement {
        unit: struck,
        direction,
        reason: format!("struck by skidding {}", label),
    });
    ctx.stage(HazardKind::Skid, HazardStage::Secondary, Some(unit));
    Ok(())
}
