//! Building collapse

use super::{HazardContext, HazardEvent, HazardKind, HazardStage};
use crate::core::{AttackDirection, DamageClass, HitTable, UnitId};
use crate::damage::{apply_clusters, DamageFlags};
use crate::game::{GameState, Subject};
use crate::map::HexCoord;
use crate::Result;

/// Queue a collapse when the units standing in a building outweigh it
pub fn check_building_load(state: &mut GameState, hex: HexCoord) {
    let Some(cf) = state
        .board
        .hex(hex)
        .and_then(|h| h.building.as_ref())
        .filter(|b| !b.collapsed)
        .map(|b| b.cf)
    else {
        return;
    };
    let load: u32 = state
        .units_at(hex)
        .iter()
        .filter_map(|&id| state.unit(id).ok())
        .map(|u| u.tonnage)
        .sum();
    if load > cf && !state.pending_collapses.contains(&hex) {
        state.pending_collapses.push(hex);
    }
}

pub(super) fn resolve(state: &mut GameState, ctx: &mut HazardContext, hex: HexCoord) -> Result<()> {
    ctx.stage(HazardKind::Collapse, HazardStage::Entry, None);
    let Some(building) = state
        .board
        .hex(hex)
        .and_then(|h| h.building.as_ref())
        .filter(|b| !b.collapsed)
    else {
        ctx.stage(HazardKind::Collapse, HazardStage::Terminal, None);
        return Ok(());
    };
    let cf = if building.cf > 0 {
        building.cf
    } else {
        building.initial_cf
    };
    let name = building.name.clone();
    let occupants: Vec<UnitId> = state.units_at(hex).into_iter().collect();
    state.report(Subject::public(), format!("{} in {} collapses", name, hex));
    ctx.stage(HazardKind::Collapse, HazardStage::Destination, None);

    let damage = cf.div_ceil(10);
    if damage > 0 {
        for &unit in &occupants {
            let out = apply_clusters(
                state,
                unit,
                HitTable::Standard,
                AttackDirection::Front,
                damage,
                5,
                DamageClass::Collapse,
                DamageFlags::default(),
            )?;
            ctx.record(out);
        }
    }
    ctx.stage(HazardKind::Collapse, HazardStage::Damage, None);
    state.board.collapse_building(hex);

    // Units that were up inside the structure come down with it
    for unit in occupants {
        let u = state.unit(unit)?;
        if !u.is_active() {
            continue;
        }
        if u.elevation > 0 {
            ctx.push(HazardEvent::Fall {
                unit,
                hex,
                levels: u.elevation as u32,
                modifier: 0,
            });
        } else {
            let facing = u.facing;
            state.place_unit(unit, hex, facing, 0)?;
        }
    }
    ctx.stage(HazardKind::Collapse, HazardStage::Secondary, None);
    ctx.stage(HazardKind::Collapse, HazardStage::Terminal, None);
    Ok(())
}
