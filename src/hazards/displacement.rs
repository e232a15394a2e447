//! Displacement: a unit forced out of its hex

use super::{destroy_impossible, HazardContext, HazardEvent, HazardKind, HazardStage};
use crate::core::{Facing, UnitId};
use crate::game::GameState;
use crate::Result;

pub(super) fn resolve(
    state: &mut GameState,
    ctx: &mut HazardContext,
    unit: UnitId,
    direction: Facing,
    reason: &str,
) -> Result<()> {
    ctx.stage(HazardKind::Displacement, HazardStage::Entry, Some(unit));
    let u = state.unit(unit)?;
    let Some(from) = u.position.filter(|_| u.is_active()) else {
        ctx.stage(HazardKind::Displacement, HazardStage::Terminal, Some(unit));
        return Ok(());
    };
    let facing = u.facing;
    let level = state.board.hex(from).map_or(0, |h| h.floor()) + u.elevation;

    for dir in [direction, direction.rotate(1), direction.rotate(-1)] {
        let to = from.neighbor(dir);
        let Some(target) = state.board.hex(to) else {
            continue;
        };
        if target.ceiling() > level + 1 {
            continue;
        }
        let floor = target.floor();
        ctx.stage(HazardKind::Displacement, HazardStage::Destination, Some(unit));
        let label = state.unit_label(unit);
        state.report_unit(unit, format!("{} is displaced into {} ({})", label, to, reason));

        if floor < level {
            // Fall resolution places the unit
            ctx.push(HazardEvent::Fall {
                unit,
                hex: to,
                levels: (level - floor) as u32,
                modifier: 0,
            });
            ctx.stage(HazardKind::Displacement, HazardStage::Secondary, Some(unit));
            ctx.stage(HazardKind::Displacement, HazardStage::Terminal, Some(unit));
            return Ok(());
        }

        if !state.can_occupy(unit, to) {
            let occupants: Vec<UnitId> = state
                .units_at(to)
                .into_iter()
                .filter(|&o| o != unit)
                .collect();
            if let Some(&first) = occupants.first() {
                ctx.push(HazardEvent::Displacement {
                    unit: first,
                    direction: dir,
                    reason: format!("displaced by {}", label),
                });
            }
        }
        state.place_unit(unit, to, facing, 0)?;
        if state.board.has_minefields(to) {
            ctx.push(HazardEvent::Minefield {
                unit,
                hex: to,
                jumped: false,
            });
        }
        ctx.stage(HazardKind::Displacement, HazardStage::Terminal, Some(unit));
        return Ok(());
    }

    let label = state.unit_label(unit);
    state.report_unit(unit, format!("{} has no legal hex to be displaced into", label));
    destroy_impossible(state, ctx, unit)
}
