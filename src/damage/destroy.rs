//! Unit destruction and removal from play

use crate::core::{Disposition, UnitId};
use crate::delta::UnitDelta;
use crate::game::GameState;
use crate::Result;

/// Take a unit out of play
///
/// Idempotent: a unit already out of play is left alone. Pending turns bound
/// to the unit are dropped and carried units are released into the carrier's
/// hex, or destroyed with it when they cannot legally stand there.
/// Returns every unit that left play, the carrier first.
pub fn remove_unit(
    state: &mut GameState,
    id: UnitId,
    disposition: Disposition,
    reason: &str,
) -> Result<Vec<UnitId>> {
    let mut removed = Vec::new();
    let mut work = vec![(id, disposition, reason.to_string())];

    while let Some((id, disposition, reason)) = work.pop() {
        let unit = state.units.get_mut(id)?;
        if unit.disposition.is_some() {
            continue;
        }
        if disposition != Disposition::Retreated {
            unit.destroyed = true;
        }
        unit.doomed = false;
        unit.disposition = Some(disposition);
        let hex = unit.position;
        let passengers = std::mem::take(&mut unit.transport.carried);
        let carrier = unit.transport.carrier.take();

        if let Some(carrier) = carrier {
            if let Ok(c) = state.units.get_mut(carrier) {
                c.transport.carried.retain(|&p| p != id);
            }
        }

        state.turns.remove_unit_turns(id);
        state.graveyard.push(id);
        state.journal.log(UnitDelta::Removed { unit: id, disposition });
        let label = state.unit_label(id);
        let verb = match disposition {
            Disposition::Retreated => "withdraws from the battle",
            Disposition::Devastated => "is devastated",
            _ => "is destroyed",
        };
        state.report_unit(id, format!("*** {} {} ({}) ***", label, verb, reason));
        removed.push(id);

        for passenger in passengers {
            let fits = match hex {
                Some(h) if disposition != Disposition::Retreated => state.can_occupy(passenger, h),
                _ => false,
            };
            let p = state.units.get_mut(passenger)?;
            p.transport.carrier = None;
            state.journal.log(UnitDelta::Loaded {
                unit: passenger,
                carrier: None,
            });
            if fits {
                p.position = hex;
                p.deployed = true;
                let label = state.unit_label(passenger);
                state.report_unit(passenger, format!("{} escapes the wreck", label));
            } else if disposition == Disposition::Retreated {
                work.push((passenger, Disposition::Retreated, "carried off the field".into()));
            } else {
                work.push((passenger, disposition, "trapped in destroyed carrier".into()));
            }
        }
    }
    Ok(removed)
}
