//! Critical hits
//!
//! Units pick a strategy through their [`CritTable`]: slot-based criticals
//! for walkers, a single effect table for vehicles, or none at all.

use super::{remove_unit, DamageFlags, DamageRequest};
use crate::core::{
    CritTable, DamageClass, Dice, Disposition, EquipmentKind, LocationKind, UnitId,
};
use crate::delta::UnitDelta;
use crate::game::{CritPolicy, GameState};
use crate::Result;
use smallvec::SmallVec;

/// What a round of critical hits did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CritResult {
    pub rolls: u32,
    pub equipment: Vec<String>,
    /// Explosions to feed back into the damage pipeline
    pub secondary: SmallVec<[DamageRequest; 2]>,
    pub destroyed: Vec<UnitId>,
}

/// Number of criticals the policy awards, or `None` when no roll is made
pub fn crit_count(policy: CritPolicy, dice: &mut Dice) -> Option<u32> {
    match policy {
        CritPolicy::Never => None,
        CritPolicy::Always => Some(1),
        CritPolicy::Standard => Some(match dice.roll_2d6().total() {
            12 => 3,
            10 | 11 => 2,
            8 | 9 => 1,
            _ => 0,
        }),
    }
}

/// Roll for criticals in a location that just lost internal structure
pub fn roll_criticals(
    state: &mut GameState,
    unit: UnitId,
    location: LocationKind,
) -> Result<CritResult> {
    let mut result = CritResult::default();
    let table = state.unit(unit)?.crit_table;
    let policy = state.options.crit_policy;
    let label = state.unit_label(unit);

    match table {
        CritTable::None => {}
        CritTable::Slots => {
            let Some(count) = crit_count(policy, &mut state.dice) else {
                return Ok(result);
            };
            result.rolls += 1;
            state.report_unit(
                unit,
                format!("{} critical check ({}): {} critical(s)", label, location, count),
            );
            for _ in 0..count {
                if !state.unit(unit)?.is_alive() {
                    break;
                }
                slot_critical(state, unit, location, &mut result)?;
            }
        }
        CritTable::Vehicle => {
            if !state.options.vehicle_crits || policy == CritPolicy::Never {
                return Ok(result);
            }
            result.rolls += 1;
            let hit = match policy {
                CritPolicy::Always => true,
                _ => {
                    let roll = state.dice.roll_2d6();
                    state.report_unit(
                        unit,
                        format!("{} critical check ({}): {}", label, location, roll),
                    );
                    roll.total() >= 8
                }
            };
            if hit {
                vehicle_critical(state, unit, &mut result)?;
            }
        }
    }
    Ok(result)
}

fn slot_critical(
    state: &mut GameState,
    unit: UnitId,
    location: LocationKind,
    result: &mut CritResult,
) -> Result<()> {
    let u = state.unit(unit)?;
    let slots: SmallVec<[(usize, u32); 16]> = u
        .equipment
        .iter()
        .enumerate()
        .filter(|(_, e)| e.location == location && e.unhit_slots() > 0)
        .map(|(i, e)| (i, e.unhit_slots()))
        .collect();
    let total: u32 = slots.iter().map(|(_, n)| n).sum();
    let label = state.unit_label(unit);
    if total == 0 {
        state.report_unit(unit, format!("{}: no critical slots left in {}", label, location));
        return Ok(());
    }

    let mut pick = state.dice.pick(total as usize) as u32;
    let mut index = slots[0].0;
    for &(i, n) in &slots {
        if pick < n {
            index = i;
            break;
        }
        pick -= n;
    }

    let u = state.units.get_mut(unit)?;
    let item = &mut u.equipment[index];
    item.hits += 1;
    if item.hits >= item.slots {
        item.destroyed = true;
    }
    let destroyed = item.destroyed;
    let name = item.name.clone();
    let kind = item.kind.clone();
    state.journal.log(UnitDelta::EquipmentHit {
        unit,
        index,
        destroyed,
    });
    state.report_unit(unit, format!("{}: critical hit on {}", label, name));
    result.equipment.push(name);

    match kind {
        EquipmentKind::Engine => {
            if state.unit(unit)?.engine_hits() >= 3 {
                result
                    .destroyed
                    .extend(remove_unit(state, unit, Disposition::Graveyard, "engine destroyed")?);
            }
        }
        EquipmentKind::Gyro => state.queue_psr(unit, 3, "gyro hit"),
        EquipmentKind::Cockpit => {
            let u = state.units.get_mut(unit)?;
            u.crew.kill();
            state.journal.log(UnitDelta::CrewHit {
                unit,
                hits: crate::core::crew::LETHAL_HITS,
                conscious: false,
            });
            result
                .destroyed
                .extend(remove_unit(state, unit, Disposition::Salvage, "cockpit destroyed")?);
        }
        EquipmentKind::Actuator(actuator) if actuator.is_leg() => {
            state.queue_psr(unit, actuator.psr_modifier(), "leg actuator hit");
        }
        EquipmentKind::Ammo(_) | EquipmentKind::PowerCell { .. } => {
            explode(state, unit, index, result)?;
        }
        _ => {}
    }
    Ok(())
}

/// Detonate an item and everything linked to it
///
/// Each item is marked exploded before its damage is queued, so an item can
/// only ever explode once.
pub fn explode(
    state: &mut GameState,
    unit: UnitId,
    index: usize,
    result: &mut CritResult,
) -> Result<()> {
    let mut chain = vec![index];
    while let Some(i) = chain.pop() {
        let u = state.units.get_mut(unit)?;
        if !u.can_explode(i) {
            continue;
        }
        let Some(item) = u.equipment.get_mut(i) else {
            continue;
        };
        let damage = item.explosion_damage();
        item.exploded = true;
        item.destroyed = true;
        let location = item.location;
        let name = item.name.clone();
        if let Some(next) = item.linked {
            chain.push(next);
        }
        let contained = u
            .equipment
            .iter()
            .any(|e| e.location == location && e.kind == EquipmentKind::Case && !e.destroyed);

        state.journal.log(UnitDelta::EquipmentHit {
            unit,
            index: i,
            destroyed: true,
        });
        let label = state.unit_label(unit);
        state.report_unit(
            unit,
            format!("*** {}: {} explodes for {} damage ***", label, name, damage),
        );
        let flags = DamageFlags {
            ammo_explosion: true,
            ignore_armor: true,
            contained,
            through_building: false,
        };
        result.secondary.push(
            DamageRequest::at(unit, location, damage, DamageClass::Explosive).with_flags(flags),
        );
    }
    Ok(())
}

fn vehicle_critical(state: &mut GameState, unit: UnitId, result: &mut CritResult) -> Result<()> {
    let roll = state.dice.roll_2d6();
    let label = state.unit_label(unit);
    let u = state.units.get_mut(unit)?;
    let first_weapon = u
        .equipment
        .iter()
        .position(|e| e.weapon().is_some() && e.is_usable());

    let effect = match roll.total() {
        6 => {
            u.vehicle_damage.driver_hits += 1;
            "driver hit".to_string()
        }
        7 => match first_weapon {
            Some(i) => {
                u.equipment[i].jammed = true;
                state.journal.log(UnitDelta::EquipmentHit {
                    unit,
                    index: i,
                    destroyed: false,
                });
                format!("{} jammed", state.unit(unit)?.equipment[i].name)
            }
            None => "weapon jam, no effect".to_string(),
        },
        8 | 10 => {
            u.vehicle_damage.stunned += 1;
            "crew stunned".to_string()
        }
        9 => match first_weapon {
            Some(i) => {
                u.equipment[i].destroyed = true;
                state.journal.log(UnitDelta::EquipmentHit {
                    unit,
                    index: i,
                    destroyed: true,
                });
                let name = state.unit(unit)?.equipment[i].name.clone();
                result.equipment.push(name.clone());
                format!("{} destroyed", name)
            }
            None => "weapon destroyed, no effect".to_string(),
        },
        11 => {
            u.vehicle_damage.immobile = true;
            "engine hit, immobilized".to_string()
        }
        12 => {
            let bin = (0..u.equipment.len()).find(|&i| u.can_explode(i));
            match bin {
                Some(i) => {
                    explode(state, unit, i, result)?;
                    "ammunition hit".to_string()
                }
                None => {
                    result.destroyed.extend(remove_unit(
                        state,
                        unit,
                        Disposition::Graveyard,
                        "fuel tank hit",
                    )?);
                    "fuel tank hit".to_string()
                }
            }
        }
        _ => "no effect".to_string(),
    };
    state.report_unit(unit, format!("{} vehicle critical {}: {}", label, roll, effect));
    Ok(())
}
