//! Damage and critical-hit pipeline
//!
//! A [`DamageRequest`] enters at a hit location. The pipeline walks the
//! layout's transfer graph one location at a time, recording a
//! [`LocationStep`] per location that balances exactly:
//!
//! ```text
//! incoming + amplified == mitigated + armor_absorbed + structure_lost
//!                         + transferred + wasted + to_terrain + to_passengers
//! ```
//!
//! Transferred damage is the incoming amount of the next step. Secondary
//! damage (ammunition explosions, passengers riding a destroyed carrier) is
//! queued on an explicit work list, never by recursion, and every exploding
//! item is marked before it is queued so chains always end.

pub mod armor;
pub mod critical;
pub mod destroy;

use crate::core::{
    AttackDirection, DamageClass, Disposition, HitResult, HitTable, LocationKind, UnitId,
};
use crate::delta::UnitDelta;
use crate::game::GameState;
use crate::log_verbose;
use crate::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

pub use armor::modified_damage;
pub use critical::{crit_count, CritResult};
pub use destroy::remove_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageFlags {
    /// Damage comes from the unit's own exploding equipment
    pub ammo_explosion: bool,
    /// Skip armor entirely (and its modifier)
    pub ignore_armor: bool,
    /// Excess is wasted instead of transferring out of the location
    pub contained: bool,
    /// The target's building absorbs part of the damage first
    pub through_building: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRequest {
    pub unit: UnitId,
    pub hit: HitResult,
    pub amount: u32,
    pub class: DamageClass,
    #[serde(default)]
    pub flags: DamageFlags,
}

impl DamageRequest {
    pub fn new(unit: UnitId, hit: HitResult, amount: u32, class: DamageClass) -> Self {
        DamageRequest {
            unit,
            hit,
            amount,
            class,
            flags: DamageFlags::default(),
        }
    }

    pub fn at(unit: UnitId, location: LocationKind, amount: u32, class: DamageClass) -> Self {
        Self::new(unit, HitResult::new(location), amount, class)
    }

    pub fn with_flags(mut self, flags: DamageFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Accounting for one location visited by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationStep {
    pub unit: Option<UnitId>,
    pub location: Option<LocationKind>,
    pub incoming: u32,
    pub amplified: u32,
    pub mitigated: u32,
    pub armor_absorbed: u32,
    pub structure_lost: u32,
    pub transferred: u32,
    pub wasted: u32,
    pub to_terrain: u32,
    pub to_passengers: u32,
    pub destroyed_location: bool,
}

impl LocationStep {
    fn new(unit: UnitId, location: LocationKind, incoming: u32) -> Self {
        LocationStep {
            unit: Some(unit),
            location: Some(location),
            incoming,
            ..Default::default()
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.incoming + self.amplified
            == self.mitigated
                + self.armor_absorbed
                + self.structure_lost
                + self.transferred
                + self.wasted
                + self.to_terrain
                + self.to_passengers
    }
}

/// Everything one call into the pipeline did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    pub steps: Vec<LocationStep>,
    /// Critical-chance rolls made
    pub crit_rolls: u32,
    /// Names of equipment struck by criticals, in order
    pub criticals: Vec<String>,
    pub explosions: u32,
    /// Units that left play during this call
    pub destroyed: Vec<UnitId>,
}

impl DamageOutcome {
    pub fn merge(&mut self, other: DamageOutcome) {
        self.steps.extend(other.steps);
        self.crit_rolls += other.crit_rolls;
        self.criticals.extend(other.criticals);
        self.explosions += other.explosions;
        for id in other.destroyed {
            if !self.destroyed.contains(&id) {
                self.destroyed.push(id);
            }
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.steps.iter().all(LocationStep::is_balanced)
    }

    /// Armor plus structure removed from `unit`
    pub fn damage_dealt(&self, unit: UnitId) -> u32 {
        self.steps
            .iter()
            .filter(|s| s.unit == Some(unit))
            .map(|s| s.armor_absorbed + s.structure_lost)
            .sum()
    }
}

/// Damage in one phase that forces a piloting roll
const PHASE_DAMAGE_PSR: u32 = 20;

/// Run a damage request, and everything it sets off, to completion
pub fn apply_damage(state: &mut GameState, request: DamageRequest) -> Result<DamageOutcome> {
    let mut outcome = DamageOutcome::default();
    let mut work: VecDeque<DamageRequest> = VecDeque::new();
    work.push_back(request);
    while let Some(req) = work.pop_front() {
        resolve_request(state, req, &mut work, &mut outcome)?;
    }
    Ok(outcome)
}

/// Split `total` into clusters of at most `cluster` points, rolling a fresh
/// hit location for each
#[allow(clippy::too_many_arguments)]
pub fn apply_clusters(
    state: &mut GameState,
    unit: UnitId,
    table: HitTable,
    direction: AttackDirection,
    total: u32,
    cluster: u32,
    class: DamageClass,
    flags: DamageFlags,
) -> Result<DamageOutcome> {
    let mut outcome = DamageOutcome::default();
    let mut left = total;
    let cluster = cluster.max(1);
    while left > 0 {
        let amount = left.min(cluster);
        left -= amount;
        let layout = state.unit(unit)?.layout;
        let roll = match table {
            HitTable::Standard => state.dice.roll_2d6().total(),
            HitTable::Punch | HitTable::Kick => state.dice.d6(),
        };
        let hit = layout.hit_location(table, direction, roll);
        let req = DamageRequest::new(unit, hit, amount, class).with_flags(flags);
        outcome.merge(apply_damage(state, req)?);
    }
    Ok(outcome)
}

/// Apply crew hits and report them. Returns true when the crew died.
pub fn crew_hit(state: &mut GameState, unit: UnitId, hits: u32, reason: &str) -> Result<bool> {
    let u = state.units.get_mut(unit)?;
    if !u.is_alive() || hits == 0 {
        return Ok(false);
    }
    let injury = u.crew.apply_hits(hits, &mut state.dice);
    let total = u.crew.total_hits();
    let conscious = u.crew.is_active();
    let dead = u.crew.is_dead();
    state.journal.log(UnitDelta::CrewHit {
        unit,
        hits: total,
        conscious,
    });
    let label = state.unit_label(unit);
    state.report_unit(
        unit,
        format!("{} crew takes {} hit(s) from {} ({} total)", label, hits, reason, total),
    );
    if injury.knocked_out {
        state.report_unit(unit, format!("{} crew is knocked unconscious", label));
    }
    if dead {
        remove_unit(state, unit, Disposition::Salvage, "crew killed")?;
    }
    Ok(dead)
}

fn resolve_request(
    state: &mut GameState,
    req: DamageRequest,
    work: &mut VecDeque<DamageRequest>,
    outcome: &mut DamageOutcome,
) -> Result<()> {
    let id = req.unit;
    let unit = state.units.get(id)?;
    let layout = unit.layout;
    let alive_at_start = unit.is_alive();
    let armor_kind = unit.armor_kind;
    let tracks_heat = unit.tracks_heat();
    let position = unit.position;

    // Heat damage feeds the heat accumulator of heat-tracking units
    if req.class == DamageClass::Heat && tracks_heat {
        let mut step = LocationStep::new(id, req.hit.location, req.amount);
        step.mitigated = req.amount;
        state.units.get_mut(id)?.heat_buildup += req.amount;
        let label = state.unit_label(id);
        state.report_unit(id, format!("{} builds up {} heat", label, req.amount));
        outcome.steps.push(step);
        return Ok(());
    }

    let mut location = if unit.location(req.hit.location).is_some() {
        req.hit.location
    } else {
        layout.fallback()
    };
    let mut remaining = req.amount;
    let mut first = true;
    let mut dealt = 0u32;
    let mut crit_location: Option<LocationKind> = None;
    let mut vital_lost = false;

    loop {
        let mut step = LocationStep::new(id, location, remaining);

        if first && req.flags.through_building {
            if let Some(hex) = position {
                if let Some(b) = state
                    .board
                    .hex_mut(hex)
                    .and_then(|h| h.building.as_mut())
                    .filter(|b| !b.collapsed)
                {
                    let absorbed = remaining.min(b.absorption());
                    step.to_terrain = absorbed;
                    remaining -= absorbed;
                    if absorbed > 0 && b.damage(absorbed) {
                        state.pending_collapses.push(hex);
                    }
                }
            }
        }

        let u = state.units.get_mut(id)?;
        let Some(loc) = u.locations.iter_mut().find(|l| l.kind == location) else {
            step.wasted = remaining;
            outcome.steps.push(step);
            break;
        };

        if loc.destroyed {
            match layout.transfer_target(location).filter(|_| !req.flags.contained) {
                Some(next) => {
                    step.transferred = remaining;
                    outcome.steps.push(step);
                    location = next;
                    first = false;
                    continue;
                }
                None => {
                    step.wasted = remaining;
                    outcome.steps.push(step);
                    break;
                }
            }
        }

        let rear = req.hit.rear && first;
        if !req.flags.ignore_armor && loc.armor_for(rear) > 0 && remaining > 0 {
            let adjusted = modified_damage(armor_kind, req.class, remaining);
            if adjusted < remaining {
                step.mitigated = remaining - adjusted;
            } else {
                step.amplified = adjusted - remaining;
            }
            remaining = adjusted;
        }

        if !req.flags.ignore_armor {
            let armor = loc.armor_for(rear);
            let absorbed = armor.min(remaining);
            loc.set_armor_for(rear, armor - absorbed);
            step.armor_absorbed = absorbed;
            remaining -= absorbed;
        }

        let lost = loc.internal.min(remaining);
        loc.internal -= lost;
        step.structure_lost = lost;
        remaining -= lost;
        dealt += step.armor_absorbed + step.structure_lost;

        let snapshot = (loc.armor, loc.rear_armor, loc.internal);
        let destroyed_now = loc.internal == 0 && (lost > 0 || loc.original_internal == 0 || remaining > 0);
        if destroyed_now {
            loc.destroy();
        }
        if step.armor_absorbed + step.structure_lost > 0 {
            state.journal.log(UnitDelta::Damaged {
                unit: id,
                location,
                armor: snapshot.0,
                rear_armor: snapshot.1,
                internal: snapshot.2,
            });
        }

        if lost > 0 && !destroyed_now && crit_location.is_none() {
            crit_location = Some(location);
        }

        if destroyed_now {
            step.destroyed_location = true;
            destroy_location(state, id, location)?;
            if layout.is_vital(location) {
                vital_lost = true;
            }
            if remaining > 0 {
                let next = layout
                    .transfer_target(location)
                    .filter(|_| !req.flags.contained);
                let passengers: SmallVec<[UnitId; 4]> = state
                    .units
                    .get(id)?
                    .transport
                    .carried
                    .iter()
                    .copied()
                    .collect();
                match next {
                    Some(next) => {
                        step.transferred = remaining;
                        outcome.steps.push(step);
                        location = next;
                        first = false;
                        continue;
                    }
                    None if !passengers.is_empty() && !req.flags.contained => {
                        step.to_passengers = remaining;
                        queue_passenger_damage(state, &passengers, remaining, req.class, work)?;
                    }
                    None => step.wasted = remaining,
                }
            }
        } else {
            step.wasted = remaining;
        }
        outcome.steps.push(step);
        break;
    }

    if !alive_at_start {
        return Ok(());
    }

    let label = state.unit_label(id);
    if req.amount > 0 {
        log_verbose!(
            state.logger,
            "{} takes {} damage at {}",
            label,
            req.amount,
            req.hit.location
        );
        state.report_unit(
            id,
            format!("{} takes {} damage ({})", label, dealt, req.hit.location),
        );
    }

    // Head hits injure the crew of walkers
    if req.hit.location == LocationKind::Head
        && layout.is_walker()
        && dealt > 0
        && !req.flags.ammo_explosion
    {
        crew_hit(state, id, 1, "head hit")?;
    }
    if req.flags.ammo_explosion {
        crew_hit(state, id, 2, "ammunition explosion")?;
    }

    if vital_lost && state.unit(id)?.is_alive() {
        let disposition = if req.flags.ammo_explosion {
            Disposition::Devastated
        } else {
            Disposition::Graveyard
        };
        outcome
            .destroyed
            .extend(remove_unit(state, id, disposition, "vital location destroyed")?);
    }

    let u = state.units.get_mut(id)?;
    let before = u.round.phase_damage;
    u.round.phase_damage += dealt;
    if before < PHASE_DAMAGE_PSR && u.round.phase_damage >= PHASE_DAMAGE_PSR {
        state.queue_psr(id, 1, "20+ damage this phase");
    }

    if crit_location.is_none() && req.hit.through_armor_crit {
        let hit_location_intact = state
            .unit(id)?
            .location(req.hit.location)
            .is_some_and(|l| !l.destroyed);
        if hit_location_intact {
            crit_location = Some(req.hit.location);
        }
    }
    if let Some(loc) = crit_location {
        if state.unit(id)?.is_alive() {
            let result = critical::roll_criticals(state, id, loc)?;
            outcome.crit_rolls += result.rolls;
            outcome.explosions += result.secondary.len() as u32;
            outcome.criticals.extend(result.equipment);
            outcome.destroyed.extend(result.destroyed);
            work.extend(result.secondary);
        }
    }

    Ok(())
}

/// Mark a location and its dependents destroyed along with their equipment
fn destroy_location(state: &mut GameState, unit: UnitId, location: LocationKind) -> Result<()> {
    let u = state.units.get_mut(unit)?;
    let layout = u.layout;
    let mut lost: SmallVec<[LocationKind; 3]> = SmallVec::new();
    lost.push(location);
    for &dep in layout.dependents(location) {
        if let Some(l) = u.location_mut(dep) {
            if !l.destroyed {
                l.destroy();
                lost.push(dep);
            }
        }
    }
    for item in u.equipment.iter_mut().filter(|e| lost.contains(&e.location)) {
        item.destroyed = true;
    }
    let label = state.unit_label(unit);
    for kind in lost {
        state.journal.log(UnitDelta::LocationDestroyed { unit, location: kind });
        state.report_unit(unit, format!("{} loses its {}", label, kind));
    }
    Ok(())
}

fn queue_passenger_damage(
    state: &GameState,
    passengers: &[UnitId],
    amount: u32,
    class: DamageClass,
    work: &mut VecDeque<DamageRequest>,
) -> Result<()> {
    let share = amount / passengers.len() as u32;
    let extra = amount % passengers.len() as u32;
    for (i, &p) in passengers.iter().enumerate() {
        let part = share + if i == 0 { extra } else { 0 };
        if part == 0 {
            continue;
        }
        let fallback = state.unit(p)?.layout.fallback();
        work.push_back(DamageRequest::at(p, fallback, part, class));
    }
    Ok(())
}
