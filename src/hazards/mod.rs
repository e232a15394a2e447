//! Movement-hazard resolvers
//!
//! Falls, skids, displacements, minefields and building collapses feed each
//! other: a skid ends in a fall, a fall lands on another unit and displaces
//! it, a collapse drops every occupant. All of them are processed from one
//! work list. Each event walks the same stages
//! (Entry → Destination → Damage → Secondary → Terminal) and a per-pass
//! visited set keeps chains finite: a unit displaced twice in one pass has
//! nowhere legal to go and is destroyed.

pub mod collapse;
pub mod displacement;
pub mod fall;
pub mod minefield;
pub mod psr;
pub mod skid;

use crate::core::{Disposition, Facing, UnitId};
use crate::damage::{remove_unit, DamageOutcome};
use crate::game::GameState;
use crate::map::HexCoord;
use crate::Result;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub use collapse::check_building_load;
pub use fall::{fall_damage, fall_direction};
pub use psr::{piloting_target, resolve_pending, roll_psr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    Fall,
    Skid,
    Displacement,
    Minefield,
    Collapse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardEvent {
    /// Drop `levels` into `hex`; `modifier` applies to the roll that
    /// protects the crew
    Fall {
        unit: UnitId,
        hex: HexCoord,
        levels: u32,
        modifier: i32,
    },
    Skid {
        unit: UnitId,
        direction: Facing,
        distance: u32,
    },
    Displacement {
        unit: UnitId,
        direction: Facing,
        reason: String,
    },
    Minefield {
        unit: UnitId,
        hex: HexCoord,
        /// Entered by landing from a jump
        jumped: bool,
    },
    Collapse { hex: HexCoord },
}

impl HazardEvent {
    pub fn kind(&self) -> HazardKind {
        match self {
            HazardEvent::Fall { .. } => HazardKind::Fall,
            HazardEvent::Skid { .. } => HazardKind::Skid,
            HazardEvent::Displacement { .. } => HazardKind::Displacement,
            HazardEvent::Minefield { .. } => HazardKind::Minefield,
            HazardEvent::Collapse { .. } => HazardKind::Collapse,
        }
    }

    pub fn unit(&self) -> Option<UnitId> {
        match self {
            HazardEvent::Fall { unit, .. }
            | HazardEvent::Skid { unit, .. }
            | HazardEvent::Displacement { unit, .. }
            | HazardEvent::Minefield { unit, .. } => Some(*unit),
            HazardEvent::Collapse { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardStage {
    Entry,
    Destination,
    Damage,
    Secondary,
    Terminal,
}

/// One stage transition, kept for inspection and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTrace {
    pub kind: HazardKind,
    pub stage: HazardStage,
    pub unit: Option<UnitId>,
}

#[derive(Debug, Clone, Default)]
pub struct HazardOutcome {
    pub trace: Vec<StageTrace>,
    pub damage: DamageOutcome,
    /// Units destroyed for lack of a legal position
    pub impossible: Vec<UnitId>,
    pub events: u32,
}

impl HazardOutcome {
    pub fn merge(&mut self, other: HazardOutcome) {
        self.trace.extend(other.trace);
        self.damage.merge(other.damage);
        self.impossible.extend(other.impossible);
        self.events += other.events;
    }

    pub fn stages(&self, unit: UnitId, kind: HazardKind) -> Vec<HazardStage> {
        self.trace
            .iter()
            .filter(|t| t.unit == Some(unit) && t.kind == kind)
            .map(|t| t.stage)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Visit {
    Unit(UnitId, HazardKind),
    Mine(UnitId, HexCoord),
    Collapse(HexCoord),
}

impl Visit {
    fn of(event: &HazardEvent) -> Visit {
        match event {
            HazardEvent::Minefield { unit, hex, .. } => Visit::Mine(*unit, *hex),
            HazardEvent::Collapse { hex } => Visit::Collapse(*hex),
            HazardEvent::Fall { unit, .. }
            | HazardEvent::Skid { unit, .. }
            | HazardEvent::Displacement { unit, .. } => Visit::Unit(*unit, event.kind()),
        }
    }
}

/// Work list shared by the resolvers during one pass
pub struct HazardContext {
    queue: VecDeque<HazardEvent>,
    visited: FxHashSet<Visit>,
    pub outcome: HazardOutcome,
}

impl HazardContext {
    fn new(events: impl IntoIterator<Item = HazardEvent>) -> Self {
        HazardContext {
            queue: events.into_iter().collect(),
            visited: FxHashSet::default(),
            outcome: HazardOutcome::default(),
        }
    }

    /// Queue a follow-up hazard
    pub fn push(&mut self, event: HazardEvent) {
        self.queue.push_back(event);
    }

    pub fn stage(&mut self, kind: HazardKind, stage: HazardStage, unit: Option<UnitId>) {
        self.outcome.trace.push(StageTrace { kind, stage, unit });
    }

    pub fn record(&mut self, damage: DamageOutcome) {
        self.outcome.damage.merge(damage);
    }
}

/// Resolve hazards and everything they set off
pub fn resolve(
    state: &mut GameState,
    events: impl IntoIterator<Item = HazardEvent>,
) -> Result<HazardOutcome> {
    let mut ctx = HazardContext::new(events);
    loop {
        while let Some(event) = ctx.queue.pop_front() {
            ctx.outcome.events += 1;
            if !ctx.visited.insert(Visit::of(&event)) {
                revisit(state, &mut ctx, &event)?;
                continue;
            }
            match event {
                HazardEvent::Fall {
                    unit,
                    hex,
                    levels,
                    modifier,
                } => fall::resolve(state, &mut ctx, unit, hex, levels, modifier)?,
                HazardEvent::Skid {
                    unit,
                    direction,
                    distance,
                } => skid::resolve(state, &mut ctx, unit, direction, distance)?,
                HazardEvent::Displacement {
                    unit,
                    direction,
                    reason,
                } => displacement::resolve(state, &mut ctx, unit, direction, &reason)?,
                HazardEvent::Minefield { unit, hex, jumped } => {
                    minefield::resolve(state, &mut ctx, unit, hex, jumped)?
                }
                HazardEvent::Collapse { hex } => collapse::resolve(state, &mut ctx, hex)?,
            }
        }
        let collapses = std::mem::take(&mut state.pending_collapses);
        if collapses.is_empty() {
            break;
        }
        ctx.queue
            .extend(collapses.into_iter().map(|hex| HazardEvent::Collapse { hex }));
    }
    Ok(ctx.outcome)
}

/// A unit displaced again in the same pass stays where it is when that hex
/// is legal; otherwise it has nowhere left to go.
fn revisit(state: &mut GameState, ctx: &mut HazardContext, event: &HazardEvent) -> Result<()> {
    let HazardEvent::Displacement { unit, .. } = event else {
        return Ok(());
    };
    let u = state.unit(*unit)?;
    if !u.is_alive() {
        return Ok(());
    }
    match u.position {
        Some(hex) if state.can_occupy(*unit, hex) => {
            ctx.stage(HazardKind::Displacement, HazardStage::Terminal, Some(*unit));
            Ok(())
        }
        Some(_) => destroy_impossible(state, ctx, *unit),
        None => Ok(()),
    }
}

/// No legal position exists for the unit
pub(crate) fn destroy_impossible(
    state: &mut GameState,
    ctx: &mut HazardContext,
    unit: UnitId,
) -> Result<()> {
    if !state.unit(unit)?.is_alive() {
        return Ok(());
    }
    let removed = remove_unit(state, unit, Disposition::Graveyard, "impossible displacement")?;
    ctx.outcome.impossible.push(unit);
    ctx.outcome.damage.destroyed.extend(removed);
    ctx.stage(HazardKind::Displacement, HazardStage::Terminal, Some(unit));
    Ok(())
}
