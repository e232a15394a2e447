//! Weapon, physical and artillery attacks
//!
//! Attacks are declared during their phase and resolved together when the
//! phase ends, in declaration order. Every attack of a phase fires, even when
//! its attacker was destroyed by an earlier attack of the same phase.
//!
//! Anti-missile assignments are settled before any attack resolves, so a
//! participant choosing an AMS target never interrupts a damage chain.

use crate::core::{
    AttackDirection, DamageClass, EquipmentKind, HitTable, LocationKind, MoveMode, Unit, UnitClass,
    UnitId,
};
use crate::damage::{apply_clusters, apply_damage, DamageFlags, DamageOutcome, DamageRequest};
use crate::game::actions::AttackDeclaration;
use crate::game::events::AmsOption;
use crate::game::state::{ArtilleryShell, PendingAttack};
use crate::game::{GameState, Phase, Subject};
use crate::hazards::{self, HazardEvent, HazardOutcome};
use crate::map::HexCoord;
use crate::{Result, SimError};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Indirect-fire penalty for artillery
const ARTILLERY_MODIFIER: i32 = 7;
/// Damage lost by artillery splash in each adjacent hex
const SPLASH_FALLOFF: u32 = 10;
/// Cluster-roll penalty applied by an engaging anti-missile system
const AMS_CLUSTER_PENALTY: u32 = 4;

/// Target number with the modifiers that built it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToHit {
    pub value: i32,
    pub modifiers: SmallVec<[(&'static str, i32); 8]>,
}

impl ToHit {
    fn base(name: &'static str, value: i32) -> Self {
        let mut modifiers = SmallVec::new();
        modifiers.push((name, value));
        ToHit { value, modifiers }
    }

    fn add(&mut self, name: &'static str, value: i32) {
        if value != 0 {
            self.value += value;
            self.modifiers.push((name, value));
        }
    }

    pub fn describe(&self) -> String {
        self.modifiers
            .iter()
            .map(|(n, v)| format!("{} {:+}", n, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttackSummary {
    pub hits: u32,
    pub misses: u32,
    pub damage: DamageOutcome,
    pub hazards: HazardOutcome,
}

impl AttackSummary {
    fn merge(&mut self, other: AttackSummary) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.damage.merge(other.damage);
        self.hazards.merge(other.hazards);
    }
}

/// Missiles that hit for a rack of `size` on a 2d6 cluster roll
pub fn cluster_hits(size: u32, roll: u32) -> u32 {
    const TWENTY: [u32; 11] = [6, 6, 9, 12, 12, 12, 12, 16, 16, 20, 20];
    let idx = (roll.clamp(2, 12) - 2) as usize;
    let column: Option<[u32; 11]> = match size {
        2 => Some([1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2]),
        4 => Some([1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4]),
        5 => Some([1, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5]),
        6 => Some([2, 2, 3, 3, 4, 4, 4, 5, 5, 6, 6]),
        10 => Some([3, 3, 4, 6, 6, 6, 6, 8, 8, 10, 10]),
        15 => Some([5, 5, 6, 9, 9, 9, 9, 12, 12, 15, 15]),
        20 => Some(TWENTY),
        _ => None,
    };
    match column {
        Some(c) => c[idx],
        None => ((size * TWENTY[idx]) as f64 / 20.0).round().max(1.0) as u32,
    }
}

/// Side of `target` facing `from`
pub fn attack_direction(target: &Unit, from: HexCoord) -> AttackDirection {
    match target.position {
        Some(pos) if pos != from => {
            let bearing = pos.direction_to(from).value() as i32;
            let relative = (bearing - target.facing.value() as i32).rem_euclid(6);
            AttackDirection::from_relative(relative as u8)
        }
        _ => AttackDirection::Front,
    }
}

fn target_movement_modifier(target: &Unit) -> i32 {
    let hexes = target.round.hexes_moved;
    let base = match hexes {
        0..=2 => 0,
        3..=4 => 1,
        5..=6 => 2,
        7..=9 => 3,
        _ => 4,
    };
    base + i32::from(target.round.moved == MoveMode::Jump)
}

fn heat_modifier(unit: &Unit) -> i32 {
    if !unit.tracks_heat() {
        return 0;
    }
    match unit.heat {
        0..=7 => 0,
        8..=12 => 1,
        13..=16 => 2,
        17..=23 => 3,
        _ => 4,
    }
}

/// Modifiers every attack against `target` shares
fn target_modifiers(state: &GameState, to_hit: &mut ToHit, attacker: &Unit, target: &Unit) {
    to_hit.add("target movement", target_movement_modifier(target));
    if let Some(h) = target.position.and_then(|p| state.board.hex(p)) {
        to_hit.add("terrain", h.terrain.to_hit_modifier());
    }
    if target.prone {
        let adjacent = matches!((attacker.position, target.position), (Some(a), Some(t)) if a.distance(t) <= 1);
        to_hit.add("prone target", if adjacent { -2 } else { 1 });
    }
    if target.shutdown || !target.crew.is_active() || target.vehicle_damage.immobile {
        to_hit.add("immobile target", -4);
    }
}

/// Target number for a weapon shot, or why the shot is impossible
pub fn weapon_to_hit(state: &GameState, attacker: UnitId, weapon: usize, target: UnitId) -> Result<ToHit> {
    let a = state.unit(attacker)?;
    let t = state.unit(target)?;
    let stats = a
        .equipment
        .get(weapon)
        .and_then(|e| e.weapon())
        .ok_or_else(|| SimError::InvalidAction(format!("{} has no weapon {}", a.name, weapon)))?;
    let (Some(from), Some(to)) = (a.position, t.position) else {
        return Err(SimError::InvalidPosition("attacker or target is off the board".into()));
    };
    let distance = from.distance(to);
    if distance > stats.max_range() {
        return Err(SimError::InvalidAction(format!(
            "{} is out of range ({} > {})",
            t.name,
            distance,
            stats.max_range()
        )));
    }

    let mut to_hit = ToHit::base("gunnery", a.crew.gunnery);
    let band = if distance <= stats.ranges[0] {
        0
    } else if distance <= stats.ranges[1] {
        2
    } else {
        4
    };
    to_hit.add("range", band);
    if stats.min_range > 0 && distance <= stats.min_range {
        to_hit.add("minimum range", (stats.min_range - distance + 1) as i32);
    }
    to_hit.add("attacker movement", a.round.moved.attacker_modifier());
    to_hit.add("heat", heat_modifier(a));
    to_hit.add("sensors", 2 * a.sensor_hits() as i32);
    to_hit.add("driver", a.vehicle_damage.driver_hits as i32);
    target_modifiers(state, &mut to_hit, a, t);
    Ok(to_hit)
}

/// Target number for a physical attack
pub fn physical_to_hit(state: &GameState, attacker: UnitId, declaration: &AttackDeclaration) -> Result<ToHit> {
    let a = state.unit(attacker)?;
    let target = declaration
        .target()
        .ok_or_else(|| SimError::InvalidAction("physical attacks need a target unit".into()))?;
    let t = state.unit(target)?;
    let mut to_hit = ToHit::base("piloting", a.crew.piloting);
    match declaration {
        AttackDeclaration::Punch { arm, .. } => {
            for (kind, penalty) in [
                (crate::core::ActuatorKind::UpperArm, 2),
                (crate::core::ActuatorKind::LowerArm, 2),
                (crate::core::ActuatorKind::Hand, 1),
            ] {
                if !a.has_actuator(*arm, kind) {
                    to_hit.add("arm actuator", penalty);
                }
            }
        }
        AttackDeclaration::Kick { .. } => to_hit.add("kick", -2),
        AttackDeclaration::Push { .. } => to_hit.add("push", -1),
        AttackDeclaration::Charge { .. } => {
            to_hit.add("attacker movement", a.round.moved.attacker_modifier())
        }
        _ => {}
    }
    target_modifiers(state, &mut to_hit, a, t);
    Ok(to_hit)
}

fn invalid(msg: impl Into<String>) -> SimError {
    SimError::InvalidAction(msg.into())
}

/// Check one unit's declarations against the current phase
pub fn validate_attacks(state: &GameState, attacker: UnitId, attacks: &[AttackDeclaration]) -> Result<()> {
    let a = state.unit(attacker)?;
    if !a.can_act() {
        return Err(invalid(format!("{} cannot attack", a.name)));
    }
    let mut weapons_used: SmallVec<[usize; 8]> = SmallVec::new();
    let physical = attacks.iter().filter(|d| d.is_physical()).count();
    let punches = attacks
        .iter()
        .filter(|d| matches!(d, AttackDeclaration::Punch { .. }))
        .count();
    if physical > 1 && punches != physical {
        return Err(invalid("only punches may be combined in one physical attack"));
    }

    for declaration in attacks {
        match (state.phase, declaration) {
            (Phase::Firing, AttackDeclaration::Weapon { weapon, target }) => {
                if weapons_used.contains(weapon) {
                    return Err(invalid(format!("weapon {} fires twice", weapon)));
                }
                weapons_used.push(*weapon);
                if !a.ready_weapons().contains(weapon) {
                    return Err(invalid(format!("weapon {} of {} is not ready", weapon, a.name)));
                }
                if a.equipment[*weapon].weapon().is_some_and(|w| w.is_artillery()) {
                    return Err(invalid("artillery fires in the targeting phases"));
                }
                check_target(state, a, *target)?;
                weapon_to_hit(state, attacker, *weapon, *target)?;
            }
            (Phase::Targeting | Phase::Offboard, AttackDeclaration::Artillery { weapon, hex }) => {
                if weapons_used.contains(weapon) {
                    return Err(invalid(format!("weapon {} fires twice", weapon)));
                }
                weapons_used.push(*weapon);
                let is_artillery = a.ready_weapons().contains(weapon)
                    && a.equipment[*weapon].weapon().is_some_and(|w| w.is_artillery());
                if !is_artillery {
                    return Err(invalid(format!("weapon {} is not ready artillery", weapon)));
                }
                if !state.board.contains(*hex) {
                    return Err(SimError::InvalidPosition(format!("{} is off the board", hex)));
                }
            }
            (Phase::Physical, d) if d.is_physical() => {
                let Some(target) = d.target() else {
                    return Err(invalid("physical attacks need a target"));
                };
                let t = check_target(state, a, target)?;
                let adjacent = matches!((a.position, t.position), (Some(x), Some(y)) if x.distance(y) == 1);
                if !adjacent {
                    return Err(invalid(format!("{} is not adjacent", t.name)));
                }
                check_physical(a, d)?;
            }
            _ => {
                return Err(SimError::WrongPhase(format!(
                    "{:?} during {:?}",
                    declaration, state.phase
                )))
            }
        }
    }
    Ok(())
}

fn check_target<'a>(state: &'a GameState, attacker: &Unit, target: UnitId) -> Result<&'a Unit> {
    let t = state.unit(target)?;
    if !t.is_active() || t.is_carried() || t.position.is_none() {
        return Err(invalid(format!("{} is not a valid target", t.name)));
    }
    if !state.are_enemies(attacker.id, target) {
        return Err(invalid(format!("{} is not an enemy", t.name)));
    }
    Ok(t)
}

fn check_physical(a: &Unit, declaration: &AttackDeclaration) -> Result<()> {
    if !matches!(a.class, UnitClass::Mech | UnitClass::ProtoMech) || a.prone {
        return Err(invalid(format!("{} cannot make physical attacks", a.name)));
    }
    let intact = |kind: LocationKind| a.location(kind).is_some_and(|l| !l.destroyed);
    match declaration {
        AttackDeclaration::Punch { arm, .. } => {
            let arm_ok = matches!(arm, LocationKind::LeftArm | LocationKind::RightArm)
                && intact(*arm)
                && a.has_actuator(*arm, crate::core::ActuatorKind::Shoulder);
            if !arm_ok {
                return Err(invalid(format!("{} cannot punch with {:?}", a.name, arm)));
            }
        }
        AttackDeclaration::Kick { .. } | AttackDeclaration::Push { .. } => {
            if !a.is_walker() || a.locations.iter().any(|l| l.kind.is_leg() && l.destroyed) {
                return Err(invalid(format!("{} has no legs to kick or push with", a.name)));
            }
        }
        AttackDeclaration::Charge { .. } => {
            if a.round.hexes_moved == 0 || a.round.moved == MoveMode::Jump {
                return Err(invalid(format!("{} did not run up to charge", a.name)));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Record a unit's declarations for resolution at the end of the phase
pub fn declare_attacks(state: &mut GameState, attacker: UnitId, attacks: Vec<AttackDeclaration>) -> Result<()> {
    validate_attacks(state, attacker, &attacks)?;
    let label = state.unit_label(attacker);
    let count = attacks.len();
    state.attacks.extend(attacks.into_iter().map(|declaration| PendingAttack {
        attacker,
        declaration,
    }));
    state.unit_mut(attacker)?.round.done = true;
    crate::log_verbose!(state.logger, "{} declares {} attack(s)", label, count);
    Ok(())
}

fn is_missile_attack(state: &GameState, attack: &PendingAttack) -> Option<(UnitId, String, u32)> {
    let AttackDeclaration::Weapon { weapon, target } = attack.declaration else {
        return None;
    };
    let e = state.unit(attack.attacker).ok()?.equipment.get(weapon)?;
    let size = e.weapon()?.cluster?;
    Some((target, e.name.clone(), size))
}

/// Defenders whose anti-missile system could engage one of the declared
/// missile attacks, with the attacks it may choose from
pub fn ams_candidates(state: &GameState) -> Vec<(UnitId, Vec<AmsOption>)> {
    let mut by_defender: FxHashMap<UnitId, Vec<AmsOption>> = FxHashMap::default();
    for (i, attack) in state.attacks.iter().enumerate() {
        let Some((target, weapon, missiles)) = is_missile_attack(state, attack) else {
            continue;
        };
        let armed = state.unit(target).is_ok_and(|t| {
            t.is_active() && !t.round.ams_used && t.has_working(|k| matches!(k, EquipmentKind::AntiMissile))
        });
        if armed {
            by_defender.entry(target).or_default().push(AmsOption {
                attack: i,
                attacker: attack.attacker,
                weapon,
                missiles,
            });
        }
    }
    let mut out: Vec<_> = by_defender.into_iter().collect();
    out.sort_by_key(|(id, _)| *id);
    out
}

/// Resolve every attack declared this phase
///
/// `ams` maps a defender to the index (into the declared attacks) its
/// anti-missile system engages.
pub fn resolve_attacks(state: &mut GameState, ams: &FxHashMap<UnitId, usize>) -> Result<AttackSummary> {
    let attacks = std::mem::take(&mut state.attacks);
    let mut summary = AttackSummary::default();
    for (i, attack) in attacks.iter().enumerate() {
        let engaged = attack
            .declaration
            .target()
            .is_some_and(|t| ams.get(&t) == Some(&i));
        let result = match &attack.declaration {
            AttackDeclaration::Weapon { weapon, target } => {
                resolve_weapon(state, attack.attacker, *weapon, *target, engaged)?
            }
            AttackDeclaration::Artillery { weapon, hex } => {
                launch_artillery(state, attack.attacker, *weapon, *hex)?;
                AttackSummary::default()
            }
            d => resolve_physical(state, attack.attacker, d)?,
        };
        summary.merge(result);
    }
    Ok(summary)
}

/// Spend one shot of ammunition. False when the weapon has nothing to fire.
fn consume_ammo(unit: &mut Unit, ammo: Option<&str>) -> bool {
    let Some(ammo) = ammo else {
        return true;
    };
    let Some(idx) = unit.find_ammo(ammo) else {
        return false;
    };
    if let EquipmentKind::Ammo(bin) = &mut unit.equipment[idx].kind {
        bin.shots -= 1;
    }
    true
}

fn resolve_weapon(
    state: &mut GameState,
    attacker: UnitId,
    weapon: usize,
    target: UnitId,
    ams_engaged: bool,
) -> Result<AttackSummary> {
    let mut summary = AttackSummary::default();
    let label = state.unit_label(attacker);
    let target_label = state.unit_label(target);
    if !state.unit(target)?.is_active() {
        state.report_unit(attacker, format!("{} holds fire: {} is gone", label, target_label));
        return Ok(summary);
    }
    let to_hit = match weapon_to_hit(state, attacker, weapon, target) {
        Ok(t) => t,
        Err(e) => {
            state.report_unit(attacker, format!("{} cannot fire: {}", label, e));
            return Ok(summary);
        }
    };
    let (stats, name) = {
        let a = state.unit_mut(attacker)?;
        let e = &a.equipment[weapon];
        let (Some(stats), name) = (e.weapon().cloned(), e.name.clone()) else {
            return Ok(summary);
        };
        if !consume_ammo(a, stats.ammo.as_deref()) {
            state.report_unit(attacker, format!("{} {} is out of ammunition", label, name));
            return Ok(summary);
        }
        if a.tracks_heat() {
            a.heat_buildup += stats.heat;
        }
        (stats, name)
    };

    let roll = state.dice.roll_2d6();
    let hit = roll.succeeds(to_hit.value);
    state.report_unit(
        attacker,
        format!(
            "{} fires {} at {}: needs {} ({}), rolls {}: {}",
            label,
            name,
            target_label,
            to_hit.value,
            to_hit.describe(),
            roll,
            if hit { "hit" } else { "miss" }
        ),
    );
    if !hit {
        summary.misses += 1;
        return Ok(summary);
    }
    summary.hits += 1;

    let from = state.unit(attacker)?.position;
    let t = state.unit(target)?;
    let direction = from.map_or(AttackDirection::Front, |f| attack_direction(t, f));
    let in_building = t
        .position
        .and_then(|p| state.board.hex(p))
        .is_some_and(|h| h.has_building())
        && from != t.position;
    let flags = DamageFlags {
        through_building: in_building,
        ..DamageFlags::default()
    };

    let out = match stats.cluster {
        Some(size) => {
            let mut cluster_roll = state.dice.roll_2d6().total();
            if ams_engaged {
                cluster_roll = cluster_roll.saturating_sub(AMS_CLUSTER_PENALTY).max(2);
                state.unit_mut(target)?.round.ams_used = true;
                state.report_unit(target, format!("{} engages the {} with its AMS", target_label, name));
            }
            let missiles = cluster_hits(size, cluster_roll);
            let per_cluster = if stats.damage == 1 { 5 } else { stats.damage };
            state.report_unit(target, format!("{} of {} missiles hit {}", missiles, size, target_label));
            apply_clusters(
                state,
                target,
                HitTable::Standard,
                direction,
                missiles * stats.damage,
                per_cluster,
                stats.class,
                flags,
            )?
        }
        None => {
            let roll = state.dice.roll_2d6().total();
            let hit = state.unit(target)?.layout.hit_location(HitTable::Standard, direction, roll);
            apply_damage(
                state,
                DamageRequest::new(target, hit, stats.damage, stats.class).with_flags(flags),
            )?
        }
    };
    summary.damage.merge(out);
    Ok(summary)
}

fn resolve_physical(state: &mut GameState, attacker: UnitId, declaration: &AttackDeclaration) -> Result<AttackSummary> {
    let mut summary = AttackSummary::default();
    let Some(target) = declaration.target() else {
        return Ok(summary);
    };
    let label = state.unit_label(attacker);
    let target_label = state.unit_label(target);
    let a = state.unit(attacker)?;
    let t = state.unit(target)?;
    if !t.is_active() || !a.is_active() {
        return Ok(summary);
    }
    let (Some(from), Some(to)) = (a.position, t.position) else {
        return Ok(summary);
    };
    let tonnage = a.tonnage;
    let target_tonnage = t.tonnage;
    let hexes_moved = a.round.hexes_moved;
    let direction = attack_direction(t, from);
    let to_hit = physical_to_hit(state, attacker, declaration)?;

    let roll = state.dice.roll_2d6();
    let hit = roll.succeeds(to_hit.value);
    let verb = match declaration {
        AttackDeclaration::Punch { .. } => "punches",
        AttackDeclaration::Kick { .. } => "kicks",
        AttackDeclaration::Push { .. } => "pushes",
        _ => "charges",
    };
    state.report_unit(
        attacker,
        format!(
            "{} {} {}: needs {} ({}), rolls {}: {}",
            label,
            verb,
            target_label,
            to_hit.value,
            to_hit.describe(),
            roll,
            if hit { "hit" } else { "miss" }
        ),
    );
    if !hit {
        summary.misses += 1;
        if matches!(declaration, AttackDeclaration::Kick { .. }) {
            state.queue_psr(attacker, 0, "missed kick");
        }
        return Ok(summary);
    }
    summary.hits += 1;
    let push_dir = from.direction_to(to);

    match declaration {
        AttackDeclaration::Punch { arm, .. } => {
            let mut damage = tonnage.div_ceil(10);
            let a = state.unit(attacker)?;
            if !a.has_actuator(*arm, crate::core::ActuatorKind::UpperArm)
                || !a.has_actuator(*arm, crate::core::ActuatorKind::LowerArm)
            {
                damage = damage.div_ceil(2);
            }
            let out = apply_clusters(
                state,
                target,
                HitTable::Punch,
                direction,
                damage,
                damage,
                DamageClass::Physical,
                DamageFlags::default(),
            )?;
            summary.damage.merge(out);
        }
        AttackDeclaration::Kick { .. } => {
            let damage = tonnage / 5;
            let out = apply_clusters(
                state,
                target,
                HitTable::Kick,
                direction,
                damage,
                damage,
                DamageClass::Physical,
                DamageFlags::default(),
            )?;
            summary.damage.merge(out);
            state.queue_psr(target, 0, "kicked");
        }
        AttackDeclaration::Push { .. } => {
            let out = hazards::resolve(
                state,
                [HazardEvent::Displacement {
                    unit: target,
                    direction: push_dir,
                    reason: format!("pushed by {}", label),
                }],
            )?;
            summary.hazards.merge(out);
        }
        AttackDeclaration::Charge { .. } => {
            let to_target = tonnage.div_ceil(10) * hexes_moved.max(1);
            let to_attacker = target_tonnage.div_ceil(10);
            let out = apply_clusters(
                state,
                target,
                HitTable::Standard,
                direction,
                to_target,
                5,
                DamageClass::Physical,
                DamageFlags::default(),
            )?;
            summary.damage.merge(out);
            let out = apply_clusters(
                state,
                attacker,
                HitTable::Standard,
                AttackDirection::Front,
                to_attacker,
                5,
                DamageClass::Physical,
                DamageFlags::default(),
            )?;
            summary.damage.merge(out);
            state.queue_psr(attacker, 2, "charged");
            state.queue_psr(target, 2, "was charged");
            let out = hazards::resolve(
                state,
                [HazardEvent::Displacement {
                    unit: target,
                    direction: push_dir,
                    reason: format!("charged by {}", label),
                }],
            )?;
            summary.hazards.merge(out);
        }
        _ => {}
    }
    Ok(summary)
}

/// Fire an artillery weapon: spend the shell and put it in flight
fn launch_artillery(state: &mut GameState, attacker: UnitId, weapon: usize, hex: HexCoord) -> Result<()> {
    let label = state.unit_label(attacker);
    let round = state.round;
    let a = state.unit_mut(attacker)?;
    let owner = a.owner;
    let gunnery = a.crew.gunnery;
    let e = &a.equipment[weapon];
    let (Some(stats), name) = (e.weapon().cloned(), e.name.clone()) else {
        return Ok(());
    };
    if !consume_ammo(a, stats.ammo.as_deref()) {
        state.report_unit(attacker, format!("{} {} is out of ammunition", label, name));
        return Ok(());
    }
    if a.tracks_heat() {
        a.heat_buildup += stats.heat;
    }
    let delay = stats.artillery_delay.unwrap_or(0);
    state.artillery.push(ArtilleryShell {
        attacker,
        owner,
        weapon: name.clone(),
        hex,
        damage: stats.damage,
        lands: round + delay,
        to_hit: gunnery + ARTILLERY_MODIFIER,
    });
    state.report_unit(
        attacker,
        format!("{} fires {} at {}, landing in round {}", label, name, hex, round + delay),
    );
    Ok(())
}

/// Land every shell due this round
pub fn land_artillery(state: &mut GameState) -> Result<AttackSummary> {
    let round = state.round;
    let (due, flying): (Vec<_>, Vec<_>) = std::mem::take(&mut state.artillery)
        .into_iter()
        .partition(|s| s.lands <= round);
    state.artillery = flying;
    let mut summary = AttackSummary::default();

    for shell in due {
        let auto = state
            .player(shell.owner)
            .is_ok_and(|p| p.auto_hit_hexes.contains(&shell.hex));
        let mut impact = shell.hex;
        if auto {
            summary.hits += 1;
        } else {
            let roll = state.dice.roll_2d6();
            if roll.succeeds(shell.to_hit) {
                summary.hits += 1;
            } else {
                summary.misses += 1;
                let direction = crate::core::Facing::new(state.dice.d6() as i32 - 1);
                let distance = (shell.to_hit - roll.total() as i32).max(1) as u32;
                impact = shell.hex.translated(direction, distance);
            }
        }
        if !state.board.contains(impact) {
            state.report(
                Subject::public(),
                format!("{} shell aimed at {} lands off the board", shell.weapon, shell.hex),
            );
            continue;
        }
        state.report(
            Subject::public(),
            format!("{} shell lands in {}", shell.weapon, impact),
        );

        let mut zone: Vec<(HexCoord, u32)> = vec![(impact, shell.damage)];
        let splash = shell.damage.saturating_sub(SPLASH_FALLOFF);
        if splash > 0 {
            zone.extend(
                impact
                    .neighbors()
                    .into_iter()
                    .filter(|h| state.board.contains(*h))
                    .map(|h| (h, splash)),
            );
        }
        for (hex, damage) in zone {
            for unit in state.units_at(hex) {
                let out = apply_clusters(
                    state,
                    unit,
                    HitTable::Standard,
                    AttackDirection::Front,
                    damage,
                    5,
                    DamageClass::Artillery,
                    DamageFlags::default(),
                )?;
                summary.damage.merge(out);
            }
            if let Some(b) = state.board.hex_mut(hex).and_then(|h| h.building.as_mut()) {
                if b.damage(damage) {
                    state.pending_collapses.push(hex);
                }
            }
        }
    }
    let out = hazards::resolve(state, Vec::new())?;
    summary.hazards.merge(out);
    Ok(summary)
}
