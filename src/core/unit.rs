//! Unit model
//!
//! A unit is a flat record of capabilities plus mutable battle state. There is
//! no type hierarchy: the class drives turn grouping, the location layout
//! drives damage routing, the crit table picks the critical-hit strategy and
//! the armor kind picks the armor modifier.

use crate::core::{
    ActuatorKind, Crew, EntityId, Equipment, EquipmentKind, Facing, GameEntity, Location,
    LocationKind, LocationLayout, PlayerId, UnitName,
};
use crate::map::HexCoord;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type UnitId = EntityId<Unit>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    Mech,
    ProtoMech,
    Vehicle,
    Infantry,
    Aero,
}

impl UnitClass {
    pub const ALL: [UnitClass; 5] = [
        UnitClass::Mech,
        UnitClass::ProtoMech,
        UnitClass::Vehicle,
        UnitClass::Infantry,
        UnitClass::Aero,
    ];

    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    Biped,
    Quad,
    Tracked,
    Wheeled,
    Hover,
    Foot,
    Aerodyne,
}

impl MovementMode {
    pub fn is_walker(&self) -> bool {
        matches!(self, MovementMode::Biped | MovementMode::Quad)
    }

    pub fn can_enter_water(&self) -> bool {
        !matches!(self, MovementMode::Wheeled | MovementMode::Foot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArmorKind {
    #[default]
    Standard,
    FerroFibrous,
    Hardened,
    Reactive,
    Reflective,
    FerroLamellor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CritTable {
    #[default]
    Slots,
    Vehicle,
    None,
}

/// Where a unit went when it left play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Graveyard,
    Salvage,
    Retreated,
    Devastated,
}

/// How the unit moved this round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MoveMode {
    #[default]
    Stationary,
    Walk,
    Run,
    Jump,
}

impl MoveMode {
    /// To-hit modifier for the attacker having moved this way
    pub fn attacker_modifier(&self) -> i32 {
        match self {
            MoveMode::Stationary => 0,
            MoveMode::Walk => 1,
            MoveMode::Run => 2,
            MoveMode::Jump => 3,
        }
    }
}

/// Round-scoped bookkeeping, reset at the end of every round
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundState {
    pub moved: MoveMode,
    pub hexes_moved: u32,
    /// Damage taken during the current phase (20+ queues a piloting roll)
    pub phase_damage: u32,
    /// Finished acting in the current phase
    pub done: bool,
    pub fell: bool,
    pub ams_used: bool,
}

/// Transport relations
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<UnitId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub carried: Vec<UnitId>,
    /// Tons of cargo space
    #[serde(default)]
    pub capacity: u32,
}

/// Effects from vehicle critical hits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VehicleDamage {
    pub driver_hits: u32,
    /// Rounds the crew remains stunned
    pub stunned: u32,
    pub immobile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: UnitName,
    pub owner: PlayerId,
    pub class: UnitClass,
    pub movement: MovementMode,
    pub layout: LocationLayout,
    #[serde(default)]
    pub armor_kind: ArmorKind,
    #[serde(default)]
    pub crit_table: CritTable,
    pub tonnage: u32,
    pub walk_mp: u32,
    #[serde(default)]
    pub jump_mp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<HexCoord>,
    #[serde(default)]
    pub facing: Facing,
    /// Level above the hex floor
    #[serde(default)]
    pub elevation: i32,
    #[serde(default)]
    pub prone: bool,
    pub locations: Vec<Location>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    pub crew: Crew,
    #[serde(default)]
    pub heat: u32,
    #[serde(default)]
    pub heat_buildup: u32,
    /// Heat sinks built into the engine, in addition to mounted ones
    #[serde(default)]
    pub base_heat_sinks: u32,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub deploy_round: u32,
    #[serde(default)]
    pub deployed: bool,
    #[serde(default)]
    pub offboard: bool,
    #[serde(default)]
    pub commander: bool,
    #[serde(default)]
    pub battle_value: u32,
    #[serde(default)]
    pub destroyed: bool,
    /// Marked for removal at the end of the phase
    #[serde(default)]
    pub doomed: bool,
    #[serde(default)]
    pub shutdown: bool,
    #[serde(default)]
    pub crippled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    #[serde(default)]
    pub vehicle_damage: VehicleDamage,
    #[serde(default)]
    pub round: RoundState,
}

impl GameEntity<Unit> for Unit {
    fn id(&self) -> UnitId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl Unit {
    pub fn location(&self, kind: LocationKind) -> Option<&Location> {
        self.locations.iter().find(|l| l.kind == kind)
    }

    pub fn location_mut(&mut self, kind: LocationKind) -> Option<&mut Location> {
        self.locations.iter_mut().find(|l| l.kind == kind)
    }

    pub fn is_walker(&self) -> bool {
        self.movement.is_walker()
    }

    /// Heat is tracked only for units with heat sinks or a heat-generating engine
    pub fn tracks_heat(&self) -> bool {
        matches!(self.class, UnitClass::Mech | UnitClass::ProtoMech | UnitClass::Aero)
    }

    /// On the board and able to take part in the battle
    pub fn is_active(&self) -> bool {
        self.deployed && !self.destroyed && !self.doomed && self.disposition.is_none()
    }

    /// Still in play, deployed or waiting to deploy
    pub fn is_alive(&self) -> bool {
        !self.destroyed && !self.doomed && self.disposition.is_none()
    }

    pub fn is_carried(&self) -> bool {
        self.transport.carrier.is_some()
    }

    pub fn can_act(&self) -> bool {
        self.is_active() && !self.shutdown && self.crew.is_active() && !self.is_carried()
    }

    pub fn can_move(&self) -> bool {
        self.can_act() && !self.vehicle_damage.immobile && self.walk_mp > 0
    }

    pub fn run_mp(&self) -> u32 {
        let walk = self.effective_walk_mp();
        walk + walk.div_ceil(2)
    }

    /// Walking MP after heat and leg damage
    pub fn effective_walk_mp(&self) -> u32 {
        let heat_penalty = if self.tracks_heat() { self.heat / 5 } else { 0 };
        let destroyed_legs = self
            .locations
            .iter()
            .filter(|l| l.kind.is_leg() && l.destroyed)
            .count() as u32;
        if destroyed_legs > 0 && self.layout == LocationLayout::Biped {
            return 1;
        }
        self.walk_mp
            .saturating_sub(heat_penalty)
            .saturating_sub(destroyed_legs)
    }

    fn hits_on(&self, pred: impl Fn(&EquipmentKind) -> bool) -> u32 {
        self.equipment
            .iter()
            .filter(|e| pred(&e.kind))
            .map(|e| e.hits)
            .sum()
    }

    pub fn engine_hits(&self) -> u32 {
        self.hits_on(|k| matches!(k, EquipmentKind::Engine))
    }

    pub fn gyro_hits(&self) -> u32 {
        self.hits_on(|k| matches!(k, EquipmentKind::Gyro))
    }

    pub fn sensor_hits(&self) -> u32 {
        self.hits_on(|k| matches!(k, EquipmentKind::Sensors))
    }

    pub fn life_support_hit(&self) -> bool {
        self.hits_on(|k| matches!(k, EquipmentKind::LifeSupport)) > 0
    }

    /// Piloting modifier from damaged leg actuators and destroyed legs
    pub fn leg_damage_modifier(&self) -> i32 {
        let actuators: i32 = self
            .equipment
            .iter()
            .filter(|e| e.hits > 0 || e.destroyed)
            .filter_map(|e| match e.kind {
                EquipmentKind::Actuator(kind) if kind.is_leg() => Some(kind.psr_modifier()),
                _ => None,
            })
            .sum();
        let legs = self
            .locations
            .iter()
            .filter(|l| l.kind.is_leg() && l.destroyed)
            .count() as i32;
        actuators + legs * 5
    }

    pub fn has_actuator(&self, location: LocationKind, kind: ActuatorKind) -> bool {
        self.equipment.iter().any(|e| {
            e.location == location
                && e.kind == EquipmentKind::Actuator(kind)
                && !e.destroyed
                && e.hits == 0
        })
    }

    /// Working heat sinks including the engine-integrated ones
    pub fn heat_dissipation(&self) -> u32 {
        let mounted = self
            .equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::HeatSink) && e.is_usable())
            .count() as u32;
        self.base_heat_sinks + mounted
    }

    /// Indices of weapons that can fire this phase
    pub fn ready_weapons(&self) -> SmallVec<[usize; 8]> {
        self.equipment
            .iter()
            .enumerate()
            .filter(|(_, e)| e.weapon().is_some() && e.is_usable())
            .filter(|(_, e)| self.location(e.location).is_some_and(|l| !l.destroyed))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the item at `index` can still detonate. Equipment in a
    /// destroyed location is gone and never explodes.
    pub fn can_explode(&self, index: usize) -> bool {
        self.equipment.get(index).is_some_and(|e| {
            e.is_explosive() && self.location(e.location).is_some_and(|l| !l.destroyed)
        })
    }

    /// First ammo bin with shots left for the given ammo type
    pub fn find_ammo(&self, ammo: &str) -> Option<usize> {
        self.equipment.iter().position(|e| {
            !e.destroyed
                && !e.exploded
                && e.ammo().is_some_and(|bin| bin.ammo == ammo && bin.shots > 0)
        })
    }

    pub fn has_working(&self, pred: impl Fn(&EquipmentKind) -> bool) -> bool {
        self.equipment
            .iter()
            .any(|e| pred(&e.kind) && e.is_usable())
    }

    pub fn has_artillery(&self) -> bool {
        self.equipment
            .iter()
            .any(|e| e.weapon().is_some_and(|w| w.is_artillery()) && e.is_usable())
    }

    pub fn total_armor(&self) -> u32 {
        self.locations
            .iter()
            .map(|l| l.armor + l.rear_armor.unwrap_or(0))
            .sum()
    }

    pub fn total_internal(&self) -> u32 {
        self.locations.iter().map(|l| l.internal).sum()
    }

    pub fn original_internal(&self) -> u32 {
        self.locations.iter().map(|l| l.original_internal).sum()
    }

    /// Forced-withdrawal threshold: half the internal structure gone, a vital
    /// location's structure exhausted below a third, or no weapons left.
    pub fn is_crippled(&self) -> bool {
        if !self.is_alive() {
            return false;
        }
        let internal_lost = self.total_internal() * 2 <= self.original_internal();
        let vital_critical = self.locations.iter().any(|l| {
            self.layout.is_vital(l.kind) && !l.destroyed && l.internal * 3 < l.original_internal
        });
        let has_weapons = self.equipment.iter().any(|e| e.weapon().is_some());
        let disarmed = has_weapons && self.ready_weapons().is_empty();
        internal_lost || vital_critical || disarmed || self.engine_hits() >= 2
    }

    /// Total hexes the unit may enter this phase for the given mode
    pub fn mp_for(&self, mode: MoveMode) -> u32 {
        match mode {
            MoveMode::Stationary => 0,
            MoveMode::Walk => self.effective_walk_mp(),
            MoveMode::Run => self.run_mp(),
            MoveMode::Jump => self.jump_mp,
        }
    }

    pub fn reset_round(&mut self) {
        self.round = RoundState::default();
    }
}

#[cfg(test)]
mod tests {
    use crate::core::chassis::ChassisBuilder;
    use crate::core::{EquipmentKind, LocationKind, PlayerId};

    #[test]
    fn test_engine_hits_accumulate() {
        let mut unit = ChassisBuilder::mech("Hunchback", 50, 4).build(PlayerId::new(0));
        assert_eq!(unit.engine_hits(), 0);
        for e in unit.equipment.iter_mut() {
            if e.kind == EquipmentKind::Engine {
                e.hits = 2;
            }
        }
        assert_eq!(unit.engine_hits(), 2);
        assert!(unit.is_crippled());
    }

    #[test]
    fn test_run_mp_rounds_up() {
        let unit = ChassisBuilder::mech("Locust", 20, 8).build(PlayerId::new(0));
        assert_eq!(unit.run_mp(), 12);
        let unit = ChassisBuilder::mech("Atlas", 100, 3).build(PlayerId::new(0));
        assert_eq!(unit.run_mp(), 5);
    }

    #[test]
    fn test_destroyed_leg_slows_biped() {
        let mut unit = ChassisBuilder::mech("Wolverine", 55, 5).build(PlayerId::new(0));
        unit.location_mut(LocationKind::LeftLeg).unwrap().destroy();
        assert_eq!(unit.effective_walk_mp(), 1);
        assert!(unit.leg_damage_modifier() >= 5);
    }

    #[test]
    fn test_ammo_in_lost_location_cannot_explode() {
        let mut unit = ChassisBuilder::mech("Warhammer", 70, 4)
            .ammo("SRM", LocationKind::LeftArm)
            .build(PlayerId::new(0));
        let bin = unit.equipment.iter().position(|e| e.ammo().is_some()).unwrap();
        assert!(unit.can_explode(bin));
        unit.location_mut(LocationKind::LeftArm).unwrap().destroy();
        assert!(!unit.can_explode(bin));
        assert!(!unit.can_explode(unit.equipment.len()));
    }

    #[test]
    fn test_new_unit_is_not_crippled() {
        let mut unit = ChassisBuilder::mech("Griffin", 55, 5)
            .weapon("PPC", LocationKind::RightArm)
            .build(PlayerId::new(0));
        unit.deployed = true;
        assert!(!unit.is_crippled());
    }
}
