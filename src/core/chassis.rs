//! Unit construction: structure tables, default equipment and the weapon catalogue
//!
//! Scenarios describe units by class, tonnage and mounted weapons; the
//! builder fills in internal structure, default armor and the fixed equipment
//! every chassis of that class carries.

use crate::core::{
    ActuatorKind, AmmoBin, ArmorKind, Crew, CritTable, DamageClass, EntityId, Equipment,
    EquipmentKind, Location, LocationKind, LocationLayout, MovementMode, PlayerId, Transport,
    Unit, UnitClass, UnitName, VehicleDamage, WeaponStats,
};
use crate::core::Facing;

use LocationKind as L;

/// Biped internal structure by tonnage: (tons, center torso, side torso, arm, leg).
/// The head always has 3 points.
const STRUCTURE_TABLE: [(u32, u32, u32, u32, u32); 17] = [
    (20, 6, 5, 3, 4),
    (25, 8, 6, 4, 6),
    (30, 10, 7, 5, 7),
    (35, 11, 8, 6, 8),
    (40, 12, 10, 6, 10),
    (45, 14, 11, 7, 11),
    (50, 16, 12, 8, 12),
    (55, 18, 13, 9, 13),
    (60, 20, 14, 10, 14),
    (65, 21, 15, 10, 15),
    (70, 22, 15, 11, 15),
    (75, 23, 16, 12, 16),
    (80, 25, 17, 13, 17),
    (85, 27, 18, 14, 18),
    (90, 29, 19, 15, 19),
    (95, 30, 20, 16, 20),
    (100, 31, 21, 17, 21),
];

/// Internal structure of a walker location for the given tonnage
pub fn walker_structure(tonnage: u32, kind: LocationKind) -> u32 {
    let rounded = (tonnage.clamp(20, 100) + 2) / 5 * 5;
    let row = STRUCTURE_TABLE
        .iter()
        .find(|r| r.0 >= rounded)
        .unwrap_or(&STRUCTURE_TABLE[STRUCTURE_TABLE.len() - 1]);
    match kind {
        L::Head => 3,
        L::CenterTorso => row.1,
        L::LeftTorso | L::RightTorso => row.2,
        L::LeftArm | L::RightArm => row.3,
        _ => row.4,
    }
}

/// Weapon statistics and critical slots by catalogue name
pub fn weapon_stats(name: &str) -> Option<(WeaponStats, u32)> {
    let direct = |damage, heat, ranges, class, slots| {
        Some((
            WeaponStats {
                damage,
                heat,
                ranges,
                min_range: 0,
                cluster: None,
                ammo: None,
                class,
                artillery_delay: None,
            },
            slots,
        ))
    };
    let mut found = match name {
        "Small Laser" => direct(3, 1, [1, 2, 3], DamageClass::Energy, 1),
        "Medium Laser" => direct(5, 3, [3, 6, 9], DamageClass::Energy, 1),
        "Large Laser" => direct(8, 8, [5, 10, 15], DamageClass::Energy, 2),
        "PPC" => direct(10, 10, [6, 12, 18], DamageClass::Energy, 3),
        "Flamer" => direct(2, 3, [1, 2, 3], DamageClass::Heat, 1),
        "Machine Gun" => direct(2, 0, [1, 2, 3], DamageClass::Ballistic, 1),
        "AC/5" => direct(5, 1, [6, 12, 18], DamageClass::Ballistic, 4),
        "AC/10" => direct(10, 3, [5, 10, 15], DamageClass::Ballistic, 7),
        "AC/20" => direct(20, 7, [3, 6, 9], DamageClass::Ballistic, 10),
        "LRM 10" => direct(1, 4, [7, 14, 21], DamageClass::Missile, 2),
        "LRM 20" => direct(1, 6, [7, 14, 21], DamageClass::Missile, 5),
        "SRM 4" => direct(2, 3, [3, 6, 9], DamageClass::Missile, 1),
        "SRM 6" => direct(2, 4, [3, 6, 9], DamageClass::Missile, 2),
        "Arrow IV" => direct(20, 10, [17, 17, 34], DamageClass::Artillery, 15),
        "Thumper" => direct(15, 6, [17, 17, 34], DamageClass::Artillery, 15),
        "Long Tom" => direct(25, 20, [17, 17, 34], DamageClass::Artillery, 30),
        _ => None,
    };
    if let Some((stats, _)) = found.as_mut() {
        match name {
            "PPC" | "AC/5" => stats.min_range = 3,
            "LRM 10" | "LRM 20" => stats.min_range = 6,
            _ => {}
        }
        stats.cluster = match name {
            "LRM 10" => Some(10),
            "LRM 20" => Some(20),
            "SRM 4" => Some(4),
            "SRM 6" => Some(6),
            _ => None,
        };
        stats.ammo = match name {
            "Machine Gun" => Some("MG"),
            "AC/5" => Some("AC5"),
            "AC/10" => Some("AC10"),
            "AC/20" => Some("AC20"),
            "LRM 10" | "LRM 20" => Some("LRM"),
            "SRM 4" | "SRM 6" => Some("SRM"),
            "Arrow IV" => Some("ArrowIV"),
            "Thumper" => Some("Thumper"),
            "Long Tom" => Some("LongTom"),
            _ => None,
        }
        .map(str::to_string);
        stats.artillery_delay = match name {
            "Arrow IV" => Some(0),
            "Thumper" => Some(1),
            "Long Tom" => Some(2),
            _ => None,
        };
    }
    found
}

/// Full ammunition bin by ammo type
pub fn ammo_bin(ammo: &str) -> Option<AmmoBin> {
    let (shots, damage_per_shot) = match ammo {
        "MG" => (200, 2),
        "AC5" => (20, 5),
        "AC10" => (10, 10),
        "AC20" => (5, 20),
        "LRM" => (120, 1),
        "SRM" => (90, 2),
        "ArrowIV" => (5, 20),
        "Thumper" => (20, 15),
        "LongTom" => (5, 25),
        _ => return None,
    };
    Some(AmmoBin {
        ammo: ammo.to_string(),
        shots,
        damage_per_shot,
    })
}

/// Builder for units
#[derive(Debug, Clone)]
pub struct ChassisBuilder {
    name: String,
    class: UnitClass,
    movement: MovementMode,
    layout: LocationLayout,
    tonnage: u32,
    walk_mp: u32,
    jump_mp: u32,
    gunnery: i32,
    piloting: i32,
    crew_size: usize,
    armor_kind: ArmorKind,
    crit_table: CritTable,
    armor: Vec<(LocationKind, u32, Option<u32>)>,
    equipment: Vec<Equipment>,
    heat_sinks: Option<u32>,
    battle_value: Option<u32>,
    commander: bool,
    offboard: bool,
    deploy_round: u32,
    capacity: u32,
}

impl ChassisBuilder {
    fn base(
        name: &str,
        class: UnitClass,
        movement: MovementMode,
        layout: LocationLayout,
        tonnage: u32,
        walk_mp: u32,
    ) -> Self {
        ChassisBuilder {
            name: name.to_string(),
            class,
            movement,
            layout,
            tonnage,
            walk_mp,
            jump_mp: 0,
            gunnery: 4,
            piloting: 5,
            crew_size: 1,
            armor_kind: ArmorKind::Standard,
            crit_table: match class {
                UnitClass::Mech | UnitClass::ProtoMech => CritTable::Slots,
                UnitClass::Vehicle => CritTable::Vehicle,
                UnitClass::Infantry | UnitClass::Aero => CritTable::None,
            },
            armor: Vec::new(),
            equipment: Vec::new(),
            heat_sinks: None,
            battle_value: None,
            commander: false,
            offboard: false,
            deploy_round: 0,
            capacity: 0,
        }
    }

    pub fn mech(name: &str, tonnage: u32, walk_mp: u32) -> Self {
        Self::base(
            name,
            UnitClass::Mech,
            MovementMode::Biped,
            LocationLayout::Biped,
            tonnage,
            walk_mp,
        )
    }

    pub fn quad(name: &str, tonnage: u32, walk_mp: u32) -> Self {
        Self::base(
            name,
            UnitClass::Mech,
            MovementMode::Quad,
            LocationLayout::Quad,
            tonnage,
            walk_mp,
        )
    }

    pub fn protomech(name: &str, tonnage: u32, walk_mp: u32) -> Self {
        Self::base(
            name,
            UnitClass::ProtoMech,
            MovementMode::Biped,
            LocationLayout::Proto,
            tonnage,
            walk_mp,
        )
    }

    pub fn vehicle(name: &str, tonnage: u32, cruise_mp: u32, movement: MovementMode) -> Self {
        let mut b = Self::base(
            name,
            UnitClass::Vehicle,
            movement,
            LocationLayout::Vehicle,
            tonnage,
            cruise_mp,
        );
        b.crew_size = (tonnage / 15).max(1) as usize;
        b
    }

    /// `tonnage` doubles as trooper count for platoons
    pub fn infantry(name: &str, troopers: u32, walk_mp: u32) -> Self {
        Self::base(
            name,
            UnitClass::Infantry,
            MovementMode::Foot,
            LocationLayout::Infantry,
            troopers,
            walk_mp,
        )
    }

    pub fn aero(name: &str, tonnage: u32, thrust: u32) -> Self {
        Self::base(
            name,
            UnitClass::Aero,
            MovementMode::Aerodyne,
            LocationLayout::Aero,
            tonnage,
            thrust,
        )
    }

    pub fn jump(mut self, mp: u32) -> Self {
        self.jump_mp = mp;
        self
    }

    pub fn skills(mut self, gunnery: i32, piloting: i32) -> Self {
        self.gunnery = gunnery;
        self.piloting = piloting;
        self
    }

    pub fn armor_kind(mut self, kind: ArmorKind) -> Self {
        self.armor_kind = kind;
        self
    }

    pub fn crit_table(mut self, table: CritTable) -> Self {
        self.crit_table = table;
        self
    }

    pub fn armor(mut self, location: LocationKind, front: u32, rear: Option<u32>) -> Self {
        self.armor.retain(|(k, _, _)| *k != location);
        self.armor.push((location, front, rear));
        self
    }

    /// Mount a catalogue weapon. Unknown names are ignored; callers validate
    /// names with [`weapon_stats`] first.
    pub fn weapon(mut self, name: &str, location: LocationKind) -> Self {
        if let Some((stats, slots)) = weapon_stats(name) {
            self.equipment.push(
                Equipment::new(name, EquipmentKind::Weapon(stats), location).with_slots(slots),
            );
        }
        self
    }

    /// Mount a full ammunition bin
    pub fn ammo(mut self, ammo: &str, location: LocationKind) -> Self {
        if let Some(bin) = ammo_bin(ammo) {
            self.equipment.push(Equipment::new(
                format!("{} Ammo", ammo),
                EquipmentKind::Ammo(bin),
                location,
            ));
        }
        self
    }

    pub fn equipment(mut self, item: Equipment) -> Self {
        self.equipment.push(item);
        self
    }

    pub fn heat_sinks(mut self, count: u32) -> Self {
        self.heat_sinks = Some(count);
        self
    }

    pub fn battle_value(mut self, bv: u32) -> Self {
        self.battle_value = Some(bv);
        self
    }

    pub fn commander(mut self) -> Self {
        self.commander = true;
        self
    }

    pub fn offboard(mut self) -> Self {
        self.offboard = true;
        self
    }

    pub fn deploy_round(mut self, round: u32) -> Self {
        self.deploy_round = round;
        self
    }

    pub fn capacity(mut self, tons: u32) -> Self {
        self.capacity = tons;
        self
    }

    fn structure(&self, kind: LocationKind) -> u32 {
        let t = self.tonnage;
        match self.layout {
            LocationLayout::Biped => walker_structure(t, kind),
            LocationLayout::Quad => match kind {
                L::FrontLeftLeg | L::FrontRightLeg | L::RearLeftLeg | L::RearRightLeg => {
                    walker_structure(t, L::LeftLeg)
                }
                other => walker_structure(t, other),
            },
            LocationLayout::Proto => match kind {
                L::Head => 1 + t / 3,
                L::CenterTorso => 2 * t,
                L::LeftArm | L::RightArm => t / 2 + 1,
                L::Legs => t + 2,
                _ => 3,
            },
            LocationLayout::Vehicle => t.div_ceil(10),
            LocationLayout::Infantry => t,
            LocationLayout::Aero => match kind {
                L::Fuselage => (t / 5).max(1),
                _ => t.div_ceil(10),
            },
        }
    }

    fn default_armor(&self, kind: LocationKind, internal: u32) -> (u32, Option<u32>) {
        let t = self.tonnage;
        match self.layout {
            LocationLayout::Biped | LocationLayout::Quad => match kind {
                L::Head => (9, None),
                L::CenterTorso | L::LeftTorso | L::RightTorso => {
                    (internal * 3 / 2, Some(internal / 2))
                }
                _ => (internal * 2, None),
            },
            LocationLayout::Proto => (internal, None),
            LocationLayout::Vehicle => match kind {
                L::Front => (t / 2, None),
                L::Rear => (t / 4, None),
                _ => (t * 3 / 8, None),
            },
            LocationLayout::Infantry => (0, None),
            LocationLayout::Aero => (t / 4, None),
        }
    }

    fn fixed_equipment(&self) -> Vec<Equipment> {
        let mut items = Vec::new();
        let actuator = |kind: ActuatorKind, loc: LocationKind| {
            Equipment::new(format!("{:?}", kind), EquipmentKind::Actuator(kind), loc)
        };
        match self.layout {
            LocationLayout::Biped | LocationLayout::Quad => {
                items.push(Equipment::new("Engine", EquipmentKind::Engine, L::CenterTorso).with_slots(6));
                items.push(Equipment::new("Gyro", EquipmentKind::Gyro, L::CenterTorso).with_slots(4));
                items.push(Equipment::new("Cockpit", EquipmentKind::Cockpit, L::Head));
                items.push(Equipment::new("Life Support", EquipmentKind::LifeSupport, L::Head).with_slots(2));
                items.push(Equipment::new("Sensors", EquipmentKind::Sensors, L::Head).with_slots(2));
                if self.layout == LocationLayout::Biped {
                    for arm in [L::LeftArm, L::RightArm] {
                        for kind in [
                            ActuatorKind::Shoulder,
                            ActuatorKind::UpperArm,
                            ActuatorKind::LowerArm,
                            ActuatorKind::Hand,
                        ] {
                            items.push(actuator(kind, arm));
                        }
                    }
                }
                let legs: &[LocationKind] = if self.layout == LocationLayout::Biped {
                    &[L::LeftLeg, L::RightLeg]
                } else {
                    &[L::FrontLeftLeg, L::FrontRightLeg, L::RearLeftLeg, L::RearRightLeg]
                };
                for &leg in legs {
                    for kind in [
                        ActuatorKind::Hip,
                        ActuatorKind::UpperLeg,
                        ActuatorKind::LowerLeg,
                        ActuatorKind::Foot,
                    ] {
                        items.push(actuator(kind, leg));
                    }
                }
            }
            LocationLayout::Proto => {
                items.push(Equipment::new("Engine", EquipmentKind::Engine, L::CenterTorso));
                items.push(Equipment::new("Sensors", EquipmentKind::Sensors, L::Head));
            }
            LocationLayout::Aero => {
                items.push(Equipment::new("Engine", EquipmentKind::Engine, L::Fuselage).with_slots(3));
            }
            _ => {}
        }
        items
    }

    pub fn build(self, owner: PlayerId) -> Unit {
        let locations = self
            .layout
            .locations()
            .iter()
            .map(|&kind| {
                let internal = self.structure(kind);
                let (front, rear) = match self.armor.iter().find(|(k, _, _)| *k == kind) {
                    Some(&(_, f, r)) => (f, r),
                    None => self.default_armor(kind, internal),
                };
                let rear = if self.layout.has_rear_armor(kind) {
                    Some(rear.unwrap_or(0))
                } else {
                    None
                };
                Location::new(kind, front, rear, internal)
            })
            .collect();

        let mut equipment = self.fixed_equipment();
        equipment.extend(self.equipment.iter().cloned());

        let base_heat_sinks = self.heat_sinks.unwrap_or(match self.class {
            UnitClass::Mech | UnitClass::Aero => 10,
            UnitClass::ProtoMech => 2,
            _ => 0,
        });
        let weapon_damage: u32 = equipment
            .iter()
            .filter_map(|e| e.weapon())
            .map(|w| w.damage * w.cluster.unwrap_or(1))
            .sum();
        let battle_value = self
            .battle_value
            .unwrap_or(self.tonnage * 20 + weapon_damage * 10);

        let mut crew = Crew::new(format!("{} crew", self.name), self.gunnery, self.piloting);
        for i in 1..self.crew_size {
            crew.members
                .push(crate::core::CrewMember::new(format!("{} crew {}", self.name, i + 1)));
        }

        Unit {
            id: EntityId::new(0),
            name: UnitName::new(self.name),
            owner,
            class: self.class,
            movement: self.movement,
            layout: self.layout,
            armor_kind: self.armor_kind,
            crit_table: self.crit_table,
            tonnage: self.tonnage,
            walk_mp: self.walk_mp,
            jump_mp: self.jump_mp,
            position: None,
            facing: Facing::NORTH,
            elevation: 0,
            prone: false,
            locations,
            equipment,
            crew,
            heat: 0,
            heat_buildup: 0,
            base_heat_sinks,
            transport: Transport {
                capacity: self.capacity,
                ..Default::default()
            },
            deploy_round: self.deploy_round,
            deployed: false,
            offboard: self.offboard,
            commander: self.commander,
            battle_value,
            destroyed: false,
            doomed: false,
            shutdown: false,
            crippled: false,
            disposition: None,
            vehicle_damage: VehicleDamage::default(),
            round: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_table_lookup() {
        assert_eq!(walker_structure(20, L::CenterTorso), 6);
        assert_eq!(walker_structure(100, L::LeftLeg), 21);
        assert_eq!(walker_structure(53, L::LeftArm), 9);
        assert_eq!(walker_structure(75, L::Head), 3);
    }

    #[test]
    fn test_biped_has_rear_armor_only_on_torsos() {
        let unit = ChassisBuilder::mech("Shadow Hawk", 55, 5).build(PlayerId::new(0));
        assert_eq!(unit.locations.len(), 8);
        for loc in &unit.locations {
            let torso = matches!(loc.kind, L::CenterTorso | L::LeftTorso | L::RightTorso);
            assert_eq!(loc.rear_armor.is_some(), torso, "{}", loc.kind);
        }
        assert_eq!(unit.location(L::Head).unwrap().armor, 9);
    }

    #[test]
    fn test_catalogue_weapons() {
        let (lrm, slots) = weapon_stats("LRM 20").unwrap();
        assert_eq!(lrm.cluster, Some(20));
        assert_eq!(lrm.min_range, 6);
        assert_eq!(lrm.ammo.as_deref(), Some("LRM"));
        assert_eq!(slots, 5);
        assert!(weapon_stats("Gauss Cannon Mk IX").is_none());
        assert!(weapon_stats("Long Tom").unwrap().0.is_artillery());
    }

    #[test]
    fn test_armor_override() {
        let unit = ChassisBuilder::vehicle("Scorpion", 25, 4, MovementMode::Tracked)
            .armor(L::Front, 10, None)
            .build(PlayerId::new(0));
        assert_eq!(unit.location(L::Front).unwrap().armor, 10);
        assert_eq!(unit.location(L::Front).unwrap().internal, 3);
        assert_eq!(unit.crit_table, CritTable::Vehicle);
    }
}
