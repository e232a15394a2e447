//! Hit locations, location layouts and their rule tables
//!
//! A unit's body plan is a [`LocationLayout`]. The layout owns everything the
//! damage pipeline needs to know about the plan: which locations exist, where
//! overflow damage goes when a location is destroyed (the transfer graph),
//! which locations are severed along with another, which locations are vital,
//! and how a 2d6 roll maps onto a location for each attack direction.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Head,
    CenterTorso,
    LeftTorso,
    RightTorso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    FrontLeftLeg,
    FrontRightLeg,
    RearLeftLeg,
    RearRightLeg,
    Legs,
    MainGun,
    Front,
    Left,
    Right,
    Rear,
    Turret,
    Platoon,
    Nose,
    LeftWing,
    RightWing,
    Aft,
    Fuselage,
}

impl LocationKind {
    pub fn abbr(&self) -> &'static str {
        match self {
            LocationKind::Head => "HD",
            LocationKind::CenterTorso => "CT",
            LocationKind::LeftTorso => "LT",
            LocationKind::RightTorso => "RT",
            LocationKind::LeftArm => "LA",
            LocationKind::RightArm => "RA",
            LocationKind::LeftLeg => "LL",
            LocationKind::RightLeg => "RL",
            LocationKind::FrontLeftLeg => "FLL",
            LocationKind::FrontRightLeg => "FRL",
            LocationKind::RearLeftLeg => "RLL",
            LocationKind::RearRightLeg => "RRL",
            LocationKind::Legs => "LG",
            LocationKind::MainGun => "MG",
            LocationKind::Front => "FR",
            LocationKind::Left => "LS",
            LocationKind::Right => "RS",
            LocationKind::Rear => "RR",
            LocationKind::Turret => "TU",
            LocationKind::Platoon => "PL",
            LocationKind::Nose => "NOS",
            LocationKind::LeftWing => "LWG",
            LocationKind::RightWing => "RWG",
            LocationKind::Aft => "AFT",
            LocationKind::Fuselage => "SI",
        }
    }

    pub fn is_leg(&self) -> bool {
        matches!(
            self,
            LocationKind::LeftLeg
                | LocationKind::RightLeg
                | LocationKind::FrontLeftLeg
                | LocationKind::FrontRightLeg
                | LocationKind::RearLeftLeg
                | LocationKind::RearRightLeg
                | LocationKind::Legs
        )
    }

    pub fn is_arm(&self) -> bool {
        matches!(self, LocationKind::LeftArm | LocationKind::RightArm)
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbr())
    }
}

/// Armor and internal structure of one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationKind,
    pub armor: u32,
    /// Rear armor, for locations that have a separate rear facing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rear_armor: Option<u32>,
    pub internal: u32,
    pub original_armor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_rear_armor: Option<u32>,
    pub original_internal: u32,
    #[serde(default)]
    pub destroyed: bool,
}

impl Location {
    pub fn new(kind: LocationKind, armor: u32, rear_armor: Option<u32>, internal: u32) -> Self {
        Location {
            kind,
            armor,
            rear_armor,
            internal,
            original_armor: armor,
            original_rear_armor: rear_armor,
            original_internal: internal,
            destroyed: false,
        }
    }

    /// Armor facing the attack. Locations without rear armor use the front value.
    pub fn armor_for(&self, rear: bool) -> u32 {
        match (rear, self.rear_armor) {
            (true, Some(r)) => r,
            _ => self.armor,
        }
    }

    pub fn set_armor_for(&mut self, rear: bool, value: u32) {
        match (rear, self.rear_armor.as_mut()) {
            (true, Some(r)) => *r = value,
            _ => self.armor = value,
        }
    }

    /// Mark destroyed: armor and structure both drop to zero.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.armor = 0;
        if let Some(r) = self.rear_armor.as_mut() {
            *r = 0;
        }
        self.internal = 0;
    }
}

/// Side of the target an attack comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackDirection {
    Front,
    Left,
    Right,
    Rear,
}

impl AttackDirection {
    /// Direction from a hexside offset relative to the target's facing.
    /// 0 is dead ahead, increasing clockwise.
    pub fn from_relative(relative: u8) -> Self {
        match relative % 6 {
            0 | 1 | 5 => AttackDirection::Front,
            2 => AttackDirection::Right,
            3 => AttackDirection::Rear,
            _ => AttackDirection::Left,
        }
    }
}

/// Which hit table is consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitTable {
    /// 2d6 standard table
    Standard,
    /// 1d6 punch table (upper body)
    Punch,
    /// 1d6 kick table (legs)
    Kick,
}

/// Location selected by a hit-table roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitResult {
    pub location: LocationKind,
    pub rear: bool,
    /// A natural 2 on the standard table: critical chance even through armor
    pub through_armor_crit: bool,
}

impl HitResult {
    pub fn new(location: LocationKind) -> Self {
        HitResult {
            location,
            rear: false,
            through_armor_crit: false,
        }
    }
}

/// Body plan of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationLayout {
    Biped,
    Quad,
    Proto,
    Vehicle,
    Infantry,
    Aero,
}

use LocationKind as L;

const BIPED: &[LocationKind] = &[
    L::Head,
    L::CenterTorso,
    L::LeftTorso,
    L::RightTorso,
    L::LeftArm,
    L::RightArm,
    L::LeftLeg,
    L::RightLeg,
];
const QUAD: &[LocationKind] = &[
    L::Head,
    L::CenterTorso,
    L::LeftTorso,
    L::RightTorso,
    L::FrontLeftLeg,
    L::FrontRightLeg,
    L::RearLeftLeg,
    L::RearRightLeg,
];
const PROTO: &[LocationKind] = &[
    L::Head,
    L::CenterTorso,
    L::LeftArm,
    L::RightArm,
    L::Legs,
    L::MainGun,
];
const VEHICLE: &[LocationKind] = &[L::Front, L::Left, L::Right, L::Rear, L::Turret];
const INFANTRY: &[LocationKind] = &[L::Platoon];
const AERO: &[LocationKind] = &[L::Nose, L::LeftWing, L::RightWing, L::Aft, L::Fuselage];

// Standard 2d6 tables, index = roll - 2
const BIPED_FRONT: [LocationKind; 11] = [
    L::CenterTorso,
    L::RightArm,
    L::RightArm,
    L::RightLeg,
    L::RightTorso,
    L::CenterTorso,
    L::LeftTorso,
    L::LeftLeg,
    L::LeftArm,
    L::LeftArm,
    L::Head,
];
const BIPED_LEFT: [LocationKind; 11] = [
    L::LeftTorso,
    L::LeftLeg,
    L::LeftArm,
    L::LeftArm,
    L::LeftLeg,
    L::LeftTorso,
    L::CenterTorso,
    L::RightTorso,
    L::RightArm,
    L::RightLeg,
    L::Head,
];
const BIPED_RIGHT: [LocationKind; 11] = [
    L::RightTorso,
    L::RightLeg,
    L::RightArm,
    L::RightArm,
    L::RightLeg,
    L::RightTorso,
    L::CenterTorso,
    L::LeftTorso,
    L::LeftArm,
    L::LeftLeg,
    L::Head,
];
const PROTO_TABLE: [LocationKind; 11] = [
    L::MainGun,
    L::LeftArm,
    L::Legs,
    L::Legs,
    L::CenterTorso,
    L::CenterTorso,
    L::CenterTorso,
    L::Legs,
    L::RightArm,
    L::MainGun,
    L::Head,
];
const AERO_NOSE: [LocationKind; 11] = [
    L::Nose,
    L::RightWing,
    L::Nose,
    L::Nose,
    L::RightWing,
    L::Nose,
    L::LeftWing,
    L::Nose,
    L::LeftWing,
    L::Aft,
    L::Fuselage,
];
const PUNCH_FRONT: [LocationKind; 6] = [
    L::LeftArm,
    L::LeftTorso,
    L::CenterTorso,
    L::RightTorso,
    L::RightArm,
    L::Head,
];

impl LocationLayout {
    pub fn locations(&self) -> &'static [LocationKind] {
        match self {
            LocationLayout::Biped => BIPED,
            LocationLayout::Quad => QUAD,
            LocationLayout::Proto => PROTO,
            LocationLayout::Vehicle => VEHICLE,
            LocationLayout::Infantry => INFANTRY,
            LocationLayout::Aero => AERO,
        }
    }

    pub fn is_walker(&self) -> bool {
        matches!(
            self,
            LocationLayout::Biped | LocationLayout::Quad | LocationLayout::Proto
        )
    }

    /// Where excess damage goes when `from` has been destroyed
    pub fn transfer_target(&self, from: LocationKind) -> Option<LocationKind> {
        match self {
            LocationLayout::Biped => match from {
                L::LeftArm | L::LeftLeg => Some(L::LeftTorso),
                L::RightArm | L::RightLeg => Some(L::RightTorso),
                L::LeftTorso | L::RightTorso => Some(L::CenterTorso),
                _ => None,
            },
            LocationLayout::Quad => match from {
                L::FrontLeftLeg | L::RearLeftLeg => Some(L::LeftTorso),
                L::FrontRightLeg | L::RearRightLeg => Some(L::RightTorso),
                L::LeftTorso | L::RightTorso => Some(L::CenterTorso),
                _ => None,
            },
            LocationLayout::Proto => match from {
                L::LeftArm | L::RightArm | L::Legs | L::MainGun => Some(L::CenterTorso),
                _ => None,
            },
            LocationLayout::Vehicle => match from {
                L::Turret | L::Left | L::Right | L::Rear => Some(L::Front),
                _ => None,
            },
            LocationLayout::Aero => match from {
                L::Nose | L::LeftWing | L::RightWing | L::Aft => Some(L::Fuselage),
                _ => None,
            },
            LocationLayout::Infantry => None,
        }
    }

    /// Locations lost together with `kind`
    pub fn dependents(&self, kind: LocationKind) -> &'static [LocationKind] {
        match (self, kind) {
            (LocationLayout::Biped, L::LeftTorso) => &[L::LeftArm],
            (LocationLayout::Biped, L::RightTorso) => &[L::RightArm],
            _ => &[],
        }
    }

    /// Destroying a vital location destroys the unit
    pub fn is_vital(&self, kind: LocationKind) -> bool {
        match self {
            LocationLayout::Biped | LocationLayout::Quad => {
                matches!(kind, L::Head | L::CenterTorso)
            }
            LocationLayout::Proto => kind == L::CenterTorso,
            LocationLayout::Vehicle => {
                matches!(kind, L::Front | L::Left | L::Right | L::Rear)
            }
            LocationLayout::Infantry => kind == L::Platoon,
            LocationLayout::Aero => kind == L::Fuselage,
        }
    }

    pub fn has_rear_armor(&self, kind: LocationKind) -> bool {
        matches!(self, LocationLayout::Biped | LocationLayout::Quad)
            && matches!(kind, L::CenterTorso | L::LeftTorso | L::RightTorso)
    }

    /// The location a missing location falls back to
    pub fn fallback(&self) -> LocationKind {
        match self {
            LocationLayout::Biped | LocationLayout::Quad | LocationLayout::Proto => L::CenterTorso,
            LocationLayout::Vehicle => L::Front,
            LocationLayout::Infantry => L::Platoon,
            LocationLayout::Aero => L::Fuselage,
        }
    }

    /// Map a roll onto a location. `roll` is 2..=12 for the standard table
    /// and 1..=6 for punch and kick tables.
    pub fn hit_location(&self, table: HitTable, direction: AttackDirection, roll: u32) -> HitResult {
        match table {
            HitTable::Standard => self.standard_hit(direction, roll.clamp(2, 12)),
            HitTable::Punch => HitResult {
                location: self.punch_location(direction, roll.clamp(1, 6)),
                rear: direction == AttackDirection::Rear
                    && self.has_rear_armor(self.punch_location(direction, roll.clamp(1, 6))),
                through_armor_crit: false,
            },
            HitTable::Kick => HitResult::new(self.kick_location(direction, roll.clamp(1, 6))),
        }
    }

    fn standard_hit(&self, direction: AttackDirection, roll: u32) -> HitResult {
        let idx = (roll - 2) as usize;
        let crit = roll == 2;
        match self {
            LocationLayout::Biped | LocationLayout::Quad => {
                let kind = match direction {
                    AttackDirection::Front | AttackDirection::Rear => BIPED_FRONT[idx],
                    AttackDirection::Left => BIPED_LEFT[idx],
                    AttackDirection::Right => BIPED_RIGHT[idx],
                };
                let kind = if *self == LocationLayout::Quad {
                    quad_leg(kind)
                } else {
                    kind
                };
                HitResult {
                    location: kind,
                    rear: direction == AttackDirection::Rear && self.has_rear_armor(kind),
                    through_armor_crit: crit,
                }
            }
            LocationLayout::Proto => HitResult::new(PROTO_TABLE[idx]),
            LocationLayout::Vehicle => {
                let facing_side = match direction {
                    AttackDirection::Front => L::Front,
                    AttackDirection::Left => L::Left,
                    AttackDirection::Right => L::Right,
                    AttackDirection::Rear => L::Rear,
                };
                let kind = match roll {
                    5 => match direction {
                        AttackDirection::Front => L::Right,
                        AttackDirection::Rear => L::Left,
                        _ => L::Front,
                    },
                    9 => match direction {
                        AttackDirection::Front => L::Left,
                        AttackDirection::Rear => L::Right,
                        _ => L::Rear,
                    },
                    10..=12 => L::Turret,
                    _ => facing_side,
                };
                HitResult {
                    location: kind,
                    rear: false,
                    through_armor_crit: crit || roll == 12,
                }
            }
            LocationLayout::Infantry => HitResult::new(L::Platoon),
            LocationLayout::Aero => {
                let kind = match direction {
                    AttackDirection::Rear => {
                        if roll >= 11 {
                            L::Fuselage
                        } else if roll % 2 == 0 {
                            L::Aft
                        } else if roll < 7 {
                            L::RightWing
                        } else {
                            L::LeftWing
                        }
                    }
                    AttackDirection::Left if (4..=8).contains(&roll) => L::LeftWing,
                    AttackDirection::Right if (4..=8).contains(&roll) => L::RightWing,
                    _ => AERO_NOSE[idx],
                };
                HitResult::new(kind)
            }
        }
    }

    fn punch_location(&self, direction: AttackDirection, roll: u32) -> LocationKind {
        match self {
            LocationLayout::Biped | LocationLayout::Quad => {
                let kind = match direction {
                    AttackDirection::Left => match roll {
                        1 | 2 => L::LeftTorso,
                        3 => L::CenterTorso,
                        4 | 5 => L::LeftArm,
                        _ => L::Head,
                    },
                    AttackDirection::Right => match roll {
                        1 | 2 => L::RightTorso,
                        3 => L::CenterTorso,
                        4 | 5 => L::RightArm,
                        _ => L::Head,
                    },
                    _ => PUNCH_FRONT[(roll - 1) as usize],
                };
                if *self == LocationLayout::Quad {
                    quad_leg(kind)
                } else {
                    kind
                }
            }
            _ => self.standard_hit(direction, roll + 4).location,
        }
    }

    fn kick_location(&self, direction: AttackDirection, roll: u32) -> LocationKind {
        match self {
            LocationLayout::Biped => match direction {
                AttackDirection::Left => L::LeftLeg,
                AttackDirection::Right => L::RightLeg,
                _ => {
                    if roll <= 3 {
                        L::RightLeg
                    } else {
                        L::LeftLeg
                    }
                }
            },
            LocationLayout::Quad => match direction {
                AttackDirection::Rear => {
                    if roll <= 3 {
                        L::RearRightLeg
                    } else {
                        L::RearLeftLeg
                    }
                }
                AttackDirection::Left => L::FrontLeftLeg,
                AttackDirection::Right => L::FrontRightLeg,
                AttackDirection::Front => {
                    if roll <= 3 {
                        L::FrontRightLeg
                    } else {
                        L::FrontLeftLeg
                    }
                }
            },
            LocationLayout::Proto => L::Legs,
            _ => self.standard_hit(direction, 7).location,
        }
    }
}

fn quad_leg(kind: LocationKind) -> LocationKind {
    match kind {
        L::LeftArm => L::FrontLeftLeg,
        L::RightArm => L::FrontRightLeg,
        L::LeftLeg => L::RearLeftLeg,
        L::RightLeg => L::RearRightLeg,
        other => other,
    }
}
