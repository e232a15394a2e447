//! Equipment mounted in unit locations
//!
//! Each item occupies one or more critical slots of a single location. A
//! critical hit lands on one unhit slot; the item's `hits` counter tracks how
//! many of its slots have been struck.

use crate::core::LocationKind;
use serde::{Deserialize, Serialize};

/// Damage class carried by an attack or hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DamageClass {
    #[default]
    Physical,
    Ballistic,
    Energy,
    Missile,
    Explosive,
    Heat,
    Fall,
    Collapse,
    Artillery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuatorKind {
    Shoulder,
    UpperArm,
    LowerArm,
    Hand,
    Hip,
    UpperLeg,
    LowerLeg,
    Foot,
}

impl ActuatorKind {
    pub fn is_leg(&self) -> bool {
        matches!(
            self,
            ActuatorKind::Hip | ActuatorKind::UpperLeg | ActuatorKind::LowerLeg | ActuatorKind::Foot
        )
    }

    /// Piloting modifier for a damaged leg actuator
    pub fn psr_modifier(&self) -> i32 {
        match self {
            ActuatorKind::Hip => 2,
            ActuatorKind::UpperLeg | ActuatorKind::LowerLeg | ActuatorKind::Foot => 1,
            _ => 0,
        }
    }
}

/// Fixed statistics of a weapon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage: u32,
    pub heat: u32,
    /// Upper bound of the short, medium and long range bands
    pub ranges: [u32; 3],
    #[serde(default)]
    pub min_range: u32,
    /// Number of missiles in the rack; cluster weapons roll the cluster table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<u32>,
    /// Ammunition type consumed per shot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammo: Option<String>,
    pub class: DamageClass,
    /// Artillery: rounds of flight before the shell lands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artillery_delay: Option<u32>,
}

impl WeaponStats {
    pub fn is_artillery(&self) -> bool {
        self.artillery_delay.is_some()
    }

    pub fn max_range(&self) -> u32 {
        self.ranges[2]
    }
}

/// Ammunition bin contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoBin {
    pub ammo: String,
    pub shots: u32,
    /// Damage dealt per remaining shot when the bin explodes
    pub damage_per_shot: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentKind {
    Weapon(WeaponStats),
    Ammo(AmmoBin),
    HeatSink,
    Engine,
    Gyro,
    Cockpit,
    Sensors,
    LifeSupport,
    Actuator(ActuatorKind),
    JumpJet,
    AntiMissile,
    /// Cellular ammunition storage: explosions in this location are contained
    Case,
    /// Power system that explodes when hit (e.g. fuel cell)
    PowerCell { damage: u32 },
}

/// One mounted item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    pub kind: EquipmentKind,
    pub location: LocationKind,
    #[serde(default = "one")]
    pub slots: u32,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub jammed: bool,
    /// Set before the item's explosion is queued, so it can only explode once
    #[serde(default)]
    pub exploded: bool,
    /// Index of an item that detonates sympathetically with this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked: Option<usize>,
}

fn one() -> u32 {
    1
}

impl Equipment {
    pub fn new(name: impl Into<String>, kind: EquipmentKind, location: LocationKind) -> Self {
        Equipment {
            name: name.into(),
            kind,
            location,
            slots: 1,
            hits: 0,
            destroyed: false,
            jammed: false,
            exploded: false,
            linked: None,
        }
    }

    pub fn with_slots(mut self, slots: u32) -> Self {
        self.slots = slots.max(1);
        self
    }

    pub fn unhit_slots(&self) -> u32 {
        if self.destroyed {
            0
        } else {
            self.slots.saturating_sub(self.hits)
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.destroyed && !self.jammed && self.hits == 0
    }

    pub fn weapon(&self) -> Option<&WeaponStats> {
        match &self.kind {
            EquipmentKind::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn ammo(&self) -> Option<&AmmoBin> {
        match &self.kind {
            EquipmentKind::Ammo(a) => Some(a),
            _ => None,
        }
    }

    /// Damage this item deals to its own location when it explodes.
    /// Zero for items that cannot explode in their current state.
    pub fn explosion_damage(&self) -> u32 {
        match &self.kind {
            EquipmentKind::Ammo(bin) => bin.shots * bin.damage_per_shot,
            EquipmentKind::PowerCell { damage } => *damage,
            _ => 0,
        }
    }

    pub fn is_explosive(&self) -> bool {
        !self.exploded && self.explosion_damage() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ammo_explosion_damage_depends_on_shots() {
        let mut bin = Equipment::new(
            "SRM 6 Ammo",
            EquipmentKind::Ammo(AmmoBin {
                ammo: "SRM".into(),
                shots: 15,
                damage_per_shot: 2,
            }),
            LocationKind::LeftTorso,
        );
        assert_eq!(bin.explosion_damage(), 30);
        assert!(bin.is_explosive());
        bin.exploded = true;
        assert!(!bin.is_explosive());
    }

    #[test]
    fn test_empty_bin_is_not_explosive() {
        let bin = Equipment::new(
            "AC/20 Ammo",
            EquipmentKind::Ammo(AmmoBin {
                ammo: "AC20".into(),
                shots: 0,
                damage_per_shot: 20,
            }),
            LocationKind::RightTorso,
        );
        assert!(!bin.is_explosive());
    }

    #[test]
    fn test_unhit_slots() {
        let mut engine = Equipment::new("Engine", EquipmentKind::Engine, LocationKind::CenterTorso)
            .with_slots(6);
        engine.hits = 2;
        assert_eq!(engine.unhit_slots(), 4);
        engine.destroyed = true;
        assert_eq!(engine.unhit_slots(), 0);
    }
}
