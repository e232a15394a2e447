//! Core game types and entities

pub mod chassis;
pub mod crew;
pub mod dice;
pub mod entity;
pub mod equipment;
pub mod location;
pub mod player;
pub mod types;
pub mod unit;

pub use chassis::ChassisBuilder;
pub use crew::{Crew, CrewInjury, CrewMember};
pub use dice::{Dice, Roll2d6};
pub use entity::{EntityId, EntityStore, GameEntity};
pub use equipment::{ActuatorKind, AmmoBin, DamageClass, Equipment, EquipmentKind, WeaponStats};
pub use location::{AttackDirection, HitResult, HitTable, Location, LocationKind, LocationLayout};
pub use player::{InitiativeRoll, MineAllotment, Player, PlayerId, Team};
pub use types::{Facing, PlayerName, TeamId, UnitName};
pub use unit::{
    ArmorKind, CritTable, Disposition, MoveMode, MovementMode, RoundState, Transport, Unit,
    UnitClass, UnitId, VehicleDamage,
};
