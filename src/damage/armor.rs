//! Armor-kind damage modifiers

use crate::core::{ArmorKind, DamageClass};

/// Damage after the armor's modifier. Only consulted while armor remains.
pub fn modified_damage(kind: ArmorKind, class: DamageClass, amount: u32) -> u32 {
    use DamageClass as D;
    match kind {
        ArmorKind::Standard | ArmorKind::FerroFibrous => amount,
        ArmorKind::Hardened => amount.div_ceil(2),
        ArmorKind::Reactive => match class {
            D::Missile | D::Artillery | D::Explosive => amount.div_ceil(2),
            _ => amount,
        },
        ArmorKind::Reflective => match class {
            D::Energy => amount.div_ceil(2),
            D::Physical | D::Artillery | D::Explosive => amount * 2,
            _ => amount,
        },
        ArmorKind::FerroLamellor => amount - amount / 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardened_halves_rounding_up() {
        assert_eq!(modified_damage(ArmorKind::Hardened, DamageClass::Ballistic, 5), 3);
        assert_eq!(modified_damage(ArmorKind::Hardened, DamageClass::Energy, 10), 5);
    }

    #[test]
    fn test_reflective_amplifies_physical() {
        assert_eq!(modified_damage(ArmorKind::Reflective, DamageClass::Physical, 7), 14);
        assert_eq!(modified_damage(ArmorKind::Reflective, DamageClass::Energy, 7), 4);
        assert_eq!(modified_damage(ArmorKind::Reflective, DamageClass::Ballistic, 7), 7);
    }

    #[test]
    fn test_reactive_and_lamellor() {
        assert_eq!(modified_damage(ArmorKind::Reactive, DamageClass::Missile, 9), 5);
        assert_eq!(modified_damage(ArmorKind::Reactive, DamageClass::Energy, 9), 9);
        assert_eq!(modified_damage(ArmorKind::FerroLamellor, DamageClass::Energy, 10), 8);
        assert_eq!(modified_damage(ArmorKind::FerroFibrous, DamageClass::Energy, 10), 10);
    }
}
