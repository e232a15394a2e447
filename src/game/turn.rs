//! Turn descriptors and the per-phase turn queue

use crate::core::{PlayerId, Unit, UnitClass, UnitId};
use crate::game::turn_order::is_eligible;
use crate::game::GameState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Set of unit classes, one bit per class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassMask(u8);

impl ClassMask {
    pub const ALL: ClassMask = ClassMask(0b1_1111);

    pub fn of(classes: &[UnitClass]) -> Self {
        ClassMask(classes.iter().fold(0, |m, c| m | c.bit()))
    }

    pub fn single(class: UnitClass) -> Self {
        ClassMask(class.bit())
    }

    pub fn contains(&self, class: UnitClass) -> bool {
        self.0 & class.bit() != 0
    }

    pub fn without(self, class: UnitClass) -> Self {
        ClassMask(self.0 & !class.bit())
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// What a turn allows its player to act with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnBinding {
    /// A player-level turn (minefields, artillery designation)
    Player,
    /// Any one eligible unit of these classes
    Classes(ClassMask),
    /// Exactly this unit
    Unit(UnitId),
}

/// A queued permission for one player to act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnDescriptor {
    pub player: PlayerId,
    pub binding: TurnBinding,
    /// Inserted by group movement after a unit of the group moved
    #[serde(default)]
    pub multi_turn: bool,
}

impl TurnDescriptor {
    pub fn player(player: PlayerId) -> Self {
        TurnDescriptor {
            player,
            binding: TurnBinding::Player,
            multi_turn: false,
        }
    }

    pub fn classes(player: PlayerId, mask: ClassMask) -> Self {
        TurnDescriptor {
            player,
            binding: TurnBinding::Classes(mask),
            multi_turn: false,
        }
    }

    pub fn unit(player: PlayerId, unit: UnitId) -> Self {
        TurnDescriptor {
            player,
            binding: TurnBinding::Unit(unit),
            multi_turn: false,
        }
    }

    /// May `unit` act on this turn, ignoring phase eligibility
    pub fn accepts(&self, unit: &Unit) -> bool {
        if unit.owner != self.player {
            return false;
        }
        match self.binding {
            TurnBinding::Player => true,
            TurnBinding::Classes(mask) => mask.contains(unit.class),
            TurnBinding::Unit(id) => unit.id == id,
        }
    }

    /// Validity predicate: the player exists and still has something to act with
    pub fn is_valid(&self, state: &GameState) -> bool {
        let Ok(player) = state.player(self.player) else {
            return false;
        };
        match self.binding {
            TurnBinding::Player => state.player_has_phase_action(player),
            TurnBinding::Classes(_) | TurnBinding::Unit(_) => state
                .units
                .values()
                .any(|u| self.accepts(u) && is_eligible(state, state.phase, u)),
        }
    }
}

impl fmt::Display for TurnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding {
            TurnBinding::Player => write!(f, "player {}", self.player),
            TurnBinding::Classes(mask) => {
                write!(f, "player {} classes {:05b}", self.player, mask.0)?;
                if self.multi_turn {
                    write!(f, " (multi)")?;
                }
                Ok(())
            }
            TurnBinding::Unit(unit) => write!(f, "player {} unit {}", self.player, unit),
        }
    }
}

/// Ordered turns of the current phase and the zero-based index of the current one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnQueue {
    turns: Vec<TurnDescriptor>,
    index: usize,
}

impl TurnQueue {
    pub fn new(turns: Vec<TurnDescriptor>) -> Self {
        TurnQueue { turns, index: 0 }
    }

    pub fn reset(&mut self, turns: Vec<TurnDescriptor>) {
        self.turns = turns;
        self.index = 0;
    }

    pub fn clear(&mut self) {
        self.reset(Vec::new());
    }

    pub fn current(&self) -> Option<&TurnDescriptor> {
        self.turns.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn turns(&self) -> &[TurnDescriptor] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns not yet consumed, including the current one
    pub fn remaining(&self) -> usize {
        self.turns.len().saturating_sub(self.index)
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.turns.len()
    }

    /// Consume the current turn
    pub fn advance(&mut self) {
        if self.index < self.turns.len() {
            self.index += 1;
        }
    }

    /// Insert turns right after the current one, in order
    pub fn insert_after_current(&mut self, turns: impl IntoIterator<Item = TurnDescriptor>) {
        let at = (self.index + 1).min(self.turns.len());
        let tail = self.turns.split_off(at);
        self.turns.extend(turns);
        self.turns.extend(tail);
    }

    /// Drop pending turns bound to a unit that has left play
    pub fn remove_unit_turns(&mut self, unit: UnitId) {
        self.retain_future(|t| t.binding != TurnBinding::Unit(unit));
    }

    /// Filter the turns after the current one
    pub fn retain_future(&mut self, mut keep: impl FnMut(&TurnDescriptor) -> bool) {
        let tail = self.turns.split_off((self.index + 1).min(self.turns.len()));
        self.turns.extend(tail.into_iter().filter(|t| keep(t)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(player: u32) -> TurnDescriptor {
        TurnDescriptor::player(PlayerId::new(player))
    }

    #[test]
    fn test_reactive_insert_goes_after_current() {
        let mut queue = TurnQueue::new(vec![t(0), t(1), t(2)]);
        queue.advance();
        queue.insert_after_current([t(9)]);
        let players: Vec<u32> = queue.turns().iter().map(|t| t.player.as_u32()).collect();
        assert_eq!(players, vec![0, 1, 9, 2]);
        assert_eq!(queue.current().unwrap().player.as_u32(), 1);
    }

    #[test]
    fn test_insert_into_empty_queue() {
        let mut queue = TurnQueue::default();
        queue.insert_after_current([t(3)]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.current().unwrap().player.as_u32(), 3);
    }

    #[test]
    fn test_remove_unit_turns_keeps_index_on_current() {
        let unit = UnitId::new(5);
        let p = PlayerId::new(0);
        let mut queue = TurnQueue::new(vec![
            TurnDescriptor::unit(p, unit),
            t(1),
            TurnDescriptor::unit(p, unit),
            t(2),
        ]);
        queue.advance();
        queue.remove_unit_turns(unit);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.current().unwrap().player.as_u32(), 1);
        queue.advance();
        assert_eq!(queue.current().unwrap().player.as_u32(), 2);
    }

    #[test]
    fn test_exhaustion() {
        let mut queue = TurnQueue::new(vec![t(0)]);
        assert_eq!(queue.remaining(), 1);
        queue.advance();
        assert!(queue.is_exhausted());
        queue.advance();
        assert_eq!(queue.index(), 1);
    }

    #[test]
    fn test_class_mask() {
        let mask = ClassMask::of(&[UnitClass::Mech, UnitClass::Vehicle]);
        assert!(mask.contains(UnitClass::Mech));
        assert!(!mask.contains(UnitClass::Infantry));
        assert!(mask.without(UnitClass::Mech).contains(UnitClass::Vehicle));
        assert!(ClassMask::default().is_empty());
    }
}
