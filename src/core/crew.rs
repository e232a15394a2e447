//! Crew members and injury tracking

use crate::core::dice::Dice;
use serde::{Deserialize, Serialize};

/// Hits at which a crew member dies
pub const LETHAL_HITS: u32 = 6;

/// Consciousness roll target for a given number of accumulated hits
pub fn consciousness_target(hits: u32) -> Option<i32> {
    match hits {
        0 => None,
        1 => Some(3),
        2 => Some(5),
        3 => Some(7),
        4 => Some(10),
        5 => Some(11),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub hits: u32,
    #[serde(default = "yes")]
    pub conscious: bool,
    /// Terminal: the member is dead or will be removed at end of phase
    #[serde(default)]
    pub doomed: bool,
}

fn yes() -> bool {
    true
}

impl CrewMember {
    pub fn new(name: impl Into<String>) -> Self {
        CrewMember {
            name: name.into(),
            hits: 0,
            conscious: true,
            doomed: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.conscious && !self.doomed
    }
}

/// Result of applying crew hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrewInjury {
    pub hits: u32,
    pub knocked_out: bool,
    pub killed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    pub members: Vec<CrewMember>,
    pub gunnery: i32,
    pub piloting: i32,
}

impl Crew {
    pub fn new(name: impl Into<String>, gunnery: i32, piloting: i32) -> Self {
        Crew {
            members: vec![CrewMember::new(name)],
            gunnery,
            piloting,
        }
    }

    /// The member who pilots the unit and absorbs crew hits
    pub fn commander(&self) -> Option<&CrewMember> {
        self.members.iter().find(|m| !m.doomed)
    }

    pub fn is_dead(&self) -> bool {
        self.members.iter().all(|m| m.doomed)
    }

    pub fn is_active(&self) -> bool {
        self.members.iter().any(|m| m.is_active())
    }

    pub fn total_hits(&self) -> u32 {
        self.commander().map(|m| m.hits).unwrap_or(LETHAL_HITS)
    }

    /// Apply `hits` to the commanding member and roll consciousness.
    pub fn apply_hits(&mut self, hits: u32, dice: &mut Dice) -> CrewInjury {
        let mut injury = CrewInjury {
            hits,
            ..Default::default()
        };
        if hits == 0 {
            return injury;
        }
        let Some(member) = self.members.iter_mut().find(|m| !m.doomed) else {
            return injury;
        };
        member.hits = (member.hits + hits).min(LETHAL_HITS);
        if member.hits >= LETHAL_HITS {
            member.doomed = true;
            member.conscious = false;
            injury.killed = true;
            return injury;
        }
        if member.conscious {
            if let Some(target) = consciousness_target(member.hits) {
                if !dice.roll_2d6().succeeds(target) {
                    member.conscious = false;
                    injury.knocked_out = true;
                }
            }
        }
        injury
    }

    /// Kill the commanding member outright (cockpit destroyed).
    pub fn kill(&mut self) {
        for m in self.members.iter_mut() {
            m.hits = LETHAL_HITS;
            m.doomed = true;
            m.conscious = false;
        }
    }

    /// End-of-round recovery roll for unconscious members.
    /// Returns true if anyone woke up.
    pub fn try_recover(&mut self, dice: &mut Dice) -> bool {
        let mut woke = false;
        for m in self.members.iter_mut().filter(|m| !m.doomed && !m.conscious) {
            if let Some(target) = consciousness_target(m.hits) {
                if dice.roll_2d6().succeeds(target) {
                    m.conscious = true;
                    woke = true;
                }
            }
        }
        woke
    }
}
