//! Outbound events and feedback requests
//!
//! Everything collaborators learn about the game flows out of the engine as
//! [`Outbound`] events, in the order the engine produced them.

use crate::core::{PlayerId, UnitId};
use crate::delta::UnitDelta;
use crate::game::report::Report;
use crate::game::turn::TurnDescriptor;
use crate::game::{Phase, VictoryResult};
use serde::{Deserialize, Serialize};

/// One missile attack an anti-missile system could engage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmsOption {
    /// Index into the phase's declared attacks
    pub attack: usize,
    pub attacker: UnitId,
    pub weapon: String,
    /// Missiles in the rack
    pub missiles: u32,
}

/// What a suspended resolver wants from a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    /// Pick which incoming missile attack the defender's AMS engages
    AmsTarget {
        defender: UnitId,
        options: Vec<AmsOption>,
    },
}

impl FeedbackKind {
    /// Choice taken when the participant cannot or does not answer
    pub fn default_choice(&self) -> usize {
        match self {
            // Largest cluster, first declared on ties
            FeedbackKind::AmsTarget { options, .. } => options
                .iter()
                .enumerate()
                .fold(None::<(usize, u32)>, |best, (i, o)| match best {
                    Some((_, m)) if m >= o.missiles => best,
                    _ => Some((i, o.missiles)),
                })
                .map(|(i, _)| i)
                .unwrap_or(0),
        }
    }

    pub fn choices(&self) -> usize {
        match self {
            FeedbackKind::AmsTarget { options, .. } => options.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Continuation token the answer must echo
    pub token: u64,
    pub player: PlayerId,
    pub kind: FeedbackKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub token: u64,
    pub choice: usize,
}

/// Events broadcast to every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outbound {
    PhaseChanged {
        phase: Phase,
        round: u32,
    },
    TurnQueue {
        turns: Vec<TurnDescriptor>,
        index: usize,
    },
    UnitUpdate(UnitDelta),
    Reports(Vec<Report>),
    /// Sent to the requester only; nothing was mutated
    Rejected {
        player: PlayerId,
        reason: String,
        turns: Vec<TurnDescriptor>,
        index: usize,
    },
    FeedbackRequested(FeedbackRequest),
    GameOver(VictoryResult),
}

impl Outbound {
    /// Player the event is addressed to, if it is not for everyone
    pub fn recipient(&self) -> Option<PlayerId> {
        match self {
            Outbound::Rejected { player, .. } => Some(*player),
            Outbound::FeedbackRequested(req) => Some(req.player),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(attack: usize, missiles: u32) -> AmsOption {
        AmsOption {
            attack,
            attacker: UnitId::new(attack as u32),
            weapon: "LRM".into(),
            missiles,
        }
    }

    #[test]
    fn test_default_ams_choice_prefers_largest_then_first() {
        let kind = FeedbackKind::AmsTarget {
            defender: UnitId::new(9),
            options: vec![option(0, 6), option(1, 20), option(2, 20)],
        };
        assert_eq!(kind.default_choice(), 1);
        assert_eq!(kind.choices(), 3);
    }

    #[test]
    fn test_recipient() {
        let rejected = Outbound::Rejected {
            player: PlayerId::new(2),
            reason: "not your turn".into(),
            turns: Vec::new(),
            index: 0,
        };
        assert_eq!(rejected.recipient(), Some(PlayerId::new(2)));
        assert_eq!(
            Outbound::PhaseChanged {
                phase: Phase::Movement,
                round: 1
            }
            .recipient(),
            None
        );
    }
}
