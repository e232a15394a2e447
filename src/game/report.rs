//! Numbered, append-only report entries
//!
//! Reports accumulate during a phase and are flushed as a batch when the phase
//! ends. Each entry names its subject so the transport can redact entries a
//! player should not see.

use crate::core::{PlayerId, TeamId, UnitId};
use crate::game::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// Only the owning player sees it under double blind
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: u32,
    pub round: u32,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    #[serde(default)]
    pub visibility: Visibility,
    pub text: String,
}

impl Report {
    /// Should `viewer` on `viewer_team` see this entry
    pub fn visible_to(&self, viewer: PlayerId, viewer_team: TeamId, double_blind: bool) -> bool {
        if !double_blind || self.visibility == Visibility::Public {
            return true;
        }
        self.player == Some(viewer) || self.team == Some(viewer_team)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.round, self.id, self.text)
    }
}

/// Subject of a report being written
#[derive(Debug, Clone, Copy, Default)]
pub struct Subject {
    pub unit: Option<UnitId>,
    pub player: Option<PlayerId>,
    pub team: Option<TeamId>,
    pub visibility: Visibility,
}

impl Subject {
    pub fn public() -> Self {
        Subject::default()
    }

    pub fn unit(unit: UnitId, player: PlayerId, team: TeamId) -> Self {
        Subject {
            unit: Some(unit),
            player: Some(player),
            team: Some(team),
            visibility: Visibility::Owner,
        }
    }

    pub fn player(player: PlayerId, team: TeamId) -> Self {
        Subject {
            unit: None,
            player: Some(player),
            team: Some(team),
            visibility: Visibility::Public,
        }
    }
}

/// Reports of the current round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLog {
    entries: Vec<Report>,
    next_id: u32,
    /// Entries before this index were already flushed
    flushed: usize,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, round: u32, phase: Phase, subject: Subject, text: impl Into<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Report {
            id,
            round,
            phase,
            unit: subject.unit,
            player: subject.player,
            team: subject.team,
            visibility: subject.visibility,
            text: text.into(),
        });
        id
    }

    pub fn entries(&self) -> &[Report] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries written since the last flush
    pub fn pending(&self) -> &[Report] {
        &self.entries[self.flushed.min(self.entries.len())..]
    }

    /// Mark pending entries flushed and return them
    pub fn flush(&mut self) -> Vec<Report> {
        let batch = self.pending().to_vec();
        self.flushed = self.entries.len();
        batch
    }

    /// Start a new round: numbering restarts and old entries are dropped
    pub fn new_round(&mut self) {
        self.entries.clear();
        self.next_id = 0;
        self.flushed = 0;
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|r| r.text.contains(needle))
    }
}
