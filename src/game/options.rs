//! Game options
//!
//! Every field has a default so scenario files only name what they change.

use crate::core::UnitClass;
use serde::{Deserialize, Serialize};

/// How often damage reaching internal structure produces critical hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CritPolicy {
    /// 2d6: 8-9 one critical, 10-11 two, 12 three
    #[default]
    Standard,
    /// Every structure hit produces one critical
    Always,
    Never,
}

/// Planetary conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    /// Multiplier on falling damage
    pub gravity: f64,
    /// Ambient temperature in degrees Celsius
    pub temperature: i32,
}

impl Default for Conditions {
    fn default() -> Self {
        Conditions {
            gravity: 1.0,
            temperature: 25,
        }
    }
}

impl Conditions {
    /// Extra heat per round from extreme temperature
    pub fn heat_modifier(&self) -> i32 {
        if self.temperature > 50 {
            (self.temperature - 50 + 9) / 10
        } else if self.temperature < -30 {
            -((-30 - self.temperature + 9) / 10)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryOptions {
    pub last_team_standing: bool,
    /// Win when every opposing commander has been destroyed
    pub commander_killed: bool,
    /// Win when this percentage of the opposing battle value is destroyed
    pub bv_destroyed_percent: Option<u32>,
}

impl Default for VictoryOptions {
    fn default() -> Self {
        VictoryOptions {
            last_team_standing: true,
            commander_killed: false,
            bv_destroyed_percent: None,
        }
    }
}

/// Classes that move in groups and their group size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMovement {
    pub class: UnitClass,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    /// Every player rolls initiative separately instead of per team
    pub individual_initiative: bool,
    /// Tie-break rerolls before falling back to id order
    pub initiative_rerolls_max: u32,
    pub group_movement: Vec<GroupMovement>,
    /// Classes that always move after everyone else
    pub even_movers: Vec<UnitClass>,
    pub crit_policy: CritPolicy,
    pub conditions: Conditions,
    pub forced_withdrawal: bool,
    pub auto_advance_reports: bool,
    /// Defenders choose which missile attack their anti-missile system engages
    pub manual_ams: bool,
    /// Default a pending feedback request after this many milliseconds
    pub feedback_timeout_ms: Option<u64>,
    pub max_rounds: Option<u32>,
    pub victory: VictoryOptions,
    /// Units that may share one hex
    pub stacking_limit: usize,
    pub skid_on_pavement: bool,
    pub vehicle_crits: bool,
    /// Hide reports about enemy units from other players
    pub double_blind: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        GameOptions {
            individual_initiative: false,
            initiative_rerolls_max: 3,
            group_movement: Vec::new(),
            even_movers: Vec::new(),
            crit_policy: CritPolicy::Standard,
            conditions: Conditions::default(),
            forced_withdrawal: false,
            auto_advance_reports: true,
            manual_ams: false,
            feedback_timeout_ms: None,
            max_rounds: None,
            victory: VictoryOptions::default(),
            stacking_limit: 1,
            skid_on_pavement: true,
            vehicle_crits: true,
            double_blind: false,
        }
    }
}

impl GameOptions {
    pub fn group_size(&self, class: UnitClass) -> Option<u32> {
        self.group_movement
            .iter()
            .find(|g| g.class == class && g.size > 1)
            .map(|g| g.size)
    }

    pub fn is_even_mover(&self, class: UnitClass) -> bool {
        self.even_movers.contains(&class)
    }
}
