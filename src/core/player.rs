//! Players and teams

use crate::core::{EntityId, GameEntity, PlayerName, TeamId};
use crate::map::{HexCoord, MineKind};
use serde::{Deserialize, Serialize};

pub type PlayerId = EntityId<Player>;

/// Minefields a player may still place
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MineAllotment {
    #[serde(default)]
    pub conventional: u32,
    #[serde(default)]
    pub vibrabomb: u32,
    #[serde(default)]
    pub command: u32,
    #[serde(default)]
    pub active: u32,
    #[serde(default)]
    pub inferno: u32,
}

impl MineAllotment {
    pub fn total(&self) -> u32 {
        self.conventional + self.vibrabomb + self.command + self.active + self.inferno
    }

    fn slot(&mut self, kind: MineKind) -> &mut u32 {
        match kind {
            MineKind::Conventional => &mut self.conventional,
            MineKind::Vibrabomb => &mut self.vibrabomb,
            MineKind::Command => &mut self.command,
            MineKind::Active => &mut self.active,
            MineKind::Inferno => &mut self.inferno,
        }
    }

    /// Use up one field of `kind`; false if none are left
    pub fn take(&mut self, kind: MineKind) -> bool {
        let slot = self.slot(kind);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

/// Represents a player in the game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Unique ID for this player
    pub id: PlayerId,

    /// Player name
    pub name: PlayerName,

    pub team: TeamId,

    #[serde(default)]
    pub initiative_bonus: i32,

    /// Disconnected: turns are skipped, feedback requests take defaults
    #[serde(default)]
    pub ghost: bool,

    /// Ready to leave the lounge or a report phase
    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub mines: MineAllotment,

    /// Pre-designated artillery hexes, always hit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_hit_hexes: Vec<HexCoord>,

    /// Set once the player has used the artillery designation turn
    #[serde(default)]
    pub artillery_designated: bool,

    /// Columns of the board the player deploys into (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_columns: Option<(i32, i32)>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<PlayerName>, team: TeamId) -> Self {
        Player {
            id,
            name: name.into(),
            team,
            initiative_bonus: 0,
            ghost: false,
            done: false,
            mines: MineAllotment::default(),
            auto_hit_hexes: Vec::new(),
            artillery_designated: false,
            deploy_columns: None,
        }
    }

    pub fn can_deploy_at(&self, hex: HexCoord) -> bool {
        match self.deploy_columns {
            Some((lo, hi)) => hex.x >= lo && hex.x <= hi,
            None => true,
        }
    }
}

impl GameEntity<Player> for Player {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Initiative rolled by a team (or by a player under individual initiative)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitiativeRoll {
    /// Each roll in order; later entries are tie-break rerolls
    pub rolls: Vec<i32>,
}

impl InitiativeRoll {
    pub fn latest(&self) -> i32 {
        self.rolls.last().copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub members: Vec<PlayerId>,
    #[serde(default)]
    pub initiative: InitiativeRoll,
}

impl Team {
    pub fn new(id: TeamId) -> Self {
        Team {
            id,
            members: Vec::new(),
            initiative: InitiativeRoll::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mine_allotment_take() {
        let mut mines = MineAllotment {
            conventional: 1,
            vibrabomb: 2,
            ..Default::default()
        };
        assert_eq!(mines.total(), 3);
        assert!(mines.take(MineKind::Conventional));
        assert!(!mines.take(MineKind::Conventional));
        assert!(!mines.take(MineKind::Inferno));
        assert_eq!(mines.total(), 2);
    }

    #[test]
    fn test_deploy_zone() {
        let mut player = Player::new(PlayerId::new(1), "Hanse", TeamId(1));
        assert!(player.can_deploy_at(HexCoord::new(12, 3)));
        player.deploy_columns = Some((0, 2));
        assert!(player.can_deploy_at(HexCoord::new(2, 9)));
        assert!(!player.can_deploy_at(HexCoord::new(3, 0)));
    }
}
