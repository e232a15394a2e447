//! Scenario file loader (.json)

use crate::core::chassis::{ammo_bin, weapon_stats};
use crate::core::{
    ArmorKind, ChassisBuilder, CritTable, Facing, LocationKind, MineAllotment, MovementMode,
    PlayerId, TeamId, Unit,
};
use crate::game::{GameOptions, GameState};
use crate::map::{Board, Building, Hex, HexCoord, Terrain};
use crate::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete scenario document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Dice seed; a fresh entropy seed is used when absent
    #[serde(default)]
    pub seed: Option<u64>,
    pub board: BoardSpec,
    #[serde(default)]
    pub options: GameOptions,
    pub players: Vec<PlayerSpec>,
    pub units: Vec<UnitSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSpec {
    pub width: i32,
    pub height: i32,
    /// Hexes that differ from open clear ground
    #[serde(default)]
    pub hexes: Vec<HexSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexSpec {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub elevation: i32,
    #[serde(default)]
    pub depth: i32,
    #[serde(default)]
    pub building: Option<BuildingSpec>,
    #[serde(default)]
    pub on_fire: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    pub cf: u32,
    pub height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub name: String,
    pub team: u32,
    #[serde(default)]
    pub initiative_bonus: i32,
    /// Inclusive column range units may deploy into
    #[serde(default)]
    pub deploy_columns: Option<(i32, i32)>,
    #[serde(default)]
    pub mines: MineAllotment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChassisKind {
    Mech,
    Quad,
    Protomech,
    Vehicle,
    Infantry,
    Aero,
}

/// A weapon or ammunition bin and the location it is mounted in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mount {
    pub name: String,
    pub location: LocationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorSpec {
    pub location: LocationKind,
    pub front: u32,
    #[serde(default)]
    pub rear: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    /// Owning player, by name
    pub owner: String,
    pub chassis: ChassisKind,
    /// Tons, or troopers for infantry
    pub tonnage: u32,
    /// Walk, cruise or thrust points depending on the chassis
    pub walk_mp: u32,
    #[serde(default)]
    pub jump_mp: u32,
    /// Vehicle motive type; tracked when absent
    #[serde(default)]
    pub movement: Option<MovementMode>,
    #[serde(default)]
    pub gunnery: Option<i32>,
    #[serde(default)]
    pub piloting: Option<i32>,
    #[serde(default)]
    pub weapons: Vec<Mount>,
    #[serde(default)]
    pub ammo: Vec<Mount>,
    #[serde(default)]
    pub armor: Vec<ArmorSpec>,
    #[serde(default)]
    pub armor_kind: Option<ArmorKind>,
    #[serde(default)]
    pub crit_table: Option<CritTable>,
    #[serde(default)]
    pub heat_sinks: Option<u32>,
    #[serde(default)]
    pub battle_value: Option<u32>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub commander: bool,
    #[serde(default)]
    pub offboard: bool,
    #[serde(default)]
    pub deploy_round: u32,
    /// Start on the board already deployed
    #[serde(default)]
    pub position: Option<HexCoord>,
    #[serde(default)]
    pub facing: Facing,
}

/// Scenario loader for .json files
pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Load and build a scenario from a file
    pub fn load_from_file(path: &Path) -> Result<GameState> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)?.build()
    }

    /// Same as [`load_from_file`](Self::load_from_file) on the tokio runtime
    pub async fn load_async(path: &Path) -> Result<GameState> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)?.build()
    }

    pub fn parse(content: &str) -> Result<Scenario> {
        serde_json::from_str(content).map_err(|e| SimError::Scenario(e.to_string()))
    }
}

/// Read just the options block of a scenario, or a bare options document
pub fn load_options(path: &Path) -> Result<GameOptions> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| SimError::Scenario(e.to_string()))?;
    let options = value.get("options").cloned().unwrap_or(value);
    serde_json::from_value(options).map_err(|e| SimError::Scenario(e.to_string()))
}

impl Scenario {
    /// Build the game state, rejecting unknown names and illegal positions
    pub fn build(&self) -> Result<GameState> {
        if self.board.width < 1 || self.board.height < 1 {
            return Err(SimError::Scenario(format!(
                "board {}x{} is empty",
                self.board.width, self.board.height
            )));
        }
        let mut state = GameState::new(self.build_board()?, self.options.clone());
        match self.seed {
            Some(seed) => state.seed(seed),
            None => state.seed(rand::random()),
        }

        for spec in &self.players {
            if state.players.iter().any(|p| p.name.as_str() == spec.name) {
                return Err(SimError::Scenario(format!("duplicate player {}", spec.name)));
            }
            let id = state.add_player(spec.name.as_str(), TeamId(spec.team));
            let player = state.player_mut(id)?;
            player.initiative_bonus = spec.initiative_bonus;
            player.deploy_columns = spec.deploy_columns;
            player.mines = spec.mines.clone();
        }
        let teams: std::collections::BTreeSet<u32> = self.players.iter().map(|p| p.team).collect();
        if teams.len() < 2 {
            return Err(SimError::Scenario("a scenario needs at least two teams".into()));
        }

        for spec in &self.units {
            let owner = state
                .players
                .iter()
                .find(|p| p.name.as_str() == spec.owner)
                .map(|p| p.id)
                .ok_or_else(|| {
                    SimError::Scenario(format!("unit {} has unknown owner {}", spec.name, spec.owner))
                })?;
            let id = state.add_unit(spec.to_unit(owner)?);
            if let Some(hex) = spec.position {
                if !state.can_occupy(id, hex) {
                    return Err(SimError::Scenario(format!(
                        "unit {} cannot start at {}",
                        spec.name, hex
                    )));
                }
                let floor = state.board.hex_or_err(hex)?.floor();
                state.unit_mut(id)?.deployed = true;
                state.place_unit(id, hex, spec.facing, floor)?;
            }
        }
        // Starting positions are not changes anyone needs to hear about
        state.journal.drain();
        state.logger.verbose(&format!(
            "Loaded scenario '{}': {} players, {} units",
            self.name,
            state.players.len(),
            state.units.len()
        ));
        Ok(state)
    }

    fn build_board(&self) -> Result<Board> {
        let mut board = Board::new(self.board.width, self.board.height);
        for spec in &self.board.hexes {
            let at = HexCoord::new(spec.x, spec.y);
            let hex = Hex {
                terrain: spec.terrain,
                elevation: spec.elevation,
                depth: spec.depth,
                building: spec
                    .building
                    .as_ref()
                    .map(|b| Building::new(b.name.clone(), b.cf, b.height)),
                minefields: Vec::new(),
                on_fire: spec.on_fire,
            };
            board
                .set_hex(at, hex)
                .map_err(|_| SimError::Scenario(format!("hex {} is off the board", at)))?;
        }
        Ok(board)
    }
}

impl UnitSpec {
    fn to_unit(&self, owner: PlayerId) -> Result<Unit> {
        let name = self.name.as_str();
        let mut builder = match self.chassis {
            ChassisKind::Mech => ChassisBuilder::mech(name, self.tonnage, self.walk_mp),
            ChassisKind::Quad => ChassisBuilder::quad(name, self.tonnage, self.walk_mp),
            ChassisKind::Protomech => ChassisBuilder::protomech(name, self.tonnage, self.walk_mp),
            ChassisKind::Vehicle => ChassisBuilder::vehicle(
                name,
                self.tonnage,
                self.walk_mp,
                self.movement.unwrap_or(MovementMode::Tracked),
            ),
            ChassisKind::Infantry => ChassisBuilder::infantry(name, self.tonnage, self.walk_mp),
            ChassisKind::Aero => ChassisBuilder::aero(name, self.tonnage, self.walk_mp),
        };
        builder = builder.jump(self.jump_mp).skills(
            self.gunnery.unwrap_or(4),
            self.piloting.unwrap_or(5),
        );

        for mount in &self.weapons {
            if weapon_stats(&mount.name).is_none() {
                return Err(SimError::Scenario(format!(
                    "unit {} mounts unknown weapon {}",
                    self.name, mount.name
                )));
            }
            builder = builder.weapon(&mount.name, mount.location);
        }
        for mount in &self.ammo {
            if ammo_bin(&mount.name).is_none() {
                return Err(SimError::Scenario(format!(
                    "unit {} carries unknown ammunition {}",
                    self.name, mount.name
                )));
            }
            builder = builder.ammo(&mount.name, mount.location);
        }
        for armor in &self.armor {
            builder = builder.armor(armor.location, armor.front, armor.rear);
        }
        if let Some(kind) = self.armor_kind {
            builder = builder.armor_kind(kind);
        }
        if let Some(table) = self.crit_table {
            builder = builder.crit_table(table);
        }
        if let Some(sinks) = self.heat_sinks {
            builder = builder.heat_sinks(sinks);
        }
        if let Some(bv) = self.battle_value {
            builder = builder.battle_value(bv);
        }
        if self.commander {
            builder = builder.commander();
        }
        if self.offboard {
            builder = builder.offboard();
        }

        let unit = builder
            .deploy_round(self.deploy_round)
            .capacity(self.capacity)
            .build(owner);
        if self.armor.iter().any(|a| unit.location(a.location).is_none()) {
            return Err(SimError::Scenario(format!(
                "unit {} armors a location its chassis does not have",
                self.name
            )));
        }
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIRMISH: &str = r#"{
        "name": "Ridge fight",
        "seed": 7,
        "board": {
            "width": 10,
            "height": 10,
            "hexes": [
                {"x": 4, "y": 4, "terrain": "HeavyWoods", "elevation": 1},
                {"x": 6, "y": 2, "building": {"name": "Depot", "cf": 40, "height": 2}}
            ]
        },
        "options": {"max_rounds": 8},
        "players": [
            {"name": "Alpha", "team": 1, "deploy_columns": [0, 2], "mines": {"conventional": 1}},
            {"name": "Bravo", "team": 2}
        ],
        "units": [
            {"name": "Hunchback", "owner": "Alpha", "chassis": "mech", "tonnage": 50, "walk_mp": 4,
             "weapons": [{"name": "AC/20", "location": "RightTorso"}],
             "ammo": [{"name": "AC20", "location": "LeftTorso"}],
             "commander": true},
            {"name": "Scorpion", "owner": "Bravo", "chassis": "vehicle", "tonnage": 25, "walk_mp": 4,
             "movement": "Tracked", "position": {"x": 8, "y": 8}, "facing": 3}
        ]
    }"#;

    #[test]
    fn test_builds_board_players_and_units() {
        let state = ScenarioLoader::parse(SKIRMISH).unwrap().build().unwrap();
        assert_eq!(state.options.max_rounds, Some(8));
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].deploy_columns, Some((0, 2)));
        assert_eq!(state.players[0].mines.conventional, 1);
        assert_eq!(
            state.board.hex(HexCoord::new(4, 4)).unwrap().terrain,
            Terrain::HeavyWoods
        );
        assert!(state.board.hex(HexCoord::new(6, 2)).unwrap().has_building());

        let mech = state.units.values().find(|u| u.name.as_str() == "Hunchback").unwrap();
        assert!(mech.commander);
        assert!(!mech.deployed);
        assert!(mech.equipment.iter().any(|e| e.name == "AC/20"));

        let tank = state.units.values().find(|u| u.name.as_str() == "Scorpion").unwrap();
        assert!(tank.deployed);
        assert_eq!(tank.position, Some(HexCoord::new(8, 8)));
        assert_eq!(tank.facing, Facing::SOUTH);
    }

    #[test]
    fn test_unknown_weapon_is_rejected() {
        let json = SKIRMISH.replace("\"AC/20\"", "\"Death Ray\"");
        let err = ScenarioLoader::parse(&json).unwrap().build().unwrap_err();
        assert!(matches!(err, SimError::Scenario(m) if m.contains("Death Ray")));
    }

    #[test]
    fn test_unknown_owner_is_rejected() {
        let json = SKIRMISH.replace("\"owner\": \"Bravo\"", "\"owner\": \"Charlie\"");
        let err = ScenarioLoader::parse(&json).unwrap().build().unwrap_err();
        assert!(matches!(err, SimError::Scenario(m) if m.contains("Charlie")));
    }

    #[test]
    fn test_off_board_start_is_rejected() {
        let json = SKIRMISH.replace("{\"x\": 8, \"y\": 8}", "{\"x\": 12, \"y\": 8}");
        assert!(ScenarioLoader::parse(&json).unwrap().build().is_err());
    }

    #[test]
    fn test_single_team_is_rejected() {
        let json = SKIRMISH.replace("\"team\": 2", "\"team\": 1");
        let err = ScenarioLoader::parse(&json).unwrap().build().unwrap_err();
        assert!(matches!(err, SimError::Scenario(_)));
    }

    #[test]
    fn test_malformed_json_is_a_scenario_error() {
        assert!(matches!(
            ScenarioLoader::parse("{\"name\": 3"),
            Err(SimError::Scenario(_))
        ));
    }
}
