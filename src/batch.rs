//! Batch mode for running many games in parallel and collecting statistics
//!
//! Scenarios are discovered with a parallel directory walk, parsed once, and
//! then played round-robin by bot controllers on the rayon pool. Every game
//! gets its own seed derived from the batch seed and its index, so a batch
//! is reproducible game by game.

use crate::game::controller::PlayerController;
use crate::game::{Engine, GameEndReason, GameLoop, RandomController, VerbosityLevel, ZeroController};
use crate::loader::{Scenario, ScenarioLoader};
use crate::{Result, SimError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Controller type for batch games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerType {
    Zero,
    #[default]
    Random,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub games: usize,
    pub seed: u64,
    pub controller: ControllerType,
    /// Overrides each scenario's round limit
    pub max_rounds: Option<u32>,
    /// Stop starting new games after this long
    pub time_limit: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            games: 10,
            seed: 42,
            controller: ControllerType::Random,
            max_rounds: None,
            time_limit: None,
        }
    }
}

/// Outcome of one batch game
#[derive(Debug, Clone)]
struct GameRecord {
    scenario: String,
    end: GameEndReason,
    rounds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioStats {
    pub games: usize,
    pub draws: usize,
    pub round_limits: usize,
    pub team_wins: BTreeMap<u32, usize>,
}

/// Statistics collected over a batch
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub games: usize,
    pub draws: usize,
    pub round_limits: usize,
    pub failures: usize,
    pub total_rounds: u64,
    pub team_wins: BTreeMap<u32, usize>,
    pub scenarios: BTreeMap<String, ScenarioStats>,
    pub elapsed: Duration,
}

impl BatchStats {
    fn record(&mut self, game: GameRecord) {
        self.games += 1;
        self.total_rounds += game.rounds as u64;
        let per = self.scenarios.entry(game.scenario).or_default();
        per.games += 1;
        match game.end {
            GameEndReason::Victory(team) => {
                *self.team_wins.entry(team.0).or_insert(0) += 1;
                *per.team_wins.entry(team.0).or_insert(0) += 1;
            }
            GameEndReason::Draw => {
                self.draws += 1;
                per.draws += 1;
            }
            GameEndReason::RoundLimit | GameEndReason::Snapshot => {
                self.round_limits += 1;
                per.round_limits += 1;
            }
        }
    }

    pub fn average_rounds(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total_rounds as f64 / self.games as f64
        }
    }

    pub fn print_summary(&self) {
        let pct = |n: usize, of: usize| 100.0 * n as f64 / of.max(1) as f64;
        println!("\n=== Batch Complete ===");
        println!("Total games played: {}", self.games);
        if self.failures > 0 {
            println!("Failed games: {}", self.failures);
        }
        println!("Elapsed time: {:.2}s", self.elapsed.as_secs_f64());
        println!("Average rounds: {:.1}\n", self.average_rounds());

        println!("=== Outcomes ===");
        for (team, wins) in &self.team_wins {
            println!("Team {} wins: {} ({:.1}%)", team, wins, pct(*wins, self.games));
        }
        println!("Draws: {} ({:.1}%)", self.draws, pct(self.draws, self.games));
        println!(
            "Round limit: {} ({:.1}%)",
            self.round_limits,
            pct(self.round_limits, self.games)
        );

        println!("\n=== Per Scenario ===");
        for (name, s) in &self.scenarios {
            println!("  {}: {} games", name, s.games);
            for (team, wins) in &s.team_wins {
                println!("    Team {}: {} ({:.1}%)", team, wins, pct(*wins, s.games));
            }
            if s.draws > 0 {
                println!("    Draws: {}", s.draws);
            }
            if s.round_limits > 0 {
                println!("    Round limit: {}", s.round_limits);
            }
        }
    }
}

/// All `.json` scenario files under `dir`, sorted by path
pub fn discover_scenarios(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SimError::Scenario(format!("{} is not a directory", dir.display())));
    }
    let mut found = Vec::new();
    for entry in jwalk::WalkDir::new(dir).skip_hidden(true) {
        let entry = entry.map_err(|e| SimError::Scenario(e.to_string()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Per-game seed, spread so neighbouring games do not share dice streams
pub fn game_seed(batch_seed: u64, index: usize) -> u64 {
    batch_seed.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Parse every scenario, then play `config.games` games across them
pub fn run_batch(paths: &[PathBuf], config: &BatchConfig) -> Result<BatchStats> {
    if paths.is_empty() {
        return Err(SimError::Scenario("no scenarios to play".into()));
    }
    let scenarios = paths
        .iter()
        .map(|p| {
            let content = std::fs::read_to_string(p)?;
            ScenarioLoader::parse(&content)
                .map_err(|e| SimError::Scenario(format!("{}: {}", p.display(), e)))
        })
        .collect::<Result<Vec<Scenario>>>()?;

    let start = Instant::now();
    let deadline = config.time_limit.map(|d| start + d);
    let outcomes: Vec<Option<Result<GameRecord>>> = (0..config.games)
        .into_par_iter()
        .map(|index| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            let scenario = &scenarios[index % scenarios.len()];
            Some(play_one(scenario, game_seed(config.seed, index), config))
        })
        .collect();

    let mut stats = BatchStats::default();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(record)) => stats.record(record),
            Some(Err(e)) => {
                eprintln!("Warning: Game {} failed: {}", index, e);
                stats.failures += 1;
            }
            None => {}
        }
    }
    stats.elapsed = start.elapsed();
    Ok(stats)
}

fn play_one(scenario: &Scenario, seed: u64, config: &BatchConfig) -> Result<GameRecord> {
    let mut state = scenario.build()?;
    state.seed(seed);
    if let Some(max) = config.max_rounds {
        state.options.max_rounds = Some(max);
    }
    let max_rounds = state.options.max_rounds.unwrap_or(100);
    let players: Vec<_> = state.players.iter().map(|p| p.id).collect();

    let mut controllers: Vec<Box<dyn PlayerController>> = players
        .iter()
        .enumerate()
        .map(|(i, &player)| -> Box<dyn PlayerController> {
            match config.controller {
                ControllerType::Zero => Box::new(ZeroController::new(player)),
                ControllerType::Random => Box::new(RandomController::with_seed(
                    player,
                    seed.wrapping_add(0x1234_5678_9ABC_DEF0).wrapping_add(i as u64),
                )),
            }
        })
        .collect();
    let mut seats: Vec<&mut dyn PlayerController> = controllers
        .iter_mut()
        .map(|c| -> &mut dyn PlayerController { &mut **c })
        .collect();

    let mut engine = Engine::new(state);
    let result = GameLoop::new(&mut engine)
        .with_verbosity(VerbosityLevel::Silent)
        .with_max_rounds(max_rounds)
        .run_game(&mut seats)?;
    Ok(GameRecord {
        scenario: scenario.name.clone(),
        end: result.end_reason,
        rounds: result.rounds_played,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_scenario(dir: &Path, file: &str, name: &str) {
        let json = serde_json::json!({
            "name": name,
            "board": {"width": 8, "height": 8},
            "options": {"max_rounds": 3},
            "players": [
                {"name": "Alpha", "team": 1},
                {"name": "Bravo", "team": 2}
            ],
            "units": [
                {"name": "Locust", "owner": "Alpha", "chassis": "mech", "tonnage": 20, "walk_mp": 8,
                 "weapons": [{"name": "Medium Laser", "location": "CenterTorso"}]},
                {"name": "Wasp", "owner": "Bravo", "chassis": "mech", "tonnage": 20, "walk_mp": 6,
                 "weapons": [{"name": "Medium Laser", "location": "RightArm"}]}
            ]
        });
        std::fs::write(dir.join(file), json.to_string()).unwrap();
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skirmish_batch_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        dir
    }

    #[test]
    fn test_discovers_json_files_recursively() {
        let dir = scratch_dir("discover");
        write_scenario(&dir, "a.json", "A");
        write_scenario(&dir.join("nested"), "b.json", "B");
        std::fs::write(dir.join("notes.txt"), "not a scenario").unwrap();

        let found = discover_scenarios(&dir).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().unwrap() == "json"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_batch_plays_every_game() {
        let dir = scratch_dir("run");
        write_scenario(&dir, "duel.json", "Duel");
        let paths = discover_scenarios(&dir).unwrap();

        let config = BatchConfig {
            games: 4,
            seed: 11,
            controller: ControllerType::Zero,
            ..BatchConfig::default()
        };
        let stats = run_batch(&paths, &config).unwrap();
        assert_eq!(stats.games + stats.failures, 4);
        assert_eq!(stats.scenarios["Duel"].games, stats.games);
        let decided: usize = stats.team_wins.values().sum();
        assert_eq!(decided + stats.draws + stats.round_limits, stats.games);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_game_seeds_differ_per_index() {
        assert_ne!(game_seed(1, 0), game_seed(1, 1));
        assert_eq!(game_seed(5, 3), game_seed(5, 3));
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        assert!(run_batch(&[], &BatchConfig::default()).is_err());
    }
}
