//! Skirmish - Main Binary
//!
//! Runs hex-map skirmishes between bot controllers: single games, resumed
//! snapshots, parallel batches, or a served game driven through the pump.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use skirmish_core::{
    batch::{self, BatchConfig},
    game::{
        controller::PlayerController, snapshot::ControllerState, Engine, GameEndReason, GameLoop,
        GameResult, GameSnapshot, GameState, Outbound, RandomController, VerbosityLevel,
        ZeroController,
    },
    loader::ScenarioLoader,
    server::{self, PumpConfig},
};
use std::path::PathBuf;
use std::time::Duration;

/// Controller type for bot seats
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ControllerType {
    /// Always takes the first candidate action
    Zero,
    /// Picks uniformly among candidates
    Random,
}

impl From<ControllerType> for batch::ControllerType {
    fn from(c: ControllerType) -> Self {
        match c {
            ControllerType::Zero => batch::ControllerType::Zero,
            ControllerType::Random => batch::ControllerType::Random,
        }
    }
}

/// Verbosity level for game output (accepts names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Skirmish - phase-driven hex-map combat engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one scenario to the end with bot controllers
    Run {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Override the scenario's dice seed
        #[arg(long)]
        seed: Option<u64>,

        /// Verbosity level for game output (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        /// Stop after this many rounds
        #[arg(long, default_value_t = 100)]
        max_rounds: u32,

        #[arg(long, value_enum, default_value = "random")]
        controller: ControllerType,

        /// Output file for the game snapshot
        #[arg(long, default_value = "game.snapshot")]
        snapshot_output: PathBuf,

        /// Save a snapshot and stop once this round is complete
        #[arg(long, value_name = "ROUND")]
        stop_after_round: Option<u32>,
    },

    /// Load and resume a game from a snapshot file
    Resume {
        #[arg(value_name = "SNAPSHOT_FILE")]
        snapshot: PathBuf,

        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        #[arg(long, default_value_t = 100)]
        max_rounds: u32,
    },

    /// Play many games across every scenario in a directory
    Batch {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(long, short = 'g', default_value_t = 100)]
        games: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, value_enum, default_value = "random")]
        controller: ControllerType,

        #[arg(long)]
        max_rounds: Option<u32>,

        /// Stop starting new games after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Serve a scenario through the action pump with bot connections
    Serve {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = 100)]
        max_rounds: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            verbosity,
            max_rounds,
            controller,
            snapshot_output,
            stop_after_round,
        } => {
            let mut state = ScenarioLoader::load_from_file(&scenario)
                .with_context(|| format!("loading scenario {}", scenario.display()))?;
            let seed = seed.unwrap_or_else(rand::random);
            state.seed(seed);
            println!("=== Skirmish: {} ===", scenario.display());
            println!("Seed: {seed}\n");
            let controllers = state
                .players
                .iter()
                .enumerate()
                .map(|(i, p)| make_controller(controller, p.id, seed.wrapping_add(i as u64 + 1)))
                .collect();
            let stop = stop_after_round.map(|round| (round, snapshot_output));
            run_game(state, controllers, verbosity.0, max_rounds, stop)?;
        }
        Commands::Resume {
            snapshot,
            verbosity,
            max_rounds,
        } => {
            let loaded = GameSnapshot::load_from_file(&snapshot)
                .with_context(|| format!("loading snapshot {}", snapshot.display()))?;
            println!("=== Resuming {} at round {} ===\n", snapshot.display(), loaded.round);
            let controllers = loaded
                .game_state
                .players
                .iter()
                .enumerate()
                .map(|(i, p)| -> Box<dyn PlayerController> {
                    match loaded.controller_for(p.id) {
                        Some(ControllerState::Random(r)) => Box::new(r.clone()),
                        Some(ControllerState::Zero { player }) => Box::new(ZeroController::new(*player)),
                        None => Box::new(RandomController::with_seed(p.id, loaded.round as u64 + i as u64)),
                    }
                })
                .collect();
            run_game(loaded.game_state, controllers, verbosity.0, max_rounds, None)?;
        }
        Commands::Batch {
            dir,
            games,
            seed,
            controller,
            max_rounds,
            seconds,
        } => {
            println!("=== Skirmish - Batch Mode ===\n");
            let paths = batch::discover_scenarios(&dir)
                .with_context(|| format!("scanning {}", dir.display()))?;
            if paths.is_empty() {
                bail!("no .json scenarios under {}", dir.display());
            }
            for path in &paths {
                println!("  {}", path.display());
            }
            println!("\nRunning {games} games, seed {seed}, controller {:?}", controller);
            let config = BatchConfig {
                games,
                seed,
                controller: controller.into(),
                max_rounds,
                time_limit: seconds.map(Duration::from_secs),
            };
            let stats = batch::run_batch(&paths, &config).context("running batch")?;
            stats.print_summary();
        }
        Commands::Serve {
            scenario,
            seed,
            max_rounds,
        } => serve(scenario, seed, max_rounds).await?,
    }

    Ok(())
}

fn make_controller(kind: ControllerType, player: skirmish_core::core::PlayerId, seed: u64) -> Box<dyn PlayerController> {
    match kind {
        ControllerType::Zero => Box::new(ZeroController::new(player)),
        ControllerType::Random => Box::new(RandomController::with_seed(player, seed)),
    }
}

fn run_game(
    state: GameState,
    mut controllers: Vec<Box<dyn PlayerController>>,
    verbosity: VerbosityLevel,
    max_rounds: u32,
    stop: Option<(u32, PathBuf)>,
) -> anyhow::Result<()> {
    let mut engine = Engine::new(state);
    let mut seats: Vec<&mut dyn PlayerController> = controllers
        .iter_mut()
        .map(|c| -> &mut dyn PlayerController { &mut **c })
        .collect();
    let mut game_loop = GameLoop::new(&mut engine)
        .with_verbosity(verbosity)
        .with_max_rounds(max_rounds);
    if let Some((round, path)) = stop {
        game_loop = game_loop.with_snapshot_after(round, path);
    }
    let result = game_loop.run_game(&mut seats).context("running game")?;
    print_result(&result);
    Ok(())
}

fn print_result(result: &GameResult) {
    println!("\n=== Game Over ===");
    match result.end_reason {
        GameEndReason::Victory(team) => println!("Winner: team {}", team.0),
        GameEndReason::Draw => println!("Result: draw"),
        GameEndReason::RoundLimit => println!("Result: round limit reached"),
        GameEndReason::Snapshot => println!("Result: snapshot saved"),
    }
    println!("Rounds played: {}", result.rounds_played);
    println!("Actions: {}", result.actions);
}

async fn serve(scenario: PathBuf, seed: Option<u64>, max_rounds: u32) -> anyhow::Result<()> {
    let mut state = ScenarioLoader::load_async(&scenario)
        .await
        .with_context(|| format!("loading scenario {}", scenario.display()))?;
    let seed = seed.unwrap_or_else(rand::random);
    state.seed(seed);
    state.options.max_rounds.get_or_insert(max_rounds);
    let players: Vec<_> = state.players.iter().map(|p| p.id).collect();
    let config = PumpConfig::from_options(&state.options);

    let mut engine = Engine::new(state);
    engine.start().context("starting game")?;
    let (handle, pump) = server::spawn(engine, config);

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Outbound::Reports(reports) => {
                    for report in reports {
                        println!("{report}");
                    }
                }
                Outbound::GameOver(victory) => {
                    println!("\n=== Game Over: {} ===", victory.reason);
                    break;
                }
                _ => {}
            }
        }
    });

    let bots: Vec<_> = players
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let bot = RandomController::with_seed(p, seed.wrapping_add(i as u64 + 1));
            tokio::spawn(server::run_bot(handle.clone(), bot))
        })
        .collect();
    for bot in bots {
        bot.await.context("bot task")??;
    }
    handle.shutdown()?;
    pump.await.context("pump task")??;
    printer.abort();
    Ok(())
}
