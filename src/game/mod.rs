//! Phases, turns, the engine and everything that drives a match

pub mod actions;
pub mod attacks;
pub mod controller;
pub mod engine;
pub mod events;
pub mod game_loop;
pub mod heat;
pub mod logger;
pub mod movement;
pub mod options;
pub mod phase;
pub mod random_controller;
pub mod report;
pub mod snapshot;
pub mod state;
pub mod state_hash;
pub mod turn;
pub mod turn_order;
pub mod victory;
pub mod zero_controller;

pub use actions::{AttackDeclaration, MovePath, MovePathMode, MoveStep, PlayerAction};
pub use controller::{GameStateView, PlayerController};
pub use engine::{ActionOutcome, AdminCommand, Engine};
pub use events::{FeedbackRequest, FeedbackResponse, Outbound};
pub use game_loop::{GameEndReason, GameLoop, GameResult};
pub use logger::{GameLogger, OutputFormat, OutputMode, VerbosityLevel};
pub use options::{CritPolicy, GameOptions};
pub use phase::{Phase, PhaseContext};
pub use random_controller::RandomController;
pub use report::Subject;
pub use snapshot::GameSnapshot;
pub use state::GameState;
pub use turn::{TurnDescriptor, TurnQueue};
pub use victory::{check_victory, VictoryResult};
pub use zero_controller::ZeroController;
