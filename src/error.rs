//! Error types for the simulation core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unit not found: {0}")]
    UnitNotFound(u32),

    #[error("Player not found: {0}")]
    PlayerNotFound(u32),

    #[error("Invalid game action: {0}")]
    InvalidAction(String),

    #[error("Not your turn: player {player} acted during turn {turn_index}")]
    NotYourTurn { player: u32, turn_index: usize },

    #[error("Action not legal in phase {0}")]
    WrongPhase(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Unknown feedback token: {0}")]
    UnknownFeedbackToken(u64),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
