//! Doctor error types

use std::time::Duration;

use chess_core::PgnError;
use thiserror::Error;

/// Failures talking to the external analysis engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Process missing, exited, or its pipes closed
    #[error("analysis engine unavailable: {0}")]
    Unavailable(String),

    #[error("analysis engine timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Stockfish not found: set STOCKFISH_PATH, pass --engine, or add it to PATH")]
    EngineNotFound,
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("PGN parse error: {0}")]
    Pgn(#[from] PgnError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
