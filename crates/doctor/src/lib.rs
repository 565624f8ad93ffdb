//! Chess Doctor: engine-backed move-quality annotation for PGN games.

pub mod analysis;
pub mod analyzer;
pub mod board_utils;
pub mod client;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod explain;
pub mod normalize;
pub mod pool;
pub mod report;
pub mod stockfish;

pub use analysis::{GameSummary, MoveQuality, PlayerSummary, QualityTier, Thresholds};
pub use analyzer::{GameAnalysis, GameAnalyzer, MoveAnalysis, TopMove};
pub use client::EngineClient;
pub use config::{AnalysisConfig, EngineSettings};
pub use error::{ConfigError, DoctorError, EngineError};
pub use evaluator::{EngineScore, EvaluationResult, Evaluator, PvLine, SearchBudget};
pub use normalize::{normalize, normalize_score, NormalizedScore};
pub use pool::{EnginePool, PooledEngine};
pub use report::AnalysisReport;
pub use stockfish::EngineOptions;

use chess_core::Game;

/// Parse a PGN and analyze its first game.
pub async fn analyze_pgn<E: Evaluator>(
    engine: &E,
    config: &AnalysisConfig,
    pgn: &str,
) -> Result<GameAnalysis, DoctorError> {
    let game = Game::parse(pgn)?;
    let analysis = GameAnalyzer::new(engine, config).analyze(&game).await?;
    Ok(analysis)
}
