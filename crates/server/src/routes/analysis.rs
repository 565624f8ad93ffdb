use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, Extension, Json};
use chess_core::Game;
use chess_doctor::{AnalysisConfig, AnalysisReport, EnginePool, GameAnalyzer};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 1000000, message = "pgn must be a non-empty string"))]
    pub pgn: String,
}

/// POST /api/analyze
///
/// Replays the first game of the submitted PGN on a pooled engine and returns
/// the per-move report. Dropping the request (client disconnect) stops the
/// analysis after the in-flight engine call.
pub async fn analyze(
    Extension(pool): Extension<Arc<EnginePool>>,
    Extension(config): Extension<Arc<AnalysisConfig>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    req.validate()
        .map_err(|_| AppError::BadRequest("pgn must be a non-empty string".to_string()))?;

    let game = Game::parse(&req.pgn)?;
    tracing::info!(
        white = %game.info.white,
        black = %game.info.black,
        plies = game.plies.len(),
        "Analyzing game"
    );

    let engine = pool.checkout().await?;
    let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await?;
    drop(engine);

    tracing::info!(
        moves = analysis.moves.len(),
        errors = analysis.errors.len(),
        "Analysis complete"
    );
    Ok(Json(AnalysisReport::from(&analysis)))
}
