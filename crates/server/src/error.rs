use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::PgnError;
use chess_doctor::{DoctorError, EngineError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PgnError> for AppError {
    fn from(e: PgnError) -> Self {
        AppError::BadRequest(format!("invalid PGN: {e}"))
    }
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::Pgn(e) => e.into(),
            DoctorError::Engine(e) => e.into(),
            DoctorError::Config(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Engine(e) => {
                tracing::error!("Engine error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "analysis engine unavailable".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
