pub mod config;
pub mod error;
pub mod routes;

pub use error::AppError;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use chess_doctor::{AnalysisConfig, EnginePool};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// The full application: API routes, the static UI as fallback, shared state.
pub fn build_router(
    pool: Arc<EnginePool>,
    analysis: Arc<AnalysisConfig>,
    static_dir: impl AsRef<Path>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/analyze", post(routes::analysis::analyze))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(Extension(pool))
        .layer(Extension(analysis))
        .layer(CompressionLayer::new())
        .layer(cors)
}
