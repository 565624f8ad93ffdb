use std::sync::Arc;

use anyhow::Context;
use chess_doctor::EnginePool;
use server::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let options = config.engine.resolve()?;
    let pool = Arc::new(EnginePool::new(options, config.engine.pool_size));
    // A failed warm-up is not fatal; requests get 503 until an engine starts
    if pool.warm_up().await == 0 {
        tracing::warn!("No engine could be started; /api/analyze will be unavailable");
    }

    let app = server::build_router(
        pool.clone(),
        Arc::new(config.analysis.clone()),
        &config.static_dir,
    );

    let addr = config.addr();
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    pool.shutdown().await;
    Ok(())
}
