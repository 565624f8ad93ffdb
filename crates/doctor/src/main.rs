//! Chess Doctor CLI
//!
//! Analyzes the first game of a PGN file with Stockfish and prints an
//! annotated transcript (or the JSON report with `--json`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, warn};

use chess_doctor::report::{format_transcript, AnalysisReport};
use chess_core::Game;
use chess_doctor::{
    AnalysisConfig, ConfigError, DoctorError, EngineClient, EngineSettings, GameAnalyzer,
};

#[derive(Parser)]
#[command(name = "chess-doctor")]
#[command(about = "Annotate a chess game with engine-backed move quality")]
struct Cli {
    /// PGN file to analyze
    pgn_file: PathBuf,

    /// Path to the Stockfish executable (auto-detected if omitted)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Print the JSON report instead of the transcript
    #[arg(long)]
    json: bool,

    /// Search depth for the before/after evaluations
    #[arg(long)]
    depth: Option<u32>,

    /// Search depth for the best-move re-check
    #[arg(long)]
    deep_depth: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the transcript
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Analysis failed");
                eprintln!("Error: {e:#}");
                exit_code(&e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            ExitCode::from(130)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let pgn = std::fs::read_to_string(&cli.pgn_file)
        .with_context(|| format!("failed to read {}", cli.pgn_file.display()))?;
    let game = Game::parse(&pgn).map_err(DoctorError::from)?;

    let config = AnalysisConfig::from_env()
        .map_err(DoctorError::from)?
        .with_depths(cli.depth, cli.deep_depth);
    let mut settings = EngineSettings::from_env().map_err(DoctorError::from)?;
    if cli.engine.is_some() {
        settings.path = cli.engine;
    }
    let options = settings.resolve().map_err(DoctorError::from)?;

    let engine = EngineClient::start(options).await.map_err(DoctorError::from)?;
    let result = GameAnalyzer::new(&engine, &config).analyze(&game).await;
    engine.shutdown().await;
    let analysis = result.map_err(DoctorError::from)?;

    if cli.json {
        let report = AnalysisReport::from(&analysis);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_transcript(&analysis));
    }
    Ok(())
}

/// 2 when the engine could not be used, 1 for everything else.
fn exit_code(e: &anyhow::Error) -> ExitCode {
    match e.downcast_ref::<DoctorError>() {
        Some(DoctorError::Engine(_)) | Some(DoctorError::Config(ConfigError::EngineNotFound)) => {
            ExitCode::from(2)
        }
        _ => ExitCode::from(1),
    }
}
