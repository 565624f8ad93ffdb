//! Stockfish process wrapper using UCI protocol (async I/O)

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::evaluator::{fen_side_to_move, EngineScore, EvaluationResult, PvLine, SearchBudget};

/// How long `quit` waits for the process to exit before killing it
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// How a Stockfish process is launched and configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub path: PathBuf,
    pub threads: u32,
    pub hash_mb: u32,
    /// Hard ceiling for any single query
    pub timeout: Duration,
}

impl EngineOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            threads: 1,
            hash_mb: 128,
            timeout: Duration::from_secs(10),
        }
    }
}

/// One running engine process
pub struct StockfishProcess {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Current `MultiPV` option value
    multipv: u32,
}

impl StockfishProcess {
    /// Spawn the engine and run the UCI handshake
    pub async fn spawn(options: &EngineOptions) -> Result<Self, EngineError> {
        let mut process = Command::new(&options.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&options.path, e))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            multipv: 1,
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine
            .send(&format!("setoption name Threads value {}", options.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", options.hash_mb))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.ready().await?;

        Ok(engine)
    }

    /// Send a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Unavailable(format!("failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Unavailable(format!("failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    /// Read one line; a closed pipe means the process is gone
    async fn read_line(&mut self, line: &mut String) -> Result<(), EngineError> {
        line.clear();
        let n = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| EngineError::Unavailable(format!("failed to read from engine: {e}")))?;
        if n == 0 {
            return Err(EngineError::Unavailable("engine closed its output".into()));
        }
        debug!(line = line.trim(), "SF >");
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            if line.trim() == expected {
                return Ok(());
            }
        }
    }

    async fn ready(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    /// Reset engine state between games
    pub async fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame").await?;
        self.ready().await
    }

    /// Search a position and report the ranked lines the budget asks for
    pub async fn search(
        &mut self,
        fen: &str,
        budget: &SearchBudget,
    ) -> Result<EvaluationResult, EngineError> {
        if budget.multipv != self.multipv {
            self.send(&format!("setoption name MultiPV value {}", budget.multipv))
                .await?;
            self.multipv = budget.multipv;
        }
        self.send(&format!("position fen {fen}")).await?;
        self.send(&budget.go_command()).await?;

        // Latest exact line per rank; rank 1 is the primary line
        let mut lines: Vec<Option<InfoLine>> = vec![None; budget.multipv as usize];
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") {
                if let Some(parsed) = parse_info(trimmed) {
                    let rank = parsed.multipv.saturating_sub(1) as usize;
                    if let Some(slot) = lines.get_mut(rank) {
                        *slot = Some(parsed);
                    }
                }
            } else if trimmed.starts_with("bestmove") {
                let best_move = parse_bestmove(trimmed);
                let ranked: Vec<InfoLine> = lines.into_iter().map_while(|l| l).collect();
                let Some(primary) = ranked.first() else {
                    return Err(EngineError::Unavailable(
                        "engine reported a best move without a score".into(),
                    ));
                };
                return Ok(EvaluationResult {
                    score: primary.score,
                    pov: fen_side_to_move(fen),
                    best_move,
                    pv: primary.pv.clone(),
                    depth: primary.depth,
                    lines: ranked
                        .iter()
                        .map(|l| PvLine {
                            score: l.score,
                            pv: l.pv.clone(),
                        })
                        .collect(),
                });
            }
        }
    }

    /// Abort a search left running by a cancelled caller and drain to `bestmove`
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        self.send("stop").await?;
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            if line.trim_start().starts_with("bestmove") {
                break;
            }
        }
        self.ready().await
    }

    /// Send quit and wait briefly for the process to exit, then kill it
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        if timeout(QUIT_GRACE, self.process.wait()).await.is_err() {
            warn!("Engine ignored quit, killing it");
            let _ = self.process.start_kill();
        }
    }
}

impl Drop for StockfishProcess {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

fn spawn_error(path: &Path, e: std::io::Error) -> EngineError {
    EngineError::Unavailable(format!("failed to spawn {}: {e}", path.display()))
}

/// The parts of an `info` line the classifier needs
#[derive(Debug, Clone, PartialEq, Eq)]
struct InfoLine {
    /// 1-based rank of this line
    multipv: u32,
    depth: u32,
    score: EngineScore,
    pv: Vec<String>,
}

/// Parse an `info` line carrying an exact score. Bound-only scores and lines
/// without a score return `None`.
fn parse_info(line: &str) -> Option<InfoLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.iter().any(|p| *p == "upperbound" || *p == "lowerbound") {
        return None;
    }
    let score = if let Some(cp) = parse_cp(line) {
        EngineScore::Cp(cp)
    } else {
        EngineScore::Mate(parse_mate(line)?)
    };
    Some(InfoLine {
        multipv: parse_multipv_index(line).unwrap_or(1),
        depth: parse_field(line, "depth").unwrap_or(0),
        score,
        pv: parse_pv(line),
    })
}

fn parse_field<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == key && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_field(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_field(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_field(line, "multipv")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

/// `bestmove e2e4 ponder e7e5` -> `Some("e2e4")`; `bestmove (none)` -> `None`
fn parse_bestmove(line: &str) -> Option<String> {
    match line.split_whitespace().nth(1) {
        Some("(none)") | None => None,
        Some(mv) => Some(mv.to_string()),
    }
}
