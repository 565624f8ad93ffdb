#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chess_core::board;
use chess_doctor::{
    AnalysisConfig, EngineError, EngineScore, EnginePool, EvaluationResult, Evaluator, PvLine,
    SearchBudget,
};
use chess_doctor::evaluator::fen_side_to_move;
use reqwest::Client;
use shakmaty::{CastlingMode, Color, Position};

/// Anderssen vs Kieseritzky, London 1851.
pub const IMMORTAL_GAME: &str = r#"[Event "London casual game"]
[Site "London ENG"]
[Date "1851.06.21"]
[White "Adolf Anderssen"]
[Black "Lionel Kieseritzky"]
[Result "1-0"]

1.e4 e5 2.f4 exf4 3.Bc4 Qh4+ 4.Kf1 b5 5.Bxb5 Nf6 6.Nf3 Qh6 7.d3 Nh5 8.Nh4 Qg5
9.Nf5 c6 10.g4 Nf6 11.Rg1 cxb5 12.h4 Qg6 13.h5 Qg5 14.Qf3 Ng8 15.Bxf4 Qf6
16.Nc3 Bc5 17.Nd5 Qxb2 18.Bd6 Bxg1 19.e5 Qxa1+ 20.Ke2 Na6 21.Nxg7+ Kd8
22.Qf6+ Nxf6 23.Be7# 1-0
"#;

/// White-positive engine verdicts for the start position and after each of
/// the first 44 plies. The final ply is mate and never reaches the engine.
pub fn immortal_script() -> Vec<EngineScore> {
    let cp = [
        20, 30, 25, -20, -10, -60, -40, -50, 50, 60, //
        60, 40, 100, 100, 110, 180, 190, 200, 260, 270, //
        280, 240, 580, 500, 520, 530, 540, 500, 700, 720, //
        730, 760, 800, 810, 1200, 900,
    ];
    let mates = [5, 4, 4, 3, 3, 2, 2, 1, 1];
    cp.into_iter()
        .map(EngineScore::Cp)
        .chain(mates.into_iter().map(EngineScore::Mate))
        .collect()
}

/// Evaluator stub that replays a fixed script.
///
/// Standard-budget queries consume the script in order; each entry is a
/// White-positive score and is flipped to the side to move. Deep-budget
/// queries answer with the first legal move by UCI order at 0.00. Once the
/// script runs out every position is 0.00.
pub struct ScriptedEngine {
    script: Vec<EngineScore>,
    deep: SearchBudget,
    next: AtomicUsize,
    standard_calls: AtomicUsize,
    deep_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// Every FEN queried, in order
    pub log: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<EngineScore>) -> Self {
        Self {
            script,
            deep: AnalysisConfig::default().deep,
            next: AtomicUsize::new(0),
            standard_calls: AtomicUsize::new(0),
            deep_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every position evaluates to 0.00.
    pub fn level() -> Self {
        Self::new(Vec::new())
    }

    pub fn standard_calls(&self) -> usize {
        self.standard_calls.load(Ordering::SeqCst)
    }

    pub fn deep_calls(&self) -> usize {
        self.deep_calls.load(Ordering::SeqCst)
    }

    /// Highest number of queries that were ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn answer(&self, fen: &str, budget: &SearchBudget) -> EvaluationResult {
        let pov = fen_side_to_move(fen);
        if *budget == self.deep {
            self.deep_calls.fetch_add(1, Ordering::SeqCst);
            let best = first_legal_move(fen);
            let pv: Vec<String> = best.iter().cloned().collect();
            return EvaluationResult {
                score: EngineScore::Cp(0),
                pov,
                best_move: best,
                pv: pv.clone(),
                depth: budget.depth.unwrap_or(0),
                lines: vec![PvLine {
                    score: EngineScore::Cp(0),
                    pv,
                }],
            };
        }

        self.standard_calls.fetch_add(1, Ordering::SeqCst);
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let white = self.script.get(index).copied().unwrap_or(EngineScore::Cp(0));
        let score = match (white, pov) {
            (score, Color::White) => score,
            (EngineScore::Cp(cp), Color::Black) => EngineScore::Cp(-cp),
            (EngineScore::Mate(n), Color::Black) => EngineScore::Mate(-n),
        };
        EvaluationResult {
            score,
            pov,
            best_move: None,
            pv: Vec::new(),
            depth: budget.depth.unwrap_or(0),
            lines: vec![PvLine {
                score,
                pv: Vec::new(),
            }],
        }
    }
}

impl Evaluator for ScriptedEngine {
    async fn evaluate(
        &self,
        fen: &str,
        budget: &SearchBudget,
    ) -> Result<EvaluationResult, EngineError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        self.log.lock().unwrap().push(fen.to_string());

        // Give a concurrent caller the chance to overlap
        tokio::time::sleep(Duration::from_millis(1)).await;
        let result = self.answer(fen, budget);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }
}

fn first_legal_move(fen: &str) -> Option<String> {
    let pos = board::position_from_fen(fen)?;
    let mut moves: Vec<String> = pos
        .legal_moves()
        .iter()
        .map(|m| m.to_uci(CastlingMode::Standard).to_string())
        .collect();
    moves.sort();
    moves.into_iter().next()
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// A `/bin/sh` UCI engine that scores every position +0.20 for the side to
/// move and always suggests e2e4.
#[cfg(unix)]
pub fn fake_engine(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    uci) echo "id name FakeFish"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 10 score cp 20 pv e2e4"; echo "bestmove e2e4" ;;
    stop) echo "bestmove e2e4" ;;
    quit) exit 0 ;;
  esac
done
"#;
    let path = dir.join("fakefish");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn static_dir() -> PathBuf {
    server::config::default_static_dir()
}

/// Serve the app on an ephemeral port and return its base URL.
pub async fn spawn_server(engine_path: PathBuf) -> String {
    let options = chess_doctor::EngineOptions {
        timeout: Duration::from_secs(2),
        ..chess_doctor::EngineOptions::new(engine_path)
    };
    let pool = Arc::new(EnginePool::new(options, 2));
    let config = Arc::new(AnalysisConfig::default());
    let app = server::build_router(pool, config, static_dir());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Build a reqwest client for tests.
pub fn client() -> Client {
    Client::new()
}
