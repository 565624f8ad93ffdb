//! Move-quality pipeline: replay the game, evaluate before and after every
//! ply, classify the swing, and explain the moves that were not good.

use chess_core::board::{self, PlayedMove};
use chess_core::notation;
use chess_core::{Game, GameMetadata, Ply};
use shakmaty::{Chess, Color, Move, Position};
use tracing::{debug, info, warn};

use crate::analysis::{classify, mover_delta, GameSummary, MoveQuality, QualityTier, SummaryBuilder};
use crate::config::AnalysisConfig;
use crate::error::EngineError;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::explain::{explain, explain_alternative};
use crate::normalize::{normalize, normalize_score, NormalizedScore};

/// Analysis of one ply.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnalysis {
    /// 1-based ply index
    pub ply: usize,
    pub move_number: u32,
    /// SAN for a played move, the text as written for an error ply
    pub san: String,
    pub uci: Option<String>,
    pub color: Color,
    pub quality: MoveQuality,
    pub eval_before: Option<NormalizedScore>,
    pub eval_after: Option<NormalizedScore>,
    pub delta: Option<i32>,
    /// Engine's preferred move in SAN, when it differs from the one played
    pub best_move: Option<String>,
    /// Deep re-check score of the best move. Advisory: never part of `delta`
    pub best_evaluation: Option<NormalizedScore>,
    /// Engine's ranked candidates from the deep re-check
    pub top_moves: Vec<TopMove>,
    pub principal_variation: Option<String>,
    pub explanation: Option<String>,
    pub error: Option<String>,
    /// Running move-pair notation, e.g. `"12. Nf3 Nc6"`
    pub notation: String,
}

/// One candidate move of the deep re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct TopMove {
    pub san: String,
    pub evaluation: NormalizedScore,
    /// Numbered SAN line starting with this move
    pub line: String,
}

impl MoveAnalysis {
    pub fn is_white(&self) -> bool {
        self.color == Color::White
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameAnalysis {
    pub info: GameMetadata,
    pub moves: Vec<MoveAnalysis>,
    pub errors: Vec<String>,
    pub summary: GameSummary,
}

/// Recommendation from the deep re-check.
struct Recommendation {
    best_move: Option<String>,
    best_evaluation: NormalizedScore,
    top_moves: Vec<TopMove>,
    line: Option<String>,
    explanation: String,
}

pub struct GameAnalyzer<'a, E> {
    engine: &'a E,
    config: &'a AnalysisConfig,
}

impl<'a, E: Evaluator> GameAnalyzer<'a, E> {
    pub fn new(engine: &'a E, config: &'a AnalysisConfig) -> Self {
        Self { engine, config }
    }

    /// Analyze every ply in order. Any engine failure that survives the
    /// client's own retry aborts the whole analysis.
    pub async fn analyze(&self, game: &Game) -> Result<GameAnalysis, EngineError> {
        info!(
            white = %game.info.white,
            black = %game.info.black,
            plies = game.plies.len(),
            "Analyzing game"
        );
        self.engine.new_game().await?;

        let mut moves = Vec::with_capacity(game.plies.len());
        let mut errors = Vec::new();
        let mut summary = SummaryBuilder::default();
        // Last after-evaluation, keyed by FEN, reused as the next before-evaluation
        let mut cached: Option<(String, NormalizedScore)> = None;
        // White's move text for the current move number
        let mut white_half: Option<(u32, String)> = None;

        for ply in &game.plies {
            let analysis = match &ply.played {
                Err(e) => {
                    let message = format!("Move {} ({}): {e}", ply.move_number, ply.text);
                    warn!(ply = ply.index, text = %ply.text, error = %e, "Skipping move");
                    errors.push(message.clone());
                    cached = None;
                    self.error_ply(ply, message, &mut white_half)
                }
                Ok(played) => {
                    let fen_before = board::fen(&ply.before);
                    let eval_before = match cached.take() {
                        Some((fen, score)) if fen == fen_before => score,
                        _ => self.score(&ply.before, &fen_before).await?,
                    };
                    let fen_after = board::fen(&ply.after);
                    let eval_after = self.score(&ply.after, &fen_after).await?;
                    cached = Some((fen_after, eval_after));

                    self.rated_ply(ply, played, &fen_before, eval_before, eval_after, &mut white_half)
                        .await?
                }
            };
            summary.record(analysis.color, analysis.quality, analysis.delta);
            moves.push(analysis);
        }

        info!(moves = moves.len(), errors = errors.len(), "Analysis complete");
        Ok(GameAnalysis {
            info: game.info.clone(),
            moves,
            errors,
            summary: summary.finish(),
        })
    }

    async fn rated_ply(
        &self,
        ply: &Ply,
        played: &PlayedMove,
        fen_before: &str,
        eval_before: NormalizedScore,
        eval_after: NormalizedScore,
        white_half: &mut Option<(u32, String)>,
    ) -> Result<MoveAnalysis, EngineError> {
        let delta = mover_delta(eval_before, eval_after, ply.color);
        let tier = classify(delta, &self.config.thresholds);
        debug!(
            ply = ply.index,
            san = %played.san,
            before = eval_before.value(),
            after = eval_after.value(),
            delta,
            "Classified move"
        );

        let recommendation = if tier == QualityTier::Good {
            None
        } else {
            info!(ply = ply.index, san = %played.san, delta, quality = tier.as_str(), "Non-good move");
            Some(self.recommend(ply, played, fen_before, delta).await?)
        };
        let (best_move, best_evaluation, top_moves, line, explanation) = match recommendation {
            Some(r) => (
                r.best_move,
                Some(r.best_evaluation),
                r.top_moves,
                r.line,
                Some(r.explanation),
            ),
            None => (None, None, Vec::new(), None, None),
        };

        Ok(MoveAnalysis {
            ply: ply.index,
            move_number: ply.move_number,
            san: played.san.clone(),
            uci: Some(played.uci.clone()),
            color: ply.color,
            quality: MoveQuality::Rated(tier),
            eval_before: Some(eval_before),
            eval_after: Some(eval_after),
            delta: Some(delta),
            best_move,
            best_evaluation,
            top_moves,
            principal_variation: line,
            explanation,
            error: None,
            notation: running_notation(ply, &played.san, white_half),
        })
    }

    fn error_ply(
        &self,
        ply: &Ply,
        message: String,
        white_half: &mut Option<(u32, String)>,
    ) -> MoveAnalysis {
        MoveAnalysis {
            ply: ply.index,
            move_number: ply.move_number,
            san: ply.text.clone(),
            uci: None,
            color: ply.color,
            quality: MoveQuality::Error,
            eval_before: None,
            eval_after: None,
            delta: None,
            best_move: None,
            best_evaluation: None,
            top_moves: Vec::new(),
            principal_variation: None,
            explanation: None,
            error: Some(message),
            notation: running_notation(ply, &ply.text, white_half),
        }
    }

    /// Re-check the before-position at the deep budget. The deep score is
    /// only used to pick and rank moves; it never changes the delta.
    async fn recommend(
        &self,
        ply: &Ply,
        played: &PlayedMove,
        fen_before: &str,
        delta: i32,
    ) -> Result<Recommendation, EngineError> {
        let result = self.engine.evaluate(fen_before, &self.config.deep).await?;
        let mover = ply.before.turn();
        let best_evaluation = normalize(&result, mover);

        let best = result
            .best_move
            .as_deref()
            .and_then(|uci| board::uci_to_move(&ply.before, uci).ok());
        let best_move = best
            .as_ref()
            .filter(|best| **best != played.mv)
            .map(|best| board::play(&mut ply.before.clone(), best).san);

        let line = if result.pv.is_empty() {
            None
        } else {
            Some(notation::format_line(&ply.before, &result.pv, self.config.line_moves))
                .filter(|line| !line.is_empty())
        };

        let candidates = self.candidates(&ply.before, &result);
        let played_rank = candidates.iter().position(|(mv, _)| *mv == played.mv);
        let explanation = match (played_rank, best.as_ref()) {
            // Still one of the engine's top choices, just not the first
            (Some(rank), Some(best)) if rank > 0 && *best != played.mv => {
                let gap = -mover_delta(best_evaluation, candidates[rank].1.evaluation, mover);
                explain_alternative(&ply.before, played, best, gap)
            }
            _ => explain(&ply.before, played, best.as_ref(), delta),
        };

        Ok(Recommendation {
            best_move,
            best_evaluation,
            top_moves: candidates.into_iter().map(|(_, top)| top).collect(),
            line,
            explanation,
        })
    }

    /// Legal candidate moves of a multi-line result, in engine rank order.
    fn candidates(&self, before: &Chess, result: &EvaluationResult) -> Vec<(Move, TopMove)> {
        result
            .lines
            .iter()
            .filter_map(|line| {
                let mv = board::uci_to_move(before, line.first_move()?).ok()?;
                let san = board::play(&mut before.clone(), &mv).san;
                let top = TopMove {
                    san,
                    evaluation: normalize_score(line.score, before.turn()),
                    line: notation::format_line(before, &line.pv, self.config.line_moves),
                };
                Some((mv, top))
            })
            .collect()
    }

    /// Terminal positions are scored by the rules; everything else by the engine.
    async fn score(&self, pos: &Chess, fen: &str) -> Result<NormalizedScore, EngineError> {
        if board::is_terminal(pos) {
            return Ok(if pos.is_checkmate() {
                NormalizedScore::mated(pos.turn())
            } else {
                NormalizedScore::EVEN
            });
        }
        let result = self.engine.evaluate(fen, &self.config.standard).await?;
        Ok(normalize(&result, pos.turn()))
    }
}

/// `"12. Nf3"` for White, `"12. Nf3 Nc6"` or `"12... Nc6"` for Black.
fn running_notation(ply: &Ply, text: &str, white_half: &mut Option<(u32, String)>) -> String {
    match ply.color {
        Color::White => {
            *white_half = Some((ply.move_number, text.to_string()));
            notation::move_pair(ply.move_number, Some(text), None)
        }
        Color::Black => {
            let white = white_half
                .take()
                .filter(|(number, _)| *number == ply.move_number)
                .map(|(_, san)| san);
            notation::move_pair(ply.move_number, white.as_deref(), Some(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::evaluator::{fen_side_to_move, EngineScore, EvaluationResult, PvLine, SearchBudget};

    /// Returns a fixed White-POV score per FEN and records every query.
    struct TableEngine {
        table: Vec<(String, i32)>,
        /// Ranked (uci, side-to-move cp) lines reported for multi-line searches
        ranked: Vec<(String, i32)>,
        calls: Mutex<Vec<(String, SearchBudget)>>,
    }

    impl TableEngine {
        fn new(table: &[(&str, i32)]) -> Self {
            Self {
                table: table.iter().map(|(f, s)| (f.to_string(), *s)).collect(),
                ranked: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_ranked(mut self, ranked: &[(&str, i32)]) -> Self {
            self.ranked = ranked.iter().map(|(m, s)| (m.to_string(), *s)).collect();
            self
        }
    }

    impl Evaluator for TableEngine {
        async fn evaluate(
            &self,
            fen: &str,
            budget: &SearchBudget,
        ) -> Result<EvaluationResult, EngineError> {
            self.calls.lock().unwrap().push((fen.to_string(), *budget));
            let white = self
                .table
                .iter()
                .find(|(f, _)| f == fen)
                .map(|(_, s)| *s)
                .unwrap_or(0);
            let pov = fen_side_to_move(fen);
            let cp = if pov == Color::White { white } else { -white };
            if budget.multipv > 1 && !self.ranked.is_empty() {
                let lines: Vec<PvLine> = self
                    .ranked
                    .iter()
                    .take(budget.multipv as usize)
                    .map(|(mv, score)| PvLine {
                        score: EngineScore::Cp(*score),
                        pv: vec![mv.clone()],
                    })
                    .collect();
                return Ok(EvaluationResult {
                    score: lines[0].score,
                    pov,
                    best_move: lines[0].first_move().map(str::to_string),
                    pv: lines[0].pv.clone(),
                    depth: 22,
                    lines,
                });
            }
            let pv = vec!["g1f3".to_string(), "b8c6".to_string()];
            Ok(EvaluationResult {
                score: EngineScore::Cp(cp),
                pov,
                best_move: Some("g1f3".to_string()),
                pv: pv.clone(),
                depth: 18,
                lines: vec![PvLine {
                    score: EngineScore::Cp(cp),
                    pv,
                }],
            })
        }
    }

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const AFTER_A3: &str = "rnbqkbnr/pppppppp/8/8/8/P7/1PPPPPPP/RNBQKBNR b KQkq - 0 1";

    #[tokio::test]
    async fn test_single_mistake_is_explained() {
        let engine = TableEngine::new(&[(START, 20), (AFTER_A3, -100)]);
        let config = AnalysisConfig::default();
        let game = Game::parse("1. a3 *").unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        let mv = &analysis.moves[0];
        assert_eq!(mv.delta, Some(-120));
        assert_eq!(mv.quality, MoveQuality::Rated(QualityTier::Mistake));
        assert_eq!(mv.best_move.as_deref(), Some("Nf3"));
        assert_eq!(mv.principal_variation.as_deref(), Some("1. Nf3 Nc6"));
        assert_eq!(mv.notation, "1. a3");
        assert!(mv.explanation.as_deref().unwrap().starts_with("Nf3 is better than a3"));

        assert_eq!(mv.best_evaluation, Some(NormalizedScore(20)));
        assert_eq!(mv.top_moves.len(), 1);

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].1, config.deep);
    }

    #[tokio::test]
    async fn test_runner_up_move_is_explained_as_alternative() {
        const AFTER_D4: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";
        let engine = TableEngine::new(&[(START, 20), (AFTER_D4, -40)])
            .with_ranked(&[("e2e4", 20), ("d2d4", 5), ("g1f3", 0)]);
        let config = AnalysisConfig::default();
        let game = Game::parse("1. d4 *").unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        let mv = &analysis.moves[0];
        // Classified from the standard evaluations only
        assert_eq!(mv.delta, Some(-60));
        assert_eq!(mv.quality, MoveQuality::Rated(QualityTier::Inaccuracy));
        assert_eq!(mv.best_move.as_deref(), Some("e4"));
        assert_eq!(mv.best_evaluation, Some(NormalizedScore(20)));
        let ranked: Vec<&str> = mv.top_moves.iter().map(|t| t.san.as_str()).collect();
        assert_eq!(ranked, ["e4", "d4", "Nf3"]);
        assert_eq!(mv.top_moves[1].evaluation, NormalizedScore(5));
        assert_eq!(mv.top_moves[2].line, "1. Nf3");
        assert_eq!(
            mv.explanation.as_deref(),
            Some("d4 is a strong alternative to e4 and fights for the center.")
        );
        assert_eq!(engine.calls.lock().unwrap()[2].1.multipv, 3);
    }

    #[tokio::test]
    async fn test_distant_runner_up_is_outranked() {
        let engine = TableEngine::new(&[(START, 20), (AFTER_A3, -100)])
            .with_ranked(&[("e2e4", 20), ("a2a3", -60)]);
        let config = AnalysisConfig::default();
        let game = Game::parse("1. a3 *").unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        let mv = &analysis.moves[0];
        assert_eq!(mv.top_moves.len(), 2);
        assert_eq!(
            mv.explanation.as_deref(),
            Some("a3 is among the top choices, but e4 is stronger.")
        );
    }

    #[tokio::test]
    async fn test_before_evaluation_is_reused() {
        let engine = TableEngine::new(&[]);
        let config = AnalysisConfig::default();
        let game = Game::parse("1. e4 e5 2. Nf3 *").unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        assert!(analysis.moves.iter().all(|m| m.quality.is_good()));
        // One before-evaluation plus one per ply
        assert_eq!(engine.calls.lock().unwrap().len(), 4);
        assert_eq!(analysis.moves[1].notation, "1. e4 e5");
        assert_eq!(analysis.moves[2].notation, "2. Nf3");
    }

    #[tokio::test]
    async fn test_checkmate_is_not_sent_to_engine() {
        let engine = TableEngine::new(&[]);
        let config = AnalysisConfig::default();
        let game = Game::parse("1. f3 e5 2. g4 Qh4# 0-1").unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        let mate = &analysis.moves[3];
        assert_eq!(mate.eval_after.unwrap().to_string(), "checkmate");
        assert_eq!(mate.quality, MoveQuality::Rated(QualityTier::Good));
        // Before-eval of ply 1 plus the after-evals of plies 1-3
        assert_eq!(engine.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_stalemate_is_scored_even() {
        let engine = TableEngine::new(&[]);
        let config = AnalysisConfig::default();
        let game = Game::parse(
            "1. e3 a5 2. Qh5 Ra6 3. Qxa5 h5 4. h4 Rah6 5. Qxc7 f6 6. Qxd7+ Kf7 \
             7. Qxb7 Qd3 8. Qxb8 Qh7 9. Qxc8 Kg6 10. Qe6 1/2-1/2",
        )
        .unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        assert_eq!(analysis.moves.len(), 19);
        let last = &analysis.moves[18];
        assert_eq!(last.eval_after, Some(NormalizedScore::EVEN));
        assert_eq!(last.eval_after.unwrap().to_string(), "+0.00");
        assert_eq!(last.quality, MoveQuality::Rated(QualityTier::Good));
        // Before-eval of ply 1 plus the after-evals of plies 1-18
        assert_eq!(engine.calls.lock().unwrap().len(), 19);
    }

    #[tokio::test]
    async fn test_error_ply_is_isolated() {
        let engine = TableEngine::new(&[]);
        let config = AnalysisConfig::default();
        let game = Game::parse("1. e4 e5 2. Nf3 Xq7 3. Bc4 Nf6 *").unwrap();

        let analysis = GameAnalyzer::new(&engine, &config).analyze(&game).await.unwrap();
        assert_eq!(analysis.moves.len(), 6);
        assert_eq!(analysis.moves[3].quality, MoveQuality::Error);
        assert_eq!(analysis.moves[3].notation, "2. Nf3 Xq7");
        assert_eq!(analysis.errors.len(), 1);
        assert!(analysis.errors[0].contains("Xq7"));
        assert!(analysis
            .moves
            .iter()
            .enumerate()
            .all(|(i, m)| i == 3 || m.quality.is_good()));
        assert_eq!(analysis.summary.black.errors, 1);
    }
}
