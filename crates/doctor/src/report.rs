//! Presentation of a finished analysis: the JSON document shared by the API
//! and `--json`, and the annotated text transcript.

use std::fmt::Write;

use serde::Serialize;

use crate::analysis::{GameSummary, MoveQuality};
use crate::analyzer::{GameAnalysis, MoveAnalysis, TopMove};

#[derive(Debug, Clone, Serialize)]
pub struct GameInfo {
    pub white: String,
    pub black: String,
    pub event: String,
    pub date: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveReport {
    pub move_number: u32,
    pub ply: usize,
    #[serde(rename = "move")]
    pub mv: String,
    pub player: &'static str,
    pub is_white: bool,
    pub quality: MoveQuality,
    /// Evaluation after the move, e.g. `+0.35`, `#4`
    pub evaluation: String,
    pub notation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_move: Option<String>,
    /// Deep re-check score of the best move, advisory only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_evaluation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_moves: Vec<TopMoveReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_before: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_after: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_variation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopMoveReport {
    #[serde(rename = "move")]
    pub mv: String,
    pub evaluation: String,
    pub line: String,
}

impl From<&TopMove> for TopMoveReport {
    fn from(top: &TopMove) -> Self {
        Self {
            mv: top.san.clone(),
            evaluation: top.evaluation.to_string(),
            line: top.line.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub game_info: GameInfo,
    pub moves: Vec<MoveReport>,
    pub errors: Vec<String>,
    pub summary: GameSummary,
}

impl From<&MoveAnalysis> for MoveReport {
    fn from(m: &MoveAnalysis) -> Self {
        Self {
            move_number: m.move_number,
            ply: m.ply,
            mv: m.san.clone(),
            player: if m.is_white() { "White" } else { "Black" },
            is_white: m.is_white(),
            quality: m.quality,
            evaluation: m
                .eval_after
                .map(|e| e.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            notation: m.notation.clone(),
            best_move: m.best_move.clone(),
            best_evaluation: m.best_evaluation.map(|e| e.to_string()),
            top_moves: m.top_moves.iter().map(TopMoveReport::from).collect(),
            explanation: m.explanation.clone(),
            uci: m.uci.clone(),
            eval_before: m.eval_before.map(|e| e.value()),
            eval_after: m.eval_after.map(|e| e.value()),
            delta: m.delta,
            principal_variation: m.principal_variation.clone(),
            error: m.error.clone(),
        }
    }
}

impl From<&GameAnalysis> for AnalysisReport {
    fn from(analysis: &GameAnalysis) -> Self {
        let info = &analysis.info;
        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
        Self {
            game_info: GameInfo {
                white: info.white.clone(),
                black: info.black.clone(),
                event: or_unknown(&info.event),
                date: or_unknown(&info.date),
                result: info.result.clone(),
            },
            moves: analysis.moves.iter().map(MoveReport::from).collect(),
            errors: analysis.errors.clone(),
            summary: analysis.summary.clone(),
        }
    }
}

/// Annotated transcript: one line per completed move pair, details under
/// every move that was not good, and a closing summary.
pub fn format_transcript(analysis: &GameAnalysis) -> String {
    let mut out = String::new();
    let info = &analysis.info;
    let _ = writeln!(out, "Analyzing game: {} vs {}", info.white, info.black);
    let _ = writeln!(out, "Event: {}", info.event.as_deref().unwrap_or("Unknown"));
    let _ = writeln!(out, "Date: {}", info.date.as_deref().unwrap_or("Unknown"));
    let _ = writeln!(out, "{}", "-".repeat(60));

    let last = analysis.moves.len().saturating_sub(1);
    for (i, m) in analysis.moves.iter().enumerate() {
        let good = m.quality.is_good();
        if !m.is_white() || !good || i == last {
            let _ = writeln!(out, "{}", m.notation);
        }
        if good {
            continue;
        }

        let player = if m.is_white() { "White" } else { "Black" };
        if let Some(error) = &m.error {
            let _ = writeln!(out, "  ! {player}'s move {}: {error}", m.san);
            let _ = writeln!(out);
            continue;
        }
        let evaluation = m.eval_after.map(|e| e.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "  {player}'s move: {} ({}, eval: {evaluation})",
            m.san, m.quality
        );
        if let Some(best) = &m.best_move {
            let _ = writeln!(out, "  Better move: {best}");
        }
        if m.top_moves.len() > 1 {
            let choices: Vec<String> = m
                .top_moves
                .iter()
                .map(|top| format!("{} ({})", top.san, top.evaluation))
                .collect();
            let _ = writeln!(out, "  Top choices: {}", choices.join(", "));
        }
        if let Some(why) = &m.explanation {
            let _ = writeln!(out, "  Why: {why}");
        }
        if let Some(line) = &m.principal_variation {
            let _ = writeln!(out, "  Expected line: {line}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{}", "-".repeat(60));
    for (name, s) in [("White", &analysis.summary.white), ("Black", &analysis.summary.black)] {
        let _ = writeln!(
            out,
            "{name}: accuracy {:.1}%, avg loss {:.1} cp, {} inaccuracies, {} mistakes, {} blunders",
            s.accuracy, s.average_cp_loss, s.inaccuracies, s.mistakes, s.blunders
        );
    }
    if !analysis.errors.is_empty() {
        let _ = writeln!(out, "{} move(s) could not be analyzed", analysis.errors.len());
    }
    out
}
