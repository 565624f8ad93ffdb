//! The seam between the classifier and whatever produces evaluations.

use std::future::Future;
use std::time::Duration;

use shakmaty::Color;

use crate::error::EngineError;

/// How long the engine may search one position. At least one limit is set;
/// with both set the engine stops at whichever it reaches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    pub depth: Option<u32>,
    pub movetime: Option<Duration>,
    /// Number of ranked lines to report (UCI `MultiPV`)
    pub multipv: u32,
}

impl SearchBudget {
    pub fn new(depth: Option<u32>, movetime: Option<Duration>) -> Self {
        Self {
            depth,
            movetime,
            multipv: 1,
        }
    }

    pub fn with_multipv(mut self, lines: u32) -> Self {
        self.multipv = lines.max(1);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.depth.is_some() || self.movetime.is_some()
    }

    /// UCI `go` command for this budget.
    pub fn go_command(&self) -> String {
        let mut cmd = String::from("go");
        if let Some(depth) = self.depth {
            cmd.push_str(&format!(" depth {depth}"));
        }
        if let Some(movetime) = self.movetime {
            cmd.push_str(&format!(" movetime {}", movetime.as_millis()));
        }
        cmd
    }
}

/// Raw engine score, relative to `EvaluationResult::pov`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineScore {
    Cp(i32),
    /// Mate in N moves; negative when the pov side is getting mated
    Mate(i32),
}

/// One ranked line of a multi-line search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvLine {
    /// Relative to the side to move, like `EvaluationResult::score`
    pub score: EngineScore,
    pub pv: Vec<String>,
}

impl PvLine {
    pub fn first_move(&self) -> Option<&str> {
        self.pv.first().map(String::as_str)
    }
}

/// Output of one engine query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub score: EngineScore,
    /// Side the score is computed for (side to move in the queried position)
    pub pov: Color,
    /// Top move in UCI notation; `None` when the engine reports `(none)`
    pub best_move: Option<String>,
    pub pv: Vec<String>,
    pub depth: u32,
    /// Ranked lines, best first, at most `SearchBudget::multipv` of them.
    /// The first one is the primary line above.
    pub lines: Vec<PvLine>,
}

/// Anything that can evaluate a FEN within a budget.
pub trait Evaluator: Sync {
    fn evaluate(
        &self,
        fen: &str,
        budget: &SearchBudget,
    ) -> impl Future<Output = Result<EvaluationResult, EngineError>> + Send;

    /// Called once before each analysed game.
    fn new_game(&self) -> impl Future<Output = Result<(), EngineError>> + Send {
        async { Ok(()) }
    }
}

/// Side to move from the second FEN field.
pub fn fen_side_to_move(fen: &str) -> Color {
    match fen.split_whitespace().nth(1) {
        Some("b") => Color::Black,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_command() {
        let both = SearchBudget::new(Some(18), Some(Duration::from_millis(500)));
        assert_eq!(both.go_command(), "go depth 18 movetime 500");
        let depth_only = SearchBudget::new(Some(22), None);
        assert_eq!(depth_only.go_command(), "go depth 22");
        assert!(!SearchBudget::new(None, None).is_bounded());
        // MultiPV is an engine option, not part of `go`
        assert_eq!(depth_only.with_multipv(3).go_command(), "go depth 22");
        assert_eq!(depth_only.with_multipv(0).multipv, 1);
    }

    #[test]
    fn test_fen_side_to_move() {
        assert_eq!(
            fen_side_to_move("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"),
            Color::Black
        );
        assert_eq!(fen_side_to_move("8/8/8/8/8/8/8/K6k w - - 0 1"), Color::White);
    }
}
