//! Engine scores on one absolute, White-positive scale.
//!
//! Centipawns are clamped to ±`MAX_CP`; a mate in N for White becomes
//! `MATE_SCORE - N` (and the mirror for Black), so every mate outranks every
//! finite score and shorter mates outrank longer ones.

use std::fmt;
use std::ops::Sub;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::evaluator::{EngineScore, EvaluationResult};

pub const MATE_SCORE: i32 = 100_000;
pub const MAX_CP: i32 = 99_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedScore(pub i32);

impl NormalizedScore {
    pub const EVEN: NormalizedScore = NormalizedScore(0);

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_mate(self) -> bool {
        self.0.abs() > MAX_CP
    }

    /// Moves to mate, positive when White mates. `Some(0)` is a finished mate.
    pub fn mate_distance(self) -> Option<i32> {
        if !self.is_mate() {
            return None;
        }
        let distance = MATE_SCORE - self.0.abs();
        Some(if self.0 > 0 { distance } else { -distance })
    }

    /// Score for a position where `side_to_move` is checkmated.
    pub fn mated(side_to_move: Color) -> Self {
        normalize_score(EngineScore::Mate(0), side_to_move)
    }
}

impl Sub for NormalizedScore {
    type Output = i32;

    fn sub(self, rhs: Self) -> i32 {
        self.0 - rhs.0
    }
}

/// `+0.35`, `-1.20`, `#4`, `#-3`, or `checkmate`.
impl fmt::Display for NormalizedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_distance() {
            Some(0) => f.write_str("checkmate"),
            Some(n) => write!(f, "#{n}"),
            None => write!(f, "{:+.2}", f64::from(self.0) / 100.0),
        }
    }
}

/// Convert an engine result to the White-positive scale.
pub fn normalize(result: &EvaluationResult, side_to_move: Color) -> NormalizedScore {
    normalize_score(result.score, side_to_move)
}

/// Convert a side-to-move relative score to the White-positive scale.
pub fn normalize_score(score: EngineScore, side_to_move: Color) -> NormalizedScore {
    let relative = match score {
        EngineScore::Cp(cp) => cp.clamp(-MAX_CP, MAX_CP),
        EngineScore::Mate(n) if n > 0 => MATE_SCORE - n,
        EngineScore::Mate(n) if n < 0 => -MATE_SCORE - n,
        // Side to move is already mated
        EngineScore::Mate(_) => -MATE_SCORE,
    };
    match side_to_move {
        Color::White => NormalizedScore(relative),
        Color::Black => NormalizedScore(-relative),
    }
}
