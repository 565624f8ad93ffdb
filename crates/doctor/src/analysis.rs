/// Move classification and player statistics: pure functions only
/// (No Engine/Game dependencies)

use std::fmt;

use serde::{Serialize, Serializer};
use shakmaty::Color;

use crate::normalize::NormalizedScore;

/// Default tier boundaries (mover-perspective delta, centipawns)
pub const THRESHOLD_BLUNDER: i32 = -300;
pub const THRESHOLD_MISTAKE: i32 = -100;
pub const THRESHOLD_INACCURACY: i32 = -50;

/// Maximum CP loss a single move contributes to the average
const MAX_CP_LOSS: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub blunder: i32,
    pub mistake: i32,
    pub inaccuracy: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            blunder: THRESHOLD_BLUNDER,
            mistake: THRESHOLD_MISTAKE,
            inaccuracy: THRESHOLD_INACCURACY,
        }
    }
}

impl Thresholds {
    /// Boundaries must be non-positive and strictly ordered.
    pub fn is_ordered(&self) -> bool {
        self.blunder < self.mistake && self.mistake < self.inaccuracy && self.inaccuracy <= 0
    }
}

/// Severity of a legal move, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl QualityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Good => "good move",
            QualityTier::Inaccuracy => "inaccuracy",
            QualityTier::Mistake => "mistake",
            QualityTier::Blunder => "blunder",
        }
    }
}

/// A tier for a move that was played, or `Error` for one that could not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveQuality {
    Rated(QualityTier),
    Error,
}

impl MoveQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveQuality::Rated(tier) => tier.as_str(),
            MoveQuality::Error => "error",
        }
    }

    pub fn is_good(self) -> bool {
        self == MoveQuality::Rated(QualityTier::Good)
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MoveQuality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Evaluation change from the mover's point of view; negative is bad for the mover.
pub fn mover_delta(before: NormalizedScore, after: NormalizedScore, mover: Color) -> i32 {
    match mover {
        Color::White => after - before,
        Color::Black => before - after,
    }
}

pub fn classify(delta: i32, thresholds: &Thresholds) -> QualityTier {
    if delta <= thresholds.blunder {
        QualityTier::Blunder
    } else if delta <= thresholds.mistake {
        QualityTier::Mistake
    } else if delta <= thresholds.inaccuracy {
        QualityTier::Inaccuracy
    } else {
        QualityTier::Good
    }
}

/// Centipawns given up by a move, capped so one lost mate doesn't swamp the average.
pub fn calculate_cp_loss(delta: i32) -> i32 {
    (-delta).clamp(0, MAX_CP_LOSS)
}

pub fn calculate_accuracy(total_cp_loss: i32, move_count: u32) -> f64 {
    if move_count == 0 {
        return 100.0;
    }
    let acpl = total_cp_loss as f64 / move_count as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    accuracy.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub moves: u32,
    pub good: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    pub errors: u32,
    pub average_cp_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameSummary {
    pub white: PlayerSummary,
    pub black: PlayerSummary,
}

/// Accumulates per-player counts as moves are classified.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    white: (PlayerSummary, i32),
    black: (PlayerSummary, i32),
}

impl SummaryBuilder {
    pub fn record(&mut self, mover: Color, quality: MoveQuality, delta: Option<i32>) {
        let (summary, total_loss) = match mover {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        match quality {
            MoveQuality::Error => {
                summary.errors += 1;
                return;
            }
            MoveQuality::Rated(QualityTier::Good) => summary.good += 1,
            MoveQuality::Rated(QualityTier::Inaccuracy) => summary.inaccuracies += 1,
            MoveQuality::Rated(QualityTier::Mistake) => summary.mistakes += 1,
            MoveQuality::Rated(QualityTier::Blunder) => summary.blunders += 1,
        }
        summary.moves += 1;
        *total_loss += delta.map(calculate_cp_loss).unwrap_or(0);
    }

    pub fn finish(self) -> GameSummary {
        GameSummary {
            white: finish_player(self.white),
            black: finish_player(self.black),
        }
    }
}

fn finish_player((mut summary, total_loss): (PlayerSummary, i32)) -> PlayerSummary {
    if summary.moves > 0 {
        let acpl = total_loss as f64 / summary.moves as f64;
        summary.average_cp_loss = (acpl * 10.0).round() / 10.0;
    }
    let accuracy = calculate_accuracy(total_loss, summary.moves);
    summary.accuracy = (accuracy * 10.0).round() / 10.0;
    summary
}
