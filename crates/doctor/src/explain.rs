//! Template explanations for non-good moves.
//!
//! Deterministic and engine-free: the played move and the engine's
//! suggestion are compared on the board, tactics first, then a handful of
//! positional rules from the mover's side.

use chess_core::board::{self, PlayedMove};
use shakmaty::{Chess, Move, Position};

use crate::board_utils::{center_control, developed_minors, hanging_pieces, pawn_shield};

/// Explain why `best` is preferable to the move that was played.
///
/// `before` is the position the move was played from; `delta` is the
/// mover-perspective evaluation change, used when there is no alternative.
pub fn explain(before: &Chess, played: &PlayedMove, best: Option<&Move>, delta: i32) -> String {
    let Some(best) = best.filter(|best| **best != played.mv) else {
        return format!(
            "{} gives up about {:.2} pawns of evaluation.",
            played.san,
            f64::from(delta.unsigned_abs()) / 100.0
        );
    };

    let mut scratch = before.clone();
    let best_san = board::play(&mut scratch, best).san;
    let after_best = scratch;
    let after_played = board::after(before, &played.mv);

    if let Some(clause) = tactical_clause(&played.mv, &after_played, best, &after_best) {
        return format!("{} {clause}. {best_san} would be better.", played.san);
    }

    let clauses = positional_clauses(before, &played.mv, &after_played, best, &after_best);
    if clauses.is_empty() {
        format!("{best_san} is better than {}.", played.san)
    } else {
        format!(
            "{best_san} is better than {} because it {}.",
            played.san,
            join_clauses(&clauses)
        )
    }
}

/// Centipawn gap under which an alternative counts as strong
const CLOSE_ALTERNATIVE_CP: i32 = 50;

/// Explain a move the engine still ranks among its top choices, `gap`
/// centipawns behind its first choice `best`.
pub fn explain_alternative(before: &Chess, played: &PlayedMove, best: &Move, gap: i32) -> String {
    let best_san = board::play(&mut before.clone(), best).san;
    let strengths = own_strengths(before, &played.mv);

    match (gap < CLOSE_ALTERNATIVE_CP, strengths.is_empty()) {
        (true, true) => format!(
            "{} is a strong alternative to the top engine choice ({best_san}).",
            played.san
        ),
        (true, false) => format!(
            "{} is a strong alternative to {best_san} and {}.",
            played.san,
            join_clauses(&strengths)
        ),
        (false, true) => format!(
            "{} is among the top choices, but {best_san} is stronger.",
            played.san
        ),
        (false, false) => format!(
            "{} is among the top choices and {}, but {best_san} is stronger.",
            played.san,
            join_clauses(&strengths)
        ),
    }
}

/// What a move achieves on its own, from the mover's side.
fn own_strengths(before: &Chess, mv: &Move) -> Vec<&'static str> {
    let mover = before.turn();
    let after = board::after(before, mv);
    let mut clauses = Vec::new();

    if mv.is_castle() {
        clauses.push("castles the king to safety");
    }
    if center_control(&after, mover) > center_control(before, mover) {
        clauses.push("fights for the center");
    }
    if developed_minors(&after, mover) > developed_minors(before, mover) {
        clauses.push("develops a minor piece");
    }
    clauses
}

fn tactical_clause(
    played: &Move,
    after_played: &Chess,
    best: &Move,
    after_best: &Chess,
) -> Option<String> {
    if after_best.is_checkmate() {
        return Some("missed a forced checkmate".to_string());
    }
    if after_best.is_check() && !after_played.is_check() {
        return Some("missed a check".to_string());
    }
    if let Some(captured) = best.capture() {
        if !played.is_capture() {
            return Some(format!(
                "missed the chance to win the {}",
                board::piece_name(captured)
            ));
        }
    }

    // After either move it is the opponent's turn; the mover is `!turn`
    let mover = !after_played.turn();
    let spared = hanging_pieces(after_best, mover);
    hanging_pieces(after_played, mover)
        .into_iter()
        .find(|hanging| !spared.contains(hanging))
        .map(|(square, role)| {
            format!(
                "allowed material loss: the {} on {square} is left hanging",
                board::piece_name(role)
            )
        })
}

fn positional_clauses(
    before: &Chess,
    played: &Move,
    after_played: &Chess,
    best: &Move,
    after_best: &Chess,
) -> Vec<&'static str> {
    let mover = before.turn();
    let mut clauses = Vec::new();

    if center_control(after_best, mover) > center_control(after_played, mover) {
        clauses.push("fights for the center");
    }
    if pawn_shield(after_best, mover) > pawn_shield(after_played, mover) {
        clauses.push("keeps the king's pawn shield intact");
    }
    if developed_minors(after_best, mover) > developed_minors(after_played, mover) {
        clauses.push("develops a minor piece");
    }
    if best.is_castle() && !played.is_castle() {
        clauses.push("castles the king to safety");
    }
    clauses
}

/// `a`, `a and b`, `a, b and c`
fn join_clauses(clauses: &[&str]) -> String {
    match clauses {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
