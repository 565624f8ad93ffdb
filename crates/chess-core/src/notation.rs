//! Move-number notation for transcripts and engine lines.

use shakmaty::{Chess, Color, Position};

use crate::board;

/// `"12. Nf3 Nc6"`, `"12. Nf3"` or `"12... Nc6"`.
pub fn move_pair(move_number: u32, white: Option<&str>, black: Option<&str>) -> String {
    match (white, black) {
        (Some(w), Some(b)) => format!("{move_number}. {w} {b}"),
        (Some(w), None) => format!("{move_number}. {w}"),
        (None, Some(b)) => format!("{move_number}... {b}"),
        (None, None) => format!("{move_number}."),
    }
}

/// Convert a UCI principal variation into numbered SAN, e.g.
/// `"12. Nf3 Nc6 13. Bb5"`. At most `max_moves` plies are rendered; the line
/// stops early at the first move that is not legal in sequence.
pub fn format_line(pos: &Chess, uci_moves: &[String], max_moves: usize) -> String {
    let mut pos = pos.clone();
    let mut parts: Vec<String> = Vec::new();

    for (i, uci) in uci_moves.iter().take(max_moves).enumerate() {
        let number = pos.fullmoves().get();
        let turn = pos.turn();
        let Ok(played) = board::play_uci(&mut pos, uci) else {
            break;
        };
        match turn {
            Color::White => parts.push(format!("{number}. {}", played.san)),
            Color::Black if i == 0 => parts.push(format!("{number}... {}", played.san)),
            Color::Black => parts.push(played.san),
        }
    }

    parts.join(" ")
}
