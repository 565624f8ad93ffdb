//! Rules adapter over shakmaty.
//!
//! Everything that needs to turn move text into moves, advance a position or
//! render a FEN goes through here, so the rest of the workspace never touches
//! shakmaty's parsing types directly.

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position, Role};
use thiserror::Error;

/// A move that was successfully applied to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    pub mv: Move,
    /// SAN with check/mate suffix, as shakmaty renders it
    pub san: String,
    pub uci: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalReason {
    /// Text is not SAN/UCI at all
    Unparseable,
    /// Well-formed, but not legal in the position
    Illegal,
}

impl fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalReason::Unparseable => f.write_str("unparseable"),
            IllegalReason::Illegal => f.write_str("illegal"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} move '{text}'")]
pub struct IllegalMoveError {
    pub text: String,
    pub reason: IllegalReason,
}

impl IllegalMoveError {
    fn new(text: &str, reason: IllegalReason) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

/// Apply a SAN move in place. On error the position is left untouched.
pub fn play_san(pos: &mut Chess, text: &str) -> Result<PlayedMove, IllegalMoveError> {
    let san: SanPlus = text
        .parse()
        .map_err(|_| IllegalMoveError::new(text, IllegalReason::Unparseable))?;
    let mv = san
        .san
        .to_move(pos)
        .map_err(|_| IllegalMoveError::new(text, IllegalReason::Illegal))?;
    Ok(play(pos, &mv))
}

/// Apply a UCI move (`e2e4`, `e7e8q`) in place. On error the position is left untouched.
pub fn play_uci(pos: &mut Chess, text: &str) -> Result<PlayedMove, IllegalMoveError> {
    let mv = uci_to_move(pos, text)?;
    Ok(play(pos, &mv))
}

/// Resolve a UCI string to a legal move without playing it.
pub fn uci_to_move(pos: &Chess, text: &str) -> Result<Move, IllegalMoveError> {
    let uci: UciMove = text
        .parse()
        .map_err(|_| IllegalMoveError::new(text, IllegalReason::Unparseable))?;
    uci.to_move(pos)
        .map_err(|_| IllegalMoveError::new(text, IllegalReason::Illegal))
}

/// Play an already-legal move, recording its SAN and UCI forms.
pub fn play(pos: &mut Chess, mv: &Move) -> PlayedMove {
    let uci = mv.to_uci(CastlingMode::Standard).to_string();
    let san = SanPlus::from_move_and_play_unchecked(pos, mv.clone()).to_string();
    PlayedMove {
        mv: mv.clone(),
        san,
        uci,
    }
}

/// Position after `mv`, leaving `pos` untouched.
pub fn after(pos: &Chess, mv: &Move) -> Chess {
    let mut next = pos.clone();
    next.play_unchecked(mv.clone());
    next
}

/// Pass the turn (null move). A side in check cannot pass, so the position is
/// returned unchanged in that case.
pub fn pass_turn(pos: &Chess) -> Chess {
    pos.clone().swap_turn().unwrap_or_else(|_| pos.clone())
}

/// Render a position as FEN.
pub fn fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Parse a FEN into a standard chess position.
pub fn position_from_fen(fen: &str) -> Option<Chess> {
    let fen: Fen = fen.trim().parse().ok()?;
    fen.into_position(CastlingMode::Standard).ok()
}

/// Is the side to move out of legal moves (checkmate or stalemate)?
pub fn is_terminal(pos: &Chess) -> bool {
    pos.is_checkmate() || pos.is_stalemate()
}

/// Lowercase piece name for prose.
pub fn piece_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}
