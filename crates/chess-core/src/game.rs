//! Game replay: turn parsed PGN data into an ordered list of plies with the
//! position before and after each one.

use shakmaty::{Chess, Color, Position};

use crate::board::{self, IllegalMoveError, PlayedMove};
use crate::game_data::{GameData, GameMetadata};
use crate::pgn::{self, PgnError};

/// One half-move of the game.
#[derive(Debug, Clone)]
pub struct Ply {
    /// 1-based ply index
    pub index: usize,
    pub move_number: u32,
    pub color: Color,
    /// Move text as written in the PGN
    pub text: String,
    pub before: Chess,
    /// Position after the move. For an illegal ply this is `before` with the
    /// turn passed, or `before` itself when the side to move is in check.
    pub after: Chess,
    pub played: Result<PlayedMove, IllegalMoveError>,
}

impl Ply {
    pub fn is_white(&self) -> bool {
        self.color == Color::White
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub info: GameMetadata,
    pub plies: Vec<Ply>,
}

impl Game {
    /// Parse PGN text and replay it.
    pub fn parse(pgn_text: &str) -> Result<Self, PgnError> {
        let data = pgn::parse_pgn(pgn_text)?;
        Self::from_game_data(&data)
    }

    /// Replay parsed movetext from the starting position (or the `FEN` header).
    /// Moves that cannot be applied become error plies and replay continues.
    pub fn from_game_data(data: &GameData) -> Result<Self, PgnError> {
        let start = match &data.metadata.fen {
            Some(fen) => board::position_from_fen(fen)
                .ok_or_else(|| PgnError::InvalidFen(fen.clone()))?,
            None => Chess::default(),
        };

        let first_number = start.fullmoves().get();
        let black_first = start.turn() == Color::Black;

        let mut pos = start;
        let mut plies = Vec::with_capacity(data.moves.len());
        for (i, text) in data.moves.iter().enumerate() {
            let offset = i + usize::from(black_first);
            let before = pos.clone();
            let color = before.turn();
            let played = board::play_san(&mut pos, text);
            if played.is_err() {
                pos = board::pass_turn(&before);
            }
            plies.push(Ply {
                index: i + 1,
                move_number: first_number + (offset / 2) as u32,
                color,
                text: text.clone(),
                before,
                after: pos.clone(),
                played,
            });
        }

        Ok(Self {
            info: data.metadata.clone(),
            plies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_numbers_and_colors() {
        let game = Game::parse("1. e4 e5 2. Nf3 Nc6 *").unwrap();
        let summary: Vec<(usize, u32, bool)> = game
            .plies
            .iter()
            .map(|p| (p.index, p.move_number, p.is_white()))
            .collect();
        assert_eq!(
            summary,
            vec![(1, 1, true), (2, 1, false), (3, 2, true), (4, 2, false)]
        );
        assert_eq!(game.plies[2].played.as_ref().unwrap().uci, "g1f3");
    }

    #[test]
    fn test_illegal_move_passes_turn() {
        let game = Game::parse("1. e4 e5 2. Nf3 Xq7 3. Bc4 Nf6 *").unwrap();
        assert_eq!(game.plies.len(), 6);
        assert!(game.plies[3].played.is_err());
        // Black's turn was passed, so White's Bc4 still applies
        assert!(game.plies[4].played.is_ok());
        assert!(game.plies[4].is_white());
        assert!(game.plies[5].played.is_ok());
        assert_eq!(game.plies[5].move_number, 3);
    }

    #[test]
    fn test_fen_start_with_black_to_move() {
        let pgn = "[FEN \"4k3/8/8/8/8/8/4P3/4K3 b - - 0 10\"]\n\n10... Kd7 11. e4 *";
        let game = Game::parse(pgn).unwrap();
        assert_eq!(game.plies[0].move_number, 10);
        assert!(!game.plies[0].is_white());
        assert_eq!(game.plies[1].move_number, 11);
        assert!(game.plies[1].is_white());
    }

    #[test]
    fn test_invalid_fen_header() {
        let err = Game::parse("[FEN \"garbage\"]\n\n1. e4 *").unwrap_err();
        assert_eq!(err, PgnError::InvalidFen("garbage".to_string()));
    }
}
