pub mod board;
pub mod game;
pub mod game_data;
pub mod notation;
pub mod pgn;

pub use board::{IllegalMoveError, IllegalReason, PlayedMove};
pub use game::{Game, Ply};
pub use game_data::{GameData, GameMetadata};
pub use pgn::{parse_pgn, PgnError};
