/// Board heuristics used to explain why one move beats another

use shakmaty::{Bitboard, Chess, Color, Position, Role, Square};

// Piece values for material calculation
pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;

const CENTER: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

/// Piece value (no king)
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// Squares of `color`'s pieces that attack `square`
fn attackers(pos: &Chess, square: Square, color: Color) -> Bitboard {
    let board = pos.board();
    board.attacks_to(square, color, board.occupied())
}

/// A piece is hanging when the opponent attacks it and it is either
/// undefended or attacked by something cheaper.
pub fn is_hanging(pos: &Chess, square: Square) -> bool {
    let Some(piece) = pos.board().piece_at(square) else {
        return false;
    };
    if piece.role == Role::King {
        return false;
    }
    let enemy = attackers(pos, square, !piece.color);
    if enemy.is_empty() {
        return false;
    }
    if attackers(pos, square, piece.color).is_empty() {
        return true;
    }
    let value = piece_value(piece.role);
    enemy
        .into_iter()
        .filter_map(|sq| pos.board().role_at(sq))
        .any(|role| role != Role::King && piece_value(role) < value)
}

/// Hanging pieces of `color`, most valuable first.
pub fn hanging_pieces(pos: &Chess, color: Color) -> Vec<(Square, Role)> {
    let board = pos.board();
    let mut hanging: Vec<(Square, Role)> = board
        .by_color(color)
        .into_iter()
        .filter(|&sq| is_hanging(pos, sq))
        .filter_map(|sq| board.role_at(sq).map(|role| (sq, role)))
        .collect();
    hanging.sort_by_key(|&(sq, role)| (-piece_value(role), sq));
    hanging
}

/// Center squares (d4, e4, d5, e5) occupied or attacked by `color`.
pub fn center_control(pos: &Chess, color: Color) -> usize {
    let ours = pos.board().by_color(color);
    CENTER
        .iter()
        .filter(|&&sq| ours.contains(sq) || !attackers(pos, sq, color).is_empty())
        .count()
}

/// Own pawns on the three files around the king, one or two ranks in front.
pub fn pawn_shield(pos: &Chess, color: Color) -> usize {
    let board = pos.board();
    let Some(king) = board.king_of(color) else {
        return 0;
    };
    let pawns = board.by_color(color) & board.by_role(Role::Pawn);
    let forward = match color {
        Color::White => 1,
        Color::Black => -1,
    };

    let mut count = 0;
    for df in -1..=1 {
        for step in 1..=2 {
            let (Some(file), Some(rank)) = (king.file().offset(df), king.rank().offset(forward * step))
            else {
                continue;
            };
            if pawns.contains(Square::from_coords(file, rank)) {
                count += 1;
            }
        }
    }
    count
}

/// Knights and bishops that have left their starting squares.
pub fn developed_minors(pos: &Chess, color: Color) -> usize {
    let board = pos.board();
    let minors = board.by_color(color) & (board.by_role(Role::Knight) | board.by_role(Role::Bishop));
    let home = match color {
        Color::White => [Square::B1, Square::C1, Square::F1, Square::G1],
        Color::Black => [Square::B8, Square::C8, Square::F8, Square::G8],
    };
    minors.into_iter().filter(|sq| !home.contains(sq)).count()
}
