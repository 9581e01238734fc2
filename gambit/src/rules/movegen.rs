use super::error::IllegalMove;
use super::position::Position;
use super::types::*;

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2),
    (-1, -2), (-2, -1), (-2, 1), (-1, 2)
];
const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1), (1, 1), (1, 0), (1, -1),
    (0, -1), (-1, -1), (-1, 0), (-1, 1)
];
const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Whether any piece of color `by` attacks `square`.
pub fn is_square_attacked(position: &Position, square: Square, by: Color) -> bool {
    let attacker = |sq: Option<Square>, kinds: &[PieceKind]| {
        sq.and_then(|sq| position.piece_on(sq))
            .map_or(false, |p| p.color == by && kinds.contains(&p.kind))
    };

    // A pawn of color `by` attacks from one rank behind, relative to its direction.
    let pawn_rank = -by.forward();
    if attacker(square.offset(-1, pawn_rank), &[PieceKind::Pawn])
        || attacker(square.offset(1, pawn_rank), &[PieceKind::Pawn])
    {
        return true;
    }
    if KNIGHT_OFFSETS.iter().any(|&(df, dr)| attacker(square.offset(df, dr), &[PieceKind::Knight])) {
        return true;
    }
    if KING_OFFSETS.iter().any(|&(df, dr)| attacker(square.offset(df, dr), &[PieceKind::King])) {
        return true;
    }

    let first_piece = |df: i8, dr: i8| {
        let mut current = square;
        while let Some(next) = current.offset(df, dr) {
            if position.piece_on(next).is_some() {
                return Some(next);
            }
            current = next;
        }
        None
    };
    ROOK_DIRECTIONS.iter().any(|&(df, dr)| {
        attacker(first_piece(df, dr), &[PieceKind::Rook, PieceKind::Queen])
    }) || BISHOP_DIRECTIONS.iter().any(|&(df, dr)| {
        attacker(first_piece(df, dr), &[PieceKind::Bishop, PieceKind::Queen])
    })
}

fn push_pawn_move(moves: &mut Vec<Move>, from: Square, to: Square, flags: MoveFlags) {
    if to.rank() == 0 || to.rank() == 7 {
        for kind in PieceKind::PROMOTIONS {
            moves.push(Move { from, to, promotion: Some(kind), flags });
        }
    } else {
        moves.push(Move { from, to, promotion: None, flags });
    }
}

fn pawn_moves(position: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    let forward = color.forward();
    if let Some(one) = from.offset(0, forward) {
        if position.piece_on(one).is_none() {
            push_pawn_move(moves, from, one, MoveFlags::NONE);
            let start_rank = match color {
                Color::White => 1,
                Color::Black => 6
            };
            if from.rank() == start_rank {
                if let Some(two) = one.offset(0, forward).filter(|sq| position.piece_on(*sq).is_none()) {
                    moves.push(Move { from, to: two, promotion: None, flags: MoveFlags::DOUBLE_PUSH });
                }
            }
        }
    }
    for df in [-1, 1] {
        let Some(to) = from.offset(df, forward) else {
            continue;
        };
        match position.piece_on(to) {
            Some(target) if target.color != color => {
                push_pawn_move(moves, from, to, MoveFlags::CAPTURE);
            }
            None if position.en_passant() == Some(to) => {
                moves.push(Move {
                    from,
                    to,
                    promotion: None,
                    flags: MoveFlags::CAPTURE | MoveFlags::EN_PASSANT
                });
            }
            _ => {}
        }
    }
}

fn step_moves(position: &Position, from: Square, color: Color, offsets: &[(i8, i8)], moves: &mut Vec<Move>) {
    for &(df, dr) in offsets {
        let Some(to) = from.offset(df, dr) else {
            continue;
        };
        match position.piece_on(to) {
            None => moves.push(Move { from, to, promotion: None, flags: MoveFlags::NONE }),
            Some(target) if target.color != color => {
                moves.push(Move { from, to, promotion: None, flags: MoveFlags::CAPTURE });
            }
            _ => {}
        }
    }
}

fn slider_moves(position: &Position, from: Square, color: Color, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
    for &(df, dr) in directions {
        let mut current = from;
        while let Some(to) = current.offset(df, dr) {
            match position.piece_on(to) {
                None => moves.push(Move { from, to, promotion: None, flags: MoveFlags::NONE }),
                Some(target) => {
                    if target.color != color {
                        moves.push(Move { from, to, promotion: None, flags: MoveFlags::CAPTURE });
                    }
                    break;
                }
            }
            current = to;
        }
    }
}

fn castling_moves(position: &Position, color: Color, moves: &mut Vec<Move>) {
    let rank = color.back_rank();
    let king_from = Square::new(4, rank);
    if position.piece_on(king_from) != Some(Piece::new(PieceKind::King, color))
        || is_square_attacked(position, king_from, !color)
    {
        return;
    }
    for side in CastleSide::ALL {
        if !position.castling_rights().has(color, side) {
            continue;
        }
        let rook_file = side.rook_file();
        if position.piece_on(Square::new(rook_file, rank)) != Some(Piece::new(PieceKind::Rook, color)) {
            continue;
        }
        let (low, high) = if rook_file < 4 { (rook_file + 1, 4) } else { (5, rook_file) };
        let path_clear = (low..high).all(|file| position.piece_on(Square::new(file, rank)).is_none());
        if !path_clear {
            continue;
        }
        // The king may not cross or land on an attacked square.
        let king_to = Square::new(side.king_target_file(), rank);
        let crossing = Square::new(side.rook_target_file(), rank);
        if is_square_attacked(position, crossing, !color) || is_square_attacked(position, king_to, !color) {
            continue;
        }
        let flags = match side {
            CastleSide::King => MoveFlags::CASTLE_KINGSIDE,
            CastleSide::Queen => MoveFlags::CASTLE_QUEENSIDE
        };
        moves.push(Move { from: king_from, to: king_to, promotion: None, flags });
    }
}

/// Moves that follow piece movement rules but may leave the mover in check.
pub fn pseudo_legal_moves(position: &Position) -> Vec<Move> {
    let color = position.side_to_move();
    let mut moves = Vec::with_capacity(64);
    for (from, piece) in position.pieces().filter(|(_, p)| p.color == color) {
        match piece.kind {
            PieceKind::Pawn => pawn_moves(position, from, color, &mut moves),
            PieceKind::Knight => step_moves(position, from, color, &KNIGHT_OFFSETS, &mut moves),
            PieceKind::Bishop => slider_moves(position, from, color, &BISHOP_DIRECTIONS, &mut moves),
            PieceKind::Rook => slider_moves(position, from, color, &ROOK_DIRECTIONS, &mut moves),
            PieceKind::Queen => {
                slider_moves(position, from, color, &ROOK_DIRECTIONS, &mut moves);
                slider_moves(position, from, color, &BISHOP_DIRECTIONS, &mut moves);
            }
            PieceKind::King => {
                step_moves(position, from, color, &KING_OFFSETS, &mut moves);
                castling_moves(position, color, &mut moves);
            }
        }
    }
    moves
}

/// All legal moves for the side to move, in a deterministic order
/// (by origin square, then generation order per piece).
pub fn legal_moves(position: &Position) -> Vec<Move> {
    let color = position.side_to_move();
    pseudo_legal_moves(position)
        .into_iter()
        .filter(|&mv| !position.play_unchecked(mv).is_in_check(color))
        .collect()
}

pub fn has_legal_moves(position: &Position) -> bool {
    let color = position.side_to_move();
    pseudo_legal_moves(position)
        .into_iter()
        .any(|mv| !position.play_unchecked(mv).is_in_check(color))
}

pub fn is_legal(position: &Position, mv: Move) -> bool {
    legal_moves(position).contains(&mv)
}

/// Plays `mv`, which must be one of [`legal_moves`] exactly (flags included).
pub fn apply_move(position: &Position, mv: Move) -> Result<Position, IllegalMove> {
    if !is_legal(position, mv) {
        return Err(IllegalMove { mv });
    }
    Ok(position.play_unchecked(mv))
}

/// Counts leaf nodes of the legal move tree to `depth`.
pub fn perft(position: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(position);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .into_iter()
        .map(|mv| perft(&position.play_unchecked(mv), depth - 1))
        .sum()
}
