use std::cmp::Reverse;

use crate::rules::*;

/// Move classes, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Mate,
    Winning,
    Castle,
    Quiet,
    Unsafe
}

fn material_gain(position: &Position, mv: Move) -> i16 {
    let victim = if mv.is_en_passant() {
        PieceKind::Pawn.value()
    } else {
        position.piece_on(mv.to).map_or(0, |p| p.kind.value())
    };
    let promotion = mv.promotion.map_or(0, |kind| kind.value() - PieceKind::Pawn.value());
    victim + promotion
}

fn rank(position: &Position, mv: Move) -> (Tier, Reverse<i16>) {
    let next = position.play_unchecked(mv);
    if next.is_check() && !has_legal_moves(&next) {
        return (Tier::Mate, Reverse(0));
    }
    let mover = position.piece_on(mv.from).map_or(PieceKind::Pawn, |p| p.kind);
    let gain = material_gain(position, mv);
    let attacked = is_square_attacked(&next, mv.to, next.side_to_move());
    // Losing the mover is only a risk if it is worth more than what it took.
    let net = if attacked { gain - mover.value() } else { gain };
    if gain > 0 && net >= 0 {
        return (Tier::Winning, Reverse(gain));
    }
    if mv.castle_side().is_some() {
        return (Tier::Castle, Reverse(0));
    }
    if !attacked {
        return (Tier::Quiet, Reverse(gain));
    }
    (Tier::Unsafe, Reverse(net))
}

/// Picks a legal move with a fixed, cheap heuristic: mate in one, then
/// captures and promotions that do not lose material (largest gain first),
/// then castling, then moves to unattacked squares, then anything. Ties go
/// to the earliest move in [`legal_moves`] order, so the result depends on
/// the position alone.
///
/// Returns `None` only when there are no legal moves. When the side to move
/// is in check every legal move already escapes it.
pub fn fallback_move(position: &Position) -> Option<Move> {
    legal_moves(position)
        .into_iter()
        .enumerate()
        .min_by_key(|&(index, mv)| (rank(position, mv), index))
        .map(|(_, mv)| mv)
}
