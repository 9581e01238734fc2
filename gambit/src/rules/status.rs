use std::fmt;

use serde::{Deserialize, Serialize};

use super::movegen::has_legal_moves;
use super::position::Position;
use super::types::*;

/// Plies without a capture or pawn move after which the game is drawn.
pub const FIFTY_MOVE_PLIES: u32 = 100;
/// Occurrences of the same position after which the game is drawn.
pub const REPETITION_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    FiftyMove,
    InsufficientMaterial,
    Repetition,
    Agreement
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    /// The color to move is in check.
    Check(Color),
    /// Carries the winner.
    Checkmate(Color),
    Stalemate,
    Draw(DrawReason)
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Checkmate(_) | GameStatus::Stalemate | GameStatus::Draw(_))
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameStatus::Checkmate(winner) => Some(winner),
            _ => None
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => f.write_str("in progress"),
            GameStatus::Check(color) => write!(f, "{} is in check", color),
            GameStatus::Checkmate(winner) => write!(f, "checkmate, {} wins", winner),
            GameStatus::Stalemate => f.write_str("stalemate"),
            GameStatus::Draw(DrawReason::FiftyMove) => f.write_str("draw by the fifty-move rule"),
            GameStatus::Draw(DrawReason::InsufficientMaterial) => f.write_str("draw by insufficient material"),
            GameStatus::Draw(DrawReason::Repetition) => f.write_str("draw by threefold repetition"),
            GameStatus::Draw(DrawReason::Agreement) => f.write_str("draw by agreement")
        }
    }
}

/// Neither side can possibly deliver mate: bare kings, a single minor
/// piece, or only bishops that all stand on one square color.
pub fn is_insufficient_material(position: &Position) -> bool {
    let mut minors = 0;
    let mut knights = 0;
    let mut bishop_squares = Vec::new();
    for (square, piece) in position.pieces() {
        match piece.kind {
            PieceKind::King => {}
            PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen => return false,
            PieceKind::Knight => {
                minors += 1;
                knights += 1;
            }
            PieceKind::Bishop => {
                minors += 1;
                bishop_squares.push(square.is_light());
            }
        }
    }
    if minors <= 1 {
        return true;
    }
    knights == 0 && bishop_squares.windows(2).all(|w| w[0] == w[1])
}

/// Classifies a position seen for the first time.
pub fn classify(position: &Position) -> GameStatus {
    classify_with_repetitions(position, 1)
}

/// Classifies a position that has occurred `occurrences` times in its game,
/// this occurrence included.
pub fn classify_with_repetitions(position: &Position, occurrences: usize) -> GameStatus {
    let side = position.side_to_move();
    let in_check = position.is_check();
    if !has_legal_moves(position) {
        return if in_check {
            GameStatus::Checkmate(!side)
        } else {
            GameStatus::Stalemate
        };
    }
    if is_insufficient_material(position) {
        return GameStatus::Draw(DrawReason::InsufficientMaterial);
    }
    if occurrences >= REPETITION_LIMIT {
        return GameStatus::Draw(DrawReason::Repetition);
    }
    if position.halfmove_clock() >= FIFTY_MOVE_PLIES {
        return GameStatus::Draw(DrawReason::FiftyMove);
    }
    if in_check {
        GameStatus::Check(side)
    } else {
        GameStatus::InProgress
    }
}
