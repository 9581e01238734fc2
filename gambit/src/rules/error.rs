use thiserror::Error;

use super::types::Move;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 6 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid piece placement `{0}`")]
    InvalidPlacement(String),
    #[error("invalid side to move `{0}`")]
    InvalidSideToMove(String),
    #[error("invalid castling rights `{0}`")]
    InvalidCastling(String),
    #[error("invalid en passant square `{0}`")]
    InvalidEnPassant(String),
    #[error("invalid move counter `{0}`")]
    InvalidCounter(String),
    #[error("position must have exactly one king per side")]
    InvalidKings,
    #[error("pawns cannot stand on the first or last rank")]
    PawnOnBackRank,
    #[error("the side not to move is in check")]
    OpponentInCheck
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal move {mv}")]
pub struct IllegalMove {
    pub mv: Move
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("empty move notation")]
    Empty,
    #[error("malformed move notation `{0}`")]
    Malformed(String),
    #[error("`{0}` is not a legal move in this position")]
    NoSuchMove(String),
    #[error("`{0}` is ambiguous in this position")]
    Ambiguous(String)
}
