use std::time::Duration;

use vampirc_uci::{UciFen, UciMessage, UciMove, UciPiece, UciSquare};

use crate::rules::{Move, PieceKind, Square};

use super::MoveRequest;

fn uci_square(square: Square) -> UciSquare {
    UciSquare {
        file: square.file_char(),
        rank: square.rank() + 1
    }
}

fn uci_piece(kind: PieceKind) -> UciPiece {
    match kind {
        PieceKind::Pawn => UciPiece::Pawn,
        PieceKind::Knight => UciPiece::Knight,
        PieceKind::Bishop => UciPiece::Bishop,
        PieceKind::Rook => UciPiece::Rook,
        PieceKind::Queen => UciPiece::Queen,
        PieceKind::King => UciPiece::King
    }
}

pub fn to_uci_move(mv: Move) -> UciMove {
    UciMove {
        from: uci_square(mv.from),
        to: uci_square(mv.to),
        promotion: mv.promotion.map(uci_piece)
    }
}

/// The request as a `position fen ... moves ...` command, so the engine sees
/// the game's history and not only the current board.
pub fn request_to_position_message(request: &MoveRequest) -> UciMessage {
    let fen = Some(UciFen(request.initial_position.to_string()));
    let moves = request.moves.iter().copied().map(to_uci_move).collect();
    UciMessage::Position { startpos: false, fen, moves }
}

pub fn movetime_to_go_message(movetime: Duration) -> UciMessage {
    let millis = i64::try_from(movetime.as_millis()).unwrap_or(i64::MAX);
    UciMessage::go_movetime(vampirc_uci::Duration::milliseconds(millis))
}
