use std::fmt;
use std::str::FromStr;

use super::error::FenError;
use super::movegen::{is_square_attacked, legal_moves};
use super::types::*;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// An immutable chess position. All transitions produce a new value through
/// [`apply_move`](super::apply_move).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    board: [Option<Piece>; Square::NUM],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32
}

impl Default for Position {
    fn default() -> Self {
        let mut board = [None; Square::NUM];
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook
        ];
        for (file, kind) in back.into_iter().enumerate() {
            let file = file as u8;
            board[Square::new(file, 0).index()] = Some(Piece::new(kind, Color::White));
            board[Square::new(file, 1).index()] = Some(Piece::new(PieceKind::Pawn, Color::White));
            board[Square::new(file, 6).index()] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            board[Square::new(file, 7).index()] = Some(Piece::new(kind, Color::Black));
        }
        Self {
            board,
            side_to_move: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1
        }
    }
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::FieldCount(fields.len()));
        }

        let placement_error = || FenError::InvalidPlacement(fields[0].to_owned());
        let mut board = [None; Square::NUM];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(placement_error());
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(placement_error());
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_char(c).ok_or_else(placement_error)?;
                    if file >= 8 {
                        return Err(placement_error());
                    }
                    board[Square::new(file, rank).index()] = Some(piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(placement_error());
                }
            }
            if file != 8 {
                return Err(placement_error());
            }
        }

        let side_to_move = fields[1]
            .parse::<Color>()
            .ok()
            .filter(|_| fields[1].len() == 1)
            .ok_or_else(|| FenError::InvalidSideToMove(fields[1].to_owned()))?;

        let castling_error = || FenError::InvalidCastling(fields[2].to_owned());
        let mut castling = CastlingRights::NONE;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                let (color, side) = match c {
                    'K' => (Color::White, CastleSide::King),
                    'Q' => (Color::White, CastleSide::Queen),
                    'k' => (Color::Black, CastleSide::King),
                    'q' => (Color::Black, CastleSide::Queen),
                    _ => return Err(castling_error())
                };
                if castling.has(color, side) {
                    return Err(castling_error());
                }
                let back_rank = color.back_rank();
                let king = board[Square::new(4, back_rank).index()];
                let rook = board[Square::new(side.rook_file(), back_rank).index()];
                if king != Some(Piece::new(PieceKind::King, color))
                    || rook != Some(Piece::new(PieceKind::Rook, color))
                {
                    return Err(castling_error());
                }
                castling.insert(color, side);
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            s => {
                let square: Square = s
                    .parse()
                    .map_err(|_| FenError::InvalidEnPassant(s.to_owned()))?;
                let expected_rank = match side_to_move {
                    Color::White => 5,
                    Color::Black => 2
                };
                // The pawn that just double-pushed must be in front of the
                // square, with the square and its start square empty.
                let mover = !side_to_move;
                let pawn = square.offset(0, mover.forward());
                let origin = square.offset(0, -mover.forward());
                let consistent = square.rank() == expected_rank
                    && board[square.index()].is_none()
                    && pawn.map_or(false, |sq| board[sq.index()] == Some(Piece::new(PieceKind::Pawn, mover)))
                    && origin.map_or(false, |sq| board[sq.index()].is_none());
                if !consistent {
                    return Err(FenError::InvalidEnPassant(s.to_owned()));
                }
                Some(square)
            }
        };

        let halfmove_clock = fields[4]
            .parse()
            .map_err(|_| FenError::InvalidCounter(fields[4].to_owned()))?;
        let fullmove_number: u32 = fields[5]
            .parse()
            .map_err(|_| FenError::InvalidCounter(fields[5].to_owned()))?;
        if fullmove_number == 0 {
            return Err(FenError::InvalidCounter(fields[5].to_owned()));
        }

        let position = Self {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number
        };
        position.validate()?;
        Ok(position)
    }

    fn validate(&self) -> Result<(), FenError> {
        for color in Color::ALL {
            let kings = self.pieces()
                .filter(|(_, p)| *p == Piece::new(PieceKind::King, color))
                .count();
            if kings != 1 {
                return Err(FenError::InvalidKings);
            }
        }
        let pawn_on_back_rank = self.pieces()
            .any(|(sq, p)| p.kind == PieceKind::Pawn && (sq.rank() == 0 || sq.rank() == 7));
        if pawn_on_back_rank {
            return Err(FenError::PawnOnBackRank);
        }
        if self.is_in_check(!self.side_to_move) {
            return Err(FenError::OpponentInCheck);
        }
        Ok(())
    }

    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        self.board[square.index()]
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.piece_on(sq).map(|p| (sq, p)))
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| *p == Piece::new(PieceKind::King, color))
            .map(|(sq, _)| sq)
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .map_or(false, |king| is_square_attacked(self, king, !color))
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.is_in_check(self.side_to_move)
    }

    /// Looks up the legal move with the given coordinates, filling in its flags.
    pub fn find_move(&self, from: Square, to: Square, promotion: Option<PieceKind>) -> Option<Move> {
        legal_moves(self)
            .into_iter()
            .find(|mv| mv.from == from && mv.to == to && mv.promotion == promotion)
    }

    /// The en passant square, but only if an en passant capture is actually
    /// legal. Two positions that differ only in an unusable en passant square
    /// are the same position for repetition purposes.
    fn effective_en_passant(&self) -> Option<Square> {
        self.en_passant.filter(|_| legal_moves(self).iter().any(Move::is_en_passant))
    }

    /// Repetition equality: placement, side to move, castling rights and
    /// usable en passant square. Move counters are ignored.
    pub fn same_position(&self, other: &Position) -> bool {
        self.board == other.board
            && self.side_to_move == other.side_to_move
            && self.castling == other.castling
            && self.effective_en_passant() == other.effective_en_passant()
    }

    /// Plays a move without checking legality. The move must at least be
    /// pseudo-legal for this position.
    pub(crate) fn play_unchecked(&self, mv: Move) -> Position {
        let mut next = self.clone();
        let color = self.side_to_move;
        let Some(piece) = next.board[mv.from.index()].take() else {
            return next;
        };
        let captured = next.board[mv.to.index()];

        if mv.is_en_passant() {
            next.board[Square::new(mv.to.file(), mv.from.rank()).index()] = None;
        }
        next.board[mv.to.index()] = Some(match mv.promotion {
            Some(kind) => Piece::new(kind, color),
            None => piece
        });
        if let Some(side) = mv.castle_side() {
            let rank = color.back_rank();
            let rook_from = Square::new(side.rook_file(), rank);
            let rook_to = Square::new(side.rook_target_file(), rank);
            next.board[rook_to.index()] = next.board[rook_from.index()].take();
        }

        if piece.kind == PieceKind::King {
            next.castling.remove_color(color);
        }
        for side in CastleSide::ALL {
            for c in Color::ALL {
                let corner = Square::new(side.rook_file(), c.back_rank());
                if mv.from == corner || mv.to == corner {
                    next.castling.remove(c, side);
                }
            }
        }

        next.en_passant = if mv.is_double_push() {
            mv.from.offset(0, color.forward())
        } else {
            None
        };
        next.halfmove_clock = if piece.kind == PieceKind::Pawn || captured.is_some() {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };
        if color == Color::Black {
            next.fullmove_number = next.fullmove_number.saturating_add(1);
        }
        next.side_to_move = !color;
        next
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

/// Formats the position as FEN.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_on(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            write!(f, "{}", empty)?;
                            empty = 0;
                        }
                        write!(f, "{}", piece.to_char())?;
                    }
                    None => empty += 1
                }
            }
            if empty > 0 {
                write!(f, "{}", empty)?;
            }
            if rank > 0 {
                f.write_str("/")?;
            }
        }
        let side = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b'
        };
        write!(f, " {} {} ", side, self.castling)?;
        match self.en_passant {
            Some(square) => write!(f, "{}", square)?,
            None => f.write_str("-")?
        }
        write!(f, " {} {}", self.halfmove_clock, self.fullmove_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_starting_position() {
        let start = Position::from_fen(STARTING_FEN).unwrap();
        assert_eq!(start, Position::default());
        assert_eq!(start.to_string(), STARTING_FEN);
    }

    #[test]
    fn fen_round_trip() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "4k3/4P3/4K3/8/8/8/8/8 b - - 12 40"
        ] {
            assert_eq!(Position::from_fen(fen).unwrap().to_string(), fen);
        }
    }

    #[test]
    fn rejects_malformed_fen() {
        let cases = [
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0", FenError::FieldCount(5)),
            ("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", FenError::InvalidPlacement("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR".to_owned())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1", FenError::InvalidSideToMove("x".to_owned())),
            ("8/8/8/8/8/8/8/K7 w - - 0 1", FenError::InvalidKings),
            ("k7/8/8/8/8/8/8/KP6 w - - 0 1", FenError::PawnOnBackRank),
            ("k7/8/8/8/8/8/8/K6r b - - 0 1", FenError::OpponentInCheck),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN1 w KQkq - 0 1", FenError::InvalidCastling("KQkq".to_owned())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1", FenError::InvalidEnPassant("e4".to_owned())),
            ("4k3/8/8/3NP3/8/8/8/4K3 w - d6 0 1", FenError::InvalidEnPassant("d6".to_owned())),
            ("4k3/3p4/8/3pP3/8/8/8/4K3 w - d6 0 1", FenError::InvalidEnPassant("d6".to_owned())),
            ("4k3/8/3n4/3pP3/8/8/8/4K3 w - d6 0 1", FenError::InvalidEnPassant("d6".to_owned())),
            ("4k3/8/8/8/3pP3/8/8/4K3 b - d3 0 1", FenError::InvalidEnPassant("d3".to_owned()))
        ];
        for (fen, expected) in cases {
            assert_eq!(Position::from_fen(fen), Err(expected), "{}", fen);
        }
    }

    #[test]
    fn en_passant_square_needs_the_pushed_pawn() {
        let valid = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let capture = valid.find_move("e5".parse().unwrap(), "d6".parse().unwrap(), None).unwrap();
        assert!(capture.is_en_passant());
        assert_eq!(play(&valid, capture).to_string(), "4k3/8/3P4/8/8/8/8/4K3 b - - 0 1");

        // A knight where the pushed pawn should be.
        assert!(Position::from_fen("4k3/8/8/3NP3/8/8/8/4K3 w - d6 0 1").is_err());
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let position = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 b - - 4294967295 4294967295").unwrap();
        let mv = legal_moves(&position)[0];
        let next = play(&position, mv);
        assert_eq!(next.halfmove_clock(), u32::MAX);
        assert_eq!(next.fullmove_number(), u32::MAX);
    }

    fn play(position: &Position, mv: Move) -> Position {
        crate::rules::apply_move(position, mv).unwrap()
    }

    #[test]
    fn unusable_en_passant_square_does_not_affect_repetition() {
        let with_ep = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        let without_ep = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert!(with_ep.same_position(&without_ep));
        assert_ne!(with_ep, without_ep);
    }
}
