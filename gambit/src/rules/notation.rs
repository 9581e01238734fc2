//! Move notation: UCI long algebraic (`e2e4`, `e7e8q`) and standard
//! algebraic notation (`Nf3`, `exd5`, `O-O`, `e8=Q+`).
//!
//! Parsing never trusts its input: every successful parse yields a member of
//! [`legal_moves`] for the given position.

use super::error::NotationError;
use super::movegen::{has_legal_moves, legal_moves};
use super::position::Position;
use super::types::*;

fn looks_like_uci(s: &str) -> bool {
    let bytes = s.as_bytes();
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);
    match bytes.len() {
        4 => square(bytes[0], bytes[1]) && square(bytes[2], bytes[3]),
        5 => {
            square(bytes[0], bytes[1])
                && square(bytes[2], bytes[3])
                && b"qrbnQRBN".contains(&bytes[4])
        }
        _ => false
    }
}

pub fn parse_uci(position: &Position, s: &str) -> Result<Move, NotationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(NotationError::Empty);
    }
    if !looks_like_uci(s) {
        return Err(NotationError::Malformed(s.to_owned()));
    }
    let from = s[0..2].parse().map_err(|_| NotationError::Malformed(s.to_owned()))?;
    let to = s[2..4].parse().map_err(|_| NotationError::Malformed(s.to_owned()))?;
    let promotion = s[4..].chars().next().and_then(PieceKind::from_char);
    position
        .find_move(from, to, promotion)
        .ok_or_else(|| NotationError::NoSuchMove(s.to_owned()))
}

pub fn parse_san(position: &Position, s: &str) -> Result<Move, NotationError> {
    let original = s.trim();
    if original.is_empty() {
        return Err(NotationError::Empty);
    }
    let malformed = || NotationError::Malformed(original.to_owned());
    let no_such_move = || NotationError::NoSuchMove(original.to_owned());

    let s = original.trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'));
    let s = s.strip_suffix("e.p.").unwrap_or(s).trim_end();

    let castle = match s {
        "O-O" | "0-0" => Some(CastleSide::King),
        "O-O-O" | "0-0-0" => Some(CastleSide::Queen),
        _ => None
    };
    if let Some(side) = castle {
        return legal_moves(position)
            .into_iter()
            .find(|mv| mv.castle_side() == Some(side))
            .ok_or_else(no_such_move);
    }

    let mut chars: Vec<char> = s.chars().filter(|c| !matches!(c, 'x' | ':' | '-')).collect();

    let mut promotion = None;
    if let Some(&last) = chars.last() {
        if let Some(kind) = "QRBNqrbn".contains(last).then(|| PieceKind::from_char(last)).flatten() {
            // A promotion piece follows the destination rank, optionally after '='.
            chars.pop();
            if chars.last() == Some(&'=') {
                chars.pop();
            }
            promotion = Some(kind);
        }
    }

    if chars.len() < 2 {
        return Err(malformed());
    }
    let rank = Square::parse_rank(chars[chars.len() - 1]).ok_or_else(malformed)?;
    let file = Square::parse_file(chars[chars.len() - 2]).ok_or_else(malformed)?;
    let to = Square::new(file, rank);
    let prefix = &chars[..chars.len() - 2];

    let (kind, hints) = match prefix.first() {
        Some(&c) if "NBRQK".contains(c) => (PieceKind::from_char(c).ok_or_else(malformed)?, &prefix[1..]),
        _ => (PieceKind::Pawn, prefix)
    };
    if promotion.is_some() && kind != PieceKind::Pawn {
        return Err(malformed());
    }

    let mut from_file = None;
    let mut from_rank = None;
    for &c in hints {
        if let Some(file) = Square::parse_file(c) {
            from_file = Some(file);
        } else if let Some(rank) = Square::parse_rank(c) {
            from_rank = Some(rank);
        } else {
            return Err(malformed());
        }
    }

    // Without an origin file, a pawn move is a push along its own file.
    let pawn_file = (kind == PieceKind::Pawn && from_file.is_none()).then(|| to.file());
    let mut candidates = legal_moves(position).into_iter().filter(|mv| {
        mv.to == to
            && pawn_file.map_or(true, |f| mv.from.file() == f)
            && mv.promotion == promotion
            && mv.castle_side().is_none()
            && position.piece_on(mv.from).map(|p| p.kind) == Some(kind)
            && from_file.map_or(true, |f| mv.from.file() == f)
            && from_rank.map_or(true, |r| mv.from.rank() == r)
    });
    let mv = candidates.next().ok_or_else(no_such_move)?;
    if candidates.next().is_some() {
        return Err(NotationError::Ambiguous(original.to_owned()));
    }
    Ok(mv)
}

/// Parses either notation. Input shaped like UCI is read as UCI, anything
/// else as SAN.
pub fn parse_move(position: &Position, s: &str) -> Result<Move, NotationError> {
    let s = s.trim();
    if looks_like_uci(s) {
        parse_uci(position, s)
    } else {
        parse_san(position, s)
    }
}

pub fn to_uci(mv: Move) -> String {
    mv.to_string()
}

/// Standard algebraic notation for a legal move, including the check or
/// mate suffix.
pub fn to_san(position: &Position, mv: Move) -> String {
    let mut san = String::new();
    match mv.castle_side() {
        Some(CastleSide::King) => san.push_str("O-O"),
        Some(CastleSide::Queen) => san.push_str("O-O-O"),
        None => {
            let kind = position.piece_on(mv.from).map_or(PieceKind::Pawn, |p| p.kind);
            if kind == PieceKind::Pawn {
                if mv.is_capture() {
                    san.push(mv.from.file_char());
                }
            } else {
                san.push(kind.to_char().to_ascii_uppercase());
                let rivals: Vec<Move> = legal_moves(position)
                    .into_iter()
                    .filter(|other| {
                        other.to == mv.to
                            && other.from != mv.from
                            && position.piece_on(other.from).map(|p| p.kind) == Some(kind)
                    })
                    .collect();
                if !rivals.is_empty() {
                    let shares_file = rivals.iter().any(|o| o.from.file() == mv.from.file());
                    let shares_rank = rivals.iter().any(|o| o.from.rank() == mv.from.rank());
                    if !shares_file {
                        san.push(mv.from.file_char());
                    } else if !shares_rank {
                        san.push(mv.from.rank_char());
                    } else {
                        san.push(mv.from.file_char());
                        san.push(mv.from.rank_char());
                    }
                }
            }
            if mv.is_capture() {
                san.push('x');
            }
            san.push_str(&mv.to.to_string());
            if let Some(promotion) = mv.promotion {
                san.push('=');
                san.push(promotion.to_char().to_ascii_uppercase());
            }
        }
    }

    let next = position.play_unchecked(mv);
    if next.is_check() {
        san.push(if has_legal_moves(&next) { '+' } else { '#' });
    }
    san
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn uci_round_trips_through_legal_moves() {
        let start = Position::default();
        for mv in legal_moves(&start) {
            assert_eq!(parse_uci(&start, &to_uci(mv)), Ok(mv));
        }
    }

    #[test]
    fn uci_rejects_garbage_and_illegal_moves() {
        let start = Position::default();
        assert_eq!(parse_uci(&start, ""), Err(NotationError::Empty));
        assert_eq!(parse_uci(&start, "hello"), Err(NotationError::Malformed("hello".to_owned())));
        assert_eq!(parse_uci(&start, "e2e5"), Err(NotationError::NoSuchMove("e2e5".to_owned())));
        assert!(parse_uci(&start, "e1g1").is_err());
    }

    #[test]
    fn uci_promotion_requires_piece() {
        let position = pos("8/P6k/8/8/8/8/8/K7 w - - 0 1");
        assert!(parse_uci(&position, "a7a8").is_err());
        assert_eq!(parse_uci(&position, "a7a8Q").unwrap().promotion, Some(PieceKind::Queen));
    }

    #[test]
    fn san_round_trips_through_legal_moves() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3"
        ] {
            let position = pos(fen);
            for mv in legal_moves(&position) {
                let san = to_san(&position, mv);
                assert_eq!(parse_san(&position, &san), Ok(mv), "{} in {}", san, fen);
            }
        }
    }

    #[test]
    fn san_formatting() {
        let start = Position::default();
        assert_eq!(to_san(&start, parse_uci(&start, "g1f3").unwrap()), "Nf3");
        assert_eq!(to_san(&start, parse_uci(&start, "e2e4").unwrap()), "e4");

        let position = pos("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(to_san(&position, parse_uci(&position, "e1g1").unwrap()), "O-O");
        assert_eq!(to_san(&position, parse_uci(&position, "e1c1").unwrap()), "O-O-O");
        assert_eq!(to_san(&position, parse_uci(&position, "a1a8").unwrap()), "Rxa8+");

        let knights = pos("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        assert_eq!(to_san(&knights, parse_uci(&knights, "b1d2").unwrap()), "Nbd2");

        let rooks = pos("4k3/R7/8/8/8/8/8/R3K3 w - - 0 1");
        assert_eq!(to_san(&rooks, parse_uci(&rooks, "a1a4").unwrap()), "R1a4");

        let promotion = pos("3r3k/4P3/8/8/8/8/8/K7 w - - 0 1");
        assert_eq!(to_san(&promotion, parse_uci(&promotion, "e7d8q").unwrap()), "exd8=Q+");
    }

    #[test]
    fn san_marks_mate() {
        let position = pos("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        assert_eq!(to_san(&position, parse_uci(&position, "d8h4").unwrap()), "Qh4#");
    }

    #[test]
    fn san_parsing_is_lenient_about_decoration() {
        let start = Position::default();
        let e4 = parse_uci(&start, "e2e4").unwrap();
        assert_eq!(parse_san(&start, " e4 "), Ok(e4));
        assert_eq!(parse_san(&start, "e4!?"), Ok(e4));
        assert_eq!(parse_san(&start, "Ngf3"), parse_san(&start, "Nf3"));

        let promotion = pos("8/P6k/8/8/8/8/8/K7 w - - 0 1");
        assert_eq!(parse_san(&promotion, "a8Q"), parse_san(&promotion, "a8=Q"));

        let castles = pos("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(parse_san(&castles, "0-0"), parse_san(&castles, "O-O"));
    }

    #[test]
    fn san_errors() {
        let start = Position::default();
        assert_eq!(parse_san(&start, "Qh5"), Err(NotationError::NoSuchMove("Qh5".to_owned())));
        assert_eq!(parse_san(&start, "Zz9"), Err(NotationError::Malformed("Zz9".to_owned())));
        assert_eq!(parse_san(&start, "O-O"), Err(NotationError::NoSuchMove("O-O".to_owned())));

        let knights = pos("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        assert_eq!(parse_san(&knights, "Nd2"), Err(NotationError::Ambiguous("Nd2".to_owned())));
    }

    #[test]
    fn parse_move_accepts_both_notations() {
        let start = Position::default();
        assert_eq!(parse_move(&start, "g1f3"), parse_move(&start, "Nf3"));
        assert_eq!(parse_move(&start, "e2e4\n"), parse_move(&start, "e4"));
    }
}
