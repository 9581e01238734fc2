//! Saving and restoring sessions.
//!
//! A saved game records where it started and the moves played, not the
//! derived state. Restoring replays every move through
//! [`GameSession::propose_move`], so a restored session is always one that
//! legal play could have produced, and the recorded final position and status
//! are checked against the replay.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::*;
use crate::session::{GameSession, SessionError};

pub const SAVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: u32,
    pub initial_fen: String,
    pub player_color: Color,
    /// Moves in UCI notation.
    pub moves: Vec<String>,
    pub status: GameStatus,
    pub fen: String
}

#[derive(Debug, Error)]
pub enum CorruptStateError {
    #[error("malformed save data")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported save format version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid initial position")]
    InvalidFen(#[source] FenError),
    #[error("move {index} (`{notation}`) cannot be replayed")]
    InvalidMove {
        index: usize,
        notation: String,
        #[source]
        error: SessionError
    },
    #[error("replayed position {found} does not match saved position {saved}")]
    PositionMismatch { saved: String, found: String },
    #[error("replayed status {found} does not match saved status {saved}")]
    StatusMismatch { saved: GameStatus, found: GameStatus }
}

impl SavedGame {
    pub fn from_session(session: &GameSession) -> Self {
        Self {
            version: SAVE_FORMAT_VERSION,
            initial_fen: session.initial_position().to_string(),
            player_color: session.player_color(),
            moves: session.history().iter().map(|entry| entry.mv.to_string()).collect(),
            status: session.status(),
            fen: session.position().to_string()
        }
    }

    pub fn into_session(self) -> Result<GameSession, CorruptStateError> {
        if self.version != SAVE_FORMAT_VERSION {
            return Err(CorruptStateError::UnsupportedVersion(self.version));
        }
        let initial = Position::from_fen(&self.initial_fen).map_err(CorruptStateError::InvalidFen)?;
        let mut session = GameSession::from_position(initial, self.player_color);
        for (index, notation) in self.moves.into_iter().enumerate() {
            let replayed = parse_uci(session.position(), &notation)
                .map_err(SessionError::from)
                .and_then(|mv| session.propose_move(mv));
            if let Err(error) = replayed {
                return Err(CorruptStateError::InvalidMove { index, notation, error });
            }
        }
        if self.status == GameStatus::Draw(DrawReason::Agreement) {
            session.restore_agreed_draw();
        }

        let found = session.position().to_string();
        if found != self.fen {
            return Err(CorruptStateError::PositionMismatch { saved: self.fen, found });
        }
        if session.status() != self.status {
            return Err(CorruptStateError::StatusMismatch {
                saved: self.status,
                found: session.status()
            });
        }
        Ok(session)
    }
}

pub fn save(session: &GameSession) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(&SavedGame::from_session(session))
}

pub fn restore(bytes: &[u8]) -> Result<GameSession, CorruptStateError> {
    serde_json::from_slice::<SavedGame>(bytes)?.into_session()
}

/// A format sessions can be written to and read back from.
pub trait SessionStore {
    type SaveError: std::error::Error + Send + Sync + 'static;

    fn save(&self, session: &GameSession) -> Result<Vec<u8>, Self::SaveError>;
    fn restore(&self, bytes: &[u8]) -> Result<GameSession, CorruptStateError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSessionStore;

impl SessionStore for JsonSessionStore {
    type SaveError = serde_json::Error;

    fn save(&self, session: &GameSession) -> Result<Vec<u8>, Self::SaveError> {
        save(session)
    }

    fn restore(&self, bytes: &[u8]) -> Result<GameSession, CorruptStateError> {
        restore(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_after(moves: &[&str]) -> GameSession {
        let mut session = GameSession::new(Color::Black);
        for mv in moves {
            session.propose_notation(mv).unwrap();
        }
        session
    }

    #[test]
    fn round_trip_preserves_the_game() {
        let session = session_after(&["e4", "c5", "Nf3", "d6", "d4", "cxd4"]);
        let restored = restore(&save(&session).unwrap()).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.whose_turn(), Color::White);
        assert_eq!(restored.history()[5].san, "cxd4");
    }

    #[test]
    fn round_trip_of_finished_games() {
        let mated = session_after(&["f3", "e5", "g4", "Qh4#"]);
        assert_eq!(restore(&save(&mated).unwrap()).unwrap(), mated);

        let mut agreed = session_after(&["d4", "d5"]);
        agreed.agree_draw().unwrap();
        let restored = restore(&save(&agreed).unwrap()).unwrap();
        assert_eq!(restored.status(), GameStatus::Draw(DrawReason::Agreement));
        assert!(!restored.is_active());
    }

    #[test]
    fn round_trip_from_custom_position() {
        let initial = Position::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        let mut session = GameSession::from_position(initial, Color::White);
        session.propose_notation("e2e4").unwrap();
        let saved = SavedGame::from_session(&session);
        assert_eq!(saved.moves, ["e2e4"]);
        assert_eq!(saved.fen, "4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1");
        assert_eq!(saved.into_session().unwrap(), session);
    }

    #[test]
    fn store_uses_json() {
        let session = session_after(&["Nf3"]);
        let bytes = JsonSessionStore.save(&session).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["player_color"], "black");
        assert_eq!(value["status"], "in_progress");
        assert_eq!(JsonSessionStore.restore(&bytes).unwrap(), session);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(restore(b"not json"), Err(CorruptStateError::Malformed(_))));
        assert!(matches!(restore(b"{\"version\": 1}"), Err(CorruptStateError::Malformed(_))));
    }

    #[test]
    fn rejects_tampered_saves() {
        let session = session_after(&["e4", "e5"]);
        let saved = SavedGame::from_session(&session);

        let mut illegal = saved.clone();
        illegal.moves[1] = "e7e4".to_owned();
        assert!(matches!(
            illegal.into_session(),
            Err(CorruptStateError::InvalidMove { index: 1, .. })
        ));

        let mut version = saved.clone();
        version.version = 99;
        assert!(matches!(version.into_session(), Err(CorruptStateError::UnsupportedVersion(99))));

        let mut fen = saved.clone();
        fen.initial_fen = "8/8/8/8/8/8/8/8 w - - 0 1".to_owned();
        assert!(matches!(fen.into_session(), Err(CorruptStateError::InvalidFen(_))));

        let mut position = saved.clone();
        position.fen = STARTING_FEN.to_owned();
        assert!(matches!(position.into_session(), Err(CorruptStateError::PositionMismatch { .. })));

        let mut status = saved;
        status.status = GameStatus::Stalemate;
        assert!(matches!(status.into_session(), Err(CorruptStateError::StatusMismatch { .. })));
    }

    #[test]
    fn rejects_inconsistent_en_passant_square() {
        let blob = br#"{"version":1,"initial_fen":"4k3/8/8/3NP3/8/8/8/4K3 w - d6 0 1","player_color":"white","moves":["e5d6"],"status":"in_progress","fen":"4k3/8/3P4/8/8/8/8/4K3 b - - 0 1"}"#;
        assert!(matches!(restore(blob), Err(CorruptStateError::InvalidFen(FenError::InvalidEnPassant(_)))));
    }

    #[test]
    fn extreme_move_counters_do_not_panic() {
        let initial = "4k3/8/8/8/8/8/8/R3K3 b - - 0 4294967295";
        let blob = format!(
            r#"{{"version":1,"initial_fen":"{}","player_color":"white","moves":["e8d8"],"status":"in_progress","fen":"3k4/8/8/8/8/8/8/R3K3 w - - 1 4294967295"}}"#,
            initial
        );
        let session = restore(blob.as_bytes()).unwrap();
        assert_eq!(session.position().fullmove_number(), u32::MAX);
    }

    #[test]
    fn rejects_moves_after_the_end() {
        let mut saved = SavedGame::from_session(&session_after(&["f3", "e5", "g4", "Qh4#"]));
        saved.moves.push("a2a3".to_owned());
        assert!(matches!(
            saved.into_session(),
            Err(CorruptStateError::InvalidMove { index: 4, error: SessionError::GameOver(_), .. })
        ));
    }
}
