//! The boundary to external move-generation services. Everything a service
//! returns is untrusted text; see [`crate::orchestrator`] for how it is
//! validated.

use std::fmt::Display;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::rules::{Color, Move, Position};
use crate::session::GameSession;

mod engine;
mod error;
mod raw_engine;
mod uci_convert;

pub use engine::{EngineConfig, UciEngine, UciOptionValue};
pub use error::ServiceError;

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_moves<S: Serializer>(moves: &[Move], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(moves.iter().map(Move::to_string))
}

/// What a service is asked: the current position plus the game that led to
/// it. Positions serialize as FEN and moves as UCI strings.
#[derive(Debug, Clone, Serialize)]
pub struct MoveRequest {
    #[serde(serialize_with = "serialize_display")]
    pub initial_position: Position,
    #[serde(serialize_with = "serialize_moves")]
    pub moves: Vec<Move>,
    #[serde(serialize_with = "serialize_display")]
    pub position: Position,
    pub side_to_move: Color
}

impl MoveRequest {
    pub fn from_session(session: &GameSession) -> Self {
        Self {
            initial_position: session.initial_position().clone(),
            moves: session.history().iter().map(|entry| entry.mv).collect(),
            position: session.position().clone(),
            side_to_move: session.whose_turn()
        }
    }
}

/// An external move generator. Implementations return the proposed move in
/// any notation [`crate::rules::parse_move`] understands, or an error.
#[async_trait]
pub trait MoveService: Send {
    async fn request_move(&mut self, request: &MoveRequest) -> Result<String, ServiceError>;
}

#[async_trait]
impl<S: MoveService + ?Sized> MoveService for Box<S> {
    async fn request_move(&mut self, request: &MoveRequest) -> Result<String, ServiceError> {
        (**self).request_move(request).await
    }
}
