use thiserror::Error;
use tracing::info;

use crate::orchestrator::{MoveOrchestrator, OrchestratedMove, OrchestratorError};
use crate::rules::{Color, GameStatus};
use crate::service::MoveService;
use crate::session::{GameSession, SessionError};

#[derive(Debug, Error)]
pub enum AiGameError {
    #[error("it is not {0}'s turn")]
    NotTheirTurn(Color),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError)
}

#[derive(Debug)]
pub struct AiTurn {
    pub played: OrchestratedMove,
    pub san: String,
    pub status: GameStatus
}

/// A player against a move service. Both sides' moves go through the same
/// session, the AI's after the orchestrator has settled on one.
#[derive(Debug)]
pub struct AiGame<S> {
    session: GameSession,
    service: S,
    orchestrator: MoveOrchestrator
}

impl<S: MoveService> AiGame<S> {
    pub fn new(session: GameSession, service: S, orchestrator: MoveOrchestrator) -> Self {
        Self {
            session,
            service,
            orchestrator
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn into_session(self) -> GameSession {
        self.session
    }

    pub fn play_player_move(&mut self, notation: &str) -> Result<GameStatus, AiGameError> {
        if self.session.is_active() && !self.session.is_players_turn() {
            return Err(AiGameError::NotTheirTurn(self.session.player_color()));
        }
        Ok(self.session.propose_notation(notation)?)
    }

    pub fn agree_draw(&mut self) -> Result<GameStatus, AiGameError> {
        Ok(self.session.agree_draw()?)
    }

    pub async fn play_ai_move(&mut self) -> Result<AiTurn, AiGameError> {
        if !self.session.is_active() {
            return Err(SessionError::GameOver(self.session.status()).into());
        }
        if !self.session.is_ai_turn() {
            return Err(AiGameError::NotTheirTurn(self.session.ai_color()));
        }
        let played = self.orchestrator.select_move(&mut self.service, &self.session).await?;
        let status = self.session.propose_move(played.mv)?;
        let san = self.session
            .history()
            .last()
            .map(|entry| entry.san.clone())
            .unwrap_or_default();
        info!(%san, source = ?played.source, "ai move played");
        Ok(AiTurn { played, san, status })
    }
}
