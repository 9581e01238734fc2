use futures_core::Stream;
use thiserror::Error;

use crate::orchestrator::{MoveOrchestrator, MoveSource, OrchestratorError};
use crate::rules::{Color, GameStatus, Move};
use crate::service::MoveService;
use crate::session::{GameSession, SessionError};

#[derive(Debug)]
pub enum MatchEvent {
    MovePlayed {
        color: Color,
        mv: Move,
        san: String,
        source: MoveSource,
        failures: usize,
        status: GameStatus
    },
    GameOver {
        status: GameStatus
    }
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("orchestrator error")]
    OrchestratorError(#[from] OrchestratorError),
    #[error("session error")]
    SessionError(#[from] SessionError)
}

/// Two move services playing each other.
pub struct ServiceMatch {
    session: GameSession,
    services: [Box<dyn MoveService>; Color::NUM],
    orchestrator: MoveOrchestrator
}

impl ServiceMatch {
    pub fn new(session: GameSession, white: Box<dyn MoveService>, black: Box<dyn MoveService>, orchestrator: MoveOrchestrator) -> Self {
        Self {
            session,
            services: [white, black],
            orchestrator
        }
    }

    pub fn run(mut self) -> impl Stream<Item = Result<MatchEvent, MatchError>> {
        async_stream::try_stream! {
            while self.session.is_active() {
                let stm = self.session.whose_turn();
                let service = self.services[stm as usize].as_mut();
                let played = self.orchestrator.select_move(service, &self.session).await?;
                let status = self.session.propose_move(played.mv)?;
                let san = self.session
                    .history()
                    .last()
                    .map(|entry| entry.san.clone())
                    .unwrap_or_default();
                yield MatchEvent::MovePlayed {
                    color: stm,
                    mv: played.mv,
                    san,
                    source: played.source,
                    failures: played.failures.len(),
                    status
                };
            }

            yield MatchEvent::GameOver { status: self.session.status() };
        }
    }
}
