//! Gets one validated move for the AI side out of an unreliable
//! [`MoveService`].
//!
//! Every answer from the service is parsed against the current position, so
//! only members of [`legal_moves`](crate::rules::legal_moves) are ever
//! accepted. Attempts are bounded both in number and by a wall-clock
//! deadline covering all of them, with a per-call timeout inside that. When
//! the service cannot produce a legal move in time, or keeps failing (sooner
//! when the side to move is in check), a local [`fallback_move`] is returned
//! instead. The orchestrator never touches the session; the caller plays the
//! result through [`GameSession::propose_move`].

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::rules::{parse_move, Move, NotationError};
use crate::service::{MoveRequest, MoveService, ServiceError};
use crate::session::GameSession;

mod config;
mod fallback;

pub use config::*;
pub use fallback::fallback_move;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// `max_attempts` calls were made without a legal answer.
    AttemptsExhausted,
    /// `failure_limit` attempts failed.
    RepeatedFailures,
    /// The side to move is in check and `check_failure_limit` attempts failed.
    InCheck,
    /// The overall deadline elapsed.
    DeadlineElapsed
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::AttemptsExhausted => f.write_str("attempts exhausted"),
            FallbackReason::RepeatedFailures => f.write_str("repeated failures"),
            FallbackReason::InCheck => f.write_str("failure while in check"),
            FallbackReason::DeadlineElapsed => f.write_str("deadline elapsed")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    /// Accepted from the service on this attempt (1-based).
    Service { attempt: usize },
    Fallback(FallbackReason)
}

#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("attempt {attempt}: no answer within {limit:?}")]
    Timeout { attempt: usize, limit: Duration },
    #[error("attempt {attempt}: service error")]
    Service {
        attempt: usize,
        #[source]
        error: ServiceError
    },
    #[error("attempt {attempt}: rejected `{notation}`")]
    InvalidMove {
        attempt: usize,
        notation: String,
        #[source]
        error: NotationError
    }
}

#[derive(Debug)]
pub struct OrchestratedMove {
    pub mv: Move,
    pub source: MoveSource,
    /// Failed attempts, in order, before the move was settled.
    pub failures: Vec<AttemptFailure>,
    pub elapsed: Duration
}

impl OrchestratedMove {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, MoveSource::Fallback(_))
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Not even the fallback generator found a move. Only possible when the
    /// session has no legal moves, which an active session never lacks, so
    /// in practice this means the session has already ended.
    #[error("no move could be produced, even by the fallback generator")]
    AllAttemptsExhausted { failures: Vec<AttemptFailure> }
}

#[derive(Debug, Clone, Default)]
pub struct MoveOrchestrator {
    config: OrchestratorConfig
}

impl MoveOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Whether another attempt is allowed, or why the fallback must be used.
    fn next_attempt(&self, failures: usize, in_check: bool, deadline: Option<Instant>) -> Result<Duration, FallbackReason> {
        if failures >= self.config.max_attempts {
            return Err(FallbackReason::AttemptsExhausted);
        }
        if in_check && failures >= self.config.check_failure_limit {
            return Err(FallbackReason::InCheck);
        }
        if failures >= self.config.failure_limit {
            return Err(FallbackReason::RepeatedFailures);
        }
        // No deadline means one too far away to represent.
        let remaining = deadline.map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(Instant::now()));
        if remaining.is_zero() {
            return Err(FallbackReason::DeadlineElapsed);
        }
        Ok(remaining.min(self.config.attempt_timeout))
    }

    #[instrument(skip_all, fields(ply = session.ply(), side = %session.whose_turn()))]
    pub async fn select_move<S>(&self, service: &mut S, session: &GameSession) -> Result<OrchestratedMove, OrchestratorError>
    where
        S: MoveService + ?Sized
    {
        let started = Instant::now();
        let deadline = started.checked_add(self.config.deadline);
        let position = session.position();
        let mut failures = Vec::new();
        if session.legal_moves().is_empty() {
            error!(fen = %position, status = %session.status(), "no legal moves to select from");
            return Err(OrchestratorError::AllAttemptsExhausted { failures });
        }
        let in_check = position.is_check();
        let request = MoveRequest::from_session(session);

        let reason = loop {
            let limit = match self.next_attempt(failures.len(), in_check, deadline) {
                Ok(limit) => limit,
                Err(reason) => break reason
            };
            let attempt = failures.len() + 1;
            // Dropping the call on timeout discards whatever it would have returned.
            let failure = match tokio::time::timeout(limit, service.request_move(&request)).await {
                Err(_) => AttemptFailure::Timeout { attempt, limit },
                Ok(Err(error)) => AttemptFailure::Service { attempt, error },
                Ok(Ok(notation)) => match parse_move(position, &notation) {
                    Ok(mv) => {
                        debug!(attempt, %mv, "service move accepted");
                        return Ok(OrchestratedMove {
                            mv,
                            source: MoveSource::Service { attempt },
                            failures,
                            elapsed: started.elapsed()
                        });
                    }
                    Err(error) => AttemptFailure::InvalidMove { attempt, notation, error }
                }
            };
            warn!(error = %failure, "move service attempt failed");
            failures.push(failure);
        };

        match fallback_move(position) {
            Some(mv) => {
                warn!(%mv, %reason, failures = failures.len(), "using fallback move");
                Ok(OrchestratedMove {
                    mv,
                    source: MoveSource::Fallback(reason),
                    failures,
                    elapsed: started.elapsed()
                })
            }
            None => {
                error!(fen = %position, status = %session.status(), "no legal move for the fallback generator");
                Err(OrchestratorError::AllAttemptsExhausted { failures })
            }
        }
    }
}
