use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use gambit::orchestrator::*;
use gambit::rules::*;
use gambit::service::{MoveRequest, MoveService, ServiceError};
use gambit::session::GameSession;

/// What a scripted service does on one call.
#[derive(Debug, Clone)]
enum Reply {
    Move(&'static str),
    Fail,
    Hang,
    Slow(Duration, &'static str)
}

#[derive(Debug)]
struct ScriptedService {
    replies: VecDeque<Reply>,
    calls: usize
}

impl ScriptedService {
    fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            calls: 0
        }
    }
}

#[async_trait]
impl MoveService for ScriptedService {
    async fn request_move(&mut self, _request: &MoveRequest) -> Result<String, ServiceError> {
        self.calls += 1;
        match self.replies.pop_front().unwrap_or(Reply::Hang) {
            Reply::Move(mv) => Ok(mv.to_owned()),
            Reply::Fail => Err(ServiceError::Unavailable("scripted failure".to_owned())),
            Reply::Hang => std::future::pending().await,
            Reply::Slow(delay, mv) => {
                tokio::time::sleep(delay).await;
                Ok(mv.to_owned())
            }
        }
    }
}

fn session(fen: &str) -> GameSession {
    GameSession::from_position(Position::from_fen(fen).unwrap(), Color::White)
}

fn assert_legal(session: &GameSession, played: &OrchestratedMove) {
    assert!(session.legal_moves().contains(&played.mv), "{} is not legal", played.mv);
}

#[tokio::test(start_paused = true)]
async fn accepts_a_legal_first_answer() {
    let session = GameSession::new(Color::Black);
    let mut service = ScriptedService::new([Reply::Move("e2e4")]);
    let played = MoveOrchestrator::default().select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.mv.to_string(), "e2e4");
    assert_eq!(played.source, MoveSource::Service { attempt: 1 });
    assert!(played.failures.is_empty());
    assert_eq!(service.calls, 1);
}

#[tokio::test(start_paused = true)]
async fn accepts_san_answers() {
    let session = GameSession::new(Color::Black);
    let mut service = ScriptedService::new([Reply::Move("Nf3")]);
    let played = MoveOrchestrator::default().select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.mv.to_string(), "g1f3");
}

#[tokio::test(start_paused = true)]
async fn falls_back_when_every_answer_is_illegal() {
    let session = GameSession::new(Color::Black);
    let mut service = ScriptedService::new([
        Reply::Move("e2e5"),
        Reply::Move("e7e5"),
        Reply::Move("e2e5")
    ]);
    let played = MoveOrchestrator::default().select_move(&mut service, &session).await.unwrap();
    assert_legal(&session, &played);
    assert_eq!(played.source, MoveSource::Fallback(FallbackReason::RepeatedFailures));
    assert_eq!(played.failures.len(), 2);
    assert!(played.failures.iter().all(|f| matches!(f, AttemptFailure::InvalidMove { .. })));
    assert_eq!(service.calls, 2);
}

#[tokio::test(start_paused = true)]
async fn max_attempts_bounds_calls() {
    let session = GameSession::new(Color::Black);
    let config = OrchestratorConfig {
        max_attempts: 4,
        failure_limit: 10,
        deadline: Duration::from_secs(60),
        ..OrchestratorConfig::default()
    };
    let mut service = ScriptedService::new(std::iter::repeat(Reply::Move("nonsense")).take(10));
    let played = MoveOrchestrator::new(config).select_move(&mut service, &session).await.unwrap();
    assert_legal(&session, &played);
    assert_eq!(played.source, MoveSource::Fallback(FallbackReason::AttemptsExhausted));
    assert_eq!(service.calls, 4);
}

#[tokio::test(start_paused = true)]
async fn timeouts_fall_back_within_the_deadline() {
    let session = GameSession::new(Color::Black);
    let orchestrator = MoveOrchestrator::default();
    let mut service = ScriptedService::new([Reply::Hang, Reply::Hang, Reply::Hang]);
    let started = tokio::time::Instant::now();
    let played = orchestrator.select_move(&mut service, &session).await.unwrap();
    assert_legal(&session, &played);
    assert!(played.is_fallback());
    assert!(played.failures.iter().all(|f| matches!(f, AttemptFailure::Timeout { .. })));
    assert!(started.elapsed() <= orchestrator.config().deadline);
}

#[tokio::test(start_paused = true)]
async fn the_overall_deadline_cuts_attempts_short() {
    let session = GameSession::new(Color::Black);
    let config = OrchestratorConfig {
        max_attempts: 10,
        failure_limit: 10,
        deadline: Duration::from_secs(3),
        attempt_timeout: Duration::from_secs(2),
        ..OrchestratorConfig::default()
    };
    let mut service = ScriptedService::new([Reply::Hang, Reply::Slow(Duration::from_millis(1500), "e2e4")]);
    let started = tokio::time::Instant::now();
    let played = MoveOrchestrator::new(config).select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.source, MoveSource::Fallback(FallbackReason::DeadlineElapsed));
    assert_eq!(service.calls, 2);
    match &played.failures[1] {
        AttemptFailure::Timeout { limit, .. } => assert_eq!(*limit, Duration::from_secs(1)),
        other => panic!("unexpected failure {other:?}")
    }
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(started.elapsed() < Duration::from_millis(3100));
}

#[tokio::test(start_paused = true)]
async fn recovers_after_mixed_failures() {
    let session = GameSession::new(Color::Black);
    let config = OrchestratorConfig {
        failure_limit: 3,
        max_attempts: 3,
        deadline: Duration::from_secs(10),
        ..OrchestratorConfig::default()
    };
    let mut service = ScriptedService::new([Reply::Fail, Reply::Hang, Reply::Move("d2d4")]);
    let played = MoveOrchestrator::new(config).select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.mv.to_string(), "d2d4");
    assert_eq!(played.source, MoveSource::Service { attempt: 3 });
    assert!(matches!(played.failures[0], AttemptFailure::Service { attempt: 1, .. }));
    assert!(matches!(played.failures[1], AttemptFailure::Timeout { attempt: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn check_falls_back_after_one_failure() {
    // After 1. e4 f5 2. Qh5+ black must play g6.
    let mut session = GameSession::new(Color::White);
    for mv in ["e4", "f5", "Qh5+"] {
        session.propose_notation(mv).unwrap();
    }
    assert_eq!(session.status(), GameStatus::Check(Color::Black));

    let mut service = ScriptedService::new([Reply::Move("e7e5"), Reply::Move("g7g6")]);
    let played = MoveOrchestrator::default().select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.mv.to_string(), "g7g6");
    assert_eq!(played.source, MoveSource::Fallback(FallbackReason::InCheck));
    assert_eq!(service.calls, 1);
    session.propose_move(played.mv).unwrap();
    assert!(!session.position().is_in_check(Color::Black));
}

#[tokio::test(start_paused = true)]
async fn malformed_notation_is_a_failure() {
    let session = GameSession::new(Color::Black);
    let mut service = ScriptedService::new([Reply::Move(""), Reply::Move("(none)")]);
    let played = MoveOrchestrator::default().select_move(&mut service, &session).await.unwrap();
    assert_legal(&session, &played);
    assert!(matches!(
        &played.failures[0],
        AttemptFailure::InvalidMove { notation, error: NotationError::Empty, .. } if notation.is_empty()
    ));
}

#[tokio::test(start_paused = true)]
async fn ended_games_have_nothing_to_select() {
    let mut session = GameSession::new(Color::White);
    for mv in ["f3", "e5", "g4", "Qh4#"] {
        session.propose_notation(mv).unwrap();
    }
    let mut service = ScriptedService::new([Reply::Move("a2a3")]);
    let result = MoveOrchestrator::default().select_move(&mut service, &session).await;
    assert!(matches!(result, Err(OrchestratorError::AllAttemptsExhausted { .. })));
    assert_eq!(service.calls, 0);
}

#[tokio::test(start_paused = true)]
async fn promotion_answers_must_name_the_piece() {
    let session = session("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
    let mut service = ScriptedService::new([Reply::Move("b7b8"), Reply::Move("b7b8n")]);
    let played = MoveOrchestrator::default().select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.mv.to_string(), "b7b8n");
    assert_eq!(played.source, MoveSource::Service { attempt: 2 });
}

#[tokio::test(start_paused = true)]
async fn unrepresentable_deadline_still_bounds_attempts() {
    let session = GameSession::new(Color::Black);
    let config = OrchestratorConfig {
        deadline: Duration::MAX,
        ..OrchestratorConfig::default()
    };
    let mut service = ScriptedService::new([Reply::Hang, Reply::Move("e2e4")]);
    let played = MoveOrchestrator::new(config).select_move(&mut service, &session).await.unwrap();
    assert_eq!(played.source, MoveSource::Service { attempt: 2 });
    assert!(matches!(played.failures[0], AttemptFailure::Timeout { limit, .. } if limit == config.attempt_timeout));
}
