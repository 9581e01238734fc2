use thiserror::Error;

use crate::rules::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    /// The move in standard algebraic notation, relative to the position
    /// before it was played.
    pub san: String,
    /// The position after the move.
    pub position: Position
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active(GameStatus),
    Ended(GameStatus)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    IllegalMove(#[from] IllegalMove),
    #[error("the game is already over ({0})")]
    GameOver(GameStatus),
    #[error(transparent)]
    Notation(#[from] NotationError)
}

/// One game: the only owner and mutator of its position. Every change goes
/// through [`GameSession::propose_move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    initial: Position,
    position: Position,
    history: Vec<HistoryEntry>,
    status: GameStatus,
    player_color: Color,
    ply: u32
}

impl GameSession {
    /// A new game from the standard starting position.
    pub fn new(player_color: Color) -> Self {
        Self::from_position(Position::default(), player_color)
    }

    pub fn from_position(initial: Position, player_color: Color) -> Self {
        Self {
            status: classify(&initial),
            position: initial.clone(),
            initial,
            history: Vec::new(),
            player_color,
            ply: 0
        }
    }

    pub fn initial_position(&self) -> &Position {
        &self.initial
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn state(&self) -> SessionState {
        if self.status.is_terminal() {
            SessionState::Ended(self.status)
        } else {
            SessionState::Active(self.status)
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn player_color(&self) -> Color {
        self.player_color
    }

    pub fn ai_color(&self) -> Color {
        !self.player_color
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn whose_turn(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn is_turn_of(&self, color: Color) -> bool {
        self.whose_turn() == color
    }

    pub fn is_players_turn(&self) -> bool {
        self.is_turn_of(self.player_color)
    }

    pub fn is_ai_turn(&self) -> bool {
        self.is_turn_of(self.ai_color())
    }

    /// Legal moves in the current position, or none once the game has ended.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_active() {
            legal_moves(&self.position)
        } else {
            Vec::new()
        }
    }

    /// Number of times the current position has occurred, counting only the
    /// stretch since the last capture or pawn move.
    fn repetitions(&self) -> usize {
        let reversible = self.position.halfmove_clock() as usize;
        let earlier = self.history
            .iter()
            .rev()
            .skip(1)
            .map(|entry| &entry.position)
            .chain(std::iter::once(&self.initial))
            .take(reversible);
        1 + earlier.filter(|p| p.same_position(&self.position)).count()
    }

    pub fn propose_move(&mut self, mv: Move) -> Result<GameStatus, SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::GameOver(self.status));
        }
        let next = apply_move(&self.position, mv)?;
        let san = to_san(&self.position, mv);
        self.history.push(HistoryEntry {
            mv,
            san,
            position: next.clone()
        });
        self.position = next;
        self.ply += 1;
        self.status = classify_with_repetitions(&self.position, self.repetitions());
        Ok(self.status)
    }

    /// Parses `notation` (UCI or SAN) against the current position and
    /// proposes the result.
    pub fn propose_notation(&mut self, notation: &str) -> Result<GameStatus, SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::GameOver(self.status));
        }
        let mv = parse_move(&self.position, notation)?;
        self.propose_move(mv)
    }

    pub fn agree_draw(&mut self) -> Result<GameStatus, SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::GameOver(self.status));
        }
        self.status = GameStatus::Draw(DrawReason::Agreement);
        Ok(self.status)
    }

    pub(crate) fn restore_agreed_draw(&mut self) {
        if self.is_active() {
            self.status = GameStatus::Draw(DrawReason::Agreement);
        }
    }
}
