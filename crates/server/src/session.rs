//! Session state: the authoritative board, the applied-move history, and the
//! lifecycle phase.
//!
//! The session is the only shared mutable state in the relay. It is mutated
//! exclusively through [`crate::Relay`] operations, which the caller must
//! serialize (see [`crate::shared::SharedRelay`]).

use relaychess_rules::{ChessMove, Color, Game, MoveError, Terminal};

/// Process-unique identity of one client message channel.
pub type ConnectionId = u64;

/// Reason a game terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Checkmate { winner: Color },
    Stalemate,
    DrawByRepetition,
    InsufficientMaterial,
    DrawOther,
    OpponentDisconnected,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkmate { winner: Color::White } => "checkmate_white",
            Self::Checkmate { winner: Color::Black } => "checkmate_black",
            Self::Stalemate => "stalemate",
            Self::DrawByRepetition => "draw_by_repetition",
            Self::InsufficientMaterial => "insufficient_material",
            Self::DrawOther => "draw_other",
            Self::OpponentDisconnected => "opponent_disconnected",
        }
    }
}

impl From<Terminal> for EndReason {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Checkmate { winner } => Self::Checkmate { winner },
            Terminal::Stalemate => Self::Stalemate,
            Terminal::DrawByRepetition => Self::DrawByRepetition,
            Terminal::InsufficientMaterial => Self::InsufficientMaterial,
            Terminal::DrawOther => Self::DrawOther,
        }
    }
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingForPlayers,
    InProgress,
    Terminated(EndReason),
}

/// One applied move, as recorded in the session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMove {
    pub mv: ChessMove,
    /// Coordinate notation (`e2e4`), for broadcasts and logs.
    pub uci: String,
}

/// The unit of shared state: one authoritative game plus its history and
/// lifecycle phase.
///
/// Invariant: `game` equals the sequential replay of `history` from the
/// starting position. [`Session::apply`] is the only mutation path during
/// play, and it updates both or neither.
pub struct Session {
    game: Game,
    history: Vec<RecordedMove>,
    phase: Phase,
}

impl Session {
    pub fn new() -> Self {
        Self {
            game: Game::new(),
            history: Vec::new(),
            phase: Phase::WaitingForPlayers,
        }
    }

    /// Begin a fresh game with both seats filled.
    pub fn start(&mut self) {
        self.game = Game::new();
        self.history.clear();
        self.phase = Phase::InProgress;
    }

    /// Discard the current game and wait for players again (hard-reset
    /// disconnect policy).
    pub fn reset(&mut self) {
        self.game = Game::new();
        self.history.clear();
        self.phase = Phase::WaitingForPlayers;
    }

    /// Resume a frozen game from its preserved position.
    pub fn resume(&mut self) {
        self.phase = Phase::InProgress;
    }

    pub fn terminate(&mut self, reason: EndReason) {
        self.phase = Phase::Terminated(reason);
    }

    /// Apply a validated move, coupling the board mutation with the history
    /// append. Returns the move's coordinate notation.
    pub fn apply(&mut self, mv: ChessMove) -> Result<String, MoveError> {
        self.game.try_move(mv)?;
        let uci = relaychess_rules::uci(mv);
        self.history.push(RecordedMove {
            mv,
            uci: uci.clone(),
        });
        Ok(uci)
    }

    pub fn in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn history(&self) -> &[RecordedMove] {
        &self.history
    }

    /// The applied moves alone, for replay verification.
    pub fn moves(&self) -> Vec<ChessMove> {
        self.history.iter().map(|r| r.mv).collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Coordinate notation of the most recent move, empty if none.
    pub fn last_move_uci(&self) -> String {
        self.history.last().map(|r| r.uci.clone()).unwrap_or_default()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaychess_rules::parse_square;

    fn e2e4() -> ChessMove {
        ChessMove::new(
            parse_square("e2").unwrap(),
            parse_square("e4").unwrap(),
            None,
        )
    }

    #[test]
    fn test_apply_couples_board_and_history() {
        let mut session = Session::new();
        session.start();

        let uci = session.apply(e2e4()).unwrap();
        assert_eq!(uci, "e2e4");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.last_move_uci(), "e2e4");
        assert_eq!(session.game().side_to_move(), Color::Black);
    }

    #[test]
    fn test_rejected_apply_leaves_history_untouched() {
        let mut session = Session::new();
        session.start();

        let bad = ChessMove::new(
            parse_square("e2").unwrap(),
            parse_square("e5").unwrap(),
            None,
        );
        assert!(session.apply(bad).is_err());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_reset_clears_game_and_history() {
        let mut session = Session::new();
        session.start();
        session.apply(e2e4()).unwrap();

        session.reset();
        assert_eq!(session.phase(), Phase::WaitingForPlayers);
        assert!(session.history().is_empty());
        assert_eq!(session.game().fen(), Game::new().fen());
    }

    #[test]
    fn test_terminate_and_resume() {
        let mut session = Session::new();
        session.start();
        session.apply(e2e4()).unwrap();

        let before = session.game().fen();
        session.terminate(EndReason::OpponentDisconnected);
        assert_eq!(
            session.phase(),
            Phase::Terminated(EndReason::OpponentDisconnected)
        );
        // Freeze preserves the position.
        assert_eq!(session.game().fen(), before);

        session.resume();
        assert!(session.in_progress());
        assert_eq!(session.game().fen(), before);
    }
}
