//! Move validation pipeline.
//!
//! Rules, in order:
//! - No game in progress: REJECT
//! - Submitting seat is not the side to move: REJECT
//! - Square unparseable, or promotion string unparseable on a promoting
//!   move: REJECT (promotion letters on ordinary moves are ignored)
//! - Rules engine rejects the move: REJECT
//! - Otherwise: apply, append to history, report terminal conditions
//!
//! Rejection never mutates the session. Turn ownership is checked before the
//! rules engine is consulted; it is the one guarantee everything else leans
//! on.

use relaychess_rules::{ChessMove, Color, Game, Piece, Rank, Terminal};
use relaychess_wire::MoveCmd;

use crate::session::Session;

/// Result of a move submission.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Move applied; `terminal` is set when it ended the game.
    Accepted {
        uci: String,
        terminal: Option<Terminal>,
    },
    /// No game is in progress.
    RejectedNoGame,
    /// It is not the submitting seat's turn.
    RejectedOutOfTurn,
    /// Squares or promotion piece could not be parsed.
    RejectedMalformed { detail: String },
    /// The rules engine rejected the move.
    RejectedIllegal { detail: String },
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Rejection reason to report to the submitting connection.
    pub fn reject_reason(&self) -> Option<String> {
        match self {
            Self::Accepted { .. } => None,
            Self::RejectedNoGame => Some("no game in progress".to_string()),
            Self::RejectedOutOfTurn => Some("not your turn".to_string()),
            Self::RejectedMalformed { detail } | Self::RejectedIllegal { detail } => {
                Some(detail.clone())
            }
        }
    }
}

/// Validate and apply one proposed move for the given seat.
pub fn submit_move(session: &mut Session, seat: Color, cmd: &MoveCmd) -> MoveOutcome {
    if !session.in_progress() {
        return MoveOutcome::RejectedNoGame;
    }
    if session.game().side_to_move() != seat {
        return MoveOutcome::RejectedOutOfTurn;
    }

    let from = match relaychess_rules::parse_square(&cmd.from) {
        Ok(square) => square,
        Err(e) => {
            return MoveOutcome::RejectedMalformed {
                detail: e.to_string(),
            };
        }
    };
    let to = match relaychess_rules::parse_square(&cmd.to) {
        Ok(square) => square,
        Err(e) => {
            return MoveOutcome::RejectedMalformed {
                detail: e.to_string(),
            };
        }
    };
    // Clients habitually attach a promotion letter to every move; it is
    // meaningful only when a pawn actually reaches the last rank.
    let promotion = if promotes(session.game(), seat, from, to) {
        match relaychess_rules::parse_promotion(&cmd.promotion) {
            Ok(piece) => piece.or(Some(Piece::Queen)),
            Err(e) => {
                return MoveOutcome::RejectedMalformed {
                    detail: e.to_string(),
                };
            }
        }
    } else {
        None
    };

    match session.apply(ChessMove::new(from, to, promotion)) {
        Ok(uci) => MoveOutcome::Accepted {
            uci,
            terminal: session.game().terminal(),
        },
        Err(e) => MoveOutcome::RejectedIllegal {
            detail: e.to_string(),
        },
    }
}

/// Application policy, not a rules-engine concern: whether this move is a
/// pawn reaching the last rank. Only such moves carry a promotion piece,
/// defaulting to queen when the client did not disambiguate.
fn promotes(
    game: &Game,
    seat: Color,
    from: relaychess_rules::Square,
    to: relaychess_rules::Square,
) -> bool {
    let back_rank = match seat {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    game.piece_on(from) == Some(Piece::Pawn) && to.get_rank() == back_rank
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(from: &str, to: &str) -> MoveCmd {
        MoveCmd {
            from: from.to_string(),
            to: to.to_string(),
            promotion: String::new(),
        }
    }

    fn started_session() -> Session {
        let mut session = Session::new();
        session.start();
        session
    }

    #[test]
    fn test_accepted_move_reports_uci() {
        let mut session = started_session();
        let outcome = submit_move(&mut session, Color::White, &cmd("e2", "e4"));
        assert_eq!(
            outcome,
            MoveOutcome::Accepted {
                uci: "e2e4".to_string(),
                terminal: None,
            }
        );
    }

    #[test]
    fn test_out_of_turn_changes_nothing() {
        let mut session = started_session();
        let before = session.game().fen();

        let outcome = submit_move(&mut session, Color::Black, &cmd("e7", "e5"));
        assert_eq!(outcome, MoveOutcome::RejectedOutOfTurn);
        assert_eq!(session.game().fen(), before);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_no_game_rejected() {
        let mut session = Session::new();
        let outcome = submit_move(&mut session, Color::White, &cmd("e2", "e4"));
        assert_eq!(outcome, MoveOutcome::RejectedNoGame);
    }

    #[test]
    fn test_malformed_square_rejected_without_mutation() {
        let mut session = started_session();
        let before = session.game().fen();

        let outcome = submit_move(&mut session, Color::White, &cmd("e2", "e9"));
        assert!(matches!(outcome, MoveOutcome::RejectedMalformed { .. }));
        assert_eq!(session.game().fen(), before);
    }

    #[test]
    fn test_illegal_move_rejected_without_mutation() {
        let mut session = started_session();
        let before = session.game().fen();

        let outcome = submit_move(&mut session, Color::White, &cmd("e2", "e5"));
        assert!(matches!(outcome, MoveOutcome::RejectedIllegal { .. }));
        assert_eq!(session.game().fen(), before);
        assert!(session.history().is_empty());
    }

    /// Drive a session to the brink of promotion: the white a-pawn marches
    /// through to a7, capturing its way past the black pawn chain while
    /// black shuffles a knight. White to move, a7xb8 promotes.
    fn session_one_move_from_promotion() -> Session {
        let mut session = started_session();
        let script = [
            (Color::White, "a2", "a4"),
            (Color::Black, "b7", "b5"),
            (Color::White, "a4", "b5"),
            (Color::Black, "g8", "h6"),
            (Color::White, "b5", "b6"),
            (Color::Black, "h6", "g8"),
            (Color::White, "b6", "a7"),
            (Color::Black, "g8", "h6"),
        ];
        for (seat, from, to) in script {
            assert!(submit_move(&mut session, seat, &cmd(from, to)).is_accepted());
        }
        session
    }

    #[test]
    fn test_promotion_letter_on_ordinary_move_is_ignored() {
        // Clients attach `promotion: "q"` to every drag, promotion or not;
        // it must not affect ordinary moves.
        let mut session = started_session();
        let outcome = submit_move(
            &mut session,
            Color::White,
            &MoveCmd {
                from: "e2".to_string(),
                to: "e4".to_string(),
                promotion: "q".to_string(),
            },
        );
        assert_eq!(
            outcome,
            MoveOutcome::Accepted {
                uci: "e2e4".to_string(),
                terminal: None,
            }
        );

        // Even a garbage letter is irrelevant off the last rank.
        let outcome = submit_move(
            &mut session,
            Color::Black,
            &MoveCmd {
                from: "e7".to_string(),
                to: "e5".to_string(),
                promotion: "x".to_string(),
            },
        );
        assert!(outcome.is_accepted());
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_unspecified_promotion_defaults_to_queen() {
        let mut session = session_one_move_from_promotion();

        // a7xb8 with no promotion letter: the coordinator fills in queen.
        let outcome = submit_move(&mut session, Color::White, &cmd("a7", "b8"));
        match outcome {
            MoveOutcome::Accepted { ref uci, .. } => assert_eq!(uci, "a7b8q"),
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert_eq!(
            session.game().piece_on(relaychess_rules::Square::B8),
            Some(Piece::Queen)
        );
    }

    #[test]
    fn test_explicit_promotion_letter_honored() {
        let mut session = session_one_move_from_promotion();

        let outcome = submit_move(
            &mut session,
            Color::White,
            &MoveCmd {
                from: "a7".to_string(),
                to: "b8".to_string(),
                promotion: "n".to_string(),
            },
        );
        match outcome {
            MoveOutcome::Accepted { ref uci, .. } => assert_eq!(uci, "a7b8n"),
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert_eq!(
            session.game().piece_on(relaychess_rules::Square::B8),
            Some(Piece::Knight)
        );
    }

    #[test]
    fn test_bad_promotion_letter_rejected_on_promoting_move() {
        let mut session = session_one_move_from_promotion();
        let before = session.game().fen();

        let outcome = submit_move(
            &mut session,
            Color::White,
            &MoveCmd {
                from: "a7".to_string(),
                to: "b8".to_string(),
                promotion: "x".to_string(),
            },
        );
        assert!(matches!(outcome, MoveOutcome::RejectedMalformed { .. }));
        assert_eq!(session.game().fen(), before);
    }

    #[test]
    fn test_fools_mate_reports_checkmate() {
        let mut session = started_session();
        let script = [
            (Color::White, "f2", "f3"),
            (Color::Black, "e7", "e5"),
            (Color::White, "g2", "g4"),
        ];
        for (seat, from, to) in script {
            assert!(submit_move(&mut session, seat, &cmd(from, to)).is_accepted());
        }

        let outcome = submit_move(&mut session, Color::Black, &cmd("d8", "h4"));
        match outcome {
            MoveOutcome::Accepted { terminal, .. } => {
                assert_eq!(
                    terminal,
                    Some(Terminal::Checkmate {
                        winner: Color::Black
                    })
                );
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }
}
