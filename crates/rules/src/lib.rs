//! Relaychess Rules Engine Facade
//!
//! This crate wraps the external rules engine (the `chess` crate) behind the
//! narrow capability surface the relay core needs: apply a candidate move to
//! the authoritative position, or reject it; report terminal conditions.
//! Move legality is never computed here.
//!
//! # Architecture Constraints
//!
//! This crate MUST NOT:
//! - Perform I/O operations
//! - Read wall-clock time
//! - Know anything about connections, seats, or message delivery
//!
//! All of that belongs to the relay server crate, which drives this facade
//! through explicit calls and owns every mutation ordering decision.

#![deny(unsafe_code)]

use std::collections::HashMap;

use thiserror::Error;

pub use chess::{ChessMove, Color, File, Piece, Rank, Square};

// ============================================================================
// Errors
// ============================================================================

/// Rejection reasons surfaced by the facade.
///
/// These are inputs-at-fault conditions, not engine faults; the relay reports
/// them to the submitting connection only and leaves all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// Square string is not of the form `a1`..`h8`.
    #[error("malformed square {0:?}")]
    BadSquare(String),

    /// Promotion string is not one of `q`, `r`, `b`, `n` (or empty).
    #[error("malformed promotion piece {0:?}")]
    BadPromotion(String),

    /// The rules engine rejected the move against the current position.
    #[error("illegal move {0}")]
    IllegalMove(String),

    /// Position string could not be parsed as FEN.
    #[error("malformed FEN {0:?}")]
    BadFen(String),
}

// ============================================================================
// Input Parsing
// ============================================================================

/// Parse a square in coordinate notation (`e2`, `h8`, ...).
pub fn parse_square(s: &str) -> Result<Square, MoveError> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(MoveError::BadSquare(s.to_string()));
    }
    let file = match bytes[0] {
        b @ b'a'..=b'h' => chess::File::from_index((b - b'a') as usize),
        _ => return Err(MoveError::BadSquare(s.to_string())),
    };
    let rank = match bytes[1] {
        b @ b'1'..=b'8' => chess::Rank::from_index((b - b'1') as usize),
        _ => return Err(MoveError::BadSquare(s.to_string())),
    };
    Ok(Square::make_square(rank, file))
}

/// Parse an optional promotion piece letter. An empty string means the
/// submitting client did not disambiguate.
pub fn parse_promotion(s: &str) -> Result<Option<Piece>, MoveError> {
    match s {
        "" => Ok(None),
        "q" | "Q" => Ok(Some(Piece::Queen)),
        "r" | "R" => Ok(Some(Piece::Rook)),
        "b" | "B" => Ok(Some(Piece::Bishop)),
        "n" | "N" => Ok(Some(Piece::Knight)),
        other => Err(MoveError::BadPromotion(other.to_string())),
    }
}

/// Render a move in coordinate notation (`e2e4`, `e7e8q`).
pub fn uci(mv: ChessMove) -> String {
    fn square(sq: Square, out: &mut String) {
        out.push((b'a' + sq.get_file().to_index() as u8) as char);
        out.push((b'1' + sq.get_rank().to_index() as u8) as char);
    }

    let mut out = String::with_capacity(5);
    square(mv.get_source(), &mut out);
    square(mv.get_dest(), &mut out);
    if let Some(piece) = mv.get_promotion() {
        out.push(match piece {
            Piece::Queen => 'q',
            Piece::Rook => 'r',
            Piece::Bishop => 'b',
            Piece::Knight => 'n',
            // Pawn/King promotions cannot be constructed through parse_promotion.
            Piece::Pawn | Piece::King => '?',
        });
    }
    out
}

// ============================================================================
// Terminal Conditions
// ============================================================================

/// Why a game ended, as reported by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Checkmate { winner: Color },
    Stalemate,
    DrawByRepetition,
    InsufficientMaterial,
    /// Other claimable draw (fifty-move rule).
    DrawOther,
}

// ============================================================================
// Game
// ============================================================================

/// One authoritative chess position plus the bookkeeping needed to report
/// terminal conditions.
///
/// Claimable draws (threefold repetition, fifty-move) are treated as
/// immediately terminal after the enabling move rather than waiting for a
/// claim; the relay has no claim message.
pub struct Game {
    inner: chess::Game,
    /// Occurrence count per position, keyed by the engine's FEN rendering.
    /// Used for threefold repetition detection.
    seen: HashMap<String, u32>,
}

impl Game {
    /// Start a new game from the standard initial position.
    pub fn new() -> Self {
        let inner = chess::Game::new();
        let mut seen = HashMap::new();
        seen.insert(inner.current_position().to_string(), 1);
        Self { inner, seen }
    }

    /// Start a game from an arbitrary FEN position.
    pub fn from_fen(fen: &str) -> Result<Self, MoveError> {
        let board: chess::Board = fen
            .parse()
            .map_err(|_| MoveError::BadFen(fen.to_string()))?;
        let inner = chess::Game::new_with_board(board);
        let mut seen = HashMap::new();
        seen.insert(inner.current_position().to_string(), 1);
        Ok(Self { inner, seen })
    }

    /// Current position in FEN.
    pub fn fen(&self) -> String {
        self.inner.current_position().to_string()
    }

    /// Which color's turn it is.
    pub fn side_to_move(&self) -> Color {
        self.inner.side_to_move()
    }

    /// Piece occupying a square, if any.
    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        self.inner.current_position().piece_on(square)
    }

    /// Apply a candidate move.
    ///
    /// On rejection the position is untouched; there is no partial mutation
    /// path. Legality is checked against the current position before the
    /// engine is asked to apply.
    pub fn try_move(&mut self, mv: ChessMove) -> Result<(), MoveError> {
        let board = self.inner.current_position();
        if !board.legal(mv) || !self.inner.make_move(mv) {
            return Err(MoveError::IllegalMove(uci(mv)));
        }
        *self
            .seen
            .entry(self.inner.current_position().to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    /// Query terminal conditions against the current position.
    pub fn terminal(&self) -> Option<Terminal> {
        let board = self.inner.current_position();
        match board.status() {
            chess::BoardStatus::Checkmate => {
                // The side to move is the side that was mated.
                return Some(Terminal::Checkmate {
                    winner: !board.side_to_move(),
                });
            }
            chess::BoardStatus::Stalemate => return Some(Terminal::Stalemate),
            chess::BoardStatus::Ongoing => {}
        }

        if insufficient_material(&board) {
            return Some(Terminal::InsufficientMaterial);
        }

        if self
            .seen
            .get(&board.to_string())
            .is_some_and(|&count| count >= 3)
        {
            return Some(Terminal::DrawByRepetition);
        }

        // Repetition is handled above, so a remaining claimable draw is the
        // fifty-move rule.
        if self.inner.can_declare_draw() {
            return Some(Terminal::DrawOther);
        }

        None
    }

    /// Replay a move sequence from the standard initial position.
    ///
    /// The relay's round-trip invariant: replaying the recorded history must
    /// reproduce the authoritative position exactly.
    pub fn replay(moves: &[ChessMove]) -> Result<Self, MoveError> {
        let mut game = Self::new();
        for &mv in moves {
            game.try_move(mv)?;
        }
        Ok(game)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Neither side can possibly deliver mate: bare kings, or king plus a single
/// minor piece against a bare king.
fn insufficient_material(board: &chess::Board) -> bool {
    let mut minors = 0usize;
    for square in chess::ALL_SQUARES {
        match board.piece_on(square) {
            None | Some(Piece::King) => {}
            Some(Piece::Knight) | Some(Piece::Bishop) => minors += 1,
            Some(Piece::Pawn) | Some(Piece::Rook) | Some(Piece::Queen) => return false,
        }
    }
    minors <= 1
}

// ============================================================================
// Tests
// ============================================================================
