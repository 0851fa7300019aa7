//! Relaychess Wire Protocol Types
//!
//! This crate defines the shared Protobuf message types exchanged between a
//! relay server and its clients. Both binaries MUST depend on this crate so
//! the schema cannot drift.
//!
//! # Message Categories
//!
//! - **Client → server**: move submissions and administrative commands,
//!   wrapped in [`ClientEnvelope`].
//! - **Server → one**: private messages (role assignment, move rejection).
//! - **Server → all**: state broadcasts (game start, board updates, game
//!   over, opponent departure), wrapped in [`ServerEnvelope`].
//!
//! Move-vs-command dispatch is an exhaustive match over the envelope oneof;
//! there is no duck typing at the message boundary.

#![deny(unsafe_code)]

use prost::{Enumeration, Message, Oneof};
use relaychess_rules::{Color, Terminal};

// ============================================================================
// Enumerations
// ============================================================================

/// A connection's seat at the board.
///
/// `Observer` doubles as "no seat" in fields where a seat is optional
/// (e.g. [`GameOver::winner`] for drawn games).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enumeration)]
#[repr(i32)]
pub enum Seat {
    Observer = 0,
    White = 1,
    Black = 2,
}

impl From<Color> for Seat {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Seat::White,
            Color::Black => Seat::Black,
        }
    }
}

impl Seat {
    /// The player color this seat maps to, if any.
    pub fn color(self) -> Option<Color> {
        match self {
            Seat::White => Some(Color::White),
            Seat::Black => Some(Color::Black),
            Seat::Observer => None,
        }
    }
}

/// Terminal reason carried by [`GameOver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Enumeration)]
#[repr(i32)]
pub enum GameOverReason {
    Unspecified = 0,
    Checkmate = 1,
    Stalemate = 2,
    DrawByRepetition = 3,
    InsufficientMaterial = 4,
    DrawOther = 5,
    OpponentDisconnected = 6,
}

// ============================================================================
// Client → Server Messages
// ============================================================================

/// A proposed move from a drag-drop completion.
///
/// `player identity` is NOT included - the server binds the submitting
/// connection's seat itself and never trusts the client for it.
#[derive(Clone, PartialEq, Message)]
pub struct MoveCmd {
    /// Source square in coordinate notation (`e2`).
    #[prost(string, tag = "1")]
    pub from: String,

    /// Destination square in coordinate notation (`e4`).
    #[prost(string, tag = "2")]
    pub to: String,

    /// Promotion piece letter (`q`, `r`, `b`, `n`). Empty when the client
    /// did not disambiguate; the server then defaults to queen.
    #[prost(string, tag = "3")]
    pub promotion: String,
}

/// Explicit user request to start a fresh game.
#[derive(Clone, PartialEq, Message)]
pub struct RestartRequest {}

/// Pre-game request to exchange the two player seats.
#[derive(Clone, PartialEq, Message)]
pub struct SwapSeatsRequest {}

/// Envelope for every client → server frame.
#[derive(Clone, PartialEq, Message)]
pub struct ClientEnvelope {
    #[prost(oneof = "ClientMsg", tags = "1, 2, 3")]
    pub msg: Option<ClientMsg>,
}

/// Tagged union of client messages.
#[derive(Clone, PartialEq, Oneof)]
pub enum ClientMsg {
    #[prost(message, tag = "1")]
    Move(MoveCmd),

    #[prost(message, tag = "2")]
    Restart(RestartRequest),

    #[prost(message, tag = "3")]
    SwapSeats(SwapSeatsRequest),
}

// ============================================================================
// Server → Client Messages
// ============================================================================

/// Private admission response. Only the admitted connection learns its own
/// role directly; everyone else sees it only through state broadcasts.
#[derive(Clone, PartialEq, Message)]
pub struct RoleAssigned {
    #[prost(enumeration = "Seat", tag = "1")]
    pub seat: i32,

    /// Whether a game already exists (started or finished) at admission time.
    #[prost(bool, tag = "2")]
    pub game_in_progress: bool,
}

/// Broadcast when both seats fill or a restart is granted.
#[derive(Clone, PartialEq, Message)]
pub struct GameStart {
    /// Start-of-game position in FEN.
    #[prost(string, tag = "1")]
    pub fen: String,
}

/// Broadcast after every accepted move; also sent privately to late-joining
/// observers so they can render immediately.
#[derive(Clone, PartialEq, Message)]
pub struct BoardUpdate {
    /// Current position in FEN.
    #[prost(string, tag = "1")]
    pub fen: String,

    #[prost(enumeration = "Seat", tag = "2")]
    pub side_to_move: i32,

    /// Last applied move in coordinate notation, empty if none.
    #[prost(string, tag = "3")]
    pub last_move: String,
}

/// Private rejection notice; the board did not change.
#[derive(Clone, PartialEq, Message)]
pub struct InvalidMove {
    #[prost(string, tag = "1")]
    pub reason: String,
}

/// Broadcast on a terminal condition.
#[derive(Clone, PartialEq, Message)]
pub struct GameOver {
    #[prost(enumeration = "GameOverReason", tag = "1")]
    pub reason: i32,

    /// Winning seat for checkmate, `Observer` otherwise.
    #[prost(enumeration = "Seat", tag = "2")]
    pub winner: i32,

    /// Human-readable summary.
    #[prost(string, tag = "3")]
    pub message: String,
}

/// Broadcast when a player connection is lost.
#[derive(Clone, PartialEq, Message)]
pub struct OpponentLeft {
    /// Which seat vacated.
    #[prost(enumeration = "Seat", tag = "1")]
    pub seat: i32,

    /// True when the server also reset the board (hard-reset disconnect
    /// policy); false when the position is preserved pending a reconnect.
    #[prost(bool, tag = "2")]
    pub board_reset: bool,
}

/// Envelope for every server → client frame.
#[derive(Clone, PartialEq, Message)]
pub struct ServerEnvelope {
    #[prost(oneof = "ServerMsg", tags = "1, 2, 3, 4, 5, 6")]
    pub msg: Option<ServerMsg>,
}

/// Tagged union of server messages.
#[derive(Clone, PartialEq, Oneof)]
pub enum ServerMsg {
    #[prost(message, tag = "1")]
    RoleAssigned(RoleAssigned),

    #[prost(message, tag = "2")]
    GameStart(GameStart),

    #[prost(message, tag = "3")]
    BoardUpdate(BoardUpdate),

    #[prost(message, tag = "4")]
    InvalidMove(InvalidMove),

    #[prost(message, tag = "5")]
    GameOver(GameOver),

    #[prost(message, tag = "6")]
    OpponentLeft(OpponentLeft),
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<Terminal> for GameOver {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Checkmate { winner } => Self {
                reason: GameOverReason::Checkmate as i32,
                winner: Seat::from(winner) as i32,
                message: match winner {
                    Color::White => "Checkmate. White wins.".to_string(),
                    Color::Black => "Checkmate. Black wins.".to_string(),
                },
            },
            Terminal::Stalemate => Self {
                reason: GameOverReason::Stalemate as i32,
                winner: Seat::Observer as i32,
                message: "Stalemate.".to_string(),
            },
            Terminal::DrawByRepetition => Self {
                reason: GameOverReason::DrawByRepetition as i32,
                winner: Seat::Observer as i32,
                message: "Draw by threefold repetition.".to_string(),
            },
            Terminal::InsufficientMaterial => Self {
                reason: GameOverReason::InsufficientMaterial as i32,
                winner: Seat::Observer as i32,
                message: "Draw by insufficient material.".to_string(),
            },
            Terminal::DrawOther => Self {
                reason: GameOverReason::DrawOther as i32,
                winner: Seat::Observer as i32,
                message: "Draw.".to_string(),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    #[test]
    fn test_client_envelope_roundtrip() {
        let msg = ClientEnvelope {
            msg: Some(ClientMsg::Move(MoveCmd {
                from: "e2".to_string(),
                to: "e4".to_string(),
                promotion: String::new(),
            })),
        };
        let encoded = msg.encode_to_vec();
        let decoded = ClientEnvelope::decode(encoded.as_slice()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_server_envelope_roundtrip() {
        let msg = ServerEnvelope {
            msg: Some(ServerMsg::BoardUpdate(BoardUpdate {
                fen: "8/8/8/8/8/8/8/8 w - -".to_string(),
                side_to_move: Seat::Black as i32,
                last_move: "e2e4".to_string(),
            })),
        };
        let encoded = msg.encode_to_vec();
        let decoded = ServerEnvelope::decode(encoded.as_slice()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_checkmate_game_over_carries_winner() {
        let over = GameOver::from(Terminal::Checkmate {
            winner: Color::Black,
        });
        assert_eq!(over.reason, GameOverReason::Checkmate as i32);
        assert_eq!(over.winner, Seat::Black as i32);

        let draw = GameOver::from(Terminal::Stalemate);
        assert_eq!(draw.winner, Seat::Observer as i32);
    }

    #[test]
    fn test_seat_color_mapping() {
        assert_eq!(Seat::from(Color::White).color(), Some(Color::White));
        assert_eq!(Seat::from(Color::Black).color(), Some(Color::Black));
        assert_eq!(Seat::Observer.color(), None);
    }

    #[test]
    fn test_garbage_frame_fails_decode() {
        let garbage = [0xffu8, 0xff, 0xff, 0xff, 0xff];
        assert!(ClientEnvelope::decode(garbage.as_slice()).is_err());
    }
}
