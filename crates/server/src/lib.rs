//! Relaychess Server Core
//!
//! The relay mediates between connected clients and the rules engine. It
//! owns:
//! - Session lifecycle (waiting, in progress, terminated)
//! - Seat assignment and observer admission
//! - Turn-enforced move validation and application
//! - State broadcasts and private notices
//! - Disconnect recovery
//!
//! # Architecture
//!
//! The relay is sans-IO: every operation takes decoded input and returns the
//! [`broadcast::Outbound`] messages that must be delivered, leaving actual
//! transport writes to [`broadcast::deliver`] and a caller-provided
//! [`broadcast::MessageSink`]. Each operation reads then mutates the single
//! authoritative [`session::Session`], so operations on one relay must be
//! serialized; [`shared::SharedRelay`] provides that boundary for threaded
//! dispatchers, and a single-threaded event loop gets it for free.

#![deny(unsafe_code)]

pub mod broadcast;
pub mod moves;
pub mod registry;
pub mod session;
pub mod shared;

use prost::Message as _;
use relaychess_wire::{
    BoardUpdate, ClientEnvelope, ClientMsg, GameOver, GameStart, InvalidMove, MoveCmd,
    OpponentLeft, RoleAssigned, Seat, ServerMsg,
};
use tracing::{debug, info, warn};

use broadcast::Outbound;
use moves::MoveOutcome;
use registry::{Registry, Role};
use session::{ConnectionId, EndReason, Phase, Session};

// ============================================================================
// Configuration
// ============================================================================

/// What happens to the board when a player disconnects mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectPolicy {
    /// Hard reset: fresh board, back to waiting for players. The vacated
    /// seat is open to the next admission.
    Reset,
    /// Soft notify: the position is preserved and play resumes when a new
    /// connection fills the vacant seat.
    Freeze,
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            disconnect_policy: DisconnectPolicy::Reset,
        }
    }
}

// ============================================================================
// Relay
// ============================================================================

/// The authoritative relay for one session.
///
/// Owns the session state exclusively; the registry, move pipeline, and
/// broadcaster never touch it outside a relay operation.
pub struct Relay {
    config: RelayConfig,
    registry: Registry,
    session: Session,
    next_connection_id: ConnectionId,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            session: Session::new(),
            next_connection_id: 1,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every connection currently attached, for expanding broadcasts.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.registry.connections()
    }

    /// Admit a new connection and assign it a role.
    ///
    /// The assigned role goes back privately; filling the second seat
    /// additionally starts (or, under the freeze policy, resumes) the game
    /// with a broadcast to everyone.
    pub fn connect(&mut self) -> (ConnectionId, Vec<Outbound>) {
        let conn = self.next_connection_id;
        self.next_connection_id += 1;

        let role = self.registry.admit(conn);
        info!(conn, ?role, "connection admitted");

        let mut out = Vec::new();
        match role {
            Role::Player(seat) if self.registry.both_seats_filled() => {
                // A frozen game with a live position resumes; anything else
                // (first fill, post-reset refill, finished game) starts over.
                let resumable = self.session.phase()
                    == Phase::Terminated(EndReason::OpponentDisconnected)
                    && self.session.game().terminal().is_none();

                out.push(Outbound::one(conn, role_assigned(Seat::from(seat), true)));
                if resumable {
                    self.session.resume();
                    info!("both seats filled, resuming frozen game");
                    out.push(Outbound::all(board_update(&self.session)));
                } else {
                    self.session.start();
                    info!("both seats filled, starting game");
                    out.push(Outbound::all(ServerMsg::GameStart(GameStart {
                        fen: self.session.game().fen(),
                    })));
                }
            }
            Role::Player(seat) => {
                out.push(Outbound::one(conn, role_assigned(Seat::from(seat), false)));
            }
            Role::Observer => {
                let game_exists = self.session.phase() != Phase::WaitingForPlayers;
                out.push(Outbound::one(conn, role_assigned(Seat::Observer, game_exists)));
                // Late joiners get the current position so they can render
                // immediately.
                if game_exists {
                    out.push(Outbound::one(conn, board_update(&self.session)));
                }
            }
        }
        (conn, out)
    }

    /// Handle a transport-level disconnect.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        match self.registry.remove(conn) {
            None => Vec::new(),
            Some(Role::Observer) => {
                debug!(conn, "observer left");
                Vec::new()
            }
            Some(Role::Player(seat)) => {
                info!(conn, ?seat, "player left");
                if self.session.phase() == Phase::WaitingForPlayers {
                    // No opponent was ever engaged; nothing to announce.
                    return Vec::new();
                }
                match self.config.disconnect_policy {
                    DisconnectPolicy::Reset => {
                        self.session.reset();
                        vec![Outbound::all(ServerMsg::OpponentLeft(OpponentLeft {
                            seat: Seat::from(seat) as i32,
                            board_reset: true,
                        }))]
                    }
                    DisconnectPolicy::Freeze => {
                        if self.session.in_progress() {
                            self.session.terminate(EndReason::OpponentDisconnected);
                        }
                        vec![Outbound::all(ServerMsg::OpponentLeft(OpponentLeft {
                            seat: Seat::from(seat) as i32,
                            board_reset: false,
                        }))]
                    }
                }
            }
        }
    }

    /// Decode and dispatch one client frame.
    ///
    /// Malformed frames are dropped with a log line and no state change.
    pub fn handle_frame(&mut self, conn: ConnectionId, frame: &[u8]) -> Vec<Outbound> {
        let envelope = match ClientEnvelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(conn, %err, "dropping malformed frame");
                return Vec::new();
            }
        };
        match envelope.msg {
            None => {
                warn!(conn, "dropping empty envelope");
                Vec::new()
            }
            Some(ClientMsg::Move(cmd)) => self.submit_move(conn, &cmd),
            Some(ClientMsg::Restart(_)) => self.restart(conn),
            Some(ClientMsg::SwapSeats(_)) => self.swap_seats(conn),
        }
    }

    /// Validate and apply a proposed move from a connection.
    pub fn submit_move(&mut self, conn: ConnectionId, cmd: &MoveCmd) -> Vec<Outbound> {
        let seat = match self.registry.role_of(conn) {
            Some(Role::Player(seat)) => seat,
            Some(Role::Observer) => {
                debug!(conn, "move from observer rejected");
                return vec![invalid_to(conn, "only seated players may move")];
            }
            None => {
                warn!(conn, "move from unknown connection dropped");
                return Vec::new();
            }
        };

        match moves::submit_move(&mut self.session, seat, cmd) {
            MoveOutcome::Accepted { uci, terminal } => {
                info!(conn, ?seat, %uci, "move accepted");
                let mut out = vec![Outbound::all(board_update(&self.session))];
                if let Some(terminal) = terminal {
                    self.session.terminate(EndReason::from(terminal));
                    info!(reason = EndReason::from(terminal).as_str(), "game over");
                    out.push(Outbound::all(ServerMsg::GameOver(GameOver::from(terminal))));
                }
                out
            }
            outcome => {
                // Rejection notices go only to the sender; the board stays
                // untouched.
                let reason = outcome
                    .reject_reason()
                    .unwrap_or_else(|| "invalid move".to_string());
                debug!(conn, %reason, "move rejected");
                vec![invalid_to(conn, &reason)]
            }
        }
    }

    /// Explicit restart request. Honored only from a seated player while
    /// both seats are filled.
    pub fn restart(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        if !matches!(self.registry.role_of(conn), Some(Role::Player(_))) {
            debug!(conn, "restart from non-player ignored");
            return Vec::new();
        }
        if !self.registry.both_seats_filled() {
            debug!(conn, "restart without full seats ignored");
            return Vec::new();
        }
        self.session.start();
        info!(conn, "game restarted");
        vec![Outbound::all(ServerMsg::GameStart(GameStart {
            fen: self.session.game().fen(),
        }))]
    }

    /// Pre-game color swap. Rejected once a move has been recorded.
    pub fn swap_seats(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        if !matches!(self.registry.role_of(conn), Some(Role::Player(_))) {
            debug!(conn, "seat swap from non-player ignored");
            return Vec::new();
        }
        if !self.session.history().is_empty() {
            debug!(conn, "seat swap rejected, moves already recorded");
            return vec![invalid_to(conn, "seats are locked after the first move")];
        }

        self.registry.swap_seats();
        info!("seats swapped");

        let in_progress = self.session.in_progress();
        let mut out = Vec::new();
        for seat in [relaychess_rules::Color::White, relaychess_rules::Color::Black] {
            if let Some(occupant) = self.registry.occupant(seat) {
                out.push(Outbound::one(
                    occupant,
                    role_assigned(Seat::from(seat), in_progress),
                ));
            }
        }
        out
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

// ============================================================================
// Message Builders
// ============================================================================

fn role_assigned(seat: Seat, game_in_progress: bool) -> ServerMsg {
    ServerMsg::RoleAssigned(RoleAssigned {
        seat: seat as i32,
        game_in_progress,
    })
}

fn board_update(session: &Session) -> ServerMsg {
    ServerMsg::BoardUpdate(BoardUpdate {
        fen: session.game().fen(),
        side_to_move: Seat::from(session.game().side_to_move()) as i32,
        last_move: session.last_move_uci(),
    })
}

fn invalid_to(conn: ConnectionId, reason: &str) -> Outbound {
    Outbound::one(
        conn,
        ServerMsg::InvalidMove(InvalidMove {
            reason: reason.to_string(),
        }),
    )
}

// ============================================================================
// Tests
// ============================================================================
