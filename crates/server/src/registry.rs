//! Seat bookkeeping: admission, departure, and the pre-game seat swap.
//!
//! Admission order is fixed: first connection takes White, second takes
//! Black, everyone after that observes. A vacated player seat is handed to
//! the next admitted connection.

use relaychess_rules::Color;

use crate::session::ConnectionId;

/// Role held by a connection within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Observer,
}

/// Maps connection identity to session membership.
#[derive(Debug, Default)]
pub struct Registry {
    white: Option<ConnectionId>,
    black: Option<ConnectionId>,
    observers: Vec<ConnectionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection: White if vacant, else Black, else Observer.
    pub fn admit(&mut self, conn: ConnectionId) -> Role {
        if self.white.is_none() {
            self.white = Some(conn);
            Role::Player(Color::White)
        } else if self.black.is_none() {
            self.black = Some(conn);
            Role::Player(Color::Black)
        } else {
            self.observers.push(conn);
            Role::Observer
        }
    }

    /// Remove a connection, returning the role it held.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Role> {
        if self.white == Some(conn) {
            self.white = None;
            return Some(Role::Player(Color::White));
        }
        if self.black == Some(conn) {
            self.black = None;
            return Some(Role::Player(Color::Black));
        }
        if let Some(pos) = self.observers.iter().position(|&c| c == conn) {
            self.observers.remove(pos);
            return Some(Role::Observer);
        }
        None
    }

    pub fn role_of(&self, conn: ConnectionId) -> Option<Role> {
        if self.white == Some(conn) {
            Some(Role::Player(Color::White))
        } else if self.black == Some(conn) {
            Some(Role::Player(Color::Black))
        } else if self.observers.contains(&conn) {
            Some(Role::Observer)
        } else {
            None
        }
    }

    pub fn occupant(&self, seat: Color) -> Option<ConnectionId> {
        match seat {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn both_seats_filled(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    /// Exchange the occupants of the two player seats. The caller enforces
    /// the no-moves-recorded precondition.
    pub fn swap_seats(&mut self) {
        std::mem::swap(&mut self.white, &mut self.black);
    }

    /// Every connection currently attached, players first.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut all = Vec::with_capacity(2 + self.observers.len());
        all.extend(self.white);
        all.extend(self.black);
        all.extend_from_slice(&self.observers);
        all
    }
}
