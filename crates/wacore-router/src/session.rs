//! Per-connection state and the session collaborator seam.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, TryLockError};

use tracing::info;

use crate::errors::SessionError;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Readiness of a connection. Later states imply the earlier ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    /// No socket.
    #[default]
    Disconnected,
    /// Socket open, handshake in progress.
    Connecting,
    /// Authenticated.
    LoggedIn,
    /// The contact list has been applied.
    ContactsReceived,
    /// Queued chat history has been flushed; live traffic may be applied.
    Ready,
}

/// Explicit per-connection context shared by the layers.
#[derive(Debug)]
pub struct Connection {
    state: RwLock<ConnectionState>,
    epoch: AtomicU64,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Creates a disconnected context whose first epoch is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            epoch: AtomicU64::new(1),
        }
    }

    /// Current readiness state. Blocks while a transition is in progress.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, or `None` while a transition holds the lock.
    #[must_use]
    pub fn try_state(&self) -> Option<ConnectionState> {
        match self.state.try_read() {
            Ok(guard) => Some(*guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(*poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Replaces the readiness state.
    pub fn set_state(&self, state: ConnectionState) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        info!(target: SESSION_TARGET, from = ?*guard, to = ?state, "connection state changed");
        *guard = state;
    }

    /// Moves to `via`, runs `step`, then moves to `to`, holding the state lock
    /// throughout so readers observe either the old state or `to`.
    ///
    /// `step` receives the intermediate state and must not read the
    /// connection state itself.
    pub fn transition_through<R>(
        &self,
        via: ConnectionState,
        to: ConnectionState,
        step: impl FnOnce(ConnectionState) -> R,
    ) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        info!(target: SESSION_TARGET, from = ?*guard, to = ?via, "connection state changed");
        *guard = via;
        let result = step(via);
        info!(target: SESSION_TARGET, from = ?via, to = ?to, "connection state changed");
        *guard = to;
        result
    }

    /// Returns the next message counter value. Strictly increasing.
    #[must_use]
    pub fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed)
    }
}

/// A contact as announced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Account identifier.
    pub jid: String,
    /// Name the contact chose for themselves.
    pub notify: String,
    /// Name from the local address book.
    pub name: String,
}

/// Persistent session state owned outside the router.
///
/// Methods are invoked synchronously on the thread processing the datagram.
pub trait SessionStore: Send + Sync {
    /// Inserts or replaces a contact.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store rejects the contact.
    fn update_user(&self, connection: &Connection, user: User) -> Result<(), SessionError>;

    /// Records the unread count of a chat.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the chat cannot be updated.
    fn update_chat(&self, connection: &Connection, jid: &str, count: i64)
    -> Result<(), SessionError>;

    /// Releases chat history queued until contacts were known.
    ///
    /// Called while the connection's state write lock is held; `state` is
    /// the state in force during the call. Neither the implementation nor
    /// anything it runs on the same thread (layer 4 consumers included) may
    /// call [`Connection::state`] or [`Connection::set_state`]: the lock is
    /// not reentrant, so that deadlocks or panics. Gate on `state` instead;
    /// [`Connection::try_state`] returns `None` for the duration.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the queue cannot be flushed.
    fn flush_chat_queue(
        &self,
        connection: &Connection,
        state: ConnectionState,
    ) -> Result<(), SessionError>;
}
