//! Layer 3: binary-node classification and outgoing actions.
//!
//! Inbound, the router decodes the node tree carried by a `recv` datagram,
//! classifies it by descriptor and response type, and hands the pieces to the
//! session collaborator or to layer 4. Outbound, it wraps application
//! requests in `action` nodes stamped with a fresh epoch and passes the
//! encoded tree down to layer 2.
//!
//! The server delivers the contact list, chat-history backfill and the most
//! recent messages in no fixed order. The router does not reorder them: it
//! moves the connection to [`ConnectionState::Ready`] once contacts have
//! been applied, and the session collaborator holds back history until then.
//!
//! [`ConnectionState::Ready`]: crate::ConnectionState::Ready

mod inbound;
mod outbound;
mod outcome;

use strum::{EnumString, IntoStaticStr};
use tracing::warn;

use crate::bus::{Datagram, Layer, LayerHandler, LayeredBus};
use crate::errors::BusError;
use crate::node::NodeCodec;
use crate::session::{Connection, SessionStore};

pub use self::outcome::IngestOutcome;

/// Tracing target for router operations.
pub(crate) const ROUTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::router");

/// Metadata key carrying the message id used as correlation tag.
pub const TAG_KEY: &str = "tag";
/// Metadata key carrying a chat or contact identifier.
pub const JID_KEY: &str = "jid";
/// Metadata key carrying a message id.
pub const ID_KEY: &str = "id";
/// Metadata key set to `1` on the final message of an action batch.
pub const LAST_KEY: &str = "last";

/// Commands understood or produced by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Inbound node tree from layer 2.
    Recv,
    /// Encoded frame for layer 2.
    Send,
    /// Decrypted message payload for layer 4.
    RecvMessage,
    /// Application request to relay a message.
    SendRelayMessage,
    /// Application request to mark a message read.
    SendSeen,
}

impl Command {
    /// Wire spelling of the command.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The layer 3 handler.
#[derive(Debug)]
pub struct Router<C, S> {
    codec: C,
    sessions: S,
}

impl<C: NodeCodec, S: SessionStore> Router<C, S> {
    /// Creates a router over a node codec and a session collaborator.
    #[must_use]
    pub const fn new(codec: C, sessions: S) -> Self {
        Self { codec, sessions }
    }

    /// The session collaborator.
    #[must_use]
    pub const fn sessions(&self) -> &S {
        &self.sessions
    }
}

impl<C: NodeCodec, S: SessionStore> LayerHandler for Router<C, S> {
    /// Datagrams from layers 1 and 2 are received, the rest are sent.
    fn handle(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: Datagram,
    ) -> Result<(), BusError> {
        if datagram.origin() < Layer::L3 {
            let outcome = self
                .recv(bus, connection, &datagram)
                .map_err(|error| BusError::handler(Layer::L3, error))?;
            if !outcome.is_clean() {
                warn!(
                    target: ROUTER_TARGET,
                    applied = outcome.applied(),
                    failed = outcome.failed(),
                    "node applied with skipped items"
                );
            }
            return Ok(());
        }
        self.send(bus, connection, &datagram)
            .map_err(|error| BusError::handler(Layer::L3, error))
    }
}
