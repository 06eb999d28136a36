//! Layer 3 of the chat protocol core.
//!
//! The crate models decoded binary-node trees, the layered datagram bus the
//! protocol layers talk over, the per-connection state those layers share,
//! and the [`Router`] that sits at layer 3:
//!
//! - inbound `recv` datagrams are decoded, classified by descriptor and
//!   applied to a [`SessionStore`] or forwarded to layer 4;
//! - outbound application requests (`send_relay_message`, `send_seen`) are
//!   wrapped in `action` trees and handed to layer 2.
//!
//! The wire encoding of nodes and the encryption below layer 3 are provided
//! by collaborators behind [`NodeCodec`] and [`LayerHandler`].

mod bus;
mod errors;
mod node;
mod router;
mod session;
mod wire;

pub use self::bus::{CMD_KEY, Datagram, Layer, LayerHandler, LayeredBus};
pub use self::errors::{BusError, CodecError, HandlerFailure, RouterError, SessionError};
pub use self::node::{BinaryNode, Content, JsonNodeCodec, NodeCodec};
pub use self::router::{Command, ID_KEY, IngestOutcome, JID_KEY, LAST_KEY, Router, TAG_KEY};
pub use self::session::{Connection, ConnectionState, SessionStore, User};
pub use self::wire::{FLAG_KEY, Flags, METRIC_KEY, Metric};

#[cfg(test)]
mod tests;
