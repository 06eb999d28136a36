//! Tagged request/response correlation for the chat protocol core.
//!
//! Synchronous callers issue tagged requests over an asynchronous transport
//! and block until the matching reply arrives. Messages the server pushes
//! without a matching request are buffered as unsolicited events and handed
//! out oldest first by [`Dispatcher::wait_event`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use wacore_dispatch::{Dispatcher, Message};
//! use wacore_dispatch::transport::memory::MemoryTransport;
//!
//! let transport = MemoryTransport::new(0);
//! transport.set_responder(|_| Some(b"s1,[\"Conn\"]".to_vec()));
//! let dispatcher = Dispatcher::init(transport)?;
//! let reply = dispatcher.request(&Message::new("s1", b"[\"admin\",\"init\"]".to_vec()))?;
//! let event = dispatcher.wait_event(Duration::from_millis(100))?;
//! ```

mod dispatcher;
mod errors;
mod message;
pub mod transport;

pub use self::dispatcher::Dispatcher;
pub use self::errors::{DispatchError, TransportError};
pub use self::message::{Message, Packet, TAG_SEPARATOR};
pub use self::transport::{PacketSink, Transport};
