//! Client-side core of the chat protocol.
//!
//! [`Client`] ties together the tagged request dispatcher from
//! [`wacore_dispatch`] and the layer 3 router from [`wacore_router`]. The
//! dispatcher sits below layer 1: `send` datagrams reaching layer 1 are framed
//! as tagged messages, and unsolicited messages are pumped back up the bus as
//! `recv` datagrams. Framing and encryption (layer 2) and the application
//! (layer 4) are supplied by the embedding program.
//!
//! [`telemetry::initialise`] installs the tracing subscriber described by the
//! shared [`Config`].

mod client;
mod errors;
mod sink;
pub mod telemetry;

pub use self::client::Client;
pub use self::errors::{ClientError, SinkError};
pub use wacore_config::{Config, ConfigError, LogFormat};
