//! Error types for node coding, datagram routing and the L3 router.
//!
//! Item-level ingestion failures (a contact without a `jid`, a chat with a
//! malformed count) never surface here. They are logged, skipped and counted
//! in [`crate::IngestOutcome`]. The errors below abort the whole datagram.

use std::error::Error as StdError;

use thiserror::Error;

use crate::bus::Layer;

/// Boxed error raised by a layer handler.
pub type HandlerFailure = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by a [`crate::NodeCodec`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes do not describe a node tree.
    #[error("failed to decode binary node: {message}")]
    Decode {
        /// Codec-specific description.
        message: String,
    },

    /// The node tree cannot be serialised.
    #[error("failed to encode binary node: {message}")]
    Encode {
        /// Codec-specific description.
        message: String,
    },
}

impl CodecError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

/// Errors raised while moving a datagram between layers.
#[derive(Debug, Error)]
pub enum BusError {
    /// No handler is registered for the destination layer.
    #[error("no handler registered for {layer} (cmd '{cmd}')")]
    Unrouted {
        /// Destination layer of the datagram.
        layer: Layer,
        /// Command carried by the datagram, empty when absent.
        cmd: String,
    },

    /// The destination handler rejected the datagram.
    #[error("{layer} handler failed: {source}")]
    Handler {
        /// Layer whose handler failed.
        layer: Layer,
        /// Underlying failure.
        #[source]
        source: HandlerFailure,
    },
}

impl BusError {
    /// Creates an unrouted datagram error.
    pub fn unrouted(layer: Layer, cmd: Option<&str>) -> Self {
        Self::Unrouted {
            layer,
            cmd: cmd.unwrap_or_default().to_owned(),
        }
    }

    /// Wraps a handler failure.
    pub fn handler(layer: Layer, source: impl Into<HandlerFailure>) -> Self {
        Self::Handler {
            layer,
            source: source.into(),
        }
    }
}

/// Errors reported by session collaborators.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The chat is not known to the session.
    #[error("unknown chat '{jid}'")]
    UnknownChat {
        /// Chat identifier.
        jid: String,
    },

    /// The backing store refused the update.
    #[error("session store failure: {message}")]
    Store {
        /// Description of the failure.
        message: String,
    },
}

impl SessionError {
    /// Creates an unknown chat error.
    pub fn unknown_chat(jid: impl Into<String>) -> Self {
        Self::UnknownChat { jid: jid.into() }
    }

    /// Creates a store failure.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// Errors raised by [`crate::Router`] for a whole datagram.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The datagram carries no `cmd` metadata.
    #[error("datagram for {operation} has no cmd")]
    MissingCommand {
        /// Router entry point that received the datagram.
        operation: &'static str,
    },

    /// The `cmd` is not handled by the entry point.
    #[error("unsupported cmd '{cmd}' for {operation}")]
    UnsupportedCommand {
        /// Router entry point that received the datagram.
        operation: &'static str,
        /// The rejected command.
        cmd: String,
    },

    /// Required outgoing metadata is absent.
    #[error("'{cmd}' requires '{key}' metadata")]
    MissingMetadata {
        /// Command being built.
        cmd: &'static str,
        /// Missing metadata key.
        key: &'static str,
    },

    /// Decoding or encoding the node tree failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Handing the produced datagram to another layer failed.
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl RouterError {
    /// Creates a missing command error.
    pub const fn missing_command(operation: &'static str) -> Self {
        Self::MissingCommand { operation }
    }

    /// Creates an unsupported command error.
    pub fn unsupported_command(operation: &'static str, cmd: impl Into<String>) -> Self {
        Self::UnsupportedCommand {
            operation,
            cmd: cmd.into(),
        }
    }

    /// Creates a missing metadata error.
    pub const fn missing_metadata(cmd: &'static str, key: &'static str) -> Self {
        Self::MissingMetadata { cmd, key }
    }
}
