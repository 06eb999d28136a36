//! Errors surfaced by the client glue.

use thiserror::Error;
use wacore_dispatch::DispatchError;
use wacore_router::BusError;

/// Errors returned by [`crate::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport reserves fewer header bytes than lower layers need.
    #[error("transport reserves {available} header bytes, {required} required")]
    Headroom {
        /// Header bytes required by the configuration.
        required: usize,
        /// Header bytes the transport reserves.
        available: usize,
    },

    /// Request correlation failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A datagram could not be routed or handled.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Errors raised by the layer 1 handler that hands frames to the dispatcher.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The datagram has no `tag` to frame the packet with.
    #[error("outgoing frame has no tag")]
    MissingTag,

    /// Only `send` datagrams reach the transport.
    #[error("unsupported cmd '{cmd}' at layer 1")]
    UnsupportedCommand {
        /// The rejected command, empty when absent.
        cmd: String,
    },

    /// The dispatcher refused the frame.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
