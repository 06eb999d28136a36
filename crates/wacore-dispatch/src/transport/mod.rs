//! Transport abstraction the dispatcher sits on.
//!
//! A transport owns the socket and its I/O worker thread. Incoming packets are
//! handed to a registered [`PacketSink`] on that worker thread; outgoing
//! packets are written synchronously by the caller's thread. The websocket
//! implementation lives outside this crate.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::fmt;
use std::sync::Arc;

use crate::errors::TransportError;
use crate::message::Packet;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Receives packets from a transport's worker thread.
pub trait PacketSink: Send + Sync {
    /// Handles one inbound packet. Implementations must not block for long.
    fn on_packet(&self, packet: Packet);

    /// Invoked once when the connection terminates.
    fn on_closed(&self) {}
}

/// Behaviour required from a packet transport.
pub trait Transport: Send + Sync + 'static {
    /// Registers the callback that receives inbound packets.
    fn register_recv_callback(&self, sink: Arc<dyn PacketSink>);

    /// Starts the I/O worker thread.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the worker cannot be started.
    fn start(&self) -> Result<(), TransportError>;

    /// Writes a packet and returns the number of message bytes sent.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the write fails outright.
    fn send(&self, packet: &Packet) -> Result<usize, TransportError>;

    /// Signals the worker thread to stop.
    fn stop(&self);

    /// Waits for the worker thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::WorkerPanic`] if the worker panicked.
    fn join(&self) -> Result<(), TransportError>;

    /// Header bytes to reserve in front of every outgoing packet.
    fn headroom(&self) -> usize {
        0
    }
}

impl fmt::Debug for dyn Transport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Transport")
    }
}
