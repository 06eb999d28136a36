//! Layered datagram bus.
//!
//! Each protocol layer registers one handler. A datagram is delivered to the
//! handler of its destination layer, which may in turn dispatch new datagrams
//! through the same bus. Handlers are invoked synchronously on the caller's
//! thread.

mod datagram;

use std::collections::BTreeMap;
use std::fmt;

use strum::Display;
use tracing::trace;

use crate::errors::BusError;
use crate::session::Connection;

pub use self::datagram::{CMD_KEY, Datagram};

const BUS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bus");

/// Protocol layers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Layer {
    /// Packet transport and tag correlation.
    L1,
    /// Session framing and encryption.
    L2,
    /// Binary-node routing.
    L3,
    /// Application messages.
    L4,
}

/// Receives datagrams addressed to one layer.
pub trait LayerHandler: Send + Sync {
    /// Handles a datagram. `bus` may be used to pass results to other layers.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the datagram cannot be handled.
    fn handle(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: Datagram,
    ) -> Result<(), BusError>;
}

impl<F> LayerHandler for F
where
    F: Fn(&LayeredBus, &Connection, Datagram) -> Result<(), BusError> + Send + Sync,
{
    fn handle(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: Datagram,
    ) -> Result<(), BusError> {
        self(bus, connection, datagram)
    }
}

/// Registry of layer handlers.
#[derive(Default)]
pub struct LayeredBus {
    handlers: BTreeMap<Layer, Box<dyn LayerHandler>>,
}

impl fmt::Debug for LayeredBus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LayeredBus")
            .field("layers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LayeredBus {
    /// Creates a bus with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `layer`, returning whether one was replaced.
    pub fn register(&mut self, layer: Layer, handler: impl LayerHandler + 'static) -> bool {
        self.handlers.insert(layer, Box::new(handler)).is_some()
    }

    /// Whether a handler is registered for `layer`.
    #[must_use]
    pub fn is_registered(&self, layer: Layer) -> bool {
        self.handlers.contains_key(&layer)
    }

    /// Delivers `datagram` to the handler of its destination layer.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unrouted`] when the layer has no handler, or the
    /// handler's own error.
    pub fn dispatch(&self, connection: &Connection, datagram: Datagram) -> Result<(), BusError> {
        let dest = datagram.dest();
        let Some(handler) = self.handlers.get(&dest) else {
            return Err(BusError::unrouted(dest, datagram.cmd()));
        };
        trace!(
            target: BUS_TARGET,
            origin = %datagram.origin(),
            dest = %dest,
            cmd = datagram.cmd(),
            bytes = datagram.payload().len(),
            "dispatching datagram"
        );
        handler.handle(self, connection, datagram)
    }
}
