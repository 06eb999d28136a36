//! Wiring of the dispatcher, the datagram bus and the layer 3 router.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use wacore_config::Config;
use wacore_dispatch::{Dispatcher, Message, Transport};
use wacore_router::{
    BusError, Command, Connection, ConnectionState, Datagram, Layer, LayerHandler, LayeredBus,
    NodeCodec, Router, SessionStore, TAG_KEY,
};

use crate::errors::ClientError;
use crate::sink::DispatcherSink;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// A protocol connection: dispatcher at layer 1, router at layer 3.
///
/// Layer 2 (framing and encryption) and layer 4 (the application) are
/// registered by the caller. Until a layer 2 handler exists, pumped events
/// and outgoing actions fail with [`BusError::Unrouted`].
#[derive(Debug)]
pub struct Client<T> {
    dispatcher: Arc<Dispatcher<T>>,
    connection: Connection,
    bus: LayeredBus,
    event_timeout: Duration,
    reply_timeout: Option<Duration>,
}

impl<T: Transport> Client<T> {
    /// Starts the transport and wires the layers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Headroom`] when the transport reserves fewer
    /// header bytes than configured, and [`ClientError::Dispatch`] when the
    /// transport fails to start.
    pub fn new<C, S>(
        transport: T,
        codec: C,
        sessions: S,
        config: &Config,
    ) -> Result<Self, ClientError>
    where
        C: NodeCodec + 'static,
        S: SessionStore + 'static,
    {
        let available = transport.headroom();
        if available < config.transport_headroom {
            return Err(ClientError::Headroom {
                required: config.transport_headroom,
                available,
            });
        }

        let dispatcher = Arc::new(Dispatcher::init(transport)?);
        let mut bus = LayeredBus::new();
        bus.register(Layer::L1, DispatcherSink::new(Arc::clone(&dispatcher)));
        bus.register(Layer::L3, Router::new(codec, sessions));

        let connection = Connection::new();
        connection.set_state(ConnectionState::Connecting);
        info!(
            target: CLIENT_TARGET,
            headroom = available,
            reply_timeout_ms = config.reply_timeout_ms,
            "client started"
        );
        Ok(Self {
            dispatcher,
            connection,
            bus,
            event_timeout: config.event_timeout(),
            reply_timeout: config.reply_timeout(),
        })
    }

    /// Registers the layer 2 handler, returning whether one was replaced.
    pub fn register_framing(&mut self, handler: impl LayerHandler + 'static) -> bool {
        self.bus.register(Layer::L2, handler)
    }

    /// Registers the layer 4 handler, returning whether one was replaced.
    pub fn register_application(&mut self, handler: impl LayerHandler + 'static) -> bool {
        self.bus.register(Layer::L4, handler)
    }

    /// Shared connection state.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Routes a datagram, typically an application request to layer 3.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Bus`] when any layer on the path fails.
    pub fn dispatch(&self, datagram: Datagram) -> Result<(), ClientError> {
        self.bus.dispatch(&self.connection, datagram)?;
        Ok(())
    }

    /// Sends `message` and waits for its reply, bounded by the configured
    /// reply timeout when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] for collisions, send failures and
    /// expired waits.
    pub fn request(&self, message: &Message) -> Result<Message, ClientError> {
        let reply = self.reply_timeout.map_or_else(
            || self.dispatcher.request(message),
            |timeout| self.dispatcher.request_timeout(message, timeout),
        )?;
        Ok(reply)
    }

    /// Lifts one unsolicited message onto the bus as a layer 1 `recv`.
    ///
    /// Returns `false` when no message arrived within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unrouted`] without consuming any message while no
    /// layer 2 handler is registered. Otherwise returns [`ClientError::Bus`]
    /// when a layer rejects the datagram; the message is consumed either way.
    pub fn pump_event(&self, timeout: Duration) -> Result<bool, ClientError> {
        let recv = Command::Recv.as_str();
        if !self.bus.is_registered(Layer::L2) {
            return Err(BusError::unrouted(Layer::L2, Some(recv)).into());
        }
        let Some(message) = self.dispatcher.wait_event(timeout)? else {
            return Ok(false);
        };
        let (tag, payload) = message.into_parts();
        debug!(
            target: CLIENT_TARGET,
            tag = tag.as_str(),
            bytes = payload.len(),
            "pumping unsolicited message"
        );
        let mut datagram = Datagram::command(Layer::L1, Layer::L2, recv).with_payload(payload);
        datagram.set_metadata(TAG_KEY, tag);
        self.bus.dispatch(&self.connection, datagram)?;
        Ok(true)
    }

    /// [`Self::pump_event`] with the configured event budget.
    ///
    /// # Errors
    ///
    /// As [`Self::pump_event`].
    pub fn poll_event(&self) -> Result<bool, ClientError> {
        self.pump_event(self.event_timeout)
    }

    /// Stops the transport and joins its worker.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] if the worker panicked.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.dispatcher.shutdown()?;
        self.connection.set_state(ConnectionState::Disconnected);
        info!(target: CLIENT_TARGET, "client stopped");
        Ok(())
    }
}
