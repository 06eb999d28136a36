//! Layer 1 handler bridging the datagram bus to the dispatcher.

use std::sync::Arc;

use tracing::trace;
use wacore_dispatch::{Dispatcher, Message, Transport};
use wacore_router::{BusError, Command, Connection, Datagram, Layer, LayerHandler, LayeredBus, TAG_KEY};

use crate::errors::SinkError;

const SINK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sink");

/// Turns `send` datagrams into tagged dispatcher messages.
#[derive(Debug)]
pub(crate) struct DispatcherSink<T> {
    dispatcher: Arc<Dispatcher<T>>,
}

impl<T: Transport> DispatcherSink<T> {
    pub(crate) const fn new(dispatcher: Arc<Dispatcher<T>>) -> Self {
        Self { dispatcher }
    }

    fn forward(&self, datagram: Datagram) -> Result<(), SinkError> {
        if datagram.cmd() != Some(Command::Send.as_str()) {
            return Err(SinkError::UnsupportedCommand {
                cmd: datagram.cmd().unwrap_or_default().to_owned(),
            });
        }
        let tag = datagram
            .metadata(TAG_KEY)
            .ok_or(SinkError::MissingTag)?
            .to_owned();
        trace!(
            target: SINK_TARGET,
            tag = tag.as_str(),
            bytes = datagram.payload().len(),
            "handing frame to dispatcher"
        );
        self.dispatcher
            .send(&Message::new(tag, datagram.into_payload()))?;
        Ok(())
    }
}

impl<T: Transport> LayerHandler for DispatcherSink<T> {
    fn handle(
        &self,
        _bus: &LayeredBus,
        _connection: &Connection,
        datagram: Datagram,
    ) -> Result<(), BusError> {
        self.forward(datagram)
            .map_err(|error| BusError::handler(Layer::L1, error))
    }
}
