//! Outgoing `action` trees.

use tracing::debug;

use super::{Command, ID_KEY, JID_KEY, ROUTER_TARGET, Router, TAG_KEY};
use crate::bus::{Datagram, Layer, LayeredBus};
use crate::errors::RouterError;
use crate::node::{BinaryNode, NodeCodec};
use crate::session::{Connection, SessionStore};
use crate::wire::{FLAG_KEY, Flags, METRIC_KEY, Metric};

/// One child wrapped in an `action` node and sent to layer 2.
struct OutgoingAction<'a> {
    kind: &'static str,
    child: BinaryNode,
    metric: Metric,
    flags: Flags,
    tag: Option<&'a str>,
}

impl<C: NodeCodec, S: SessionStore> Router<C, S> {
    /// Dispatches an application request on its `cmd`.
    ///
    /// # Errors
    ///
    /// Fails for a missing or unsupported command and for any error of the
    /// selected operation.
    pub fn send(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: &Datagram,
    ) -> Result<(), RouterError> {
        let cmd = datagram
            .cmd()
            .ok_or_else(|| RouterError::missing_command("send"))?;
        match cmd.parse::<Command>() {
            Ok(Command::SendRelayMessage) => self.send_relay_message(bus, connection, datagram),
            Ok(Command::SendSeen) => self.send_seen(bus, connection, datagram),
            Ok(_) | Err(_) => Err(RouterError::unsupported_command("send", cmd)),
        }
    }

    /// Relays an encoded message.
    ///
    /// The payload becomes a binary `message` node inside an `action` of type
    /// `relay`. The datagram's `tag` (the message id) is carried down so the
    /// server's acknowledgement can be correlated.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MissingMetadata`] without sending when `tag` is
    /// absent, and codec or bus errors otherwise.
    pub fn send_relay_message(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: &Datagram,
    ) -> Result<(), RouterError> {
        let cmd = Command::SendRelayMessage.as_str();
        let tag = datagram
            .metadata(TAG_KEY)
            .ok_or_else(|| RouterError::missing_metadata(cmd, TAG_KEY))?;
        self.send_action(
            bus,
            connection,
            OutgoingAction {
                kind: "relay",
                child: BinaryNode::binary("message", datagram.payload()),
                metric: Metric::Message,
                flags: Flags::IGNORE,
                tag: Some(tag),
            },
        )
    }

    /// Marks the message `id` from `jid` as read.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MissingMetadata`] without sending when `jid` or
    /// `id` is absent, and codec or bus errors otherwise.
    pub fn send_seen(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: &Datagram,
    ) -> Result<(), RouterError> {
        let cmd = Command::SendSeen.as_str();
        let jid = datagram
            .metadata(JID_KEY)
            .ok_or_else(|| RouterError::missing_metadata(cmd, JID_KEY))?;
        let id = datagram
            .metadata(ID_KEY)
            .ok_or_else(|| RouterError::missing_metadata(cmd, ID_KEY))?;
        // Single-message receipts only; `count` is always 1.
        let read = BinaryNode::new("read")
            .with_attribute("jid", jid)
            .with_attribute("index", id)
            .with_attribute("owner", "false")
            .with_attribute("count", "1");
        self.send_action(
            bus,
            connection,
            OutgoingAction {
                kind: "set",
                child: read,
                metric: Metric::Read,
                flags: Flags::EXPIRES | Flags::ACK_REQUEST,
                tag: None,
            },
        )
    }

    fn send_action(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        action: OutgoingAction<'_>,
    ) -> Result<(), RouterError> {
        let epoch = connection.next_epoch();
        let root = BinaryNode::list("action", vec![action.child])
            .with_attribute("type", action.kind)
            .with_attribute("epoch", epoch.to_string());
        let payload = self.codec.encode(&root)?;

        let mut datagram =
            Datagram::command(Layer::L3, Layer::L2, Command::Send.as_str()).with_payload(payload);
        datagram.set_metadata_int(METRIC_KEY, action.metric);
        datagram.set_metadata_int(FLAG_KEY, action.flags.bits());
        if let Some(tag) = action.tag {
            datagram.set_metadata(TAG_KEY, tag);
        }

        debug!(
            target: ROUTER_TARGET,
            kind = action.kind,
            epoch,
            tag = action.tag,
            bytes = datagram.payload().len(),
            "sending action"
        );
        bus.dispatch(connection, datagram)?;
        Ok(())
    }
}
