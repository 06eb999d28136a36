//! Classification and ingestion of inbound node trees.

use tracing::{debug, info, warn};

use super::{Command, IngestOutcome, LAST_KEY, ROUTER_TARGET, Router};
use crate::bus::{Datagram, Layer, LayeredBus};
use crate::errors::RouterError;
use crate::node::{BinaryNode, NodeCodec};
use crate::session::{Connection, ConnectionState, SessionStore, User};

const TYPE_ATTRIBUTE: &str = "type";
const FREQUENT_CONTACTS: &str = "frequent";

/// Top-level descriptor of an inbound tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Descriptor<'a> {
    Action,
    Response,
    Unknown(&'a str),
}

impl<'a> Descriptor<'a> {
    fn parse(value: &'a str) -> Self {
        match value {
            "action" => Self::Action,
            "response" => Self::Response,
            other => Self::Unknown(other),
        }
    }
}

/// `type` attribute of a `response` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKind<'a> {
    Contacts,
    Chat,
    Unknown(&'a str),
}

impl<'a> ResponseKind<'a> {
    fn parse(value: &'a str) -> Self {
        match value {
            "contacts" => Self::Contacts,
            "chat" => Self::Chat,
            other => Self::Unknown(other),
        }
    }
}

/// Descriptor of a child of an `action` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionChild<'a> {
    Contacts,
    Message,
    Unknown(Option<&'a str>),
}

impl<'a> ActionChild<'a> {
    fn parse(value: Option<&'a str>) -> Self {
        match value {
            Some("contacts") => Self::Contacts,
            Some("message") => Self::Message,
            other => Self::Unknown(other),
        }
    }
}

impl<C: NodeCodec, S: SessionStore> Router<C, S> {
    /// Decodes and applies the node tree carried by a `recv` datagram.
    ///
    /// # Errors
    ///
    /// Fails for any command other than `recv` and when the payload does not
    /// decode. Problems inside the tree are reported through the outcome.
    pub fn recv(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        datagram: &Datagram,
    ) -> Result<IngestOutcome, RouterError> {
        let cmd = datagram
            .cmd()
            .ok_or_else(|| RouterError::missing_command("recv"))?;
        if cmd.parse::<Command>() != Ok(Command::Recv) {
            return Err(RouterError::unsupported_command("recv", cmd));
        }
        let node = self.codec.decode(datagram.payload())?;
        Ok(self.recv_node(bus, connection, &node))
    }

    /// Classifies a decoded tree and applies it.
    ///
    /// Trees without descriptor are dropped and counted as one failure;
    /// unknown descriptors are ignored.
    pub fn recv_node(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        node: &BinaryNode,
    ) -> IngestOutcome {
        let Some(descriptor) = node.descriptor() else {
            warn!(
                target: ROUTER_TARGET,
                content = node.content().kind(),
                "dropping node without descriptor"
            );
            return IngestOutcome::failed_item();
        };
        debug!(
            target: ROUTER_TARGET,
            descriptor,
            kind = node.attribute(TYPE_ATTRIBUTE),
            content = node.content().kind(),
            "classifying node"
        );
        match Descriptor::parse(descriptor) {
            Descriptor::Action => self.recv_action(bus, connection, node),
            Descriptor::Response => self.recv_response(connection, node),
            Descriptor::Unknown(other) => {
                warn!(
                    target: ROUTER_TARGET,
                    descriptor = other,
                    "ignoring node with unknown descriptor"
                );
                IngestOutcome::default()
            }
        }
    }

    fn recv_action(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        node: &BinaryNode,
    ) -> IngestOutcome {
        let Some(children) = node.children() else {
            debug!(target: ROUTER_TARGET, "action carries no children");
            return IngestOutcome::default();
        };
        let last_index = children.len().saturating_sub(1);
        children
            .iter()
            .enumerate()
            .map(|(index, child)| match ActionChild::parse(child.descriptor()) {
                ActionChild::Contacts => self.recv_contacts(connection, child),
                ActionChild::Message => {
                    self.recv_message(bus, connection, child, index == last_index)
                }
                ActionChild::Unknown(descriptor) => {
                    warn!(
                        target: ROUTER_TARGET,
                        descriptor,
                        "skipping unknown action child"
                    );
                    IngestOutcome::failed_item()
                }
            })
            .sum()
    }

    fn recv_response(&self, connection: &Connection, node: &BinaryNode) -> IngestOutcome {
        let Some(kind) = node.attribute(TYPE_ATTRIBUTE) else {
            warn!(target: ROUTER_TARGET, "dropping response without type");
            return IngestOutcome::failed_item();
        };
        match ResponseKind::parse(kind) {
            ResponseKind::Contacts => self.recv_contacts(connection, node),
            ResponseKind::Chat => self.recv_chats(connection, node),
            ResponseKind::Unknown(other) => {
                debug!(target: ROUTER_TARGET, kind = other, "ignoring response");
                IngestOutcome::default()
            }
        }
    }

    /// Applies a contact list, then releases queued history and marks the
    /// connection ready, whatever the per-contact results.
    fn recv_contacts(&self, connection: &Connection, node: &BinaryNode) -> IngestOutcome {
        let Some(children) = node.children() else {
            warn!(
                target: ROUTER_TARGET,
                content = node.content().kind(),
                "contact list is not a list"
            );
            return IngestOutcome::failed_item();
        };
        if node.attribute(TYPE_ATTRIBUTE) == Some(FREQUENT_CONTACTS) {
            return Self::recv_frequent_contacts(children);
        }

        let mut outcome: IngestOutcome = children
            .iter()
            .map(|child| self.recv_contact(connection, child))
            .sum();

        let flushed = connection.transition_through(
            ConnectionState::ContactsReceived,
            ConnectionState::Ready,
            |state| self.sessions.flush_chat_queue(connection, state),
        );
        if let Err(error) = flushed {
            warn!(target: ROUTER_TARGET, %error, "failed to flush queued chats");
            outcome += IngestOutcome::failed_item();
        }

        info!(
            target: ROUTER_TARGET,
            applied = outcome.applied(),
            failed = outcome.failed(),
            "contacts received"
        );
        outcome
    }

    /// Frequent contacts are acknowledged but not stored.
    fn recv_frequent_contacts(children: &[BinaryNode]) -> IngestOutcome {
        info!(
            target: ROUTER_TARGET,
            entries = children.len(),
            "ignoring frequent contact list"
        );
        IngestOutcome::default()
    }

    fn recv_contact(&self, connection: &Connection, node: &BinaryNode) -> IngestOutcome {
        let user = match parse_user(node) {
            Ok(user) => user,
            Err(reason) => {
                warn!(
                    target: ROUTER_TARGET,
                    reason,
                    jid = node.attribute("jid"),
                    "skipping contact"
                );
                return IngestOutcome::failed_item();
            }
        };
        let jid = user.jid.clone();
        match self.sessions.update_user(connection, user) {
            Ok(()) => IngestOutcome::applied_item(),
            Err(error) => {
                warn!(
                    target: ROUTER_TARGET,
                    jid = jid.as_str(),
                    %error,
                    "contact update rejected"
                );
                IngestOutcome::failed_item()
            }
        }
    }

    fn recv_chats(&self, connection: &Connection, node: &BinaryNode) -> IngestOutcome {
        let Some(children) = node.children() else {
            warn!(
                target: ROUTER_TARGET,
                content = node.content().kind(),
                "chat response is not a list"
            );
            return IngestOutcome::failed_item();
        };
        children
            .iter()
            .map(|child| self.recv_chat(connection, child))
            .sum()
    }

    fn recv_chat(&self, connection: &Connection, node: &BinaryNode) -> IngestOutcome {
        let (jid, count) = match parse_chat(node) {
            Ok(summary) => summary,
            Err(reason) => {
                warn!(
                    target: ROUTER_TARGET,
                    reason,
                    jid = node.attribute("jid"),
                    count = node.attribute("count"),
                    "skipping chat summary"
                );
                return IngestOutcome::failed_item();
            }
        };
        match self.sessions.update_chat(connection, jid, count) {
            Ok(()) => IngestOutcome::applied_item(),
            Err(error) => {
                warn!(target: ROUTER_TARGET, jid, %error, "chat update rejected");
                IngestOutcome::failed_item()
            }
        }
    }

    /// Forwards one message payload to layer 4 as soon as it is seen.
    fn recv_message(
        &self,
        bus: &LayeredBus,
        connection: &Connection,
        node: &BinaryNode,
        last: bool,
    ) -> IngestOutcome {
        let Some(bytes) = node.bytes() else {
            warn!(
                target: ROUTER_TARGET,
                content = node.content().kind(),
                "message node carries no payload"
            );
            return IngestOutcome::failed_item();
        };
        let mut datagram = Datagram::command(Layer::L3, Layer::L4, Command::RecvMessage.as_str())
            .with_payload(bytes.to_vec());
        datagram.set_metadata_int(LAST_KEY, u8::from(last));
        match bus.dispatch(connection, datagram) {
            Ok(()) => IngestOutcome::applied_item(),
            Err(error) => {
                warn!(target: ROUTER_TARGET, last, %error, "failed to forward message");
                IngestOutcome::failed_item()
            }
        }
    }
}

fn parse_user(node: &BinaryNode) -> Result<User, &'static str> {
    if node.descriptor() != Some("user") {
        return Err("contact entry is not a user node");
    }
    let jid = node.attribute("jid").ok_or("missing jid")?;
    let notify = node.attribute("short").ok_or("missing short name")?;
    let name = node.attribute("name").ok_or("missing name")?;
    Ok(User {
        jid: jid.to_owned(),
        notify: notify.to_owned(),
        name: name.to_owned(),
    })
}

fn parse_chat(node: &BinaryNode) -> Result<(&str, i64), &'static str> {
    if node.descriptor() != Some("chat") {
        return Err("chat entry is not a chat node");
    }
    let jid = node.attribute("jid").ok_or("missing jid")?;
    let count = node
        .attribute("count")
        .ok_or("missing count")?
        .trim()
        .parse::<i64>()
        .map_err(|_| "count is not an integer")?;
    Ok((jid, count))
}
