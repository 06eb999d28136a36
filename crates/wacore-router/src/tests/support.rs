//! Recording collaborators shared by the router tests.

use std::sync::{Arc, Mutex, PoisonError};

use crate::bus::{Datagram, Layer, LayerHandler, LayeredBus};
use crate::errors::{BusError, SessionError};
use crate::node::{BinaryNode, JsonNodeCodec, NodeCodec};
use crate::router::Command;
use crate::session::{Connection, ConnectionState, SessionStore, User};

/// Layer handler that keeps every datagram it receives.
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder {
    datagrams: Arc<Mutex<Vec<Datagram>>>,
}

impl Recorder {
    pub(crate) fn datagrams(&self) -> Vec<Datagram> {
        self.datagrams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LayerHandler for Recorder {
    fn handle(
        &self,
        _bus: &LayeredBus,
        _connection: &Connection,
        datagram: Datagram,
    ) -> Result<(), BusError> {
        self.datagrams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(datagram);
        Ok(())
    }
}

/// A bus with recorders at layers 2 and 4.
pub(crate) struct RecordingBus {
    pub(crate) bus: LayeredBus,
    pub(crate) lower: Recorder,
    pub(crate) upper: Recorder,
}

impl RecordingBus {
    pub(crate) fn new() -> Self {
        let lower = Recorder::default();
        let upper = Recorder::default();
        let mut bus = LayeredBus::new();
        bus.register(Layer::L2, lower.clone());
        bus.register(Layer::L4, upper.clone());
        Self { bus, lower, upper }
    }
}

/// In-memory session store that records what the router applied.
#[derive(Debug, Default)]
pub(crate) struct FakeSessions {
    pub(crate) users: Mutex<Vec<User>>,
    pub(crate) chats: Mutex<Vec<(String, i64)>>,
    /// State passed to each flush, and what a concurrent reader saw.
    pub(crate) flushes: Mutex<Vec<(ConnectionState, Option<ConnectionState>)>>,
}

impl FakeSessions {
    pub(crate) fn users(&self) -> Vec<User> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn chats(&self) -> Vec<(String, i64)> {
        self.chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn flushes(&self) -> Vec<(ConnectionState, Option<ConnectionState>)> {
        self.flushes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStore for FakeSessions {
    fn update_user(&self, _connection: &Connection, user: User) -> Result<(), SessionError> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(user);
        Ok(())
    }

    fn update_chat(
        &self,
        _connection: &Connection,
        jid: &str,
        count: i64,
    ) -> Result<(), SessionError> {
        self.chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((jid.to_owned(), count));
        Ok(())
    }

    fn flush_chat_queue(
        &self,
        connection: &Connection,
        state: ConnectionState,
    ) -> Result<(), SessionError> {
        self.flushes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((state, connection.try_state()));
        Ok(())
    }
}

pub(crate) fn user(jid: &str, short: &str, name: &str) -> BinaryNode {
    BinaryNode::new("user")
        .with_attribute("jid", jid)
        .with_attribute("short", short)
        .with_attribute("name", name)
}

pub(crate) fn contacts(children: Vec<BinaryNode>) -> BinaryNode {
    BinaryNode::list("response", children).with_attribute("type", "contacts")
}

/// Wraps a tree in a `recv` datagram as layer 2 would deliver it.
pub(crate) fn recv_datagram(node: &BinaryNode) -> Datagram {
    let payload = JsonNodeCodec.encode(node).expect("encode node");
    Datagram::command(Layer::L2, Layer::L3, Command::Recv.as_str()).with_payload(payload)
}

/// Decodes the tree carried by a datagram sent to layer 2.
pub(crate) fn sent_tree(datagram: &Datagram) -> BinaryNode {
    JsonNodeCodec
        .decode(datagram.payload())
        .expect("decode sent node")
}
