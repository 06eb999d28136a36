//! End-to-end tests wiring a client over the in-memory transport.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rstest::{fixture, rstest};
use wacore::{Client, ClientError, Config};
use wacore_dispatch::transport::memory::MemoryTransport;
use wacore_dispatch::{DispatchError, Message};
use wacore_router::{
    BinaryNode, BusError, Connection, ConnectionState, Datagram, JsonNodeCodec, LAST_KEY, Layer,
    LayeredBus, NodeCodec, SessionError, SessionStore, TAG_KEY, User,
};

const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct Recorded {
    users: Vec<User>,
    flushes: Vec<ConnectionState>,
}

#[derive(Debug, Clone, Default)]
struct SharedSessions {
    recorded: Arc<Mutex<Recorded>>,
}

impl SharedSessions {
    fn users(&self) -> usize {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .users
            .len()
    }

    fn flushes(&self) -> Vec<ConnectionState> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flushes
            .clone()
    }
}

impl SessionStore for SharedSessions {
    fn update_user(&self, _connection: &Connection, user: User) -> Result<(), SessionError> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .users
            .push(user);
        Ok(())
    }

    fn update_chat(
        &self,
        _connection: &Connection,
        jid: &str,
        _count: i64,
    ) -> Result<(), SessionError> {
        Err(SessionError::unknown_chat(jid))
    }

    fn flush_chat_queue(
        &self,
        _connection: &Connection,
        state: ConnectionState,
    ) -> Result<(), SessionError> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flushes
            .push(state);
        Ok(())
    }
}

/// Layer 2 stand-in: passes `recv` up to layer 3 and everything else down to
/// layer 1 without transforming the payload.
fn passthrough(
    bus: &LayeredBus,
    connection: &Connection,
    datagram: Datagram,
) -> Result<(), BusError> {
    let dest = if datagram.origin() < Layer::L2 {
        Layer::L3
    } else {
        Layer::L1
    };
    let mut forwarded = Datagram::command(Layer::L2, dest, "");
    for (key, value) in datagram.metadata_entries() {
        forwarded.set_metadata(key.clone(), value.clone());
    }
    bus.dispatch(connection, forwarded.with_payload(datagram.into_payload()))
}

struct Harness {
    transport: MemoryTransport,
    sessions: SharedSessions,
    client: Client<MemoryTransport>,
    delivered: Arc<Mutex<Vec<Datagram>>>,
}

fn harness_with(config: &Config) -> Harness {
    let transport = MemoryTransport::new(config.transport_headroom);
    let sessions = SharedSessions::default();
    let mut client = Client::new(transport.clone(), JsonNodeCodec, sessions.clone(), config)
        .expect("client starts");
    client.register_framing(passthrough);

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    client.register_application(
        move |_bus: &LayeredBus, _connection: &Connection, datagram: Datagram| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(datagram);
            Ok::<(), BusError>(())
        },
    );
    Harness {
        transport,
        sessions,
        client,
        delivered,
    }
}

#[fixture]
fn harness() -> Harness {
    harness_with(&Config::default())
}

fn encoded(node: &BinaryNode) -> Vec<u8> {
    JsonNodeCodec.encode(node).expect("node encodes")
}

fn framed(tag: &str, node: &BinaryNode) -> Vec<u8> {
    let mut bytes = format!("{tag},").into_bytes();
    bytes.extend(encoded(node));
    bytes
}

#[rstest]
fn rejects_transport_without_headroom() {
    let config = Config::default();
    let result = Client::new(
        MemoryTransport::new(4),
        JsonNodeCodec,
        SharedSessions::default(),
        &config,
    );
    assert!(matches!(
        result,
        Err(ClientError::Headroom {
            required: 16,
            available: 4
        })
    ));
}

#[rstest]
fn new_client_is_connecting(harness: Harness) {
    assert_eq!(
        harness.client.connection().state(),
        ConnectionState::Connecting
    );
}

#[rstest]
fn relayed_message_reaches_transport_with_its_tag(harness: Harness) {
    let mut request = Datagram::command(Layer::L4, Layer::L3, "send_relay_message")
        .with_payload(b"hello".to_vec());
    request.set_metadata(TAG_KEY, "3EB0A1");

    harness.client.dispatch(request).expect("relay succeeds");

    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1);
    let frame = sent.first().expect("one frame");
    assert!(frame.starts_with(b"3EB0A1,"));
    let body = frame.get(b"3EB0A1,".len()..).expect("frame body");
    let tree = JsonNodeCodec.decode(body).expect("body decodes");
    assert_eq!(tree.descriptor(), Some("action"));
    assert_eq!(tree.attribute("type"), Some("relay"));
}

#[rstest]
fn pumped_contacts_make_the_connection_ready(harness: Harness) {
    let response = BinaryNode::list(
        "response",
        vec![
            BinaryNode::new("user")
                .with_attribute("jid", "1@s.whatsapp.net")
                .with_attribute("short", "Ann")
                .with_attribute("name", "Ann Example"),
        ],
    )
    .with_attribute("type", "contacts");
    harness.transport.inject(framed("s1", &response));

    assert!(harness.client.pump_event(WAIT).expect("pump succeeds"));
    assert_eq!(harness.sessions.users(), 1);
    assert_eq!(
        harness.sessions.flushes(),
        vec![ConnectionState::ContactsReceived]
    );
    assert_eq!(harness.client.connection().state(), ConnectionState::Ready);
}

#[rstest]
fn pumped_messages_reach_the_application(harness: Harness) {
    let action = BinaryNode::list(
        "action",
        vec![
            BinaryNode::binary("message", b"first".to_vec()),
            BinaryNode::binary("message", b"second".to_vec()),
        ],
    );
    harness.transport.inject(framed("preempt-1", &action));

    assert!(harness.client.pump_event(WAIT).expect("pump succeeds"));
    let delivered = harness
        .delivered
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let summary: Vec<(&[u8], Option<&str>)> = delivered
        .iter()
        .map(|datagram| (datagram.payload(), datagram.metadata(LAST_KEY)))
        .collect();
    assert_eq!(
        summary,
        vec![
            (&b"first"[..], Some("0")),
            (&b"second"[..], Some("1")),
        ]
    );
}

#[rstest]
fn empty_pump_reports_no_event(harness: Harness) {
    let pumped = harness
        .client
        .pump_event(Duration::from_millis(20))
        .expect("pump succeeds");
    assert!(!pumped);
}

#[rstest]
fn request_round_trips_through_transport(harness: Harness) {
    harness.transport.set_responder(|data| {
        data.starts_with(b"r1,").then(|| b"r1,pong".to_vec())
    });

    let reply = harness
        .client
        .request(&Message::new("r1", b"ping".to_vec()))
        .expect("reply arrives");

    assert_eq!(reply.tag(), "r1");
    assert_eq!(reply.payload(), b"pong");
}

#[rstest]
fn configured_reply_timeout_bounds_requests() {
    let config = Config {
        reply_timeout_ms: Some(20),
        ..Config::default()
    };
    let harness = harness_with(&config);

    let result = harness.client.request(&Message::new("r2", b"ping".to_vec()));

    assert!(matches!(
        result,
        Err(ClientError::Dispatch(DispatchError::ReplyTimeout { .. }))
    ));
}

#[rstest]
fn untagged_frame_is_rejected_at_layer_one(harness: Harness) {
    let frame = Datagram::command(Layer::L2, Layer::L1, "send").with_payload(b"x".to_vec());

    let result = harness.client.dispatch(frame);

    assert!(matches!(
        result,
        Err(ClientError::Bus(BusError::Handler {
            layer: Layer::L1,
            ..
        }))
    ));
    assert!(harness.transport.sent().is_empty());
}

#[rstest]
fn shutdown_closes_the_dispatcher(harness: Harness) {
    harness.client.shutdown().expect("shutdown succeeds");

    assert!(harness.client.dispatcher().is_closed());
    assert_eq!(
        harness.client.connection().state(),
        ConnectionState::Disconnected
    );
}

#[rstest]
fn pump_without_framing_keeps_the_event() {
    let transport = MemoryTransport::new(16);
    let sessions = SharedSessions::default();
    let config = Config::default();
    let mut client = Client::new(transport.clone(), JsonNodeCodec, sessions.clone(), &config)
        .expect("client starts");
    let response = BinaryNode::list("response", vec![]).with_attribute("type", "contacts");
    transport.inject(framed("s2", &response));

    let result = client.pump_event(WAIT);
    assert!(matches!(
        result,
        Err(ClientError::Bus(BusError::Unrouted {
            layer: Layer::L2,
            ..
        }))
    ));

    client.register_framing(passthrough);
    assert!(client.pump_event(WAIT).expect("pump succeeds"));
    assert_eq!(sessions.flushes(), vec![ConnectionState::ContactsReceived]);
}
