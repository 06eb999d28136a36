//! Tagged messages and the raw packets that carry them.
//!
//! On the wire a message is a single `,`-separated pair:
//!
//! ```text
//! <tag>,<payload>
//! ```
//!
//! The tag is ASCII without embedded commas. The payload is binary safe and
//! its length is taken from the packet, so embedded NUL bytes and further
//! commas survive the round trip. A packet without any separator is the
//! server's reply to a keep-alive and carries no message.

/// Byte separating the tag from the payload.
pub const TAG_SEPARATOR: u8 = b',';

/// A raw packet as exchanged with the transport.
///
/// Outgoing packets reserve `headroom` bytes in front of the framed message
/// for lower-layer headers. The sender never writes into that region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    buf: Vec<u8>,
    headroom: usize,
}

impl Packet {
    /// Wraps bytes handed up by the transport.
    #[must_use]
    pub fn received(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: bytes.into(),
            headroom: 0,
        }
    }

    /// Builds an outgoing packet with `headroom` zeroed header bytes.
    #[must_use]
    pub fn with_headroom(headroom: usize, data: &[u8]) -> Self {
        let mut buf = vec![0_u8; headroom];
        buf.extend_from_slice(data);
        Self { buf, headroom }
    }

    /// Framed message bytes, excluding the reserved header region.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.buf.get(self.headroom..).unwrap_or_default()
    }

    /// Number of framed message bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Whether the packet carries no message bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Size of the reserved header region.
    #[must_use]
    pub const fn headroom(&self) -> usize {
        self.headroom
    }

    /// The whole buffer, header region included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// A tagged message correlated by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: String,
    payload: Vec<u8>,
}

impl Message {
    /// Creates a message from a tag and an opaque payload.
    #[must_use]
    pub fn new(tag: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tag: tag.into(),
            payload: payload.into(),
        }
    }

    /// Correlation tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Opaque payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Splits the message into its tag and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.tag, self.payload)
    }

    /// Returns why the tag cannot be framed, if it cannot.
    #[must_use]
    pub fn tag_defect(&self) -> Option<&'static str> {
        if self.tag.is_empty() {
            Some("tag is empty")
        } else if !self.tag.is_ascii() {
            Some("tag is not ASCII")
        } else if self.tag.as_bytes().contains(&TAG_SEPARATOR) {
            Some("tag contains the ',' separator")
        } else {
            None
        }
    }

    /// Frames the message as `tag,payload` behind `headroom` header bytes.
    #[must_use]
    pub fn to_packet(&self, headroom: usize) -> Packet {
        let mut framed = Vec::with_capacity(self.tag.len() + 1 + self.payload.len());
        framed.extend_from_slice(self.tag.as_bytes());
        framed.push(TAG_SEPARATOR);
        framed.extend_from_slice(&self.payload);
        Packet::with_headroom(headroom, &framed)
    }

    /// Splits a packet at its first separator.
    ///
    /// Returns `None` for keep-alive replies, which carry no separator.
    #[must_use]
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        let data = packet.data();
        let position = data.iter().position(|byte| *byte == TAG_SEPARATOR)?;
        let (tag, rest) = data.split_at(position);
        let payload = rest.split_first().map_or(&[][..], |(_, payload)| payload);
        Some(Self {
            tag: String::from_utf8_lossy(tag).into_owned(),
            payload: payload.to_vec(),
        })
    }
}
