//! Metric codes and frame flags attached to outgoing frames.
//!
//! The router writes both as decimal strings into the `metric` and `flag`
//! metadata of the datagram; the framing layer turns them into the two header
//! bytes that precede the encrypted node.

use std::fmt;

use bitflags::bitflags;

/// Metadata key carrying the [`Metric`] code.
pub const METRIC_KEY: &str = "metric";

/// Metadata key carrying the [`Flags`] byte.
pub const FLAG_KEY: &str = "flag";

/// Server-side metric a frame is accounted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Metric {
    /// Client debug log upload.
    DebugLog = 1,
    /// Resume query.
    QueryResume = 2,
    /// Receipt query.
    QueryReceipt = 3,
    /// Media query.
    QueryMedia = 4,
    /// Chat list query.
    QueryChat = 5,
    /// Contact list query.
    QueryContacts = 6,
    /// Message history query.
    QueryMessages = 7,
    /// Presence update.
    Presence = 8,
    /// Presence subscription.
    PresenceSubscribe = 9,
    /// Group operation.
    Group = 10,
    /// Read receipt.
    Read = 11,
    /// Chat operation such as archive or mute.
    Chat = 12,
    /// Delivery receipt.
    Received = 13,
    /// Profile picture.
    Pic = 14,
    /// Status update.
    Status = 15,
    /// Relayed chat message.
    Message = 16,
    /// Pending actions query.
    QueryActions = 17,
    /// Block list change.
    Block = 18,
    /// Group metadata query.
    QueryGroup = 19,
    /// Link preview query.
    QueryPreview = 20,
    /// Emoji query.
    QueryEmoji = 21,
    /// Message info query.
    QueryMessageInfo = 22,
    /// Spam report.
    Spam = 23,
    /// Message search query.
    QuerySearch = 24,
    /// Identity query.
    QueryIdentity = 25,
    /// URL query.
    QueryUrl = 26,
    /// Profile change.
    Profile = 27,
    /// Contact change.
    Contact = 28,
    /// Contact card query.
    QueryVcard = 29,
    /// Status query.
    QueryStatus = 30,
    /// Status update query.
    QueryStatusUpdate = 31,
    /// Status privacy change.
    PrivacyStatus = 32,
    /// Live location query.
    QueryLiveLocations = 33,
    /// Live location update.
    LiveLocation = 34,
    /// Verified name query.
    QueryVname = 35,
    /// Label query.
    QueryLabels = 36,
    /// Call event.
    Call = 37,
    /// Call query.
    QueryCall = 38,
    /// Quick reply query.
    QueryQuickReplies = 39,
}

impl Metric {
    /// Numeric code sent on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.code())
    }
}

bitflags! {
    /// Frame flag bits. Rendered on the wire from [`Flags::bits`].
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        /// The server does not answer the frame.
        const IGNORE = 1 << 7;
        /// The server acknowledges the frame.
        const ACK_REQUEST = 1 << 6;
        /// Marks the client available.
        const AVAILABLE = 1 << 5;
        /// Marks the client unavailable.
        const NOT_AVAILABLE = 1 << 4;
        /// The frame may be discarded if not delivered promptly.
        const EXPIRES = 1 << 3;
        /// The frame is not queued for offline peers.
        const SKIP_OFFLINE = 1 << 2;
    }
}
