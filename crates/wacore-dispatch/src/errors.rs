//! Error types for request correlation and transport failures.
//!
//! Correlation anomalies that arrive on the receive path (duplicate
//! unsolicited tags, keep-alives) are logged and contained inside the
//! dispatcher. Only failures observed by the caller at the call site are
//! surfaced through [`DispatchError`].

use std::io;

use thiserror::Error;

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport accepted fewer bytes than the packet holds.
    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite {
        /// Bytes the packet holds.
        expected: usize,
        /// Bytes the transport reported as written.
        sent: usize,
    },

    /// The transport has been stopped and no longer accepts packets.
    #[error("transport is stopped")]
    Stopped,

    /// The transport worker thread was already started.
    #[error("transport worker already running")]
    AlreadyStarted,

    /// The transport worker thread panicked.
    #[error("transport worker thread panicked")]
    WorkerPanic,
}

/// Errors surfaced by [`crate::Dispatcher`] operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A pending request already holds this tag.
    #[error("tag '{tag}' is already queued")]
    DuplicateTag {
        /// The colliding tag.
        tag: String,
    },

    /// The tag cannot be framed on the wire.
    #[error("tag '{tag}' is not a valid wire tag: {reason}")]
    InvalidTag {
        /// The rejected tag.
        tag: String,
        /// Why the tag was rejected.
        reason: &'static str,
    },

    /// The transport rejected the packet.
    #[error("failed to send message '{tag}': {source}")]
    Send {
        /// Tag of the message being sent.
        tag: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// No pending request exists for the tag.
    #[error("no pending request for tag '{tag}'")]
    UnknownTag {
        /// Tag that was waited on.
        tag: String,
    },

    /// The timed wait elapsed before the reply arrived.
    #[error("no reply for tag '{tag}' within {timeout_ms}ms")]
    ReplyTimeout {
        /// Tag that was waited on.
        tag: String,
        /// Budget that elapsed, in milliseconds.
        timeout_ms: u128,
    },

    /// Starting or stopping the transport failed.
    #[error("transport lifecycle failure: {0}")]
    Transport(#[from] TransportError),

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl DispatchError {
    /// Creates a duplicate tag error.
    pub fn duplicate_tag(tag: impl Into<String>) -> Self {
        Self::DuplicateTag { tag: tag.into() }
    }

    /// Creates an invalid tag error.
    pub fn invalid_tag(tag: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidTag {
            tag: tag.into(),
            reason,
        }
    }

    /// Creates a send error wrapping the transport failure.
    pub fn send(tag: impl Into<String>, source: TransportError) -> Self {
        Self::Send {
            tag: tag.into(),
            source,
        }
    }

    /// Creates an unknown tag error.
    pub fn unknown_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTag { tag: tag.into() }
    }

    /// Creates a reply timeout error.
    pub fn reply_timeout(tag: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::ReplyTimeout {
            tag: tag.into(),
            timeout_ms: timeout.as_millis(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
