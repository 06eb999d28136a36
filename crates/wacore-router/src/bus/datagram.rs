//! Datagrams exchanged between protocol layers.

use std::collections::BTreeMap;
use std::fmt::Display;

use super::Layer;

/// Metadata key naming the command a datagram carries.
pub const CMD_KEY: &str = "cmd";

/// A payload travelling between two layers, annotated with string metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    origin: Layer,
    dest: Layer,
    metadata: BTreeMap<String, String>,
    payload: Vec<u8>,
}

impl Datagram {
    /// Builds an empty datagram without any metadata, not even a `cmd`.
    #[must_use]
    pub const fn new(origin: Layer, dest: Layer) -> Self {
        Self {
            origin,
            dest,
            metadata: BTreeMap::new(),
            payload: Vec::new(),
        }
    }

    /// Builds an empty datagram carrying `cmd`.
    #[must_use]
    pub fn command(origin: Layer, dest: Layer, cmd: &str) -> Self {
        let mut datagram = Self::new(origin, dest);
        datagram.set_metadata(CMD_KEY, cmd);
        datagram
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Sets a metadata entry, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Sets a metadata entry to the decimal rendering of `value`.
    pub fn set_metadata_int(&mut self, key: impl Into<String>, value: impl Display) {
        self.metadata.insert(key.into(), value.to_string());
    }

    /// Looks up a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// All metadata entries in key order.
    #[must_use]
    pub const fn metadata_entries(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// The `cmd` metadata entry.
    #[must_use]
    pub fn cmd(&self) -> Option<&str> {
        self.metadata(CMD_KEY)
    }

    /// Layer that produced the datagram.
    #[must_use]
    pub const fn origin(&self) -> Layer {
        self.origin
    }

    /// Layer the datagram is addressed to.
    #[must_use]
    pub const fn dest(&self) -> Layer {
        self.dest
    }

    /// Payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the datagram, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
