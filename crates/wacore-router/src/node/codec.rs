//! Conversion between node trees and payload bytes.

use tracing::trace;

use super::BinaryNode;
use crate::errors::CodecError;

const CODEC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::codec");

/// Behaviour required from a binary-node codec.
///
/// The production codec implements the protocol's token dictionary and lives
/// outside this crate.
pub trait NodeCodec: Send + Sync {
    /// Decodes a whole payload into a node tree.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] when the bytes are not a node tree.
    fn decode(&self, bytes: &[u8]) -> Result<BinaryNode, CodecError>;

    /// Encodes a node tree into payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] when the tree cannot be represented.
    fn encode(&self, node: &BinaryNode) -> Result<Vec<u8>, CodecError>;
}

/// JSON rendition of node trees, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNodeCodec;

impl NodeCodec for JsonNodeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<BinaryNode, CodecError> {
        let node: BinaryNode =
            serde_json::from_slice(bytes).map_err(|error| CodecError::decode(error.to_string()))?;
        trace!(
            target: CODEC_TARGET,
            descriptor = node.descriptor(),
            bytes = bytes.len(),
            "decoded node"
        );
        Ok(node)
    }

    fn encode(&self, node: &BinaryNode) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(node).map_err(|error| CodecError::encode(error.to_string()))
    }
}
