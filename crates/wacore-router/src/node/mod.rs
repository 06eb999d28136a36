//! Decoded binary-node trees.
//!
//! A node is a descriptor, a flat string attribute map and exactly one kind
//! of content. The wire bytes belong to a [`NodeCodec`]; this module only
//! models the tree the router classifies and builds.

mod codec;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use self::codec::{JsonNodeCodec, NodeCodec};

/// Content carried by a [`BinaryNode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Content {
    /// No content.
    #[default]
    Empty,
    /// Ordered child nodes.
    List(Vec<BinaryNode>),
    /// Opaque bytes, typically an encoded protocol message.
    Binary(Vec<u8>),
}

impl Content {
    /// Short name for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::List(_) => "list",
            Self::Binary(_) => "binary",
        }
    }
}

/// One node of a decoded protocol tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryNode {
    #[serde(default)]
    descriptor: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    content: Content,
}

impl BinaryNode {
    /// Creates an empty node with the given descriptor.
    #[must_use]
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: Some(descriptor.into()),
            ..Self::default()
        }
    }

    /// Creates a node without descriptor. Such nodes are never classified.
    #[must_use]
    pub fn anonymous(content: Content) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    /// Creates a list node.
    #[must_use]
    pub fn list(descriptor: impl Into<String>, children: Vec<Self>) -> Self {
        Self::new(descriptor).with_content(Content::List(children))
    }

    /// Creates a binary node.
    #[must_use]
    pub fn binary(descriptor: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(descriptor).with_content(Content::Binary(bytes.into()))
    }

    /// Adds or replaces an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Replaces the content.
    #[must_use]
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    /// Descriptor, if the node has one.
    #[must_use]
    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// All attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// The node's content.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Children of a list node.
    #[must_use]
    pub fn children(&self) -> Option<&[Self]> {
        match &self.content {
            Content::List(children) => Some(children),
            Content::Empty | Content::Binary(_) => None,
        }
    }

    /// Bytes of a binary node.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Binary(bytes) => Some(bytes),
            Content::Empty | Content::List(_) => None,
        }
    }
}
