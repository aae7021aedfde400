//! The conversational message model.
//!
//! Mirrors the shape the assistant service stores and returns:
//!
//! ```json
//! {
//!   "id": "msg_abc",
//!   "created_at": 1717000000,
//!   "role": "assistant",
//!   "content": [{ "type": "text", "text": { "value": "Hello!", "annotations": [] } }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::id::MessageId;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the person chatting.
    User,
    /// Produced by the assistant.
    Assistant,
}

/// Text payload of a [`ContentBlock::Text`] block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text itself.
    pub value: String,
    /// Service-supplied annotations (citations, file paths), kept opaque.
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

/// One block of a message's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text with annotations.
    Text {
        /// The text payload.
        text: TextContent,
    },
    /// Any block kind this crate does not model (images, files).
    #[serde(other)]
    Other,
}

impl ContentBlock {
    /// A text block without annotations.
    pub fn text(value: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: TextContent {
                value: value.into(),
                annotations: Vec::new(),
            },
        }
    }

    /// The text value, if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(&text.value),
            ContentBlock::Other => None,
        }
    }
}

/// A conversational turn.
///
/// Locally created messages have no `id` until the service stores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned id, absent for messages that only exist locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Creation time in seconds since the Unix epoch.
    pub created_at: i64,
    /// Who wrote the message.
    pub role: Role,
    /// Ordered content blocks; never empty for a stored message.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A single-block text message stamped with the current time.
    pub fn text(role: Role, value: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: chrono::Utc::now().timestamp(),
            role,
            content: vec![ContentBlock::text(value)],
        }
    }

    /// A user message with the given text.
    pub fn user(value: impl Into<String>) -> Self {
        Self::text(Role::User, value)
    }

    /// An assistant message with the given text.
    pub fn assistant(value: impl Into<String>) -> Self {
        Self::text(Role::Assistant, value)
    }

    /// Attach a server id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// All text blocks joined in order. Non-text blocks are skipped.
    pub fn text_value(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }
}
