//! The remote assistant operations a chat session depends on.
//!
//! [`AssistantApi`] is the object-safe boundary between the session state
//! machine and whatever actually talks to the service: `relay-http` for a
//! real deployment, `test_utils::ScriptedApi` in tests.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::id::{AssistantId, MessageId, ThreadId};
use crate::message::Message;

/// A live, pull-based stream of raw response bytes.
///
/// Dropping the stream releases the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// Result of creating a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadHandle {
    /// The new thread's id.
    pub id: ThreadId,
}

/// Result of adding a message to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    /// The stored message's id.
    pub id: MessageId,
}

/// A page of messages as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    /// Messages in the order the service returned them.
    pub data: Vec<Message>,
}

/// Remote operations against an assistant service.
///
/// Every method is a single suspension point for the caller.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create a new conversation thread for `assistant`.
    ///
    /// `fingerprint` identifies the client installation to the service.
    async fn create_thread(
        &self,
        assistant: &AssistantId,
        fingerprint: &str,
    ) -> Result<ThreadHandle, ApiError>;

    /// Append `message` to `thread`.
    async fn create_message(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
        message: &Message,
    ) -> Result<MessageHandle, ApiError>;

    /// Start a run on `thread` and return its event stream.
    async fn create_run(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
    ) -> Result<ByteStream, ApiError>;

    /// Fetch the messages stored on `thread` after the message `after`.
    async fn list_messages(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
        after: &MessageId,
    ) -> Result<Vec<Message>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn _assert_send_sync<T: Send + Sync + ?Sized>() {}

    #[test]
    fn object_safety() {
        _assert_send_sync::<dyn AssistantApi>();
        _assert_send_sync::<Arc<dyn AssistantApi>>();
    }

    #[test]
    fn message_page_decodes_data_array() {
        let page: MessagePage = serde_json::from_value(serde_json::json!({
            "object": "list",
            "data": [{
                "id": "msg_2",
                "created_at": 1,
                "role": "assistant",
                "content": [{"type": "text", "text": {"value": "Hello!", "annotations": []}}]
            }],
            "has_more": false
        }))
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].text_value(), "Hello!");
    }
}
