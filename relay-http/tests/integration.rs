//! Integration tests for the HTTP client using wiremock.

use futures::StreamExt;
use relay_http::AssistantClient;
use relay_sse::{StreamEvent, event_stream};
use relay_types::{ApiError, AssistantApi, AssistantId, Message, MessageId, Role, ThreadId};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn assistant() -> AssistantId {
    AssistantId::new("asst_1")
}

fn sse_body() -> String {
    concat!(
        "event: thread.run.created\n",
        "data: {\"id\":\"run_1\",\"status\":\"queued\"}\n\n",
        "event: thread.message.delta\n",
        "data: {\"id\":\"msg_2\",\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"Hel\"}}]}}\n\n",
        "event: thread.message.delta\n",
        "data: {\"id\":\"msg_2\",\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"lo!\"}}]}}\n\n",
        "event: thread.run.completed\n",
        "data: {\"id\":\"run_1\",\"status\":\"completed\"}\n\n",
        "event: done\n",
        "data: [DONE]\n\n",
    )
    .to_string()
}

#[tokio::test]
async fn create_thread_posts_fingerprint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({"fingerprint": "fp-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "t1", "object": "thread"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let thread = client.create_thread(&assistant(), "fp-1").await.unwrap();
    assert_eq!(thread.id, ThreadId::new("t1"));
}

#[tokio::test]
async fn api_key_is_sent_as_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "t1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri()).api_key("sk-test");
    let result = client.create_thread(&assistant(), "").await;
    assert!(result.is_ok(), "expected Ok, got: {:?}", result.err());
}

#[tokio::test]
async fn create_message_posts_message_json() {
    let mock_server = MockServer::start().await;

    let message = Message {
        id: None,
        created_at: 1_717_000_000,
        role: Role::User,
        content: vec![relay_types::ContentBlock::text("Hi")],
    };

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads/t1/messages"))
        .and(body_json(serde_json::json!({
            "created_at": 1_717_000_000,
            "role": "user",
            "content": [{"type": "text", "text": {"value": "Hi", "annotations": []}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "msg1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let handle = client
        .create_message(&assistant(), &ThreadId::new("t1"), &message)
        .await
        .unwrap();
    assert_eq!(handle.id, MessageId::new("msg1"));
}

#[tokio::test]
async fn create_run_streams_event_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads/t1/runs"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(), "text/event-stream"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let bytes = client
        .create_run(&assistant(), &ThreadId::new("t1"))
        .await
        .unwrap();

    let events: Vec<StreamEvent> = event_stream(bytes)
        .map(|e| e.unwrap())
        .filter(|e| futures::future::ready(!matches!(e, StreamEvent::Other { .. })))
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::MessageDelta { text: "Hel".into() },
            StreamEvent::MessageDelta { text: "lo!".into() },
            StreamEvent::RunCompleted,
        ]
    );
}

#[tokio::test]
async fn create_run_maps_error_status_before_streaming() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads/missing/runs"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No thread found"))
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let result = client
        .create_run(&assistant(), &ThreadId::new("missing"))
        .await;
    assert!(matches!(result, Err(ApiError::NotFound(msg)) if msg.contains("No thread")));
}

#[tokio::test]
async fn list_messages_sends_after_cursor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/assistants/asst_1/threads/t1/messages"))
        .and(query_param("after", "msg1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [{
                "id": "msg2",
                "created_at": 1_717_000_001,
                "role": "assistant",
                "content": [{"type": "text", "text": {"value": "Hello!", "annotations": []}}]
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let messages = client
        .list_messages(&assistant(), &ThreadId::new("t1"), &MessageId::new("msg1"))
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, Some(MessageId::new("msg2")));
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].text_value(), "Hello!");
}

#[tokio::test]
async fn server_error_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let err = client.create_thread(&assistant(), "fp").await.unwrap_err();
    assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unauthorized_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads/t1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri()).api_key("wrong");
    let err = client
        .create_message(&assistant(), &ThreadId::new("t1"), &Message::user("Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn malformed_json_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/assistants/asst_1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = AssistantClient::new(mock_server.uri());
    let err = client.create_thread(&assistant(), "fp").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}
