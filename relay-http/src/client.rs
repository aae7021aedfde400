//! Assistant service client struct and builder.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use relay_types::config::ConfigError;
use relay_types::{
    ApiError, AssistantApi, AssistantId, ByteStream, Message, MessageHandle, MessageId,
    MessagePage, ThreadHandle, ThreadId,
};
use serde::de::DeserializeOwned;

use crate::error::{map_http_status, map_reqwest_error, map_stream_error};

/// Environment variable holding the service base URL.
pub const BASE_URL_VAR: &str = "RELAY_BASE_URL";

/// Environment variable holding the bearer key.
pub const API_KEY_VAR: &str = "RELAY_API_KEY";

/// Client for the assistant service's thread/message/run endpoints.
///
/// Implements [`AssistantApi`] for use by a chat session.
///
/// # Example
///
/// ```no_run
/// use relay_http::AssistantClient;
///
/// let client = AssistantClient::new("https://chat.example.com")
///     .api_key("sk-...");
/// ```
#[derive(Clone)]
pub struct AssistantClient {
    /// Service base URL, without the `/api/assistants` suffix.
    pub(crate) base_url: String,
    /// Optional bearer key sent on every request.
    pub(crate) api_key: Option<String>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl AssistantClient {
    /// Create a client for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `authorization: Bearer <key>` on every request.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a preconfigured [`reqwest::Client`] (timeouts, proxies).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Build from `RELAY_BASE_URL` and `RELAY_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build using `lookup` to resolve variable names.
    ///
    /// `RELAY_BASE_URL` is required; `RELAY_API_KEY` is optional.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(BASE_URL_VAR))?;
        let mut client = Self::new(base_url);
        client.api_key = lookup(API_KEY_VAR).filter(|v| !v.is_empty());
        Ok(client)
    }

    /// `{base}/api/assistants/{assistant}/threads`
    pub(crate) fn threads_url(&self, assistant: &AssistantId) -> String {
        format!("{}/api/assistants/{assistant}/threads", self.base_url)
    }

    /// `{base}/api/assistants/{assistant}/threads/{thread}/messages`
    pub(crate) fn messages_url(&self, assistant: &AssistantId, thread: &ThreadId) -> String {
        format!("{}/{thread}/messages", self.threads_url(assistant))
    }

    /// `{base}/api/assistants/{assistant}/threads/{thread}/runs`
    pub(crate) fn runs_url(&self, assistant: &AssistantId, thread: &ThreadId) -> String {
        format!("{}/{thread}/runs", self.threads_url(assistant))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send, check the status, and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(map_http_status(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl AssistantApi for AssistantClient {
    async fn create_thread(
        &self,
        assistant: &AssistantId,
        fingerprint: &str,
    ) -> Result<ThreadHandle, ApiError> {
        let url = self.threads_url(assistant);
        tracing::debug!(url = %url, "creating thread");
        let builder = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({ "fingerprint": fingerprint }));
        self.send_json(builder).await
    }

    async fn create_message(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
        message: &Message,
    ) -> Result<MessageHandle, ApiError> {
        let url = self.messages_url(assistant, thread);
        tracing::debug!(url = %url, "creating message");
        let builder = self.request(reqwest::Method::POST, &url).json(message);
        self.send_json(builder).await
    }

    async fn create_run(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
    ) -> Result<ByteStream, ApiError> {
        let url = self.runs_url(assistant, thread);
        tracing::debug!(url = %url, "starting streaming run");

        let response = self
            .request(reqwest::Method::POST, &url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(map_reqwest_error)?;
            return Err(map_http_status(status, &body));
        }

        Ok(response.bytes_stream().map_err(map_stream_error).boxed())
    }

    async fn list_messages(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
        after: &MessageId,
    ) -> Result<Vec<Message>, ApiError> {
        let url = self.messages_url(assistant, thread);
        tracing::debug!(url = %url, after = %after, "fetching thread messages");
        let builder = self
            .request(reqwest::Method::GET, &url)
            .query(&[("after", after.as_str())]);
        let page: MessagePage = self.send_json(builder).await?;
        Ok(page.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_requires_base_url() {
        let err = AssistantClient::from_lookup(|_| None).err().unwrap();
        assert!(matches!(err, ConfigError::Missing(BASE_URL_VAR)));
    }

    #[test]
    fn api_key_is_optional() {
        let client = AssistantClient::from_lookup(|name| {
            (name == BASE_URL_VAR).then(|| "http://localhost:9999".to_string())
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
        assert!(client.api_key.is_none());
    }

    #[test]
    fn lookup_reads_base_url_and_key() {
        let vars: HashMap<&str, &str> = [
            (BASE_URL_VAR, "https://chat.example.com/"),
            (API_KEY_VAR, "sk-test"),
        ]
        .into_iter()
        .collect();
        let client =
            AssistantClient::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(client.base_url, "https://chat.example.com");
        assert_eq!(client.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = AssistantClient::new("http://localhost:9999/");
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn route_urls() {
        let client = AssistantClient::new("http://localhost:9999");
        let assistant = AssistantId::new("asst_1");
        let thread = ThreadId::new("t1");
        assert_eq!(
            client.threads_url(&assistant),
            "http://localhost:9999/api/assistants/asst_1/threads"
        );
        assert_eq!(
            client.messages_url(&assistant, &thread),
            "http://localhost:9999/api/assistants/asst_1/threads/t1/messages"
        );
        assert_eq!(
            client.runs_url(&assistant, &thread),
            "http://localhost:9999/api/assistants/asst_1/threads/t1/runs"
        );
    }

    #[test]
    fn builder_sets_api_key() {
        let client = AssistantClient::new("http://localhost:9999").api_key("sk-abc");
        assert_eq!(client.api_key, Some("sk-abc".to_string()));
    }
}
