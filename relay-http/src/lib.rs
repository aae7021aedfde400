#![deny(missing_docs)]
//! HTTP binding of [`AssistantApi`](relay_types::AssistantApi).
//!
//! ```no_run
//! use relay_http::AssistantClient;
//!
//! let client = AssistantClient::new("https://chat.example.com")
//!     .api_key("sk-...");
//! ```
//!
//! All routes live under `{base_url}/api/assistants/{assistant_id}`. The run
//! endpoint's body is returned untouched as a
//! [`ByteStream`](relay_types::ByteStream); parsing it is `relay-sse`'s job.

pub mod client;
pub(crate) mod error;

pub use client::AssistantClient;

// Re-export relay-types for convenience
pub use relay_types::{ApiError, AssistantApi, ByteStream};
