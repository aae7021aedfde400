#![deny(missing_docs)]
//! # relay-types: shared vocabulary for the relay crates
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`id`] | Typed wrappers for assistant, thread and message ids |
//! | [`message`] | The conversational [`Message`] model and its content blocks |
//! | [`api`] | The [`AssistantApi`] trait the session drives, and [`ByteStream`] |
//! | [`error`] | [`ApiError`], the failure type of every remote call |
//! | [`config`] | [`SessionConfig`] and environment loading |
//!
//! The HTTP binding of [`AssistantApi`] lives in `relay-http`; the stream
//! parser in `relay-sse`; the state machine in `relay-session`.
//!
//! With the `test-utils` feature, [`test_utils`] provides a scripted
//! [`AssistantApi`] and helpers for building SSE payloads.

pub mod api;
pub mod config;
pub mod error;
pub mod id;
pub mod message;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use api::{AssistantApi, ByteStream, MessageHandle, MessagePage, ThreadHandle};
pub use config::{ConfigError, SessionConfig};
pub use error::ApiError;
pub use id::{AssistantId, MessageId, ThreadId};
pub use message::{ContentBlock, Message, Role, TextContent};
