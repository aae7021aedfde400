#![deny(missing_docs)]
//! # relay: umbrella crate
//!
//! A single import surface for the relay crates. The shared types are always
//! available; the stream parser and session state machine sit behind
//! `session`, the reqwest client behind `http` (both on by default).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AssistantClient::new("https://chat.example.com").api_key("sk-...");
//! let session = ChatSession::spawn(Arc::new(client), SessionConfig::new("asst_1"));
//!
//! session.submit("Hi").await?;
//! let done = session.settled().await?;
//! assert_eq!(done.status, TurnStatus::Completed);
//! # Ok(())
//! # }
//! ```

pub use relay_types as types;

#[cfg(feature = "http")]
pub use relay_http as http;
#[cfg(feature = "session")]
pub use relay_session as session;
#[cfg(feature = "session")]
pub use relay_sse as sse;

/// Happy-path imports for running a chat session.
pub mod prelude {
    pub use relay_types::{
        ApiError, AssistantApi, AssistantId, Message, MessageId, Role, SessionConfig, ThreadId,
    };

    #[cfg(feature = "session")]
    pub use relay_session::{
        ChatSession, HistoryEntry, Origin, SessionError, SessionSnapshot, TurnFailure, TurnStage,
        TurnStatus,
    };

    #[cfg(feature = "session")]
    pub use relay_sse::{StreamEvent, event_stream, parse_events};

    #[cfg(feature = "http")]
    pub use relay_http::AssistantClient;
}
