#![deny(missing_docs)]
//! Chat session state machine for relay.
//!
//! A [`ChatSession`] drives one conversation with an assistant service
//! through any [`AssistantApi`](relay_types::AssistantApi):
//!
//! ```text
//! submit ─▶ create thread (once) ─▶ create message ─▶ create run
//!        ─▶ stream deltas into partial text ─▶ run completed
//!        ─▶ fetch messages after the user's ─▶ merge into history
//! ```
//!
//! Status moves `idle → in_progress → completed | failed → idle`. Only one
//! turn runs at a time; a failure at any step leaves the user's message in
//! history, discards partial text and records a [`TurnFailure`].
//!
//! [`SessionState`] holds the transitions as plain synchronous code and can
//! be used without the driver.

pub mod error;
pub mod session;
pub mod state;
pub(crate) mod turn;

pub use error::{SessionError, TurnFailure, TurnStage};
pub use session::ChatSession;
pub use state::{
    HistoryEntry, Origin, SessionSnapshot, SessionState, TurnEvent, TurnId, TurnStatus,
};
