//! Errors returned to callers and recorded for failed turns.

use std::fmt;

use relay_types::ApiError;

/// Rejections of a session command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The submitted text is blank.
    #[error("message is empty")]
    EmptyMessage,
    /// Another turn has not finished yet.
    #[error("a turn is already in progress")]
    TurnInProgress,
    /// The session driver has shut down.
    #[error("session is closed")]
    Closed,
}

/// The step of a turn that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnStage {
    /// Creating the conversation thread.
    CreateThread,
    /// Submitting the user's message.
    CreateMessage,
    /// Starting the run.
    CreateRun,
    /// Reading the run's event stream.
    Stream,
    /// Fetching the finished reply.
    FetchMessages,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::CreateThread => "create thread",
            TurnStage::CreateMessage => "create message",
            TurnStage::CreateRun => "create run",
            TurnStage::Stream => "stream",
            TurnStage::FetchMessages => "fetch messages",
        };
        f.write_str(name)
    }
}

/// Why the most recent turn failed.
///
/// Kept in snapshots, so it is a plain cloneable record rather than the
/// [`ApiError`] itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct TurnFailure {
    /// Step that failed.
    pub stage: TurnStage,
    /// Rendered cause.
    pub message: String,
    /// Whether resubmitting is likely to succeed.
    pub retryable: bool,
}

impl TurnFailure {
    /// Record `error` as the cause of a failure at `stage`.
    pub fn new(stage: TurnStage, error: &ApiError) -> Self {
        Self {
            stage,
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    /// The run's stream ended without `thread.run.completed`.
    pub fn stream_ended() -> Self {
        Self {
            stage: TurnStage::Stream,
            message: "stream ended before the run completed".into(),
            retryable: true,
        }
    }
}
