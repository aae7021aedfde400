//! Conversation state and the transitions a turn drives it through.
//!
//! [`SessionState`] is plain data with synchronous methods: it never calls
//! the service. The driver feeds it [`TurnEvent`]s produced by the turn
//! worker and publishes a [`SessionSnapshot`] after each change.

use std::fmt;

use relay_types::{Message, MessageId, ThreadId};

use crate::error::{SessionError, TurnFailure};

/// Where the current turn stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnStatus {
    /// Nothing in flight; ready for input.
    #[default]
    Idle,
    /// A turn is running.
    InProgress,
    /// The last run completed.
    Completed,
    /// The last turn failed.
    Failed,
}

/// How a history entry came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Appended locally and not (yet) acknowledged by the service.
    Local,
    /// Stored by the service under `id`.
    Confirmed {
        /// The service's id for the message.
        id: MessageId,
    },
}

/// One message in the visible history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// The message as created or fetched.
    pub message: Message,
    /// Whether the service has acknowledged it.
    pub origin: Origin,
}

impl HistoryEntry {
    /// An entry that only exists locally.
    pub fn local(message: Message) -> Self {
        Self {
            message,
            origin: Origin::Local,
        }
    }

    /// The service id, from the origin tag or the message itself.
    pub fn id(&self) -> Option<&MessageId> {
        match &self.origin {
            Origin::Confirmed { id } => Some(id),
            Origin::Local => self.message.id.as_ref(),
        }
    }

    /// Whether the service has acknowledged this entry.
    pub fn is_confirmed(&self) -> bool {
        matches!(self.origin, Origin::Confirmed { .. })
    }
}

/// Identifies one submitted turn. Issued in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub(crate) u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Progress reported by a turn worker.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// A thread was created for the session.
    ThreadCreated(ThreadId),
    /// The service stored the user's message.
    MessageAccepted(MessageId),
    /// Next fragment of the assistant's reply.
    Delta(String),
    /// The run finished; the reply is being fetched.
    RunCompleted,
    /// The fetched messages to merge. Ends the turn.
    Finalized(Vec<Message>),
    /// The turn failed. Ends the turn.
    Failed(TurnFailure),
}

/// Read-only copy of the session state handed to observers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    /// Thread used by the session, once created.
    pub thread_id: Option<ThreadId>,
    /// Ordered, merged history.
    pub history: Vec<HistoryEntry>,
    /// The user message of the running turn.
    pub pending: Option<Message>,
    /// Turn status.
    pub status: TurnStatus,
    /// Reply text streamed so far in this turn.
    pub partial_text: String,
    /// Text the user is composing.
    pub draft: String,
    /// Cause of the last failed turn.
    pub last_error: Option<TurnFailure>,
    /// Whether a turn worker is still running.
    pub turn_active: bool,
}

impl SessionSnapshot {
    /// The history's messages in order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().map(|entry| &entry.message)
    }
}

/// State owned by one session driver.
#[derive(Debug)]
pub struct SessionState {
    greeting: Option<String>,
    thread_id: Option<ThreadId>,
    history: Vec<HistoryEntry>,
    pending: Option<usize>,
    status: TurnStatus,
    partial_text: String,
    draft: String,
    last_error: Option<TurnFailure>,
    active: Option<TurnId>,
    next_turn: u64,
    // first turn id issued since the last clear
    epoch: u64,
}

impl SessionState {
    /// Fresh state; `greeting`, if any, opens the history.
    pub fn new(greeting: Option<String>) -> Self {
        let history = greeting_history(greeting.as_deref());
        Self {
            greeting,
            thread_id: None,
            history,
            pending: None,
            status: TurnStatus::Idle,
            partial_text: String::new(),
            draft: String::new(),
            last_error: None,
            active: None,
            next_turn: 1,
            epoch: 1,
        }
    }

    /// Current status.
    pub fn status(&self) -> TurnStatus {
        self.status
    }

    /// The session's thread, once created.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    /// Ordered history.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Reply text streamed so far.
    pub fn partial_text(&self) -> &str {
        &self.partial_text
    }

    /// Cause of the last failed turn.
    pub fn last_error(&self) -> Option<&TurnFailure> {
        self.last_error.as_ref()
    }

    /// The running turn, if any.
    pub fn active_turn(&self) -> Option<TurnId> {
        self.active
    }

    /// The draft text.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the draft text.
    pub fn set_draft(&mut self, text: String) {
        self.draft = text;
    }

    /// Start a turn for `text`.
    ///
    /// Appends the user message to history and marks it in flight. Allowed
    /// from any status as long as no turn is running; `completed` and
    /// `failed` pass through `idle` implicitly.
    pub fn begin_turn(&mut self, text: String) -> Result<(TurnId, Message), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.active.is_some() {
            return Err(SessionError::TurnInProgress);
        }

        let turn = TurnId(self.next_turn);
        self.next_turn += 1;

        let message = Message::user(text);
        self.history.push(HistoryEntry::local(message.clone()));
        self.pending = Some(self.history.len() - 1);
        self.status = TurnStatus::InProgress;
        self.partial_text.clear();
        self.last_error = None;
        self.active = Some(turn);
        Ok((turn, message))
    }

    /// Start a turn for the draft, clearing it once accepted.
    pub fn submit_draft(&mut self) -> Result<(TurnId, Message), SessionError> {
        let started = self.begin_turn(self.draft.clone())?;
        self.draft.clear();
        Ok(started)
    }

    /// Apply a worker event. Returns whether the state changed.
    ///
    /// Events from a turn that is no longer active are discarded. The one
    /// exception is a thread id from a cancelled turn: it is kept unless the
    /// session has been cleared since, so the session never creates a
    /// second thread.
    pub fn apply(&mut self, turn: TurnId, event: TurnEvent) -> bool {
        if self.active != Some(turn) {
            if let TurnEvent::ThreadCreated(id) = event
                && turn.0 >= self.epoch
                && self.thread_id.is_none()
            {
                self.thread_id = Some(id);
                return true;
            }
            tracing::trace!(turn = %turn, "discarding event from inactive turn");
            return false;
        }

        match event {
            TurnEvent::ThreadCreated(id) => {
                self.thread_id.get_or_insert(id);
            }
            TurnEvent::MessageAccepted(id) => {
                if let Some(entry) = self.pending.and_then(|i| self.history.get_mut(i)) {
                    entry.origin = Origin::Confirmed { id };
                }
            }
            TurnEvent::Delta(text) => self.partial_text.push_str(&text),
            TurnEvent::RunCompleted => self.status = TurnStatus::Completed,
            TurnEvent::Finalized(messages) => {
                self.partial_text.clear();
                self.pending = None;
                self.merge(messages);
                self.status = TurnStatus::Completed;
                self.active = None;
            }
            TurnEvent::Failed(failure) => {
                self.partial_text.clear();
                self.pending = None;
                self.status = TurnStatus::Failed;
                self.last_error = Some(failure);
                self.active = None;
            }
        }
        true
    }

    /// Append `messages` in order, skipping ids already in history.
    pub fn merge(&mut self, messages: Vec<Message>) {
        for message in messages {
            let origin = match &message.id {
                Some(id) if self.history.iter().any(|e| e.id() == Some(id)) => {
                    tracing::debug!(id = %id, "skipping message already in history");
                    continue;
                }
                Some(id) => Origin::Confirmed { id: id.clone() },
                None => Origin::Local,
            };
            self.history.push(HistoryEntry { message, origin });
        }
    }

    /// Return a finished turn to `idle`. History and thread are kept.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::TurnInProgress);
        }
        if matches!(self.status, TurnStatus::Completed | TurnStatus::Failed) {
            self.status = TurnStatus::Idle;
        }
        self.partial_text.clear();
        Ok(())
    }

    /// Abandon the running turn, returning its id.
    ///
    /// The user's message stays in history.
    pub fn cancel(&mut self) -> Option<TurnId> {
        let turn = self.active.take()?;
        self.partial_text.clear();
        self.pending = None;
        self.status = TurnStatus::Idle;
        Some(turn)
    }

    /// Cancel any running turn and forget the thread and history.
    ///
    /// The greeting is restored; the draft is kept.
    pub fn clear(&mut self) -> Option<TurnId> {
        let cancelled = self.cancel();
        self.thread_id = None;
        self.history = greeting_history(self.greeting.as_deref());
        self.status = TurnStatus::Idle;
        self.last_error = None;
        self.epoch = self.next_turn;
        cancelled
    }

    /// Copy the observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            thread_id: self.thread_id.clone(),
            history: self.history.clone(),
            pending: self
                .pending
                .and_then(|i| self.history.get(i))
                .map(|entry| entry.message.clone()),
            status: self.status,
            partial_text: self.partial_text.clone(),
            draft: self.draft.clone(),
            last_error: self.last_error.clone(),
            turn_active: self.active.is_some(),
        }
    }
}

fn greeting_history(greeting: Option<&str>) -> Vec<HistoryEntry> {
    greeting
        .map(|text| HistoryEntry::local(Message::assistant(text)))
        .into_iter()
        .collect()
}
