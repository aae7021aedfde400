//! The session handle and the driver task that owns the state.

use std::sync::Arc;

use relay_types::{AssistantApi, SessionConfig};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::state::{SessionSnapshot, SessionState, TurnEvent, TurnId};
use crate::turn::{EventSender, ThreadSlot, TurnJob, run_turn};

enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SubmitDraft {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SetDraft(String),
    Reset {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    CancelTurn {
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running chat session.
///
/// Commands go to a driver task that exclusively owns the session state;
/// observers read [`SessionSnapshot`]s published after every change.
/// Dropping the handle stops the driver and cancels any running turn.
///
/// ```no_run
/// # async fn demo(api: std::sync::Arc<dyn relay_types::AssistantApi>) {
/// use relay_session::ChatSession;
/// use relay_types::SessionConfig;
///
/// let session = ChatSession::spawn(api, SessionConfig::new("asst_1"));
/// session.submit("Hi").await.unwrap();
/// let done = session.settled().await.unwrap();
/// for message in done.messages() {
///     println!("{:?}: {}", message.role, message.text_value());
/// }
/// # }
/// ```
pub struct ChatSession {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl ChatSession {
    /// Start a session driver on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(api: Arc<dyn AssistantApi>, config: SessionConfig) -> Self {
        let state = SessionState::new(config.greeting.clone());
        let (snapshot_tx, snapshots) = watch::channel(state.snapshot());
        let (commands, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            api,
            config,
            state,
            commands: command_rx,
            event_tx,
            events: event_rx,
            snapshots: snapshot_tx,
            thread: ThreadSlot::default(),
            worker: None,
        };
        tokio::spawn(driver.run());

        Self {
            commands,
            snapshots,
        }
    }

    /// Submit `text` as the next user message.
    ///
    /// Returns once the turn has started; follow progress through
    /// [`subscribe`](Self::subscribe) or wait with [`settled`](Self::settled).
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::Submit { text, reply }).await?
    }

    /// Replace the draft text.
    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.commands
            .send(Command::SetDraft(text.into()))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Submit the draft; it is cleared once the turn starts.
    pub async fn submit_draft(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::SubmitDraft { reply }).await?
    }

    /// Return a finished turn to idle.
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Abandon the running turn. Returns whether there was one.
    pub async fn cancel_turn(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::CancelTurn { reply }).await
    }

    /// Cancel any running turn and start over with a fresh history and no
    /// thread.
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// The latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until no turn is running and return that state.
    pub async fn settled(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| !s.turn_active)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}

struct Worker {
    turn: TurnId,
    cancel: CancellationToken,
}

struct Driver {
    api: Arc<dyn AssistantApi>,
    config: SessionConfig,
    state: SessionState,
    commands: mpsc::Receiver<Command>,
    event_tx: EventSender,
    events: mpsc::UnboundedReceiver<(TurnId, TurnEvent)>,
    snapshots: watch::Sender<SessionSnapshot>,
    thread: ThreadSlot,
    worker: Option<Worker>,
}

impl Driver {
    async fn run(mut self) {
        tracing::debug!(assistant = %self.config.assistant_id, "session driver started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some((turn, event)) = self.events.recv() => {
                    if self.state.apply(turn, event) {
                        self.publish();
                    }
                    if self.state.active_turn().is_none() {
                        self.worker = None;
                    }
                }
            }
        }
        self.stop_worker();
        tracing::debug!("session driver stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { text, reply } => {
                let started = self.state.begin_turn(text);
                let _ = reply.send(self.start(started));
            }
            Command::SubmitDraft { reply } => {
                let started = self.state.submit_draft();
                let _ = reply.send(self.start(started));
            }
            Command::SetDraft(text) => {
                self.state.set_draft(text);
                self.publish();
            }
            Command::Reset { reply } => {
                let result = self.state.reset();
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            Command::CancelTurn { reply } => {
                let cancelled = self.state.cancel();
                if let Some(turn) = cancelled {
                    tracing::debug!(turn = %turn, "cancelling turn");
                    self.stop_worker();
                    self.publish();
                }
                let _ = reply.send(cancelled.is_some());
            }
            Command::Clear { reply } => {
                self.state.clear();
                self.stop_worker();
                // a creation still in flight fills the old slot
                self.thread = ThreadSlot::default();
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    /// Spawn the worker for a turn `begin_turn` accepted.
    fn start(
        &mut self,
        started: Result<(TurnId, relay_types::Message), SessionError>,
    ) -> Result<(), SessionError> {
        let (turn, message) = started?;
        let job = TurnJob {
            api: Arc::clone(&self.api),
            assistant: self.config.assistant_id.clone(),
            fingerprint: self.config.fingerprint.clone(),
            thread: Arc::clone(&self.thread),
            message,
        };
        let cancel = CancellationToken::new();
        tracing::debug!(turn = %turn, thread = ?job.thread.get(), "starting turn");
        tokio::spawn(run_turn(job, turn, self.event_tx.clone(), cancel.clone()));
        self.worker = Some(Worker { turn, cancel });
        self.publish();
        Ok(())
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            tracing::trace!(turn = %worker.turn, "stopping worker");
            worker.cancel.cancel();
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.snapshot());
    }
}
