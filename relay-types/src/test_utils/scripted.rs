//! ScriptedApi: plays back canned assistant responses without a network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::api::{AssistantApi, ByteStream, MessageHandle, ThreadHandle};
use crate::error::ApiError;
use crate::id::{AssistantId, MessageId, ThreadId};
use crate::message::Message;

/// Which remote operation a call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiStep {
    /// `create_thread`
    CreateThread,
    /// `create_message`
    CreateMessage,
    /// `create_run`
    CreateRun,
    /// `list_messages`
    ListMessages,
}

/// A recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `create_thread(assistant, fingerprint)`
    CreateThread {
        /// Assistant addressed.
        assistant: AssistantId,
        /// Fingerprint sent.
        fingerprint: String,
    },
    /// `create_message(assistant, thread, message)`
    CreateMessage {
        /// Thread written to.
        thread: ThreadId,
        /// Text of the submitted message.
        text: String,
    },
    /// `create_run(assistant, thread)`
    CreateRun {
        /// Thread the run was started on.
        thread: ThreadId,
    },
    /// `list_messages(assistant, thread, after)`
    ListMessages {
        /// Thread read from.
        thread: ThreadId,
        /// Cursor message id.
        after: MessageId,
    },
}

impl ApiCall {
    /// The operation this call was.
    pub fn step(&self) -> ApiStep {
        match self {
            ApiCall::CreateThread { .. } => ApiStep::CreateThread,
            ApiCall::CreateMessage { .. } => ApiStep::CreateMessage,
            ApiCall::CreateRun { .. } => ApiStep::CreateRun,
            ApiCall::ListMessages { .. } => ApiStep::ListMessages,
        }
    }
}

#[derive(Default)]
struct Script {
    calls: Vec<ApiCall>,
    runs: VecDeque<ByteStream>,
    replies: VecDeque<Vec<Message>>,
    failures: HashSet<ApiStep>,
    holds: HashMap<ApiStep, oneshot::Receiver<()>>,
    threads_created: usize,
    messages_created: usize,
}

/// A call parked by [`ScriptedApi::hold_next`].
///
/// The call is recorded as soon as it is made but does not answer until
/// [`release`](Self::release) is called or this value is dropped.
pub struct HeldCall(oneshot::Sender<()>);

impl HeldCall {
    /// Let the parked call answer. Returns false if its caller is gone.
    pub fn release(self) -> bool {
        self.0.send(()).is_ok()
    }
}

/// An [`AssistantApi`] that records every call and answers from a script.
///
/// Thread ids are issued as `t1`, `t2`, …; message ids as `msg1`, `msg2`, ….
/// Each `create_run` pops the next queued stream; each `list_messages`
/// pops the next queued reply (or returns nothing).
#[derive(Default)]
pub struct ScriptedApi {
    script: Mutex<Script>,
}

impl ScriptedApi {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the stream returned by the next `create_run`.
    pub fn push_run(&self, stream: ByteStream) -> &Self {
        self.script().runs.push_back(stream);
        self
    }

    /// Queue the messages returned by the next `list_messages`.
    pub fn push_reply(&self, messages: Vec<Message>) -> &Self {
        self.script().replies.push_back(messages);
        self
    }

    /// Make the next call of `step` fail with a retryable error.
    pub fn fail_next(&self, step: ApiStep) -> &Self {
        self.script().failures.insert(step);
        self
    }

    /// Park the next call of `step` until the returned handle is released.
    pub fn hold_next(&self, step: ApiStep) -> HeldCall {
        let (tx, rx) = oneshot::channel();
        self.script().holds.insert(step, rx);
        HeldCall(tx)
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.script().calls.clone()
    }

    /// How many calls of `step` have been made.
    pub fn count(&self, step: ApiStep) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|c| c.step() == step)
            .count()
    }

    async fn record(&self, call: ApiCall) -> Result<MutexGuard<'_, Script>, ApiError> {
        let step = call.step();
        let held = {
            let mut script = self.script();
            script.calls.push(call);
            script.holds.remove(&step)
        };
        if let Some(gate) = held {
            // a dropped HeldCall lets the call through as well
            let _ = gate.await;
        }
        let mut script = self.script();
        if script.failures.remove(&step) {
            return Err(ApiError::ServiceUnavailable(format!(
                "scripted failure in {step:?}"
            )));
        }
        Ok(script)
    }
}

#[async_trait]
impl AssistantApi for ScriptedApi {
    async fn create_thread(
        &self,
        assistant: &AssistantId,
        fingerprint: &str,
    ) -> Result<ThreadHandle, ApiError> {
        let mut script = self
            .record(ApiCall::CreateThread {
                assistant: assistant.clone(),
                fingerprint: fingerprint.to_string(),
            })
            .await?;
        script.threads_created += 1;
        Ok(ThreadHandle {
            id: ThreadId::new(format!("t{}", script.threads_created)),
        })
    }

    async fn create_message(
        &self,
        _assistant: &AssistantId,
        thread: &ThreadId,
        message: &Message,
    ) -> Result<MessageHandle, ApiError> {
        let mut script = self
            .record(ApiCall::CreateMessage {
                thread: thread.clone(),
                text: message.text_value(),
            })
            .await?;
        script.messages_created += 1;
        Ok(MessageHandle {
            id: MessageId::new(format!("msg{}", script.messages_created)),
        })
    }

    async fn create_run(
        &self,
        _assistant: &AssistantId,
        thread: &ThreadId,
    ) -> Result<ByteStream, ApiError> {
        let mut script = self
            .record(ApiCall::CreateRun {
                thread: thread.clone(),
            })
            .await?;
        script
            .runs
            .pop_front()
            .ok_or_else(|| ApiError::InvalidRequest("no scripted run queued".into()))
    }

    async fn list_messages(
        &self,
        _assistant: &AssistantId,
        thread: &ThreadId,
        after: &MessageId,
    ) -> Result<Vec<Message>, ApiError> {
        let mut script = self
            .record(ApiCall::ListMessages {
                thread: thread.clone(),
                after: after.clone(),
            })
            .await?;
        Ok(script.replies.pop_front().unwrap_or_default())
    }
}
