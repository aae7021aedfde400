//! The turn worker: thread → message → run → stream → fetch.

use std::sync::Arc;

use futures::StreamExt;
use relay_sse::{StreamEvent, event_stream};
use relay_types::{ApiError, AssistantApi, AssistantId, ByteStream, Message, ThreadId};
use tokio::sync::{OnceCell, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::{TurnFailure, TurnStage};
use crate::state::{TurnEvent, TurnId};

/// Channel carrying worker events back to the driver.
pub(crate) type EventSender = mpsc::UnboundedSender<(TurnId, TurnEvent)>;

/// The session's thread, shared by every turn until the session is cleared.
///
/// At most one `create_thread` runs per slot; a turn that finds creation in
/// flight waits for it instead of starting another.
pub(crate) type ThreadSlot = Arc<OnceCell<ThreadId>>;

/// Everything a worker needs for one turn.
pub(crate) struct TurnJob {
    pub(crate) api: Arc<dyn AssistantApi>,
    pub(crate) assistant: AssistantId,
    pub(crate) fingerprint: String,
    pub(crate) thread: ThreadSlot,
    pub(crate) message: Message,
}

#[derive(Clone)]
struct Emitter {
    turn: TurnId,
    tx: EventSender,
}

impl Emitter {
    fn emit(&self, event: TurnEvent) {
        // the driver may already be gone
        let _ = self.tx.send((self.turn, event));
    }
}

/// Run `job` to completion or until `cancel` fires.
///
/// Exactly one terminal event (`Finalized` or `Failed`) is sent unless the
/// turn is cancelled, in which case nothing more is sent and the run's
/// stream is dropped.
pub(crate) async fn run_turn(
    job: TurnJob,
    turn: TurnId,
    events: EventSender,
    cancel: CancellationToken,
) {
    let emitter = Emitter { turn, tx: events };

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(turn = %turn, "turn cancelled");
        }
        result = drive(&job, &emitter) => match result {
            Ok(()) => tracing::debug!(turn = %turn, "turn finished"),
            Err(failure) => {
                tracing::warn!(
                    turn = %turn,
                    stage = %failure.stage,
                    error = %failure.message,
                    "turn failed"
                );
                emitter.emit(TurnEvent::Failed(failure));
            }
        },
    }
}

async fn drive(job: &TurnJob, emitter: &Emitter) -> Result<(), TurnFailure> {
    let api = job.api.as_ref();

    let thread = ensure_thread(job, emitter).await?;

    let accepted = api
        .create_message(&job.assistant, &thread, &job.message)
        .await
        .map_err(|e| TurnFailure::new(TurnStage::CreateMessage, &e))?;
    emitter.emit(TurnEvent::MessageAccepted(accepted.id.clone()));

    let bytes = api
        .create_run(&job.assistant, &thread)
        .await
        .map_err(|e| TurnFailure::new(TurnStage::CreateRun, &e))?;

    read_until_completed(bytes, emitter).await?;
    emitter.emit(TurnEvent::RunCompleted);

    let fetched = api
        .list_messages(&job.assistant, &thread, &accepted.id)
        .await
        .map_err(|e| TurnFailure::new(TurnStage::FetchMessages, &e))?;
    tracing::debug!(thread = %thread, count = fetched.len(), "reply fetched");
    emitter.emit(TurnEvent::Finalized(fetched));
    Ok(())
}

/// The slot's thread, creating it on first use.
///
/// Creation runs on its own task so it finishes and reports the new id even
/// when the turn that started it is cancelled.
async fn ensure_thread(job: &TurnJob, emitter: &Emitter) -> Result<ThreadId, TurnFailure> {
    if let Some(thread) = job.thread.get() {
        return Ok(thread.clone());
    }

    let slot = Arc::clone(&job.thread);
    let api = Arc::clone(&job.api);
    let assistant = job.assistant.clone();
    let fingerprint = job.fingerprint.clone();
    let emitter = emitter.clone();
    let creation = tokio::spawn(async move {
        slot.get_or_try_init(|| async move {
            let created = api.create_thread(&assistant, &fingerprint).await?;
            tracing::debug!(thread = %created.id, "thread created");
            emitter.emit(TurnEvent::ThreadCreated(created.id.clone()));
            Ok::<_, ApiError>(created.id)
        })
        .await
        .cloned()
    });

    creation
        .await
        .unwrap_or_else(|e| Err(ApiError::Other(Box::new(e))))
        .map_err(|e| TurnFailure::new(TurnStage::CreateThread, &e))
}

/// Forward deltas until `thread.run.completed`. The stream is dropped on
/// return.
async fn read_until_completed(bytes: ByteStream, emitter: &Emitter) -> Result<(), TurnFailure> {
    let events = event_stream(bytes);
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        match event.map_err(|e| TurnFailure::new(TurnStage::Stream, &e))? {
            StreamEvent::MessageDelta { text } => emitter.emit(TurnEvent::Delta(text)),
            StreamEvent::RunCompleted => return Ok(()),
            StreamEvent::Other { kind, .. } => {
                tracing::trace!(kind = %kind, "ignoring stream event");
            }
        }
    }
    Err(TurnFailure::stream_ended())
}
