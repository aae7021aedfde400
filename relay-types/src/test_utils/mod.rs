//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. [`ScriptedApi`] plays
//! back canned responses; the `sse` helpers build event-stream payloads and
//! byte streams that report when they are released.

mod scripted;
mod sse;

pub use scripted::{ApiCall, ApiStep, HeldCall, ScriptedApi};
pub use sse::{
    ReleaseFlag, StreamFeed, byte_stream, channel_stream, completed_unit, delta_unit,
    failing_stream, sse_unit, tracked,
};
