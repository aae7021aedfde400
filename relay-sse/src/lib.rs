#![deny(missing_docs)]
//! Turns a run's raw response bytes into typed stream events.
//!
//! Two layers, usable separately:
//!
//! - [`parser`]: a pure function from `(chunk, carryover)` to
//!   `(events, carryover)`. Network chunk boundaries never line up with
//!   event boundaries, so the incomplete tail of each call is handed back
//!   and prepended to the next.
//! - [`consumer`]: adapts a [`ByteStream`](relay_types::ByteStream) into
//!   decoded text chunks, and composes that with the parser in
//!   [`event_stream`].

pub mod consumer;
pub mod parser;

pub use consumer::{TextChunks, event_stream};
pub use parser::{
    EventParser, MESSAGE_DELTA, RUN_COMPLETED, StreamEvent, Units, parse_events, split_units,
};
