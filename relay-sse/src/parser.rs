//! Chunk buffering and event parsing for the assistant event stream.
//!
//! The run endpoint answers with Server-Sent Events:
//!
//! ```text
//! event: thread.message.delta
//! data: {"id":"msg_1","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hel"}}]}}
//!
//! event: thread.run.completed
//! data: {"id":"run_1","status":"completed"}
//!
//! ```
//!
//! A unit ends at the first blank line. Everything after the last blank line
//! is an incomplete unit and is carried over verbatim to the next call.

use serde_json::Value;

/// Event kind carrying an incremental text fragment.
pub const MESSAGE_DELTA: &str = "thread.message.delta";

/// Event kind signalling that the run's reply is final.
pub const RUN_COMPLETED: &str = "thread.run.completed";

/// A complete, decoded unit of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// `thread.message.delta`: the next fragment of the assistant's reply.
    MessageDelta {
        /// Text to append, used verbatim.
        text: String,
    },
    /// `thread.run.completed`: the reply can now be fetched in full.
    RunCompleted,
    /// Any other kind. Carried so callers can log it; otherwise a no-op.
    Other {
        /// The `event:` label (`message` when the unit had none).
        kind: String,
        /// Decoded `data:` payload (`null` for `[DONE]` or no data).
        data: Value,
    },
}

/// Result of splitting a buffer into complete units.
///
/// `buffer[..consumed]` holds exactly the units and their delimiters;
/// `remainder == &buffer[consumed..]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Units<'a> {
    /// Complete units, delimiters excluded, in input order.
    pub units: Vec<&'a str>,
    /// Byte length of the consumed prefix.
    pub consumed: usize,
    /// The trailing incomplete unit.
    pub remainder: &'a str,
}

/// Split `buffer` at blank lines (`\n\n` or `\n\r\n`).
pub fn split_units(buffer: &str) -> Units<'_> {
    let mut units = Vec::new();
    let mut start = 0;
    while let Some((end, next)) = next_boundary(&buffer.as_bytes()[start..]) {
        units.push(&buffer[start..start + end]);
        start += next;
    }
    Units {
        units,
        consumed: start,
        remainder: &buffer[start..],
    }
}

/// Find the first blank line: returns (end of unit, start of the next one).
///
/// The decision at each position only looks ahead two bytes, so a boundary
/// found in a prefix of some text is also the first boundary of the whole.
fn next_boundary(bytes: &[u8]) -> Option<(usize, usize)> {
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'\n') => return Some((i, i + 2)),
            Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => return Some((i, i + 3)),
            _ => {}
        }
    }
    None
}

/// Parse `carryover + chunk` into complete events and the new carryover.
///
/// Pure: the output depends only on the two inputs. Units whose payload does
/// not decode are dropped with a warning; the others still come through.
pub fn parse_events(chunk: &str, carryover: &str) -> (Vec<StreamEvent>, String) {
    let mut buffer = String::with_capacity(carryover.len() + chunk.len());
    buffer.push_str(carryover);
    buffer.push_str(chunk);

    let split = split_units(&buffer);
    let events = split.units.iter().filter_map(|u| decode_unit(u)).collect();
    (events, split.remainder.to_string())
}

/// Decode one unit. `None` for comment-only units and malformed payloads.
fn decode_unit(unit: &str) -> Option<StreamEvent> {
    let mut kind: Option<&str> = None;
    let mut data: Option<String> = None;

    for raw in unit.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => kind = Some(value),
            "data" => match data.as_mut() {
                Some(buf) => {
                    buf.push('\n');
                    buf.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            // id:, retry: and unknown fields carry nothing we use
            _ => {}
        }
    }

    if kind.is_none() && data.is_none() {
        return None;
    }
    let kind = kind.unwrap_or("message");
    let data = data.unwrap_or_default();

    let payload = match decode_data(&data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(kind, error = %e, "dropping stream event with malformed payload");
            return None;
        }
    };

    match kind {
        MESSAGE_DELTA => match delta_text(&payload) {
            Some(text) => Some(StreamEvent::MessageDelta { text }),
            None => {
                tracing::warn!(kind, "dropping delta event without delta.content");
                None
            }
        },
        RUN_COMPLETED => Some(StreamEvent::RunCompleted),
        _ => Some(StreamEvent::Other {
            kind: kind.to_string(),
            data: payload,
        }),
    }
}

fn decode_data(data: &str) -> Result<Value, serde_json::Error> {
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed)
}

/// Concatenate the text parts of `delta.content`, in order.
fn delta_text(payload: &Value) -> Option<String> {
    let parts = payload["delta"]["content"].as_array()?;
    Some(
        parts
            .iter()
            .filter(|part| part["type"].as_str() == Some("text"))
            .filter_map(|part| part["text"]["value"].as_str())
            .collect(),
    )
}

/// [`parse_events`] with the carryover kept for you.
#[derive(Debug, Default)]
pub struct EventParser {
    carryover: String,
}

impl EventParser {
    /// A parser with an empty carryover.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next decoded chunk; returns the events it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let (events, carryover) = parse_events(chunk, &self.carryover);
        self.carryover = carryover;
        events
    }

    /// Text received but not yet part of a complete unit.
    pub fn carryover(&self) -> &str {
        &self.carryover
    }

    /// Consume the parser, returning any unterminated tail.
    pub fn finish(self) -> String {
        self.carryover
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELTA_HEL: &str = "event: thread.message.delta\ndata: {\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"Hel\"}}]}}\n\n";
    const DELTA_LO: &str = "event: thread.message.delta\ndata: {\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"lo!\"}}]}}\n\n";
    const COMPLETED: &str = "event: thread.run.completed\ndata: {\"id\":\"run_1\",\"status\":\"completed\"}\n\n";

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::MessageDelta { text: text.into() }
    }

    #[test]
    fn empty_chunk_keeps_carryover() {
        let (events, carryover) = parse_events("", "event: thread.mes");
        assert!(events.is_empty());
        assert_eq!(carryover, "event: thread.mes");

        let (events, carryover) = parse_events("", "");
        assert!(events.is_empty());
        assert_eq!(carryover, "");
    }

    #[test]
    fn complete_units_and_partial_tail() {
        let input = format!("{DELTA_HEL}{DELTA_LO}event: thread.run.comp");
        let (events, carryover) = parse_events(&input, "");
        assert_eq!(events, vec![delta("Hel"), delta("lo!")]);
        assert_eq!(carryover, "event: thread.run.comp");

        let rest = &COMPLETED["event: thread.run.comp".len()..];
        let (events, carryover) = parse_events(rest, &carryover);
        assert_eq!(events, vec![StreamEvent::RunCompleted]);
        assert_eq!(carryover, "");
    }

    #[test]
    fn malformed_payload_is_skipped() {
        let input = format!(
            "{DELTA_HEL}event: thread.message.delta\ndata: {{not json\n\n{DELTA_LO}"
        );
        let (events, carryover) = parse_events(&input, "");
        assert_eq!(events, vec![delta("Hel"), delta("lo!")]);
        assert!(carryover.is_empty());
    }

    #[test]
    fn delta_without_content_is_skipped() {
        let input = "event: thread.message.delta\ndata: {\"id\":\"msg_1\"}\n\n";
        let (events, _) = parse_events(input, "");
        assert!(events.is_empty());
    }

    #[test]
    fn unknown_kinds_are_surfaced_as_other() {
        let input = "event: thread.run.step.created\ndata: {\"id\":\"step_1\"}\n\nevent: done\ndata: [DONE]\n\n";
        let (events, _) = parse_events(input, "");
        assert_eq!(
            events,
            vec![
                StreamEvent::Other {
                    kind: "thread.run.step.created".into(),
                    data: serde_json::json!({"id": "step_1"}),
                },
                StreamEvent::Other {
                    kind: "done".into(),
                    data: Value::Null,
                },
            ]
        );
    }

    #[test]
    fn crlf_delimiters_and_comments() {
        let input = ": keep-alive\r\n\r\nevent:thread.run.completed\r\ndata:{}\r\n\r\n";
        let (events, carryover) = parse_events(input, "");
        assert_eq!(events, vec![StreamEvent::RunCompleted]);
        assert_eq!(carryover, "");
    }

    #[test]
    fn data_without_event_defaults_to_message() {
        let (events, _) = parse_events("data: {\"a\":1}\n\n", "");
        assert_eq!(
            events,
            vec![StreamEvent::Other {
                kind: "message".into(),
                data: serde_json::json!({"a": 1}),
            }]
        );
    }

    #[test]
    fn multi_line_data_is_joined() {
        let input = "event: thread.message.delta\ndata: {\"delta\":\ndata: {\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"x\"}}]}}\n\n";
        let (events, _) = parse_events(input, "");
        assert_eq!(events, vec![delta("x")]);
    }

    #[test]
    fn delta_joins_text_parts_and_skips_others() {
        let input = "event: thread.message.delta\ndata: {\"delta\":{\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"a\"}},{\"type\":\"image_file\"},{\"type\":\"text\",\"text\":{\"value\":\"b\"}}]}}\n\n";
        let (events, _) = parse_events(input, "");
        assert_eq!(events, vec![delta("ab")]);
    }

    #[test]
    fn split_units_accounts_for_every_byte() {
        let buffer = format!("{DELTA_HEL}\n\n{COMPLETED}tail");
        let split = split_units(&buffer);
        assert_eq!(split.units.len(), 3);
        assert_eq!(split.units[1], "");
        assert_eq!(split.remainder, "tail");
        assert_eq!(&buffer[split.consumed..], split.remainder);
    }

    #[test]
    fn boundary_split_between_newlines() {
        let mut parser = EventParser::new();
        let (head, tail) = DELTA_HEL.split_at(DELTA_HEL.len() - 1);
        assert!(parser.push(head).is_empty());
        assert_eq!(parser.carryover(), head);
        assert_eq!(parser.push(tail), vec![delta("Hel")]);
        assert_eq!(parser.finish(), "");
    }
}
