//! Ids the assistant service hands out for assistants, threads and messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-issued ids. The client never parses them: it compares them when
/// merging fetched messages and splices them into request paths.
macro_rules! server_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an id as the service returned it.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as sent on the wire.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

server_id!(AssistantId, "Identifier of the remote assistant a session talks to.");
server_id!(ThreadId, "Identifier of a server-side conversation thread.");
server_id!(MessageId, "Identifier of a message stored on a thread.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ThreadId::new("thread_abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"thread_abc\"");
        let back: ThreadId = serde_json::from_str("\"thread_abc\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_is_the_raw_id() {
        assert_eq!(MessageId::from("msg_1").to_string(), "msg_1");
        assert_eq!(AssistantId::from(String::from("asst_1")).as_str(), "asst_1");
    }

    #[test]
    fn ids_splice_into_request_paths() {
        let thread = ThreadId::new("thread_abc");
        let path = ["threads", thread.as_ref(), "runs"].join("/");
        assert_eq!(path, "threads/thread_abc/runs");
    }
}
