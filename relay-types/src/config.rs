//! Configuration for a chat session.

use crate::id::AssistantId;

/// Greeting shown before the user has said anything.
pub const DEFAULT_GREETING: &str = "Hello, I am your assistant. How can I help you?";

/// Default capacity of the session's command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Environment variable holding the assistant id.
pub const ASSISTANT_ID_VAR: &str = "RELAY_ASSISTANT_ID";
/// Environment variable holding the client fingerprint.
pub const FINGERPRINT_VAR: &str = "RELAY_FINGERPRINT";
/// Environment variable overriding the greeting; an empty value disables it.
pub const GREETING_VAR: &str = "RELAY_GREETING";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing configuration: {0} is not set")]
    Missing(&'static str),
}

/// Static configuration for one chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Assistant every remote call is addressed to.
    pub assistant_id: AssistantId,

    /// Client fingerprint sent when the thread is created.
    pub fingerprint: String,

    /// Assistant message placed at the top of a fresh history, if any.
    pub greeting: Option<String>,

    /// Capacity of the command channel between handles and the driver.
    pub command_buffer: usize,
}

impl SessionConfig {
    /// Configuration for `assistant_id` with default settings.
    pub fn new(assistant_id: impl Into<AssistantId>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            ..Self::default()
        }
    }

    /// Set the client fingerprint.
    #[must_use]
    pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Set or clear the greeting message.
    #[must_use]
    pub fn greeting(mut self, greeting: Option<String>) -> Self {
        self.greeting = greeting;
        self
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// `RELAY_ASSISTANT_ID` is required; `RELAY_FINGERPRINT` and
    /// `RELAY_GREETING` are optional.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let assistant_id = lookup(ASSISTANT_ID_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ASSISTANT_ID_VAR))?;
        let mut config = Self::new(assistant_id);
        if let Some(fingerprint) = lookup(FINGERPRINT_VAR) {
            config.fingerprint = fingerprint;
        }
        if let Some(greeting) = lookup(GREETING_VAR) {
            config.greeting = (!greeting.is_empty()).then_some(greeting);
        }
        Ok(config)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            assistant_id: AssistantId::new(""),
            fingerprint: String::new(),
            greeting: Some(DEFAULT_GREETING.into()),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_include_greeting() {
        let config = SessionConfig::new("asst_1");
        assert_eq!(config.assistant_id.as_str(), "asst_1");
        assert_eq!(config.greeting.as_deref(), Some(DEFAULT_GREETING));
        assert_eq!(config.command_buffer, DEFAULT_COMMAND_BUFFER);
        assert!(config.fingerprint.is_empty());
    }

    #[test]
    fn builder_overrides() {
        let config = SessionConfig::new("asst_1")
            .fingerprint("fp-1")
            .greeting(None);
        assert_eq!(config.fingerprint, "fp-1");
        assert!(config.greeting.is_none());
    }

    #[test]
    fn lookup_requires_assistant_id() {
        let err = SessionConfig::from_lookup(lookup_in(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ASSISTANT_ID_VAR)));

        let err = SessionConfig::from_lookup(lookup_in(&[(ASSISTANT_ID_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn lookup_reads_optional_fields() {
        let config = SessionConfig::from_lookup(lookup_in(&[
            (ASSISTANT_ID_VAR, "asst_9"),
            (FINGERPRINT_VAR, "fp-9"),
            (GREETING_VAR, "Hey there"),
        ]))
        .unwrap();
        assert_eq!(config.assistant_id.as_str(), "asst_9");
        assert_eq!(config.fingerprint, "fp-9");
        assert_eq!(config.greeting.as_deref(), Some("Hey there"));
    }

    #[test]
    fn empty_greeting_disables_it() {
        let config = SessionConfig::from_lookup(lookup_in(&[
            (ASSISTANT_ID_VAR, "asst_9"),
            (GREETING_VAR, ""),
        ]))
        .unwrap();
        assert!(config.greeting.is_none());
    }
}
