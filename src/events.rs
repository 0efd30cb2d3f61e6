use chrono::{DateTime, Utc};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A display-only record in the transcript.
///
/// User messages are immutable from the moment they are appended. An
/// assistant message grows while its exchange is streaming and freezes when
/// the stream completes.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Lifecycle of a single request/response exchange.
///
/// `Completed` and `Failed` are terminal; the next submission starts a
/// fresh exchange from either of them (or from `Idle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    /// Request sent, no chunk received yet.
    Sent,
    /// At least one chunk received, stream still open.
    Streaming,
    Completed,
    Failed,
}

impl ExchangeState {
    /// True while a request is outstanding; at most one exchange may be in
    /// flight at a time.
    pub fn is_in_flight(self) -> bool {
        matches!(self, ExchangeState::Sent | ExchangeState::Streaming)
    }
}
