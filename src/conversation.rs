use tracing::{error, info};

use crate::client::{ChatRequest, StreamEvent};
use crate::events::{ExchangeState, Message};

/// Fixed notice shown in place of a reply when an exchange fails. The real
/// failure reason goes to the log, never to the transcript.
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong.";

/// Owns the transcript, the session token, and the lifecycle of the
/// exchange currently in flight.
///
/// The session token lives only in memory: it is absent until the server
/// first supplies one via the `x-thread-id` header, and a later response
/// without the header leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    thread_id: Option<String>,
    exchange: ExchangeState,
    streamed: String,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record a user submission.
    ///
    /// Appends the user message immediately (before any network activity)
    /// and returns the request to send. Returns `None` without touching the
    /// transcript when the input trims to nothing, or when an exchange is
    /// already in flight (overlapping submissions are rejected, not queued).
    pub fn submit(&mut self, text: &str) -> Option<ChatRequest> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }
        if self.exchange.is_in_flight() {
            info!("submission rejected: an exchange is already in flight");
            return None;
        }

        self.messages.push(Message::user(content));
        self.streamed.clear();
        self.exchange = ExchangeState::Sent;

        Some(ChatRequest {
            content: content.to_string(),
            thread_id: self.thread_id.clone(),
        })
    }

    /// Apply one stream event to the in-flight exchange.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Delta(chunk) => {
                if self.exchange == ExchangeState::Sent {
                    // First chunk of the exchange: this is the moment the
                    // reply bubble comes into existence.
                    self.messages.push(Message::assistant(""));
                    self.exchange = ExchangeState::Streaming;
                }
                if self.exchange != ExchangeState::Streaming {
                    return;
                }
                self.streamed.push_str(&chunk);
                if let Some(message) = self.messages.last_mut() {
                    message.text = self.streamed.clone();
                }
            }
            StreamEvent::Done { thread_id } => {
                if !self.exchange.is_in_flight() {
                    return;
                }
                self.exchange = ExchangeState::Completed;
                // A missing header keeps the previously stored token.
                if let Some(id) = thread_id {
                    info!(thread_id = %id, "session token updated");
                    self.thread_id = Some(id);
                }
            }
            StreamEvent::Error(reason) => {
                if !self.exchange.is_in_flight() {
                    return;
                }
                error!(reason = %reason, "exchange failed");
                // Drop the half-built reply so no stale partial text stays
                // visible, then show the fixed notice.
                if self.exchange == ExchangeState::Streaming {
                    self.messages.pop();
                }
                self.messages.push(Message::assistant(FAILURE_NOTICE));
                self.exchange = ExchangeState::Failed;
            }
        }
    }

    /// Forget the session token so the next submission starts a fresh
    /// server-side thread. The transcript is kept.
    pub fn reset_thread(&mut self) {
        self.thread_id = None;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// True from submission until the terminal event arrives.
    pub fn is_busy(&self) -> bool {
        self.exchange.is_in_flight()
    }

    /// True once the first chunk has arrived and until the stream ends.
    pub fn is_streaming(&self) -> bool {
        self.exchange == ExchangeState::Streaming
    }

    #[allow(dead_code)]
    pub fn exchange(&self) -> ExchangeState {
        self.exchange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Role;

    fn assistant_messages(conversation: &Conversation) -> Vec<&Message> {
        conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect()
    }

    #[test]
    fn submit_appends_user_message_before_any_network_activity() {
        let mut conversation = Conversation::new();
        let request = conversation.submit("  Hello  ").unwrap();

        assert_eq!(request.content, "Hello");
        assert_eq!(request.thread_id, None);
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert_eq!(conversation.messages()[0].text, "Hello");
        assert_eq!(conversation.exchange(), ExchangeState::Sent);
    }

    #[test]
    fn whitespace_only_input_is_silently_ignored() {
        let mut conversation = Conversation::new();
        assert!(conversation.submit("   \n\t ").is_none());
        assert!(conversation.submit("").is_none());
        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.exchange(), ExchangeState::Idle);
    }

    #[test]
    fn submit_while_in_flight_is_rejected() {
        let mut conversation = Conversation::new();
        conversation.submit("first").unwrap();
        assert!(conversation.submit("second").is_none());
        assert_eq!(conversation.messages().len(), 1);

        conversation.apply(StreamEvent::Delta("...".to_string()));
        assert!(conversation.submit("third").is_none());
    }

    #[test]
    fn chunks_accumulate_into_exactly_one_assistant_message() {
        let mut conversation = Conversation::new();
        conversation.submit("Hello").unwrap();

        conversation.apply(StreamEvent::Delta("Hi".to_string()));
        conversation.apply(StreamEvent::Delta(" there".to_string()));
        conversation.apply(StreamEvent::Done {
            thread_id: Some("t1".to_string()),
        });

        let replies = assistant_messages(&conversation);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, "Hi there");
        assert_eq!(conversation.exchange(), ExchangeState::Completed);
    }

    #[test]
    fn empty_response_creates_no_assistant_message() {
        let mut conversation = Conversation::new();
        conversation.submit("Hello").unwrap();
        conversation.apply(StreamEvent::Done { thread_id: None });

        assert!(assistant_messages(&conversation).is_empty());
        assert_eq!(conversation.exchange(), ExchangeState::Completed);
    }

    #[test]
    fn thread_id_is_stored_and_sent_on_the_next_request() {
        let mut conversation = Conversation::new();

        let first = conversation.submit("Hello").unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            r#"{"content":"Hello","thread_id":null}"#
        );
        conversation.apply(StreamEvent::Delta("Hi there".to_string()));
        conversation.apply(StreamEvent::Done {
            thread_id: Some("t1".to_string()),
        });

        let second = conversation.submit("Again").unwrap();
        assert_eq!(
            serde_json::to_string(&second).unwrap(),
            r#"{"content":"Again","thread_id":"t1"}"#
        );
    }

    #[test]
    fn missing_header_keeps_the_previous_token() {
        let mut conversation = Conversation::new();
        conversation.submit("one").unwrap();
        conversation.apply(StreamEvent::Done {
            thread_id: Some("t1".to_string()),
        });

        conversation.submit("two").unwrap();
        conversation.apply(StreamEvent::Done { thread_id: None });

        assert_eq!(conversation.thread_id(), Some("t1"));
        let third = conversation.submit("three").unwrap();
        assert_eq!(third.thread_id.as_deref(), Some("t1"));
    }

    #[test]
    fn failure_mid_stream_replaces_the_partial_reply() {
        let mut conversation = Conversation::new();
        conversation.submit("Hello").unwrap();
        conversation.apply(StreamEvent::Delta("Hi th".to_string()));
        conversation.apply(StreamEvent::Error("connection reset".to_string()));

        let replies = assistant_messages(&conversation);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, FAILURE_NOTICE);
        assert!(conversation.messages().iter().all(|m| m.text != "Hi th"));
        assert_eq!(conversation.exchange(), ExchangeState::Failed);
    }

    #[test]
    fn failure_before_the_first_chunk_adds_one_notice() {
        let mut conversation = Conversation::new();
        conversation.submit("Hello").unwrap();
        conversation.apply(StreamEvent::Error("refused".to_string()));

        let replies = assistant_messages(&conversation);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, FAILURE_NOTICE);
    }

    #[test]
    fn failure_leaves_the_token_unchanged_and_input_usable() {
        let mut conversation = Conversation::new();
        conversation.submit("one").unwrap();
        conversation.apply(StreamEvent::Done {
            thread_id: Some("t1".to_string()),
        });

        conversation.submit("two").unwrap();
        conversation.apply(StreamEvent::Error("boom".to_string()));

        assert_eq!(conversation.thread_id(), Some("t1"));
        // A failed exchange is terminal for that exchange only.
        assert!(conversation.submit("three").is_some());
    }

    #[test]
    fn reset_thread_clears_the_token() {
        let mut conversation = Conversation::new();
        conversation.submit("one").unwrap();
        conversation.apply(StreamEvent::Done {
            thread_id: Some("t1".to_string()),
        });

        conversation.reset_thread();
        let request = conversation.submit("two").unwrap();
        assert_eq!(request.thread_id, None);
    }
}
