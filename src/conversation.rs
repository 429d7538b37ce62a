//! Conversation state for the active chat session.

use chrono::Utc;
use uuid::Uuid;

use crate::events::SendOutcome;

/// Greeting shown when the app starts.
pub const INITIAL_GREETING: &str = "Hello! I'm Gemini Flash. How can I help you today?";

/// Greeting shown after a "New Chat" reset.
pub const RESET_GREETING: &str = "New chat started. How can I assist you?";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Model,
    Error,
}

/// A single message in the conversation. Immutable once created; display
/// order is insertion order.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    /// Epoch millis at creation time.
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    /// Create a new model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Model, text)
    }

    /// Create a new error message.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Error, text)
    }
}

/// Ordered message list plus the loading and error flags that gate sends.
///
/// Every mutation bumps `revision`, so observers can tell the conversation
/// changed without diffing the message list.
pub struct ConversationState {
    messages: Vec<Message>,
    is_loading: bool,
    last_error: Option<String>,
    revision: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::model(INITIAL_GREETING)],
            is_loading: false,
            last_error: None,
            revision: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Mutation counter; bumped by every change to the conversation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append a message. No deduplication, no cap on history length.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.revision += 1;
    }

    /// Start a send: append the user message and raise the loading flag.
    ///
    /// Returns false (a no-op) when the trimmed text is empty or a send is
    /// already in flight.
    pub fn begin_send(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.is_loading {
            return false;
        }

        self.push(Message::user(text));
        self.is_loading = true;
        self.last_error = None;
        true
    }

    /// Finish a send: append exactly one model or error message and drop
    /// the loading flag.
    pub fn finish_send(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Reply(text) => self.push(Message::model(text)),
            SendOutcome::Failed(err) => {
                let detail = err.to_string();
                self.push(Message::error(format!("Error: {detail}")));
                self.last_error = Some(detail);
            }
        }
        self.is_loading = false;
    }

    /// Reset to a single greeting message with clear flags.
    pub fn reset(&mut self) {
        self.messages = vec![Message::model(RESET_GREETING)];
        self.is_loading = false;
        self.last_error = None;
        self.revision += 1;
    }

    /// Error text for the banner, unless an error-role message already
    /// shows it.
    pub fn banner_error(&self) -> Option<&str> {
        let err = self.last_error.as_deref()?;
        let already_shown = self
            .messages
            .iter()
            .any(|m| m.role == MessageRole::Error && m.text.contains(err));
        if already_shown { None } else { Some(err) }
    }
}
