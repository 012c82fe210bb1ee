use kpoint_core::ChatMessage;
use serde::Serialize;

/// Lifecycle of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// The user's message is in the log.
    UserSubmitted,
    /// The reply is scheduled but not yet appended.
    ResponsePending,
    /// The reply is in the log. Terminal.
    ResponseAppended,
}

impl TurnState {
    /// Next state, or `None` from the terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::UserSubmitted => Some(Self::ResponsePending),
            Self::ResponsePending => Some(Self::ResponseAppended),
            Self::ResponseAppended => None,
        }
    }
}

/// Append-only conversation history.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
