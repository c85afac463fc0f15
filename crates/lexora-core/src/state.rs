//! UI-agnostic page state
//!
//! Everything a front end needs to draw the chat page lives here. None of
//! these types know about terminals or widgets.

use std::time::{Duration, Instant};

/// How long a notice stays visible after being shown.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// A chat message in the document conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub sources: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Append-only list of messages in chronological order.
///
/// Messages are never edited once pushed; the only removal is `clear`, which
/// drops the whole log.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadState {
    pub in_progress: bool,
}

/// Document count and model label shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub document_count: u64,
    pub model_name: String,
    pub error: Option<String>,
}

impl StatusSummary {
    /// The text for the model label: the error wins over the model name.
    pub fn display_model(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.model_name)
    }
}

impl Default for StatusSummary {
    fn default() -> Self {
        Self {
            document_count: 0,
            model_name: "Loading...".to_string(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message box text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>, now: Instant) -> Self {
        Self {
            kind,
            text: text.into(),
            expires_at: now + NOTICE_TTL,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
