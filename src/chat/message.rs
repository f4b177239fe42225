use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label displayed for documents that were uploaded without a group
pub const WITHOUT_GROUP: &str = "Without group";

/// Position of a message in its session log. Ids only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A previously uploaded document attached to a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
    pub display_name: String,
    pub group: Option<String>,
}

impl DocumentRef {
    pub fn group_label(&self) -> &str {
        self.group
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(WITHOUT_GROUP)
    }
}

/// One chat turn half: either the user's prompt or the assistant's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub is_error: bool,
    pub category: Option<String>,
    pub document_ref: Option<DocumentRef>,
    /// Where the answer came from, when the service reports it
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds a user message. The id is assigned when it is appended to a log.
    pub fn user(
        text: impl Into<String>,
        category: Option<String>,
        document_ref: Option<DocumentRef>,
    ) -> Self {
        Self {
            id: MessageId(0),
            text: text.into(),
            sender: Sender::User,
            is_error: false,
            category,
            document_ref,
            source: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, category: Option<String>) -> Self {
        Self {
            id: MessageId(0),
            text: text.into(),
            sender: Sender::Assistant,
            is_error: false,
            category,
            document_ref: None,
            source: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn failed(mut self) -> Self {
        self.is_error = true;
        self
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Partial update applied in place to an existing message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub is_error: Option<bool>,
}

impl MessagePatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_error: Some(true),
        }
    }

    pub(crate) fn apply(self, message: &mut Message) {
        if let Some(text) = self.text {
            message.text = text;
        }
        if let Some(is_error) = self.is_error {
            message.is_error = is_error;
        }
    }
}
