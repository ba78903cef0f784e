use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Text,
    /// Placeholder for a user turn that was spoken rather than typed
    AudioNotice,
    System,
}

/// A committed line of conversation history. Never modified once pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,

    pub kind: EntryKind,

    /// Source text (markdown for agent entries, literal text otherwise)
    pub text: String,

    /// Markup shown to the user
    pub content: String,

    /// When the entry was committed
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub(crate) fn new(role: Role, kind: EntryKind, text: String, content: String) -> Self {
        Self {
            role,
            kind,
            text,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// Point-in-time copy of the transcript for presentation layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    pub history: Vec<TranscriptEntry>,

    /// Current live rendering (possibly the last finished answer)
    pub live: String,

    /// Whether a model turn is currently streaming
    pub streaming: bool,
}
