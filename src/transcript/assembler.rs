use tracing::{debug, info};

use super::entry::{EntryKind, Role, TranscriptEntry, TranscriptSnapshot};
use super::render::{escape_html, render_markdown, STREAMING_INDICATOR};

/// Fragment values meaning "no visible output for this turn". Truncated
/// forms are listed explicitly; matching is exact after trim + lowercase.
pub const SILENT_VARIATIONS: [&str; 5] = ["<silent>", "silent>", "<silent", "<", ">"];

/// Text shown for a user turn that was spoken
pub const AUDIO_MESSAGE_TEXT: &str = "User sent audio";

pub fn is_silent(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    SILENT_VARIATIONS.contains(&normalized.as_str())
}

/// The model turn currently being streamed
#[derive(Debug, Clone, Default)]
pub struct Turn {
    raw: String,
}

impl Turn {
    /// Accumulated raw text (markdown)
    pub fn text(&self) -> &str {
        &self.raw
    }
}

/// How the user last addressed the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMessageKind {
    Text,
    Audio,
}

/// Builds the conversation history from streamed model fragments.
///
/// Holds the committed history plus one live rendering. The live rendering
/// outlives its turn: after finalization it keeps showing the last answer
/// until the next turn produces displayable text.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    history: Vec<TranscriptEntry>,
    turn: Option<Turn>,
    live: String,
    last_user_message: Option<UserMessageKind>,
    last_finalized_markdown: Option<String>,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment of the live turn. Returns false when the fragment
    /// was suppressed.
    pub fn update_streaming_message(&mut self, fragment: &str) -> bool {
        if is_silent(fragment) {
            debug!("Ignoring silent fragment {:?}", fragment);
            return false;
        }

        let turn = self.turn.get_or_insert_with(Turn::default);

        let fragment = if turn.raw.is_empty() {
            // New displayable stream: drop the previous answer
            self.live.clear();
            fragment.strip_prefix(' ').unwrap_or(fragment)
        } else {
            fragment
        };

        turn.raw.push_str(fragment);

        self.live = render_markdown(&turn.raw);
        self.live.push_str(STREAMING_INDICATOR);
        true
    }

    /// Close the live turn (turn complete, interruption, user input).
    ///
    /// Returns true when an agent entry was committed.
    pub fn finalize_streaming_message(&mut self) -> bool {
        let committed = self.commit_turn();
        self.last_user_message = None;
        committed
    }

    /// Called when a new model turn is expected: commits any unfinished
    /// stream but keeps track of the user message that triggered it.
    pub fn start_model_message(&mut self) -> bool {
        self.commit_turn()
    }

    /// Finalize after the user interrupted the model. A turn with no typed
    /// message before it is recorded as a spoken user message.
    pub fn interrupt(&mut self) -> bool {
        let typed = self.last_user_message == Some(UserMessageKind::Text);
        let committed = self.finalize_streaming_message();
        if !typed {
            self.add_user_audio_message();
        }
        committed
    }

    pub fn add_user_message(&mut self, text: &str) {
        self.history.push(TranscriptEntry::new(
            Role::User,
            EntryKind::Text,
            text.to_string(),
            escape_html(text),
        ));
        self.last_user_message = Some(UserMessageKind::Text);
    }

    pub fn add_user_audio_message(&mut self) {
        self.history.push(TranscriptEntry::new(
            Role::User,
            EntryKind::AudioNotice,
            AUDIO_MESSAGE_TEXT.to_string(),
            AUDIO_MESSAGE_TEXT.to_string(),
        ));
        self.last_user_message = Some(UserMessageKind::Audio);
    }

    /// Informational entry (connection changes, capture notices)
    pub fn add_system_message(&mut self, text: &str) {
        self.history.push(TranscriptEntry::new(
            Role::System,
            EntryKind::System,
            text.to_string(),
            escape_html(text),
        ));
    }

    /// Wipe history and all streaming state
    pub fn clear(&mut self) {
        self.history.clear();
        self.turn = None;
        self.live.clear();
        self.last_user_message = None;
        self.last_finalized_markdown = None;
        info!("Transcript cleared");
    }

    pub fn history(&self) -> &[TranscriptEntry] {
        &self.history
    }

    /// Live rendering, including the streaming indicator while a turn runs
    pub fn live_rendering(&self) -> &str {
        &self.live
    }

    /// Raw text accumulated by the live turn
    pub fn accumulated_text(&self) -> &str {
        self.turn.as_ref().map(Turn::text).unwrap_or("")
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    pub fn has_active_turn(&self) -> bool {
        self.turn.is_some()
    }

    /// Markdown of the last committed agent answer
    pub fn last_finalized_markdown(&self) -> Option<&str> {
        self.last_finalized_markdown.as_deref()
    }

    pub fn last_user_message(&self) -> Option<UserMessageKind> {
        self.last_user_message
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            history: self.history.clone(),
            live: self.live.clone(),
            streaming: self.turn.is_some(),
        }
    }

    fn commit_turn(&mut self) -> bool {
        if let Some(stripped) = self.live.strip_suffix(STREAMING_INDICATOR) {
            let len = stripped.len();
            self.live.truncate(len);
        }

        let Some(turn) = self.turn.take() else {
            return false;
        };

        let text = turn.raw.trim();
        if text.is_empty() || is_silent(text) {
            debug!("Discarding turn without displayable text");
            return false;
        }

        self.last_finalized_markdown = Some(text.to_string());
        self.history.push(TranscriptEntry::new(
            Role::Agent,
            EntryKind::Text,
            text.to_string(),
            self.live.clone(),
        ));
        true
    }
}
