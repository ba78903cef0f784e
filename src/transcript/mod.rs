//! Streaming transcript assembly
//!
//! This module turns the model's partial text fragments into:
//! - a live rendering of the turn being streamed
//! - an append-only history of committed entries
//!
//! State changes are driven by session lifecycle events (content fragment,
//! interruption, turn complete, user text sent).

mod assembler;
mod entry;
pub mod render;

pub use assembler::{
    is_silent, TranscriptAssembler, Turn, UserMessageKind, AUDIO_MESSAGE_TEXT, SILENT_VARIATIONS,
};
pub use entry::{EntryKind, Role, TranscriptEntry, TranscriptSnapshot};
pub use render::{escape_html, render_markdown, STREAMING_INDICATOR};
