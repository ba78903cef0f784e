//! Errors surfaced at the session boundary.
//!
//! Collaborators (transport, devices, tools) report `anyhow::Error`; the
//! session wraps them into [`SessionError`] so callers can match on the kind
//! of failure and decide whether the user can retry.

use std::fmt;
use thiserror::Error;

/// Teardown step that failed while disconnecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    Camera,
    ScreenShare,
    Recorder,
    Visualizer,
    Playback,
    AudioContext,
    Transport,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeardownStep::Camera => "camera capture",
            TeardownStep::ScreenShare => "screen share",
            TeardownStep::Recorder => "audio recorder",
            TeardownStep::Visualizer => "audio visualizer",
            TeardownStep::Playback => "audio playback",
            TeardownStep::AudioContext => "audio context",
            TeardownStep::Transport => "transport",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Endpoint or credential could not be resolved. Fixed by editing settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Device or permission failure. The user may retry.
    #[error("Initialization failed: {0:#}")]
    Initialization(anyhow::Error),

    #[error("No tool registered under the name '{0}'")]
    UnknownTool(String),

    #[error("Tool '{name}' failed: {source:#}")]
    ToolFailed { name: String, source: anyhow::Error },

    /// State flags were reset even though this step failed.
    #[error("Disconnect failed while stopping {step}: {source:#}")]
    Disconnect {
        step: TeardownStep,
        source: anyhow::Error,
    },

    #[error("Session is already connected")]
    AlreadyConnected,

    #[error("Session is not connected")]
    NotConnected,

    #[error("Audio pipeline is not initialized")]
    NotInitialized,

    #[error("Audio playback failed: {0:#}")]
    Playback(anyhow::Error),

    #[error("Capture failed: {0:#}")]
    Capture(anyhow::Error),

    /// The task driving the session is gone
    #[error("Session task has stopped")]
    Stopped,

    #[error(transparent)]
    Transport(anyhow::Error),
}

impl SessionError {
    /// True for failures the user can fix by retrying or changing settings
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Configuration(_)
                | SessionError::Initialization(_)
                | SessionError::Disconnect { .. }
        )
    }
}
