//! Live session management
//!
//! This module provides the `LiveSession` state machine that manages:
//! - The connection to the model backend
//! - Local audio (playback, visualization, microphone)
//! - Camera and screen frame streaming
//! - Tool calls and the conversation transcript
//!
//! `spawn_session` runs a session on its own task behind a `SessionHandle`.

mod driver;
mod events;
mod session;
mod status;

pub use driver::{spawn_session, SessionHandle};
pub use events::{EventBus, Listener, SessionEvent, SessionEventKind};
pub use session::{LiveSession, ScreenStopHandle, SessionInput};
pub use status::{ConnectionStatus, ResourceState, SessionStatus};
