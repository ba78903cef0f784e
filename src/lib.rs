pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod tools;
pub mod transcript;
pub mod transport;

pub use audio::{AudioDevices, AudioPipeline, HeadlessDevices};
pub use capture::{CaptureKind, FrameSource, FrameStreamer};
pub use config::{Config, ConfigSource, FileConfigSource};
pub use error::{SessionError, TeardownStep};
pub use http::{create_router, AppState};
pub use session::{
    spawn_session, ConnectionStatus, LiveSession, ResourceState, ScreenStopHandle, SessionEvent,
    SessionEventKind, SessionHandle, SessionStatus,
};
pub use tools::{FnTool, Tool, ToolDispatcher, ToolRegistry};
pub use transcript::{TranscriptAssembler, TranscriptEntry, TranscriptSnapshot};
pub use transport::{NatsTransport, Transport, TransportEvent};
