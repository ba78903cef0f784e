use serde::Serialize;
use tracing::debug;

/// High-level session notification for presentation glue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum SessionEvent {
    /// User text reached the backend
    TextSent(String),
    /// The model was interrupted; its turn has been finalized
    Interrupted,
    /// The model finished its turn
    TurnComplete,
    /// Screen sharing ended outside the app
    ScreenshareStopped,
    /// The live rendering changed
    TranscriptUpdated,
    /// The connection was torn down
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    TextSent,
    Interrupted,
    TurnComplete,
    ScreenshareStopped,
    TranscriptUpdated,
    Disconnected,
}

impl SessionEventKind {
    pub const ALL: [SessionEventKind; 6] = [
        SessionEventKind::TextSent,
        SessionEventKind::Interrupted,
        SessionEventKind::TurnComplete,
        SessionEventKind::ScreenshareStopped,
        SessionEventKind::TranscriptUpdated,
        SessionEventKind::Disconnected,
    ];
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::TextSent(_) => SessionEventKind::TextSent,
            SessionEvent::Interrupted => SessionEventKind::Interrupted,
            SessionEvent::TurnComplete => SessionEventKind::TurnComplete,
            SessionEvent::ScreenshareStopped => SessionEventKind::ScreenshareStopped,
            SessionEvent::TranscriptUpdated => SessionEventKind::TranscriptUpdated,
            SessionEvent::Disconnected => SessionEventKind::Disconnected,
        }
    }
}

pub type Listener = Box<dyn FnMut(&SessionEvent) + Send>;

/// Synchronous observer list.
///
/// A listener receives every event of its kind emitted after it was
/// registered, in registration order across all listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SessionEventKind, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: SessionEventKind, listener: F)
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        self.listeners.push((kind, Box::new(listener)));
    }

    /// Notify matching listeners; returns how many were called
    pub fn emit(&mut self, event: &SessionEvent) -> usize {
        let kind = event.kind();
        let mut notified = 0;

        for (listener_kind, listener) in self.listeners.iter_mut() {
            if *listener_kind == kind {
                listener(event);
                notified += 1;
            }
        }

        debug!("Emitted {:?} to {} listener(s)", kind, notified);
        notified
    }

    pub fn listener_count(&self, kind: SessionEventKind) -> usize {
        self.listeners.iter().filter(|(k, _)| *k == kind).count()
    }
}
