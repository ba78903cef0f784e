use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::{SessionEvent, SessionEventKind};
use super::session::LiveSession;
use super::status::{ResourceState, SessionStatus};
use crate::error::SessionError;
use crate::transcript::TranscriptSnapshot;

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Connect(Reply<()>),
    Disconnect(Reply<()>),
    Initialize(Reply<()>),
    SendText(String, Reply<()>),
    ToggleMic(Reply<ResourceState>),
    StartCamera(Reply<()>),
    StopCamera(Reply<()>),
    StartScreen(Reply<()>),
    StopScreen(Reply<()>),
    Status(oneshot::Sender<SessionStatus>),
    Transcript(oneshot::Sender<TranscriptSnapshot>),
    ClearTranscript(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front end to a session running on its own task
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

/// Move `session` onto a task that serializes caller commands with backend
/// events and screen-stop notifications, in arrival order.
///
/// Every session event is also published on a broadcast channel
/// (see [`SessionHandle::subscribe`]).
pub fn spawn_session(mut session: LiveSession) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    for kind in SessionEventKind::ALL {
        let events = event_tx.clone();
        session.on(kind, move |event| {
            // No subscribers is fine
            let _ = events.send(event.clone());
        });
    }

    let task = tokio::spawn(run(session, command_rx));

    let handle = SessionHandle {
        commands: command_tx,
        events: event_tx,
    };

    (handle, task)
}

async fn run(mut session: LiveSession, mut commands: mpsc::Receiver<Command>) {
    info!("Session task started for {}", session.session_id());

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown(reply)) => {
                    shutdown(&mut session).await;
                    let _ = reply.send(());
                    break;
                }
                Some(command) => execute(&mut session, command).await,
                None => {
                    debug!("All session handles dropped");
                    shutdown(&mut session).await;
                    break;
                }
            },
            input = session.next_input() => {
                if let Err(e) = session.handle_input(input).await {
                    error!("Failed to handle session input: {}", e);
                }
            }
        }
    }

    info!("Session task stopped for {}", session.session_id());
}

async fn execute(session: &mut LiveSession, command: Command) {
    // A dropped reply receiver means the caller gave up waiting
    match command {
        Command::Connect(reply) => {
            let _ = reply.send(session.connect().await);
        }
        Command::Disconnect(reply) => {
            let _ = reply.send(session.disconnect().await);
        }
        Command::Initialize(reply) => {
            let _ = reply.send(session.initialize().await);
        }
        Command::SendText(text, reply) => {
            let _ = reply.send(session.send_text(&text).await);
        }
        Command::ToggleMic(reply) => {
            let _ = reply.send(session.toggle_mic().await);
        }
        Command::StartCamera(reply) => {
            let _ = reply.send(session.start_camera_capture().await);
        }
        Command::StopCamera(reply) => {
            let _ = reply.send(session.stop_camera_capture().await);
        }
        Command::StartScreen(reply) => {
            let _ = reply.send(session.start_screen_share().await);
        }
        Command::StopScreen(reply) => {
            let _ = reply.send(session.stop_screen_share().await);
        }
        Command::Status(reply) => {
            let _ = reply.send(session.status());
        }
        Command::Transcript(reply) => {
            let _ = reply.send(session.transcript().snapshot());
        }
        Command::ClearTranscript(reply) => {
            session.clear_transcript();
            let _ = reply.send(());
        }
        Command::Shutdown(reply) => {
            let _ = reply.send(());
        }
    }
}

async fn shutdown(session: &mut LiveSession) {
    if let Err(e) = session.disconnect().await {
        warn!("Session shut down with errors: {}", e);
    }
}

impl SessionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SessionError::Stopped)?;
        rx.await.map_err(|_| SessionError::Stopped)
    }

    pub async fn connect(&self) -> Result<(), SessionError> {
        self.request(Command::Connect).await?
    }

    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.request(Command::Disconnect).await?
    }

    pub async fn initialize(&self) -> Result<(), SessionError> {
        self.request(Command::Initialize).await?
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::SendText(text, reply)).await?
    }

    pub async fn toggle_mic(&self) -> Result<ResourceState, SessionError> {
        self.request(Command::ToggleMic).await?
    }

    pub async fn start_camera_capture(&self) -> Result<(), SessionError> {
        self.request(Command::StartCamera).await?
    }

    pub async fn stop_camera_capture(&self) -> Result<(), SessionError> {
        self.request(Command::StopCamera).await?
    }

    pub async fn start_screen_share(&self) -> Result<(), SessionError> {
        self.request(Command::StartScreen).await?
    }

    pub async fn stop_screen_share(&self) -> Result<(), SessionError> {
        self.request(Command::StopScreen).await?
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        self.request(Command::Status).await
    }

    pub async fn transcript(&self) -> Result<TranscriptSnapshot, SessionError> {
        self.request(Command::Transcript).await
    }

    pub async fn clear_transcript(&self) -> Result<(), SessionError> {
        self.request(Command::ClearTranscript).await
    }

    /// Disconnect and stop the session task
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(Command::Shutdown).await
    }

    /// Receive session events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
