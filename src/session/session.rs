use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::events::{EventBus, SessionEvent, SessionEventKind};
use super::status::{ConnectionStatus, ResourceState, SessionStatus};
use crate::audio::{AudioDevices, AudioPipeline};
use crate::capture::{CaptureKind, FrameSource, FrameStreamer};
use crate::config::{CaptureConfig, Config, ConfigSource, ENV_PREFIX};
use crate::error::{SessionError, TeardownStep};
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::transcript::TranscriptAssembler;
use crate::transport::{ConnectParams, SetupMessage, ToolCall, Transport, TransportEvent};

/// Lets the screen engine report that sharing ended outside the app
/// (e.g. the user revoked it from the OS).
#[derive(Debug, Clone)]
pub struct ScreenStopHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ScreenStopHandle {
    pub fn notify(&self) {
        if self.tx.send(()).is_err() {
            debug!("Screen stop notification dropped: session is gone");
        }
    }
}

/// Something the session has to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Transport(TransportEvent),
    /// The backend event stream ended
    TransportClosed,
    ScreenShareEnded,
}

/// State machine for one live conversation with the model backend.
///
/// Owns the connection, the local audio pipeline, camera/screen capture and
/// the transcript. Every method takes `&mut self`: callers serialize
/// operations and transport events (see `session::driver`).
pub struct LiveSession {
    session_id: String,
    config_source: Arc<dyn ConfigSource>,
    transport: Arc<dyn Transport>,
    devices: Arc<dyn AudioDevices>,
    dispatcher: ToolDispatcher,
    transcript: TranscriptAssembler,
    listeners: EventBus,

    connection: ConnectionStatus,
    /// Config in effect for the current connection
    config: Option<Config>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    connected_at: Option<DateTime<Utc>>,

    pipeline: Option<AudioPipeline>,
    microphone: ResourceState,
    mic_forwarder: Option<JoinHandle<()>>,

    camera: Option<FrameStreamer>,
    screen: Option<FrameStreamer>,
    screen_stop_tx: mpsc::UnboundedSender<()>,
    screen_stop_rx: mpsc::UnboundedReceiver<()>,
}

impl LiveSession {
    pub fn new(
        config_source: Arc<dyn ConfigSource>,
        transport: Arc<dyn Transport>,
        devices: Arc<dyn AudioDevices>,
    ) -> Self {
        let (screen_stop_tx, screen_stop_rx) = mpsc::unbounded_channel();

        Self {
            session_id: format!("live-{}", Uuid::new_v4()),
            config_source,
            transport,
            devices,
            dispatcher: ToolDispatcher::default(),
            transcript: TranscriptAssembler::new(),
            listeners: EventBus::new(),
            connection: ConnectionStatus::Disconnected,
            config: None,
            events: None,
            connected_at: None,
            pipeline: None,
            microphone: ResourceState::Inactive,
            mic_forwarder: None,
            camera: None,
            screen: None,
            screen_stop_tx,
            screen_stop_rx,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_tools(mut self, registry: ToolRegistry) -> Self {
        self.dispatcher = ToolDispatcher::new(registry);
        self
    }

    pub fn with_camera(mut self, engine: Box<dyn FrameSource>) -> Self {
        self.camera = Some(FrameStreamer::new(CaptureKind::Camera, engine));
        self
    }

    pub fn with_screen(mut self, engine: Box<dyn FrameSource>) -> Self {
        self.screen = Some(FrameStreamer::new(CaptureKind::Screen, engine));
        self
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Resolve the current config and open the transport.
    ///
    /// Calling this while connecting or connected is a caller error.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.connection != ConnectionStatus::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }

        let config = self
            .config_source
            .current()
            .map_err(|e| SessionError::Configuration(format!("{:#}", e)))?;
        let params = self.connect_params(&config)?;

        info!(
            "Connecting session {} through {} ({})",
            self.session_id,
            self.transport.name(),
            params.endpoint
        );

        self.connection = ConnectionStatus::Connecting;

        let events = match self.transport.connect(&params).await {
            Ok(events) => events,
            Err(e) => {
                self.connection = ConnectionStatus::Disconnected;
                error!("Failed to connect session {}: {:#}", self.session_id, e);
                return Err(SessionError::Transport(e));
            }
        };

        self.events = Some(events);
        self.config = Some(config);
        self.connected_at = Some(Utc::now());
        self.connection = ConnectionStatus::Connected;

        info!("Session {} connected", self.session_id);

        Ok(())
    }

    fn connect_params(&self, config: &Config) -> Result<ConnectParams, SessionError> {
        let endpoint = config.backend.endpoint.trim();
        if endpoint.is_empty() {
            return Err(SessionError::Configuration(
                "No backend endpoint configured".to_string(),
            ));
        }

        let api_key = config
            .backend
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                SessionError::Configuration(format!(
                    "No API key configured (set backend.api_key or {}__BACKEND__API_KEY)",
                    ENV_PREFIX
                ))
            })?;

        Ok(ConnectParams {
            session_id: self.session_id.clone(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            capture_sample_rate: config.audio.capture_sample_rate,
            setup: SetupMessage::from_config(config, self.dispatcher.registry().declarations()),
        })
    }

    /// Tear everything down: camera, screen, recorder, visualizer, playback,
    /// audio context, then the transport. A live model turn is committed so
    /// the next connection starts a fresh one.
    ///
    /// Every step runs even if an earlier one failed, and all state is reset
    /// so `connect()` works again. The first failure is returned.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        let was_connected = self.connection != ConnectionStatus::Disconnected;

        if !was_connected
            && self.pipeline.is_none()
            && !self.capture_state(CaptureKind::Camera).is_active()
            && !self.capture_state(CaptureKind::Screen).is_active()
        {
            debug!("Session {} has nothing to disconnect", self.session_id);
            return Ok(());
        }

        info!("Disconnecting session {}", self.session_id);

        let mut failure = None;

        if let Some(camera) = self.camera.as_mut() {
            keep_first(&mut failure, TeardownStep::Camera, camera.stop().await);
        }
        if let Some(screen) = self.screen.as_mut() {
            keep_first(&mut failure, TeardownStep::ScreenShare, screen.stop().await);
        }

        if let Some(forwarder) = self.mic_forwarder.take() {
            forwarder.abort();
        }
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(step_failure) = pipeline.release() {
                failure.get_or_insert(step_failure);
            }
        }

        if was_connected {
            keep_first(
                &mut failure,
                TeardownStep::Transport,
                self.transport.disconnect().await,
            );
        }

        if was_connected {
            self.transcript.finalize_streaming_message();
        }

        self.connection = ConnectionStatus::Disconnected;
        self.events = None;
        self.config = None;
        self.connected_at = None;
        self.microphone = ResourceState::Inactive;

        if was_connected {
            self.emit(SessionEvent::Disconnected);
        }

        match failure {
            Some((step, source)) => {
                error!(
                    "Session {} disconnected with errors ({} failed)",
                    self.session_id, step
                );
                Err(SessionError::Disconnect { step, source })
            }
            None => {
                info!("Session {} disconnected and cleaned up", self.session_id);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Local audio
    // ========================================================================

    /// Prepare playback, visualization and microphone capture.
    ///
    /// Nothing stays acquired when this fails.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        if self.pipeline.is_some() {
            warn!("Audio pipeline already initialized");
            return Ok(());
        }

        let config = match &self.config {
            Some(config) => config.clone(),
            None => self
                .config_source
                .current()
                .map_err(|e| SessionError::Configuration(format!("{:#}", e)))?,
        };

        let pipeline = AudioPipeline::acquire(
            self.devices.as_ref(),
            config.audio.sample_rate,
            config.audio.capture_sample_rate,
        )
        .await
        .map_err(|e| {
            error!("Audio initialization failed: {:#}", e);
            SessionError::Initialization(e)
        })?;

        self.pipeline = Some(pipeline);
        info!("Session {} initialized", self.session_id);

        if self.is_connected() {
            if let Some(prompt) = config.session.kickoff_prompt.as_deref() {
                if !prompt.is_empty() {
                    debug!("Sending kickoff prompt");
                    self.transport
                        .send_text(prompt)
                        .await
                        .map_err(SessionError::Transport)?;
                }
            }
        }

        Ok(())
    }

    /// Start the microphone on first use, then suspend/resume the same
    /// capture stream. Returns the new microphone state.
    pub async fn toggle_mic(&mut self) -> Result<ResourceState, SessionError> {
        self.ensure_connected()?;

        let pipeline = self.pipeline.as_mut().ok_or(SessionError::NotInitialized)?;
        let recorder = pipeline.recorder_mut();

        if !recorder.is_started() {
            let mut buffers = recorder.start().await.map_err(SessionError::Initialization)?;
            let transport = Arc::clone(&self.transport);

            self.mic_forwarder = Some(tokio::spawn(async move {
                while let Some(buffer) = buffers.recv().await {
                    if let Err(e) = transport.send_audio(&buffer).await {
                        error!("Error sending audio data: {:#}", e);
                        break;
                    }
                }
                debug!("Microphone forwarding stopped");
            }));

            self.microphone = ResourceState::Active;
        } else {
            let resume = !self.microphone.is_active();
            recorder
                .set_enabled(resume)
                .map_err(SessionError::Capture)?;
            self.microphone = ResourceState::from(resume);
        }

        info!("Microphone {:?}", self.microphone);

        Ok(self.microphone)
    }

    // ========================================================================
    // Camera / screen
    // ========================================================================

    pub async fn start_camera_capture(&mut self) -> Result<(), SessionError> {
        self.start_capture(CaptureKind::Camera).await
    }

    /// No-op when the camera was never started
    pub async fn stop_camera_capture(&mut self) -> Result<(), SessionError> {
        self.stop_capture(CaptureKind::Camera).await
    }

    pub async fn start_screen_share(&mut self) -> Result<(), SessionError> {
        self.start_capture(CaptureKind::Screen).await
    }

    /// No-op when screen sharing was never started
    pub async fn stop_screen_share(&mut self) -> Result<(), SessionError> {
        self.stop_capture(CaptureKind::Screen).await
    }

    /// Handle for the screen engine's "sharing ended" callback
    pub fn screen_stop_handle(&self) -> ScreenStopHandle {
        ScreenStopHandle {
            tx: self.screen_stop_tx.clone(),
        }
    }

    async fn start_capture(&mut self, kind: CaptureKind) -> Result<(), SessionError> {
        self.ensure_connected()?;

        let settings = self.capture_settings();
        let transport = Arc::clone(&self.transport);
        let streamer = self.streamer_mut(kind).ok_or_else(|| {
            SessionError::Initialization(anyhow!("No {} engine configured", kind))
        })?;

        streamer
            .start(transport, &settings)
            .await
            .map_err(SessionError::Initialization)
    }

    async fn stop_capture(&mut self, kind: CaptureKind) -> Result<(), SessionError> {
        match self.streamer_mut(kind) {
            Some(streamer) => streamer.stop().await.map_err(SessionError::Capture),
            None => Ok(()),
        }
    }

    fn streamer_mut(&mut self, kind: CaptureKind) -> Option<&mut FrameStreamer> {
        match kind {
            CaptureKind::Camera => self.camera.as_mut(),
            CaptureKind::Screen => self.screen.as_mut(),
        }
    }

    fn capture_state(&self, kind: CaptureKind) -> ResourceState {
        let streamer = match kind {
            CaptureKind::Camera => self.camera.as_ref(),
            CaptureKind::Screen => self.screen.as_ref(),
        };
        ResourceState::from(streamer.is_some_and(FrameStreamer::is_active))
    }

    fn capture_settings(&self) -> CaptureConfig {
        self.config
            .as_ref()
            .map(|config| config.capture.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    /// Send user text. The live agent turn is finalized before the user
    /// entry is recorded, so history keeps conversational order.
    pub async fn send_text(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;

        self.transport
            .send_text(text)
            .await
            .map_err(SessionError::Transport)?;

        self.transcript.finalize_streaming_message();
        self.transcript.add_user_message(text);
        self.emit(SessionEvent::TextSent(text.to_string()));

        Ok(())
    }

    /// Run the requested tool and send its response.
    ///
    /// Errors propagate and no response is sent, so the backend sees a
    /// stalled call.
    pub async fn handle_tool_call(&mut self, call: &ToolCall) -> Result<(), SessionError> {
        self.ensure_connected()?;

        // TODO: answer every function call in the batch; only the first one
        // is serviced and the others never get a response.
        let Some(function_call) = call.function_calls.first() else {
            warn!("Tool call without function calls");
            return Ok(());
        };
        if call.function_calls.len() > 1 {
            warn!(
                "Tool call carries {} function calls; only '{}' is handled",
                call.function_calls.len(),
                function_call.name
            );
        }

        let response = self.dispatcher.dispatch(function_call).await?;

        self.transport
            .send_tool_response(&response)
            .await
            .map_err(SessionError::Transport)
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Wait for the next transport event or screen-stop notification.
    ///
    /// Pends forever while disconnected and nothing is shared.
    pub async fn next_input(&mut self) -> SessionInput {
        let events = &mut self.events;
        let screen_stop = &mut self.screen_stop_rx;

        tokio::select! {
            event = recv_event(events) => match event {
                Some(event) => SessionInput::Transport(event),
                None => SessionInput::TransportClosed,
            },
            Some(()) = screen_stop.recv() => SessionInput::ScreenShareEnded,
        }
    }

    pub async fn handle_input(&mut self, input: SessionInput) -> Result<(), SessionError> {
        match input {
            SessionInput::Transport(event) => self.handle_event(event).await,
            SessionInput::TransportClosed => {
                warn!("Backend connection for session {} closed", self.session_id);
                self.transcript.finalize_streaming_message();
                self.transcript
                    .add_system_message("Connection to the backend was lost");
                self.disconnect().await
            }
            SessionInput::ScreenShareEnded => self.handle_screen_share_ended().await,
        }
    }

    /// React to one backend event
    pub async fn handle_event(&mut self, event: TransportEvent) -> Result<(), SessionError> {
        match event {
            TransportEvent::Audio(pcm) => {
                let Some(pipeline) = self.pipeline.as_mut() else {
                    debug!("Dropping {} bytes of model audio: not initialized", pcm.len());
                    return Ok(());
                };

                let playback = pipeline.playback_mut();
                if !playback.is_primed() {
                    playback.prime().map_err(SessionError::Playback)?;
                }
                playback.enqueue(&pcm).map_err(SessionError::Playback)
            }

            TransportEvent::Interrupted => {
                info!("Model interrupted");

                if let Some(pipeline) = self.pipeline.as_mut() {
                    if let Err(e) = pipeline.playback_mut().stop() {
                        warn!("Failed to stop playback: {:#}", e);
                    }
                }

                self.transcript.interrupt();
                self.emit(SessionEvent::Interrupted);
                Ok(())
            }

            TransportEvent::TurnComplete => {
                info!("Model finished speaking");
                self.transcript.finalize_streaming_message();
                self.emit(SessionEvent::TurnComplete);
                Ok(())
            }

            TransportEvent::Content(content) => {
                let mut updated = false;
                for text in content.texts() {
                    updated |= self.transcript.update_streaming_message(text);
                }

                if updated {
                    self.emit(SessionEvent::TranscriptUpdated);
                } else {
                    debug!("Content event without displayable text");
                }
                Ok(())
            }

            TransportEvent::ToolCall(call) => self.handle_tool_call(&call).await,
        }
    }

    async fn handle_screen_share_ended(&mut self) -> Result<(), SessionError> {
        if !self.capture_state(CaptureKind::Screen).is_active() {
            debug!("Screen stop notification while not sharing");
            return Ok(());
        }

        info!("Screen sharing ended outside the app");

        let result = self.stop_screen_share().await;
        self.emit(SessionEvent::ScreenshareStopped);
        result
    }

    // ========================================================================
    // Observers and accessors
    // ========================================================================

    /// Register a listener for one kind of session event
    pub fn on<F>(&mut self, kind: SessionEventKind, listener: F)
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        self.listeners.on(kind, listener);
    }

    fn emit(&mut self, event: SessionEvent) {
        self.listeners.emit(&event);
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }

    pub fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn microphone(&self) -> ResourceState {
        self.microphone
    }

    pub fn camera(&self) -> ResourceState {
        self.capture_state(CaptureKind::Camera)
    }

    pub fn screen(&self) -> ResourceState {
        self.capture_state(CaptureKind::Screen)
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    pub fn transcript(&self) -> &TranscriptAssembler {
        &self.transcript
    }

    /// Explicit session reset of the conversation history
    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id.clone(),
            connection: self.connection,
            connected_at: self.connected_at,
            initialized: self.is_initialized(),
            microphone: self.microphone,
            camera: self.camera(),
            screen: self.screen(),
            turn_active: self.transcript.has_active_turn(),
            history_len: self.transcript.history().len(),
        }
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }
}

async fn recv_event(events: &mut Option<mpsc::Receiver<TransportEvent>>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn keep_first(
    failure: &mut Option<(TeardownStep, anyhow::Error)>,
    step: TeardownStep,
    result: anyhow::Result<()>,
) {
    if let Err(e) = result {
        warn!("Failed to stop {}: {:#}", step, e);
        failure.get_or_insert((step, e));
    }
}
