// Test doubles for the session's collaborators
//
// Every mock records what it was asked to do in a shared log so tests can
// assert on call order across components.

#![allow(dead_code)]

use anyhow::{bail, Result};
use loqa_live::audio::{AudioContext, AudioDevices, AudioPlayback, AudioRecorder, Visualizer};
use loqa_live::capture::FrameSource;
use loqa_live::config::{CaptureConfig, Config};
use loqa_live::transport::{ConnectParams, ToolResponse, Transport, TransportEvent};
use loqa_live::session::{SessionEvent, SessionEventKind};
use loqa_live::LiveSession;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Config that passes connect-time validation
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.backend.api_key = Some("test-key".to_string());
    config
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(String),
    Audio(Vec<u8>),
    Image(String),
    ToolResponse(ToolResponse),
}

#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    params: Mutex<Option<ConnectParams>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_disconnect: AtomicBool,
    pub fail_send: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Image(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    pub fn tool_responses(&self) -> Vec<ToolResponse> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::ToolResponse(response) => Some(response),
                _ => None,
            })
            .collect()
    }

    pub fn last_params(&self) -> Option<ConnectParams> {
        self.params.lock().unwrap().clone()
    }

    /// Feed an event as if the backend had sent it
    pub async fn push(&self, event: TransportEvent) {
        let tx = self.events.lock().unwrap().clone();
        tx.expect("transport not connected")
            .send(event)
            .await
            .expect("session dropped the event stream");
    }

    /// End the event stream as if the backend went away
    pub fn close(&self) {
        self.events.lock().unwrap().take();
    }

    fn record(&self, sent: Sent) -> Result<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            bail!("send failed");
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self, params: &ConnectParams) -> Result<mpsc::Receiver<TransportEvent>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("connection refused");
        }

        let (tx, rx) = mpsc::channel(16);
        *self.events.lock().unwrap() = Some(tx);
        *self.params.lock().unwrap() = Some(params.clone());
        Ok(rx)
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().take();
        if self.fail_disconnect.load(Ordering::SeqCst) {
            bail!("close failed");
        }
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.record(Sent::Text(text.to_string()))
    }

    async fn send_audio(&self, pcm: &[u8]) -> Result<()> {
        self.record(Sent::Audio(pcm.to_vec()))
    }

    async fn send_image(&self, jpeg_base64: &str) -> Result<()> {
        self.record(Sent::Image(jpeg_base64.to_string()))
    }

    async fn send_tool_response(&self, response: &ToolResponse) -> Result<()> {
        self.record(Sent::ToolResponse(response.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Audio devices
// ============================================================================

/// Shared by the device provider and every component it opens
#[derive(Default)]
pub struct DeviceState {
    log: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    mic: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    pub recorder_starts: AtomicUsize,
}

impl DeviceState {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Make the named operation fail (it is still logged)
    pub fn fail_on(&self, op: &str) {
        *self.fail_on.lock().unwrap() = Some(op.to_string());
    }

    /// Sender feeding the started recorder, as if the microphone produced audio
    pub fn mic(&self) -> Option<mpsc::Sender<Vec<u8>>> {
        self.mic.lock().unwrap().clone()
    }

    fn record(&self, op: &str) -> Result<()> {
        self.log.lock().unwrap().push(op.to_string());
        if self.fail_on.lock().unwrap().as_deref() == Some(op) {
            bail!("{} failed", op);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockDevices {
    pub state: Arc<DeviceState>,
}

impl MockDevices {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MockContext {
    state: Arc<DeviceState>,
    sample_rate: u32,
}

impl AudioContext for MockContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(&mut self) -> Result<()> {
        self.state.record("context.close")
    }
}

struct MockPlayback {
    state: Arc<DeviceState>,
    primed: bool,
}

impl AudioPlayback for MockPlayback {
    fn is_primed(&self) -> bool {
        self.primed
    }

    fn prime(&mut self) -> Result<()> {
        self.state.record("playback.prime")?;
        self.primed = true;
        Ok(())
    }

    fn enqueue(&mut self, pcm: &[u8]) -> Result<()> {
        self.state.record(&format!("playback.enqueue({})", pcm.len()))
    }

    fn stop(&mut self) -> Result<()> {
        self.primed = false;
        self.state.record("playback.stop")
    }
}

struct MockVisualizer {
    state: Arc<DeviceState>,
}

impl Visualizer for MockVisualizer {
    fn start(&mut self) -> Result<()> {
        self.state.record("visualizer.start")
    }

    fn cleanup(&mut self) -> Result<()> {
        self.state.record("visualizer.cleanup")
    }
}

struct MockRecorder {
    state: Arc<DeviceState>,
    started: bool,
}

#[async_trait::async_trait]
impl AudioRecorder for MockRecorder {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>> {
        self.state.record("recorder.start")?;
        self.state.recorder_starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(16);
        *self.state.mic.lock().unwrap() = Some(tx);
        self.started = true;
        Ok(rx)
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.state.record(&format!("recorder.enabled({})", enabled))
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        self.state.mic.lock().unwrap().take();
        self.state.record("recorder.stop")
    }
}

#[async_trait::async_trait]
impl AudioDevices for MockDevices {
    async fn open_context(&self, sample_rate: u32) -> Result<Box<dyn AudioContext>> {
        self.state.record("context.open")?;
        Ok(Box::new(MockContext {
            state: Arc::clone(&self.state),
            sample_rate,
        }))
    }

    async fn open_playback(&self, _sample_rate: u32) -> Result<Box<dyn AudioPlayback>> {
        self.state.record("playback.open")?;
        Ok(Box::new(MockPlayback {
            state: Arc::clone(&self.state),
            primed: false,
        }))
    }

    async fn open_visualizer(&self) -> Result<Box<dyn Visualizer>> {
        self.state.record("visualizer.open")?;
        Ok(Box::new(MockVisualizer {
            state: Arc::clone(&self.state),
        }))
    }

    async fn open_recorder(&self, _sample_rate: u32) -> Result<Box<dyn AudioRecorder>> {
        self.state.record("recorder.open")?;
        Ok(Box::new(MockRecorder {
            state: Arc::clone(&self.state),
            started: false,
        }))
    }

    fn name(&self) -> &str {
        "mock devices"
    }
}

// ============================================================================
// Frame sources
// ============================================================================

#[derive(Default)]
pub struct FrameState {
    log: Mutex<Vec<String>>,
    settings: Mutex<Option<CaptureConfig>>,
    pub fail_init: AtomicBool,
    pub fail_dispose: AtomicBool,
    pub captures: AtomicUsize,
}

impl FrameState {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Settings passed to the last `initialize`
    pub fn settings(&self) -> Option<CaptureConfig> {
        self.settings.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.log.lock().unwrap().push(op.to_string());
    }
}

pub struct MockFrameSource {
    name: String,
    pub state: Arc<FrameState>,
}

impl MockFrameSource {
    pub fn new(name: &str) -> (Box<Self>, Arc<FrameState>) {
        let state = Arc::new(FrameState::default());
        let source = Box::new(Self {
            name: name.to_string(),
            state: Arc::clone(&state),
        });
        (source, state)
    }
}

#[async_trait::async_trait]
impl FrameSource for MockFrameSource {
    async fn initialize(&mut self, settings: &CaptureConfig) -> Result<()> {
        self.state.record("initialize");
        *self.state.settings.lock().unwrap() = Some(settings.clone());
        if self.state.fail_init.load(Ordering::SeqCst) {
            bail!("permission denied");
        }
        Ok(())
    }

    async fn capture(&mut self) -> Result<String> {
        let n = self.state.captures.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-frame-{}", self.name, n))
    }

    fn dispose(&mut self) -> Result<()> {
        self.state.record("dispose");
        if self.state.fail_dispose.load(Ordering::SeqCst) {
            bail!("dispose failed");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Session fixtures
// ============================================================================

pub struct Fixture {
    pub session: LiveSession,
    pub transport: Arc<MockTransport>,
    pub devices: Arc<DeviceState>,
    pub camera: Arc<FrameState>,
    pub screen: Arc<FrameState>,
}

/// Session over mocks with camera and screen engines
pub fn fixture(config: Config) -> Fixture {
    let transport = MockTransport::new();
    let devices = MockDevices::new();
    let device_state = Arc::clone(&devices.state);
    let (camera, camera_state) = MockFrameSource::new("camera");
    let (screen, screen_state) = MockFrameSource::new("screen");

    let session = LiveSession::new(Arc::new(config), transport.clone(), Arc::new(devices))
        .with_session_id("test-session")
        .with_camera(camera)
        .with_screen(screen);

    Fixture {
        session,
        transport,
        devices: device_state,
        camera: camera_state,
        screen: screen_state,
    }
}

/// Fixture that is already connected and initialized
pub async fn ready_fixture() -> Fixture {
    let mut fx = fixture(test_config());
    fx.session.connect().await.expect("connect");
    fx.session.initialize().await.expect("initialize");
    fx.devices.clear_log();
    fx
}

/// Record every session event in emission order
pub fn record_events(session: &mut LiveSession) -> Arc<Mutex<Vec<SessionEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    for kind in SessionEventKind::ALL {
        let events = Arc::clone(&events);
        session.on(kind, move |event| events.lock().unwrap().push(event.clone()));
    }
    events
}

/// Poll `condition` until it holds; panics after about a second
pub async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
