// Device provider for hosts without audio hardware (text-only sessions)

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::{AudioContext, AudioDevices, AudioPlayback, AudioRecorder, Visualizer};

/// Discards model audio and captures nothing
pub struct HeadlessDevices;

struct HeadlessContext {
    sample_rate: u32,
}

impl AudioContext for HeadlessContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct HeadlessPlayback {
    primed: bool,
    discarded_bytes: usize,
}

impl AudioPlayback for HeadlessPlayback {
    fn is_primed(&self) -> bool {
        self.primed
    }

    fn prime(&mut self) -> Result<()> {
        self.primed = true;
        Ok(())
    }

    fn enqueue(&mut self, pcm: &[u8]) -> Result<()> {
        self.discarded_bytes += pcm.len();
        debug!(
            "Headless playback discarded {} bytes ({} total)",
            pcm.len(),
            self.discarded_bytes
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.primed = false;
        Ok(())
    }
}

struct HeadlessVisualizer;

impl Visualizer for HeadlessVisualizer {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens a stream that never yields buffers
#[derive(Default)]
struct HeadlessRecorder {
    stream: Option<mpsc::Sender<Vec<u8>>>,
}

#[async_trait::async_trait]
impl AudioRecorder for HeadlessRecorder {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>> {
        let (tx, rx) = mpsc::channel(1);
        self.stream = Some(tx);
        info!("Headless recorder started (no input device)");
        Ok(rx)
    }

    fn is_started(&self) -> bool {
        self.stream.is_some()
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        debug!("Headless recorder enabled={}", enabled);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stream = None;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AudioDevices for HeadlessDevices {
    async fn open_context(&self, sample_rate: u32) -> Result<Box<dyn AudioContext>> {
        Ok(Box::new(HeadlessContext { sample_rate }))
    }

    async fn open_playback(&self, _sample_rate: u32) -> Result<Box<dyn AudioPlayback>> {
        Ok(Box::<HeadlessPlayback>::default())
    }

    async fn open_visualizer(&self) -> Result<Box<dyn Visualizer>> {
        Ok(Box::new(HeadlessVisualizer))
    }

    async fn open_recorder(&self, _sample_rate: u32) -> Result<Box<dyn AudioRecorder>> {
        Ok(Box::<HeadlessRecorder>::default())
    }

    fn name(&self) -> &str {
        "headless"
    }
}
