use anyhow::Result;
use tokio::sync::mpsc;

/// Shared processing context the other audio components hang off
pub trait AudioContext: Send {
    fn sample_rate(&self) -> u32;

    /// Release the context. Components opened from it must already be gone.
    fn close(&mut self) -> Result<()>;
}

/// Plays audio produced by the model
pub trait AudioPlayback: Send {
    /// Whether the output stream is ready to accept chunks
    fn is_primed(&self) -> bool;

    fn prime(&mut self) -> Result<()>;

    /// Queue 16-bit little-endian PCM for playback
    fn enqueue(&mut self, pcm: &[u8]) -> Result<()>;

    /// Stop immediately and discard queued audio. Leaves the stream unprimed.
    fn stop(&mut self) -> Result<()>;
}

/// Level meter fed by the playback stream
pub trait Visualizer: Send {
    fn start(&mut self) -> Result<()>;

    fn cleanup(&mut self) -> Result<()>;
}

/// Microphone capture
#[async_trait::async_trait]
pub trait AudioRecorder: Send {
    /// Open the capture stream
    ///
    /// Returns a channel receiver that will receive PCM buffers
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>>;

    /// Check if a capture stream exists (suspended or not)
    fn is_started(&self) -> bool;

    /// Suspend (`false`) or resume (`true`) the existing stream
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Close the capture stream
    fn stop(&mut self) -> Result<()>;
}

/// Audio device provider
///
/// Platform implementations open the real devices; the headless provider
/// discards playback and never captures.
#[async_trait::async_trait]
pub trait AudioDevices: Send + Sync {
    async fn open_context(&self, sample_rate: u32) -> Result<Box<dyn AudioContext>>;

    async fn open_playback(&self, sample_rate: u32) -> Result<Box<dyn AudioPlayback>>;

    async fn open_visualizer(&self) -> Result<Box<dyn Visualizer>>;

    async fn open_recorder(&self, sample_rate: u32) -> Result<Box<dyn AudioRecorder>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
