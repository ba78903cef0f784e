//! Camera and screen frame capture
//!
//! Engines implement [`FrameSource`]; a [`FrameStreamer`] owns one engine and
//! the ticker that pulls a frame every capture interval and sends it to the
//! backend.

mod streamer;

use anyhow::Result;
use std::fmt;

use crate::config::CaptureConfig;

pub use streamer::FrameStreamer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    Camera,
    Screen,
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureKind::Camera => f.write_str("camera"),
            CaptureKind::Screen => f.write_str("screen"),
        }
    }
}

/// A still-frame capture engine (camera, screen)
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Acquire the device (may prompt for permission). Frames captured
    /// afterwards are scaled to `settings.resize_width` and encoded at
    /// `settings.quality`; camera engines pick the `facing_mode` lens.
    async fn initialize(&mut self, settings: &CaptureConfig) -> Result<()>;

    /// Grab one frame as a base64-encoded JPEG
    async fn capture(&mut self) -> Result<String>;

    /// Release the device
    fn dispose(&mut self) -> Result<()>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
