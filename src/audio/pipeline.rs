use anyhow::{Context, Result};
use tracing::{info, warn};

use super::backend::{AudioContext, AudioDevices, AudioPlayback, AudioRecorder, Visualizer};
use crate::error::TeardownStep;

/// Local audio pipeline: playback, visualization and microphone capture
/// sharing one audio context.
pub struct AudioPipeline {
    context: Box<dyn AudioContext>,
    playback: Box<dyn AudioPlayback>,
    visualizer: Box<dyn Visualizer>,
    recorder: Box<dyn AudioRecorder>,
}

/// Components acquired so far; released in reverse order if acquisition
/// does not complete.
#[derive(Default)]
struct PartialPipeline {
    context: Option<Box<dyn AudioContext>>,
    playback: Option<Box<dyn AudioPlayback>>,
    visualizer: Option<Box<dyn Visualizer>>,
    recorder: Option<Box<dyn AudioRecorder>>,
}

impl Drop for PartialPipeline {
    fn drop(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.stop() {
                warn!("Failed to release recorder: {:#}", e);
            }
        }
        if let Some(mut visualizer) = self.visualizer.take() {
            if let Err(e) = visualizer.cleanup() {
                warn!("Failed to release visualizer: {:#}", e);
            }
        }
        if let Some(mut playback) = self.playback.take() {
            if let Err(e) = playback.stop() {
                warn!("Failed to release playback: {:#}", e);
            }
        }
        if let Some(mut context) = self.context.take() {
            if let Err(e) = context.close() {
                warn!("Failed to close audio context: {:#}", e);
            }
        }
    }
}

impl AudioPipeline {
    /// Open every component. On failure, whatever was opened is released
    /// before the error is returned.
    pub async fn acquire(
        devices: &dyn AudioDevices,
        sample_rate: u32,
        capture_sample_rate: u32,
    ) -> Result<Self> {
        info!(
            "Initializing audio pipeline on {} ({}Hz playback, {}Hz capture)",
            devices.name(),
            sample_rate,
            capture_sample_rate
        );

        let mut partial = PartialPipeline::default();

        partial.context = Some(
            devices
                .open_context(sample_rate)
                .await
                .context("Failed to open audio context")?,
        );

        let playback = partial.playback.insert(
            devices
                .open_playback(sample_rate)
                .await
                .context("Failed to open audio playback")?,
        );
        playback.prime().context("Failed to prime audio playback")?;

        let visualizer = partial.visualizer.insert(
            devices
                .open_visualizer()
                .await
                .context("Failed to open audio visualizer")?,
        );
        visualizer.start().context("Failed to start audio visualizer")?;

        partial.recorder = Some(
            devices
                .open_recorder(capture_sample_rate)
                .await
                .context("Failed to open audio recorder")?,
        );

        match (
            partial.context.take(),
            partial.playback.take(),
            partial.visualizer.take(),
            partial.recorder.take(),
        ) {
            (Some(context), Some(playback), Some(visualizer), Some(recorder)) => Ok(Self {
                context,
                playback,
                visualizer,
                recorder,
            }),
            _ => anyhow::bail!("Audio pipeline acquisition did not complete"),
        }
    }

    pub fn playback_mut(&mut self) -> &mut dyn AudioPlayback {
        self.playback.as_mut()
    }

    pub fn recorder_mut(&mut self) -> &mut dyn AudioRecorder {
        self.recorder.as_mut()
    }

    pub fn recorder(&self) -> &dyn AudioRecorder {
        self.recorder.as_ref()
    }

    /// Release in dependency order: recorder, visualizer, playback, context.
    ///
    /// Every step runs; the first failure is returned.
    pub fn release(mut self) -> Result<(), (TeardownStep, anyhow::Error)> {
        let steps: [(TeardownStep, Result<()>); 4] = [
            (TeardownStep::Recorder, self.recorder.stop()),
            (TeardownStep::Visualizer, self.visualizer.cleanup()),
            (TeardownStep::Playback, self.playback.stop()),
            (TeardownStep::AudioContext, self.context.close()),
        ];

        let mut first_failure = None;
        for (step, result) in steps {
            if let Err(e) = result {
                warn!("Failed to release {}: {:#}", step, e);
                first_failure.get_or_insert((step, e));
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => {
                info!("Audio pipeline released");
                Ok(())
            }
        }
    }
}
