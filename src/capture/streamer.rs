use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{CaptureKind, FrameSource};
use crate::config::CaptureConfig;
use crate::transport::Transport;

/// One capture engine plus the ticker feeding its frames to the backend
pub struct FrameStreamer {
    kind: CaptureKind,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    ticker: Option<JoinHandle<()>>,
}

impl FrameStreamer {
    pub fn new(kind: CaptureKind, source: Box<dyn FrameSource>) -> Self {
        Self {
            kind,
            source: Arc::new(Mutex::new(source)),
            ticker: None,
        }
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.ticker.is_some()
    }

    /// Initialize the engine with `settings` and send one frame per capture
    /// interval.
    ///
    /// If the engine fails to initialize it is disposed again and the error
    /// returned. A frame that fails to capture or send is skipped.
    pub async fn start(
        &mut self,
        transport: Arc<dyn Transport>,
        settings: &CaptureConfig,
    ) -> Result<()> {
        if self.is_active() {
            warn!("{} capture already running", self.kind);
            return Ok(());
        }

        let period = settings.capture_interval();

        {
            let mut source = self.source.lock().await;
            if let Err(e) = source.initialize(settings).await {
                if let Err(dispose_err) = source.dispose() {
                    warn!(
                        "Failed to dispose {} after init error: {:#}",
                        source.name(),
                        dispose_err
                    );
                }
                return Err(e).with_context(|| format!("Failed to start {} capture", self.kind));
            }
        }

        let kind = self.kind;
        let source = Arc::clone(&self.source);

        let ticker = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;

                let frame = {
                    let mut source = source.lock().await;
                    source.capture().await
                };

                match frame {
                    Ok(jpeg) => {
                        if let Err(e) = transport.send_image(&jpeg).await {
                            warn!("Failed to send {} frame: {:#}", kind, e);
                        }
                    }
                    Err(e) => warn!("Failed to capture {} frame: {:#}", kind, e),
                }
            }
        });

        self.ticker = Some(ticker);

        info!("{} capture started ({:?} per frame)", self.kind, period);

        Ok(())
    }

    /// Cancel the ticker, wait until it is gone, then dispose the engine.
    /// No-op when capture is not running.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(ticker) = self.ticker.take() else {
            debug!("{} capture not running", self.kind);
            return Ok(());
        };

        ticker.abort();
        if let Err(e) = ticker.await {
            if !e.is_cancelled() {
                warn!("{} capture task failed: {}", self.kind, e);
            }
        }

        self.source
            .lock()
            .await
            .dispose()
            .with_context(|| format!("Failed to dispose {} engine", self.kind))?;

        info!("{} capture stopped", self.kind);

        Ok(())
    }
}
