use super::config::ForwarderConfig;
use super::input::parse_line;
use crate::domain::ForwarderError;
use crate::target::ElmahIoTarget;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub lines: u64,
    pub forwarded: u64,
    pub skipped: u64,
}

/// Relays NDJSON events from a reader into an [`ElmahIoTarget`].
pub struct ForwarderService {
    target: Arc<ElmahIoTarget>,
    config: ForwarderConfig,
}

impl ForwarderService {
    pub fn new(config: ForwarderConfig) -> Result<Self, ForwarderError> {
        let target = Arc::new(ElmahIoTarget::new(config.clone())?);
        Ok(Self { target, config })
    }

    pub fn with_target(target: Arc<ElmahIoTarget>, config: ForwarderConfig) -> Self {
        Self { target, config }
    }

    pub fn target(&self) -> &Arc<ElmahIoTarget> {
        &self.target
    }

    /// Reads until EOF or cancellation. Malformed lines are logged and skipped.
    pub async fn run<R>(
        &self,
        reader: R,
        shutdown: CancellationToken,
    ) -> Result<RelaySummary, ServiceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut summary = RelaySummary::default();

        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping input");
                    break;
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                info!("End of input reached");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            summary.lines += 1;
            match parse_line(&line) {
                Ok(event) => {
                    self.target.write(&event);
                    summary.forwarded += 1;
                }
                Err(e) => {
                    warn!("Skipping line {}: {}", summary.lines, e);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Flushes queued records within the configured drain timeout.
    pub async fn drain(&self) -> Result<(), ForwarderError> {
        self.target.shutdown(self.config.drain_timeout).await
    }
}
