pub mod config;
pub mod input;
pub mod logging_system;
pub mod service;
pub mod shutdown;

pub use config::{ConfigError, DiagnosticLevel, FieldLayouts, ForwarderConfig};
pub use input::{InputError, parse_line};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging_safe};
pub use service::{ForwarderService, RelaySummary, ServiceError};

use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Entry point of the `elmah-io-forwarder` binary.
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ForwarderConfig::from_args_and_env(std::env::args_os())?;

    if let Err(e) = setup_logging_safe(config.log_level, config.log_json) {
        eprintln!("Warning: {}", e);
    }

    info!("Starting elmah-io-forwarder v{}", crate::VERSION);
    info!(
        "Configuration: base_url={}, batch_size={}, flush_delay={:?}, retries={}",
        config.base_url, config.batch_size, config.flush_delay, config.retry_count
    );

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &config.input {
        Some(path) => {
            info!("Reading events from {}", path.display());
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let service = ForwarderService::new(config)?;
    let token = CancellationToken::new();
    shutdown::spawn_signal_handler(token.clone());

    let relayed = service.run(reader, token.clone()).await;
    token.cancel();

    if let Err(e) = service.drain().await {
        error!("Drain incomplete: {}", e);
    }
    let stats = service.target().stats();
    info!(
        "Stopped: delivered={}, failed={}, dropped={}, filtered={}",
        stats.delivered, stats.failed, stats.dropped, stats.filtered
    );

    let summary = relayed?;
    info!(
        "Relayed {} lines ({} forwarded, {} skipped)",
        summary.lines, summary.forwarded, summary.skipped
    );
    Ok(())
}
