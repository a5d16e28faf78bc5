use crate::app::config::ConfigError;
use crate::buffer::BufferError;
use crate::enrich::layout::LayoutError;
use crate::sender::ClientError;
use thiserror::Error;

/// Top-level error type for the forwarder.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] ClientError),
}
