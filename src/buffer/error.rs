use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    #[error("Buffer is closed")]
    BufferClosed,

    #[error("Buffer is full")]
    BufferFull,

    #[error("Invalid buffer capacity: {capacity}")]
    InvalidCapacity { capacity: usize },

    #[error("No Tokio runtime available to run the dispatcher")]
    NoRuntime,

    #[error("Drain timed out after {waited_ms}ms")]
    DrainTimeout { waited_ms: u64 },
}
