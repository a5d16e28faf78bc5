pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod stats;

pub use batch::{Batch, BatchConfig, BatchFormer, BatchType};
pub use dispatcher::{BatchingDispatcher, DispatcherConfig};
pub use error::BufferError;
pub use stats::{DispatcherStats, DispatcherStatsSnapshot};
