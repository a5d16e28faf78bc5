//! Domain layer for elmah-io-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEvent`: what the host logging pipeline hands us
//! - `OutboundRecord`: the assembled message sent to the service
//! - `LogLevel` / `Severity`: host level and wire severity
//! - `ForwarderError`: Top-level error type

pub mod error;
pub mod log_event;
pub mod log_level;
pub mod record;

pub use error::ForwarderError;
pub use log_event::{ExceptionInfo, LogEvent, PropertyValue};
pub use log_level::{LogLevel, Severity};
pub use record::{Item, OutboundRecord};
