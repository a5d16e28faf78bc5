use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level of an incoming log event, as reported by the host logging pipeline.
///
/// This is distinct from `Severity` (the service-defined level sent on the wire).
/// `Other` carries levels the host knows about but this crate does not, e.g. custom
/// levels parsed from NDJSON input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Other(String),
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
            LogLevel::Other(name) => name,
        }
    }

    /// Rank used for minimum-level filtering. Unknown levels rank with `Info`.
    pub fn rank(&self) -> u8 {
        match self {
            LogLevel::Trace => 0,
            LogLevel::Debug => 1,
            LogLevel::Info | LogLevel::Other(_) => 2,
            LogLevel::Warn => 3,
            LogLevel::Error => 4,
            LogLevel::Fatal => 5,
        }
    }

    pub fn is_at_least(&self, minimum: &LogLevel) -> bool {
        self.rank() >= minimum.rank()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = std::convert::Infallible;

    /// Case-insensitive; accepts the common spellings used by structured log formats.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" | "verbose" | "vrb" => LogLevel::Trace,
            "debug" | "dbg" => LogLevel::Debug,
            "info" | "information" | "inf" => LogLevel::Info,
            "warn" | "warning" | "wrn" => LogLevel::Warn,
            "error" | "err" => LogLevel::Error,
            "fatal" | "critical" | "ftl" => LogLevel::Fatal,
            _ => LogLevel::Other(s.trim().to_string()),
        };
        Ok(level)
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// Severity as understood by the remote error-tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl From<&LogLevel> for Severity {
    fn from(level: &LogLevel) -> Self {
        match level {
            LogLevel::Trace => Severity::Verbose,
            LogLevel::Debug => Severity::Debug,
            LogLevel::Info => Severity::Information,
            LogLevel::Warn => Severity::Warning,
            LogLevel::Error => Severity::Error,
            LogLevel::Fatal => Severity::Fatal,
            LogLevel::Other(_) => Severity::Information,
        }
    }
}
