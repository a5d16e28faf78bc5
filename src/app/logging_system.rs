use super::config::DiagnosticLevel;
use parking_lot::RwLock;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Failed to set global tracing subscriber: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error("Logging system initialization failed")]
    InitFailed,
}

/// Builds the subscriber for the forwarder's own diagnostics.
///
/// Diagnostics go to stderr so stdout stays free; the HTTP stack is held at
/// warn unless `RUST_LOG` says otherwise.
pub struct LoggingSystem {
    directives: RwLock<Vec<(String, DiagnosticLevel)>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
        }
    }

    pub fn add_directive(&self, target: impl Into<String>, level: DiagnosticLevel) {
        self.directives.write().push((target.into(), level));
    }

    pub fn add_default_directives(&self) {
        for target in ["hyper", "hyper_util", "reqwest", "h2", "rustls"] {
            self.add_directive(target, DiagnosticLevel::Warn);
        }
    }

    pub fn build_filter_string(&self, default_level: DiagnosticLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(level_name(default_level).to_string());
        for (target, level) in directives.iter() {
            filter_parts.push(format!("{}={}", target, level_name(*level)));
        }

        filter_parts.join(",")
    }

    pub fn initialize_tracing(
        &self,
        default_level: DiagnosticLevel,
        json: bool,
    ) -> Result<(), LoggingError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                let filter = self.build_filter_string(default_level);
                EnvFilter::try_new(&filter)
                    .map_err(|source| LoggingError::InvalidFilter { filter, source })?
            }
        };

        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().json().with_writer(std::io::stderr)),
            )?;
        } else {
            tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                ),
            )?;
        }

        Ok(())
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn level_name(level: DiagnosticLevel) -> &'static str {
    match level {
        DiagnosticLevel::Error => "error",
        DiagnosticLevel::Warn => "warn",
        DiagnosticLevel::Info => "info",
        DiagnosticLevel::Debug => "debug",
        DiagnosticLevel::Trace => "trace",
    }
}

/// Installs the global subscriber once; later calls report the first outcome.
pub fn setup_logging_safe(level: DiagnosticLevel, json: bool) -> Result<(), LoggingError> {
    static INIT: Once = Once::new();
    static INIT_SUCCESS: AtomicBool = AtomicBool::new(false);

    INIT.call_once(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();

        match logging_system.initialize_tracing(level, json) {
            Ok(()) => INIT_SUCCESS.store(true, Ordering::Release),
            Err(e) => eprintln!("Warning: {}", e),
        }
    });

    if INIT_SUCCESS.load(Ordering::Acquire) {
        Ok(())
    } else {
        Err(LoggingError::InitFailed)
    }
}
