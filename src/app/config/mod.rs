mod cli;
pub mod groups;
mod env;
mod validation;

use crate::context::DiagnosticContext;
use crate::domain::{LogEvent, LogLevel};
use crate::enrich::{Layout, LayoutError, TemplateRenderer};
use crate::sender::{ClientConfig, MAX_TRANSPORT_TIMEOUT, ProxySettings};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use env::{override_optional, override_parsed, override_string};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use cli::ForwarderConfig;
pub use groups::FieldLayouts;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid layout: {0}")]
    InvalidLayout(#[from] LayoutError),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Level of the forwarder's own diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<DiagnosticLevel> for tracing::Level {
    fn from(level: DiagnosticLevel) -> Self {
        match level {
            DiagnosticLevel::Error => tracing::Level::ERROR,
            DiagnosticLevel::Warn => tracing::Level::WARN,
            DiagnosticLevel::Info => tracing::Level::INFO,
            DiagnosticLevel::Debug => tracing::Level::DEBUG,
            DiagnosticLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl ForwarderConfig {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = ForwarderConfig::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// CLI arguments (with env fallbacks); a `--config-file` replaces the
    /// delivery settings while the process options stay as given.
    pub fn from_args_and_env<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = ForwarderConfig::parse_from(args);

        let mut config = match &cli.config_file {
            Some(path) => {
                let mut config = Self::read_file(path)?;
                config.config_file = cli.config_file.clone();
                config.input = cli.input.clone();
                config.log_level = cli.log_level;
                config.log_json = cli.log_json;
                config.drain_timeout_secs = cli.drain_timeout_secs;
                config
            }
            None => cli,
        };

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ForwarderConfig::default();

        override_string("ELMAH_IO_API_KEY", &mut config.api_key);
        override_string("ELMAH_IO_LOG_ID", &mut config.log_id);
        override_optional("ELMAH_IO_APPLICATION", &mut config.application);
        override_string("ELMAH_IO_BASE_URL", &mut config.base_url);
        override_parsed("ELMAH_IO_BATCH_SIZE", &mut config.batch_size)?;
        override_parsed("ELMAH_IO_FLUSH_DELAY_MS", &mut config.flush_delay_ms)?;
        override_parsed("ELMAH_IO_FLUSH_TIMEOUT_SECS", &mut config.flush_timeout_secs)?;
        override_parsed("ELMAH_IO_RETRY_COUNT", &mut config.retry_count)?;
        override_parsed("ELMAH_IO_RETRY_DELAY_MS", &mut config.retry_delay_ms)?;
        override_parsed("ELMAH_IO_QUEUE_CAPACITY", &mut config.queue_capacity)?;
        override_optional("ELMAH_IO_PROXY_URL", &mut config.proxy_url);
        override_optional("ELMAH_IO_PROXY_USERNAME", &mut config.proxy_username);
        override_optional("ELMAH_IO_PROXY_PASSWORD", &mut config.proxy_password);
        override_string("ELMAH_IO_MINIMUM_LEVEL", &mut config.minimum_level);
        override_optional("ELMAH_IO_TITLE_LAYOUT", &mut config.title_layout);
        override_parsed("ELMAH_IO_SEND_INSTALLATION", &mut config.send_installation)?;

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Renders the key and log id layouts once and derives durations.
    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.api_key = render_setting(&self.api_key)?;
        self.log_id = render_setting(&self.log_id)?.trim().to_string();

        self.flush_delay = Duration::from_millis(self.flush_delay_ms);
        self.flush_timeout = Duration::from_secs(self.flush_timeout_secs);
        self.retry_delay = Duration::from_millis(self.retry_delay_ms);
        self.drain_timeout = Duration::from_secs(self.drain_timeout_secs);

        Ok(())
    }

    pub fn minimum_level(&self) -> LogLevel {
        self.minimum_level
            .parse()
            .unwrap_or(LogLevel::Trace)
    }

    pub fn proxy(&self) -> Option<ProxySettings> {
        self.proxy_url.as_ref().map(|url| ProxySettings {
            url: url.clone(),
            username: self.proxy_username.clone(),
            password: self.proxy_password.clone(),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: self.flush_timeout.min(MAX_TRANSPORT_TIMEOUT),
            proxy: self.proxy(),
            ..ClientConfig::default()
        }
    }
}

fn render_setting(value: &str) -> Result<String, ConfigError> {
    let layout = Layout::parse(value)?;
    if layout.is_literal() {
        return Ok(value.to_string());
    }
    Ok(layout.render(&LogEvent::empty(), &DiagnosticContext))
}
