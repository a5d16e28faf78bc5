use super::{ConfigError, ForwarderConfig};
use crate::domain::LogLevel;
use crate::enrich::Layout;
use url::Url;
use uuid::Uuid;

impl ForwarderConfig {
    /// Rejects configurations that could never deliver anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "API key is required".to_string(),
            ));
        }

        if self.log_id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("Log ID is required".to_string()));
        }
        Uuid::parse_str(self.log_id.trim()).map_err(|e| {
            ConfigError::InvalidConfig(format!("Log ID '{}' is not a GUID: {}", self.log_id, e))
        })?;

        Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        if let Some(proxy_url) = &self.proxy_url {
            Url::parse(proxy_url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy_url, e))
            })?;
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.flush_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush timeout must be greater than 0".to_string(),
            ));
        }

        if let LogLevel::Other(level) = self.minimum_level() {
            return Err(ConfigError::InvalidConfig(format!(
                "Unknown minimum level '{}'",
                level
            )));
        }

        if let Some(title) = &self.title_layout {
            Layout::parse(title)?;
        }
        for (_, layout) in self.layouts.overrides() {
            Layout::parse(layout)?;
        }

        Ok(())
    }
}
