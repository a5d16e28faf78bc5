use super::DiagnosticLevel;
use super::groups::FieldLayouts;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct ForwarderConfig {
    /// API key; may be a layout such as ${env:MY_KEY}
    #[arg(long, env = "ELMAH_IO_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Log ID (GUID); may be a layout
    #[arg(long, env = "ELMAH_IO_LOG_ID", default_value = "")]
    pub log_id: String,

    /// Application name used when events carry none
    #[arg(long, env = "ELMAH_IO_APPLICATION")]
    pub application: Option<String>,

    /// Service base URL
    #[arg(long, env = "ELMAH_IO_BASE_URL", default_value = "https://api.elmah.io")]
    pub base_url: String,

    /// Records per bulk call
    #[arg(long, env = "ELMAH_IO_BATCH_SIZE", default_value = "50")]
    pub batch_size: usize,

    /// Delay between the first buffered record and its flush, in milliseconds
    #[arg(long, env = "ELMAH_IO_FLUSH_DELAY_MS", default_value = "250")]
    pub flush_delay_ms: u64,

    /// Upper bound for one flush, in seconds
    #[arg(long, env = "ELMAH_IO_FLUSH_TIMEOUT_SECS", default_value = "150")]
    pub flush_timeout_secs: u64,

    /// Additional delivery attempts per flush
    #[arg(long, env = "ELMAH_IO_RETRY_COUNT", default_value = "0")]
    pub retry_count: u32,

    /// Pause between delivery attempts, in milliseconds
    #[arg(long, env = "ELMAH_IO_RETRY_DELAY_MS", default_value = "50")]
    pub retry_delay_ms: u64,

    /// Records that may wait for the dispatcher before new ones are dropped
    #[arg(long, env = "ELMAH_IO_QUEUE_CAPACITY", default_value = "10000")]
    pub queue_capacity: usize,

    /// Outbound proxy URL
    #[arg(long, env = "ELMAH_IO_PROXY_URL")]
    pub proxy_url: Option<String>,

    #[arg(long, env = "ELMAH_IO_PROXY_USERNAME")]
    pub proxy_username: Option<String>,

    #[arg(long, env = "ELMAH_IO_PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// Lowest event level that is forwarded
    #[arg(long, env = "ELMAH_IO_MINIMUM_LEVEL", default_value = "trace")]
    pub minimum_level: String,

    /// Title layout; the formatted message is used when unset
    #[arg(long, env = "ELMAH_IO_TITLE_LAYOUT")]
    pub title_layout: Option<String>,

    /// Report this installation once at startup
    #[arg(long, env = "ELMAH_IO_SEND_INSTALLATION")]
    pub send_installation: bool,

    /// Level of the forwarder's own diagnostics
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: DiagnosticLevel,

    /// Write the forwarder's own diagnostics as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Read events from this file instead of stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Seconds to wait for queued records on shutdown
    #[arg(long, env = "ELMAH_IO_DRAIN_TIMEOUT_SECS", default_value = "5")]
    pub drain_timeout_secs: u64,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Field override layouts (file only)
    #[arg(skip)]
    pub layouts: FieldLayouts,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub flush_delay: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub flush_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub retry_delay: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub drain_timeout: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            log_id: String::new(),
            application: None,
            base_url: "https://api.elmah.io".to_string(),
            batch_size: 50,
            flush_delay_ms: 250,
            flush_timeout_secs: 150,
            retry_count: 0,
            retry_delay_ms: 50,
            queue_capacity: 10_000,
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            minimum_level: "trace".to_string(),
            title_layout: None,
            send_installation: false,
            log_level: DiagnosticLevel::Info,
            log_json: false,
            input: None,
            drain_timeout_secs: 5,
            config_file: None,
            layouts: FieldLayouts::default(),
            flush_delay: Duration::from_millis(250),
            flush_timeout: Duration::from_secs(150),
            retry_delay: Duration::from_millis(50),
            drain_timeout: Duration::from_secs(5),
        }
    }
}
