use super::installation::Installation;
use crate::domain::OutboundRecord;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, ClientBuilder, Proxy};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Upper bound for a single HTTP request, whatever the flush timeout is.
pub const MAX_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request timeout: {0}")]
    RequestTimeout(String),
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxySettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Requested request timeout; capped at `MAX_TRANSPORT_TIMEOUT`.
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
    pub enable_compression: bool,
    pub proxy: Option<ProxySettings>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elmah.io".to_string(),
            api_key: String::new(),
            timeout: MAX_TRANSPORT_TIMEOUT,
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("elmah-io-forwarder/{}", crate::VERSION),
            enable_compression: true,
            proxy: None,
        }
    }
}

/// The remote service as seen by the dispatcher.
///
/// Both create operations may fail; the dispatcher turns failures into
/// error-hook notifications and never hands them back to producers.
pub trait DeliveryClient: Send + Sync + 'static {
    fn create_one(
        &self,
        log_id: &str,
        record: &OutboundRecord,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn create_bulk(
        &self,
        log_id: &str,
        records: &[OutboundRecord],
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn create_installation(
        &self,
        _log_id: &str,
        _installation: &Installation,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        async { Ok(()) }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    pub fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// reqwest-backed client for the messages and installations endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
    stats: Arc<ClientStats>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallationRequest<'a> {
    log_id: &'a str,
    #[serde(flatten)]
    installation: &'a Installation,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url: Url = config
            .base_url
            .parse()
            .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfiguration(format!(
                "Base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let mut client_builder = ClientBuilder::new()
            .timeout(config.timeout.min(MAX_TRANSPORT_TIMEOUT))
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent);

        if config.enable_compression {
            client_builder = client_builder.gzip(true);
        }

        if let Some(proxy) = &config.proxy {
            let mut reqwest_proxy = Proxy::all(&proxy.url).map_err(|e| {
                ClientError::InvalidConfiguration(format!("Invalid proxy URL: {}", e))
            })?;
            if let Some(username) = &proxy.username {
                reqwest_proxy =
                    reqwest_proxy.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
            }
            client_builder = client_builder.proxy(reqwest_proxy);
        }

        let client = client_builder.build().map_err(|e| {
            ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            config,
            base_url,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{segments...}?api_key=...`
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidConfiguration("Base URL cannot carry a path".to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api_key", &self.config.api_key);
        Ok(url)
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<(), ClientError> {
        let payload = serde_json::to_vec(body)?;
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                self.stats.record_request(false, start.elapsed());
                if e.is_timeout() {
                    ClientError::RequestTimeout(e.to_string())
                } else {
                    ClientError::NetworkError(e)
                }
            })?;

        let status = response.status();
        self.stats.record_request(status.is_success(), start.elapsed());

        if status.is_success() {
            debug!("Request accepted with HTTP {}", status.as_u16());
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::HttpError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl DeliveryClient for HttpClient {
    async fn create_one(&self, log_id: &str, record: &OutboundRecord) -> Result<(), ClientError> {
        let url = self.endpoint(&["v3", "messages", log_id])?;
        self.post_json(url, record).await
    }

    async fn create_bulk(
        &self,
        log_id: &str,
        records: &[OutboundRecord],
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["v3", "messages", log_id, "_bulk"])?;
        self.post_json(url, records).await
    }

    async fn create_installation(
        &self,
        log_id: &str,
        installation: &Installation,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["v3", "installations", "_create"])?;
        self.post_json(
            url,
            &InstallationRequest {
                log_id,
                installation,
            },
        )
        .await
    }
}
