#![allow(dead_code)]

use elmah_io_forwarder::domain::{OutboundRecord, Severity};
use elmah_io_forwarder::sender::{ClientError, DeliveryClient, Installation};
use elmah_io_forwarder::ForwarderConfig;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

pub const LOG_ID: &str = "8d8c8f0e-5a9b-4c7e-9f6a-2b3c4d5e6f70";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    One(String),
    Bulk(Vec<String>),
    Installation(String),
}

/// Delivery client that records calls instead of sending them.
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    failures_left: AtomicU32,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` deliveries fail with HTTP 500.
    pub fn failing(count: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(count),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn delivered_titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .flat_map(|call| match call {
                Call::One(title) => vec![title],
                Call::Bulk(titles) => titles,
                Call::Installation(_) => Vec::new(),
            })
            .collect()
    }

    fn outcome(&self) -> Result<(), ClientError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(ClientError::HttpError {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(())
    }
}

impl DeliveryClient for RecordingClient {
    async fn create_one(&self, _log_id: &str, record: &OutboundRecord) -> Result<(), ClientError> {
        self.calls.lock().push(Call::One(record.title.clone()));
        self.outcome()
    }

    async fn create_bulk(
        &self,
        _log_id: &str,
        records: &[OutboundRecord],
    ) -> Result<(), ClientError> {
        let titles = records.iter().map(|r| r.title.clone()).collect();
        self.calls.lock().push(Call::Bulk(titles));
        self.outcome()
    }

    async fn create_installation(
        &self,
        _log_id: &str,
        installation: &Installation,
    ) -> Result<(), ClientError> {
        self.calls
            .lock()
            .push(Call::Installation(installation.name.clone()));
        Ok(())
    }
}

pub fn record(title: &str) -> OutboundRecord {
    OutboundRecord::new(title, Severity::Error, Utc::now())
}

pub fn config() -> ForwarderConfig {
    ForwarderConfig {
        api_key: "test-key".to_string(),
        log_id: LOG_ID.to_string(),
        ..Default::default()
    }
}
