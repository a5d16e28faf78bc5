use super::log_level::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single key/value pair in one of the record's list fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub value: Option<String>,
}

impl Item {
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// The assembled, immutable message handed to the dispatcher.
///
/// Serializes to the wire payload expected by the error-tracking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRecord {
    pub title: String,
    pub title_template: Option<String>,
    pub severity: Severity,
    #[serde(rename = "dateTime")]
    pub timestamp_utc: DateTime<Utc>,
    pub detail: Option<String>,
    pub data: Vec<Item>,
    pub source: Option<String>,
    pub hostname: Option<String>,
    pub application: Option<String>,
    pub user: Option<String>,
    pub method: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub status_code: Option<i32>,
    pub correlation_id: Option<String>,
    pub category: Option<String>,
    pub server_variables: Vec<Item>,
    pub cookies: Vec<Item>,
    pub form: Vec<Item>,
    pub query_string: Vec<Item>,
}

impl OutboundRecord {
    /// A record with only the mandatory parts set.
    pub fn new(title: impl Into<String>, severity: Severity, timestamp_utc: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            title_template: None,
            severity,
            timestamp_utc,
            detail: None,
            data: Vec::new(),
            source: None,
            hostname: None,
            application: None,
            user: None,
            method: None,
            version: None,
            url: None,
            type_name: None,
            status_code: None,
            correlation_id: None,
            category: None,
            server_variables: Vec::new(),
            cookies: Vec::new(),
            form: Vec::new(),
            query_string: Vec::new(),
        }
    }
}
