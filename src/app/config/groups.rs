use crate::enrich::FieldName;
use serde::{Deserialize, Serialize};

/// Per-field override layouts. A set layout replaces the property and
/// context lookups for that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLayouts {
    pub hostname: Option<String>,
    pub source: Option<String>,
    pub application: Option<String>,
    pub user: Option<String>,
    pub method: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub status_code: Option<String>,
    pub correlation_id: Option<String>,
    pub category: Option<String>,
    pub cookies: Option<String>,
    pub form: Option<String>,
    pub query_string: Option<String>,
    pub headers: Option<String>,
}

impl FieldLayouts {
    /// The configured overrides, in field order.
    pub fn overrides(&self) -> Vec<(FieldName, &str)> {
        FieldName::ALL
            .iter()
            .filter_map(|field| self.get(*field).map(|layout| (*field, layout)))
            .collect()
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        let layout = match field {
            FieldName::Hostname => &self.hostname,
            FieldName::Source => &self.source,
            FieldName::Application => &self.application,
            FieldName::User => &self.user,
            FieldName::Method => &self.method,
            FieldName::Version => &self.version,
            FieldName::Url => &self.url,
            FieldName::Type => &self.type_name,
            FieldName::StatusCode => &self.status_code,
            FieldName::CorrelationId => &self.correlation_id,
            FieldName::Category => &self.category,
            FieldName::Cookies => &self.cookies,
            FieldName::Form => &self.form,
            FieldName::QueryString => &self.query_string,
            FieldName::Headers => &self.headers,
        };
        layout.as_deref().filter(|layout| !layout.trim().is_empty())
    }
}
