use serde::{Deserialize, Serialize};

/// One-shot report describing this forwarder to the service, sent before
/// steady-state delivery begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub logger_info: Vec<LoggerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub assemblies: Vec<AssemblyInfo>,
    pub properties: Vec<crate::domain::Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyInfo {
    pub name: String,
    pub version: String,
}

impl Installation {
    /// Report for this crate, listing the logging stack it runs on.
    pub fn current(application: Option<&str>) -> Self {
        let mut properties = Vec::new();
        if let Some(application) = application {
            properties.push(crate::domain::Item::new(
                "application",
                Some(application.to_string()),
            ));
        }

        Self {
            name: application.unwrap_or(env!("CARGO_PKG_NAME")).to_string(),
            version: crate::VERSION.to_string(),
            kind: "rust".to_string(),
            logger_info: vec![LoggerInfo {
                kind: "tracing".to_string(),
                assemblies: vec![AssemblyInfo {
                    name: env!("CARGO_PKG_NAME").to_string(),
                    version: crate::VERSION.to_string(),
                }],
                properties,
            }],
        }
    }
}
