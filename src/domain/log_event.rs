use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::fmt;

/// Opaque property value attached to a log event.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(Vec<(String, PropertyValue)>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(value as i64)
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        PropertyValue::Integer(value as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(items) => {
                PropertyValue::List(items.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Exception (error) attached to a log event, with its inner-exception chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionInfo {
    /// Fully qualified type name, when the producer knows it.
    pub type_name: Option<String>,
    pub message: String,
    pub stack_trace: Option<String>,
    /// Originating module or component.
    pub source: Option<String>,
    /// Diagnostic key/value pairs carried by the exception itself.
    pub data: Vec<(String, String)>,
    pub inner: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_inner(mut self, inner: ExceptionInfo) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    /// Builds an exception chain from a Rust error and its `source()` chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut info = ExceptionInfo {
            message: error.to_string(),
            ..Default::default()
        };
        if let Some(source) = error.source() {
            info.inner = Some(Box::new(ExceptionInfo::from_error(source)));
        }
        info
    }

    /// Walks the chain, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ExceptionInfo> {
        std::iter::successors(Some(self), |e| e.inner.as_deref())
    }

    /// The innermost exception of the chain.
    pub fn base(&self) -> &ExceptionInfo {
        self.chain().last().unwrap_or(self)
    }

    fn write_header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(f, "{}: {}", type_name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_header(f)?;
        for inner in self.chain().skip(1) {
            f.write_str(" ---> ")?;
            inner.write_header(f)?;
        }

        let chain: Vec<&ExceptionInfo> = self.chain().collect();
        for (depth, exception) in chain.iter().enumerate().rev() {
            if let Some(stack) = &exception.stack_trace {
                write!(f, "\n{}", stack.trim_end())?;
            }
            if depth > 0 {
                f.write_str("\n--- End of inner exception stack trace ---")?;
            }
        }
        Ok(())
    }
}

/// A log event as received from the host logging pipeline. Immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    /// Rendered (formatted) message.
    pub message: String,
    /// Raw message template, when the producer used one.
    pub message_template: Option<String>,
    /// Ordered structured properties.
    pub properties: Vec<(String, PropertyValue)>,
    pub exception: Option<ExceptionInfo>,
}

impl LogEvent {
    pub fn new(level: LogLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            message_template: None,
            properties: Vec::new(),
            exception: None,
        }
    }

    /// Creates an event from a structured-logging template, rendering `{name}`
    /// placeholders from the given properties into the message.
    pub fn from_template(
        level: LogLevel,
        logger: impl Into<String>,
        template: impl Into<String>,
        properties: Vec<(String, PropertyValue)>,
    ) -> Self {
        let template = template.into();
        let message = crate::enrich::layout::render_message_template(&template, &properties);
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message,
            message_template: Some(template),
            properties,
            exception: None,
        }
    }

    /// An event carrying nothing; used to render configuration values.
    pub fn empty() -> Self {
        Self::new(LogLevel::Info, "", "")
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Case-insensitive property lookup; returns the stored key and value.
    pub fn property_ignore_case(&self, name: &str) -> Option<(&str, &PropertyValue)> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, value)| (key.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("request failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_exception_display_includes_inner_chain() {
        let exception = ExceptionInfo::new("System.InvalidOperationException", "outer")
            .with_stack_trace("   at Outer()")
            .with_inner(
                ExceptionInfo::new("System.NullReferenceException", "inner")
                    .with_stack_trace("   at Inner()"),
            );

        let text = exception.to_string();
        assert!(text.starts_with(
            "System.InvalidOperationException: outer ---> System.NullReferenceException: inner"
        ));
        let inner_pos = text.find("at Inner()").unwrap();
        let outer_pos = text.find("at Outer()").unwrap();
        assert!(inner_pos < outer_pos);
        assert!(text.contains("--- End of inner exception stack trace ---"));
    }

    #[test]
    fn test_exception_from_error_follows_sources() {
        let error = Outer(std::io::Error::other("disk on fire"));
        let info = ExceptionInfo::from_error(&error);

        assert_eq!(info.message, "request failed");
        assert_eq!(info.base().message, "disk on fire");
        assert_eq!(info.chain().count(), 2);
        assert!(info.type_name.is_none());
    }

    #[test]
    fn test_property_lookup_ignores_case() {
        let event = LogEvent::new(LogLevel::Info, "test", "hello").with_property("HostName", "web-1");

        let (key, value) = event.property_ignore_case("hostname").unwrap();
        assert_eq!(key, "HostName");
        assert_eq!(value.as_str(), Some("web-1"));
    }

    #[test]
    fn test_json_values_convert_to_properties() {
        let value: serde_json::Value = serde_json::json!({"a": [1, 2.5, "x"], "b": null});
        let converted = PropertyValue::from(value);

        let PropertyValue::Map(entries) = converted else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].1,
            PropertyValue::List(vec![
                PropertyValue::Integer(1),
                PropertyValue::Float(2.5),
                PropertyValue::String("x".into())
            ])
        );
        assert!(entries[1].1.is_null());
    }
}
