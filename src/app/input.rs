//! Newline-delimited JSON events in a CLEF-like shape.
//!
//! `@t` timestamp, `@l` level, `@m` rendered message, `@mt` message template,
//! `@x` exception text, `logger` (or `SourceContext`), `exception` object.
//! Every other key becomes a property.

use crate::domain::{ExceptionInfo, LogEvent, LogLevel, PropertyValue};
use crate::enrich::render_message_template;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Event must be a JSON object")]
    NotAnObject,
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

pub fn parse_line(line: &str) -> Result<LogEvent, InputError> {
    let Value::Object(mut object) = serde_json::from_str::<Value>(line)? else {
        return Err(InputError::NotAnObject);
    };

    let timestamp = match take_string(&mut object, "@t") {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| InputError::InvalidTimestamp(raw))?,
        None => Utc::now(),
    };
    let level = take_string(&mut object, "@l")
        .map(|raw| raw.parse().unwrap_or(LogLevel::Info))
        .unwrap_or(LogLevel::Info);
    let message = take_string(&mut object, "@m");
    let template = take_string(&mut object, "@mt");
    let logger = take_string(&mut object, "logger")
        .or_else(|| take_string(&mut object, "SourceContext"))
        .unwrap_or_default();

    let exception = match object.remove("exception") {
        Some(Value::Object(exception)) => Some(exception_from_object(exception)),
        Some(Value::String(text)) => Some(exception_from_text(&text)),
        _ => None,
    }
    .or_else(|| take_string(&mut object, "@x").map(|text| exception_from_text(&text)));
    object.remove("@x");

    let properties: Vec<(String, PropertyValue)> = object
        .into_iter()
        .map(|(key, value)| (key, PropertyValue::from(value)))
        .collect();

    let message = match (message, &template) {
        (Some(message), _) => message,
        (None, Some(template)) => render_message_template(template, &properties),
        (None, None) => String::new(),
    };

    Ok(LogEvent {
        timestamp,
        level,
        logger,
        message,
        message_template: template,
        properties,
        exception,
    })
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// `Type: message` on the first line, stack trace below.
fn exception_from_text(text: &str) -> ExceptionInfo {
    let (header, stack) = match text.split_once('\n') {
        Some((header, stack)) => (header.trim_end(), Some(stack)),
        None => (text.trim_end(), None),
    };

    let mut exception = match header.split_once(": ") {
        Some((type_name, message)) if !type_name.contains(' ') => {
            ExceptionInfo::new(type_name, message)
        }
        _ => ExceptionInfo {
            message: header.to_string(),
            ..Default::default()
        },
    };
    if let Some(stack) = stack.filter(|s| !s.trim().is_empty()) {
        exception.stack_trace = Some(stack.to_string());
    }
    exception
}

fn exception_from_object(mut object: Map<String, Value>) -> ExceptionInfo {
    let data = match object.remove("data") {
        Some(Value::Object(data)) => data
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    };
    let inner = match object.remove("inner") {
        Some(Value::Object(inner)) => Some(Box::new(exception_from_object(inner))),
        _ => None,
    };

    ExceptionInfo {
        type_name: take_string(&mut object, "type"),
        message: take_string(&mut object, "message").unwrap_or_default(),
        stack_trace: take_string(&mut object, "stackTrace"),
        source: take_string(&mut object, "source"),
        data,
        inner,
    }
}
