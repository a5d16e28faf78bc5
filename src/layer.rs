//! `tracing` integration.
//!
//! Installing [`ElmahIoLayer`] on a subscriber forwards every enabled event to
//! an [`ElmahIoTarget`]. Event fields become properties, a field recorded as an
//! error becomes the exception, and fields of the enclosing spans act as the
//! scoped diagnostic context.

use crate::context::ScopeOverlay;
use crate::domain::{ExceptionInfo, LogEvent, LogLevel, PropertyValue};
use crate::target::ElmahIoTarget;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events never reach the service, so delivery cannot feed itself.
const INTERNAL_TARGETS: &[&str] = &[
    "elmah_io_forwarder",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
];

pub struct ElmahIoLayer {
    target: Arc<ElmahIoTarget>,
}

impl ElmahIoLayer {
    pub fn new(target: Arc<ElmahIoTarget>) -> Self {
        Self { target }
    }
}

fn is_internal(target: &str) -> bool {
    INTERNAL_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Fields recorded on a span, stored in its extensions.
#[derive(Debug, Default)]
struct SpanFields(Vec<(String, String)>);

impl Visit for SpanFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{:?}", value)));
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    properties: Vec<(String, PropertyValue)>,
    exception: Option<ExceptionInfo>,
}

impl EventVisitor {
    fn push(&mut self, field: &Field, value: PropertyValue) {
        let name = field.name();
        if name.starts_with("log.") {
            return;
        }
        self.properties.push((name.to_string(), value));
    }
}

impl Visit for EventVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, PropertyValue::Integer(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let value = i64::try_from(value)
            .map(PropertyValue::Integer)
            .unwrap_or_else(|_| PropertyValue::String(value.to_string()));
        self.push(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, PropertyValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, PropertyValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, PropertyValue::from(value));
        }
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.exception = Some(ExceptionInfo::from_error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.push(field, PropertyValue::String(rendered));
        }
    }
}

impl<S> Layer<S> for ElmahIoLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = SpanFields::default();
        attrs.record(&mut fields);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            match extensions.get_mut::<SpanFields>() {
                Some(fields) => values.record(fields),
                None => {
                    let mut fields = SpanFields::default();
                    values.record(&mut fields);
                    extensions.insert(fields);
                }
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }

        let level = LogLevel::from(metadata.level());
        if !self.target.is_enabled(&level) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut scoped = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    scoped.extend(fields.0.iter().cloned());
                }
            }
        }

        let log_event = LogEvent {
            timestamp: Utc::now(),
            level,
            logger: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            message_template: None,
            properties: visitor.properties,
            exception: visitor.exception,
        };

        let context = ScopeOverlay::new(scoped, self.target.context());
        self.target.write_with_context(&log_event, &context);
    }
}
