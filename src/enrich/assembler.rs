use super::fields::FieldName;
use super::formatter::format_value;
use super::layout::TemplateRenderer;
use super::resolver::FieldResolver;
use crate::context::AmbientContext;
use crate::domain::{ExceptionInfo, Item, LogEvent, OutboundRecord, Severity};
use crate::sender::MessageHooks;
use std::collections::HashSet;
use std::sync::Arc;

/// Builds outbound records from log events and applies the client-side filter.
pub struct MessageAssembler {
    resolver: FieldResolver,
    title: Option<Arc<dyn TemplateRenderer>>,
    hooks: MessageHooks,
}

impl MessageAssembler {
    pub fn new(resolver: FieldResolver) -> Self {
        Self {
            resolver,
            title: None,
            hooks: MessageHooks::default(),
        }
    }

    /// Renders titles through `layout` instead of using the formatted message.
    pub fn with_title_layout(mut self, layout: Arc<dyn TemplateRenderer>) -> Self {
        self.title = Some(layout);
        self
    }

    pub fn with_hooks(mut self, hooks: MessageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    /// The record for `event`, or `None` when the filter hook discards it.
    pub fn assemble(
        &self,
        event: &LogEvent,
        context: &dyn AmbientContext,
    ) -> Option<OutboundRecord> {
        let record = self.build(event, context);
        if self.hooks.filtered(&record) {
            return None;
        }
        Some(record)
    }

    /// Assembles without consulting the filter.
    pub fn build(&self, event: &LogEvent, context: &dyn AmbientContext) -> OutboundRecord {
        let title = match &self.title {
            Some(layout) => layout.render(event, context),
            None => event.message.clone(),
        };

        let mut record = OutboundRecord::new(title, Severity::from(&event.level), event.timestamp);
        record.title_template = event
            .message_template
            .clone()
            .or_else(|| Some(record.title.clone()));
        record.detail = event.exception.as_ref().map(ToString::to_string);

        let mut consumed = HashSet::new();
        let mut single = |field: FieldName| {
            let resolution = self.resolver.resolve_detailed(field, event, context);
            consumed.extend(resolution.consumed_property);
            resolution.value
        };

        record.hostname = single(FieldName::Hostname);
        record.source = single(FieldName::Source);
        record.application = single(FieldName::Application);
        record.user = single(FieldName::User);
        record.method = single(FieldName::Method);
        record.version = single(FieldName::Version);
        record.url = single(FieldName::Url);
        record.type_name = single(FieldName::Type);
        record.correlation_id = single(FieldName::CorrelationId);
        record.category = single(FieldName::Category);

        let status = self.resolver.resolve_status_code(event, context);
        consumed.extend(status.consumed_property);
        record.status_code = status.value.and_then(|code| code.trim().parse().ok());

        let mut items = |field: FieldName| {
            let (items, key) = self.resolver.resolve_items(field, event, context);
            consumed.extend(key);
            items
        };

        record.server_variables = items(FieldName::Headers);
        record.cookies = items(FieldName::Cookies);
        record.form = items(FieldName::Form);
        record.query_string = items(FieldName::QueryString);

        if let Some(exception) = &event.exception {
            record.data.extend(exception_data(exception));
        }
        record.data.extend(
            event
                .properties
                .iter()
                .filter(|(key, value)| !value.is_null() && !consumed.contains(key))
                .map(|(key, value)| Item::new(key.clone(), Some(format_value(value)))),
        );

        record
    }
}

/// Diagnostic pairs of every exception in the chain, outermost first.
fn exception_data(exception: &ExceptionInfo) -> Vec<Item> {
    exception
        .chain()
        .flat_map(|e| {
            e.data.iter().map(move |(key, value)| {
                let key = match &e.type_name {
                    Some(type_name) => format!("{type_name}.{key}"),
                    None => key.clone(),
                };
                Item::new(key, Some(value.clone()))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use crate::domain::{LogLevel, PropertyValue};
    use crate::enrich::layout::Layout;
    use crate::enrich::resolver::NoHost;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(FieldResolver::new(Arc::new(NoHost)))
    }

    fn data(record: &OutboundRecord) -> Vec<(&str, Option<&str>)> {
        record
            .data
            .iter()
            .map(|i| (i.key.as_str(), i.value.as_deref()))
            .collect()
    }

    #[test]
    fn test_single_property_round_trips_into_data() {
        let event = LogEvent::new(LogLevel::Info, "", "hello").with_property("Key", "Value");
        let record = assembler().build(&event, &StaticContext::new());

        assert_eq!(data(&record), vec![("Key", Some("Value"))]);
        assert!(record.detail.is_none());
    }

    #[test]
    fn test_template_arguments_fill_fields_and_title() {
        let event = LogEvent::from_template(
            LogLevel::Error,
            "Web",
            "{method} {url} returned {statusCode} for {user}",
            vec![
                ("method".into(), PropertyValue::from("POST")),
                ("url".into(), PropertyValue::from("https://shop.test/cart?id=1")),
                ("statusCode".into(), PropertyValue::Integer(500)),
                ("user".into(), PropertyValue::from("mal")),
                ("cartId".into(), PropertyValue::Integer(7)),
            ],
        );

        let record = assembler().build(&event, &StaticContext::new());

        assert_eq!(
            record.title,
            "POST https://shop.test/cart?id=1 returned 500 for mal"
        );
        assert_eq!(
            record.title_template.as_deref(),
            Some("{method} {url} returned {statusCode} for {user}")
        );
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.method.as_deref(), Some("POST"));
        assert_eq!(record.url.as_deref(), Some("/cart"));
        assert_eq!(record.status_code, Some(500));
        assert_eq!(record.user.as_deref(), Some("mal"));
        assert_eq!(data(&record), vec![("cartId", Some("7"))]);
    }

    #[test]
    fn test_exception_fills_detail_type_and_data_first() {
        let exception = ExceptionInfo::new("System.IO.IOException", "disk full")
            .with_data("HResult", "-2147024784")
            .with_inner(ExceptionInfo::new("Win32Exception", "no space").with_data("Code", "112"));
        let event = LogEvent::new(LogLevel::Fatal, "Storage", "write failed")
            .with_exception(exception)
            .with_property("path", "/var/data");

        let record = assembler().build(&event, &StaticContext::new());

        assert!(
            record
                .detail
                .as_deref()
                .unwrap()
                .starts_with("System.IO.IOException: disk full ---> Win32Exception: no space")
        );
        assert_eq!(record.type_name.as_deref(), Some("Win32Exception"));
        assert_eq!(record.source.as_deref(), Some("Storage"));
        assert_eq!(record.category.as_deref(), Some("Storage"));
        assert_eq!(
            data(&record),
            vec![
                ("System.IO.IOException.HResult", Some("-2147024784")),
                ("Win32Exception.Code", Some("112")),
                ("path", Some("/var/data")),
            ]
        );
    }

    #[test]
    fn test_items_and_defaults() {
        let event = LogEvent::new(LogLevel::Warn, "t", "m")
            .with_property("cookies", r#"[{"session":"abc"}]"#)
            .with_property("QueryString", r#""q"="shoes", "page"="2""#)
            .with_property("nothing", PropertyValue::Null);

        let record = assembler().build(&event, &StaticContext::new());

        assert_eq!(record.cookies, vec![Item::new("session", Some("abc".into()))]);
        assert_eq!(record.query_string.len(), 2);
        assert!(record.form.is_empty());
        assert!(record.server_variables.is_empty());
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_title_layout_and_context_fields() {
        let assembler = assembler().with_title_layout(Arc::new(
            Layout::parse("[${level}] ${message}").unwrap(),
        ));
        let event = LogEvent::new(LogLevel::Other("Notice".into()), "t", "disk at 80%");
        let context = StaticContext::new().with_global("correlationId", "req-42");

        let record = assembler.build(&event, &context);

        assert_eq!(record.title, "[Notice] disk at 80%");
        assert_eq!(record.title_template.as_deref(), Some("[Notice] disk at 80%"));
        assert_eq!(record.severity, Severity::Information);
        assert_eq!(record.correlation_id.as_deref(), Some("req-42"));
    }

    #[test]
    fn test_filter_discards_record() {
        let assembler = assembler()
            .with_hooks(MessageHooks::new().on_filter(|record| record.status_code == Some(404)));
        let missing = LogEvent::new(LogLevel::Error, "t", "not found").with_property("statusCode", 404);
        let broken = LogEvent::new(LogLevel::Error, "t", "boom").with_property("statusCode", 500);
        let context = StaticContext::new();

        assert!(assembler.assemble(&missing, &context).is_none());
        assert!(assembler.assemble(&broken, &context).is_some());
    }
}
