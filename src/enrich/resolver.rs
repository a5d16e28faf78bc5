use super::fields::{FieldName, FieldSource, HostValue};
use super::formatter::format_value;
use super::items::render_items;
use super::layout::TemplateRenderer;
use crate::context::AmbientContext;
use crate::domain::{Item, LogEvent};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

static MACHINE_NAME: LazyLock<Option<String>> = LazyLock::new(|| {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.trim().is_empty())
});

/// Name of the machine this process runs on, resolved once.
pub fn machine_name() -> Option<&'static str> {
    MACHINE_NAME.as_deref()
}

/// Values known to the hosting framework (process, web request, ...).
///
/// This tier is optional; a plain process only knows its machine and user name.
pub trait HostEnvironment: Send + Sync {
    fn value(&self, key: HostValue) -> Option<String>;
}

/// Host tier for a plain process: machine name and OS user.
#[derive(Debug, Clone, Default)]
pub struct ProcessHost;

impl HostEnvironment for ProcessHost {
    fn value(&self, key: HostValue) -> Option<String> {
        match key {
            HostValue::MachineName => machine_name().map(str::to_string),
            HostValue::ProcessUser => std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .ok(),
            _ => None,
        }
    }
}

/// Host tier that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl HostEnvironment for NoHost {
    fn value(&self, _key: HostValue) -> Option<String> {
        None
    }
}

/// Outcome of resolving a single field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub value: Option<String>,
    /// Key of the event property that supplied the value, if any.
    pub consumed_property: Option<String>,
}

/// Resolves semantic fields by walking each field's source chain until a
/// non-empty value turns up, then applying the field's hard fallback.
pub struct FieldResolver {
    chains: HashMap<FieldName, Vec<FieldSource>>,
    overrides: HashMap<FieldName, Arc<dyn TemplateRenderer>>,
    defaults: HashMap<FieldName, String>,
    host: Arc<dyn HostEnvironment>,
}

impl FieldResolver {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        let chains = FieldName::ALL
            .iter()
            .map(|field| (*field, field.source_chain()))
            .collect();

        Self {
            chains,
            overrides: HashMap::new(),
            defaults: HashMap::new(),
            host,
        }
    }

    /// Replaces the lookup chain of `field` with a caller-supplied template.
    pub fn with_override(mut self, field: FieldName, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.overrides.insert(field, renderer);
        self
    }

    /// Value used when nothing else resolves `field` (e.g. the configured application).
    pub fn with_default(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.defaults.insert(field, value.into());
        self
    }

    pub fn chain(&self, field: FieldName) -> &[FieldSource] {
        self.chains.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Resolved, normalized value of `field`, or `None`.
    pub fn resolve(
        &self,
        field: FieldName,
        event: &LogEvent,
        context: &dyn AmbientContext,
    ) -> Option<String> {
        self.resolve_detailed(field, event, context).value
    }

    pub fn resolve_detailed(
        &self,
        field: FieldName,
        event: &LogEvent,
        context: &dyn AmbientContext,
    ) -> Resolution {
        let mut resolution = match self.overrides.get(&field) {
            Some(renderer) => Resolution {
                value: non_blank(renderer.render(event, context)),
                consumed_property: None,
            },
            None => self.walk_chain(field, event, context),
        };

        if resolution.value.is_none() {
            resolution.value = fallback(field, event)
                .or_else(|| self.defaults.get(&field).cloned().and_then(non_blank));
        }
        if field == FieldName::Url {
            resolution.value = resolution.value.map(|url| normalize_url(&url));
        }
        resolution
    }

    /// Status code as an integer; anything unparseable resolves to `None`.
    pub fn resolve_status_code(
        &self,
        event: &LogEvent,
        context: &dyn AmbientContext,
    ) -> Resolution {
        let mut resolution = self.resolve_detailed(FieldName::StatusCode, event, context);
        resolution.value = resolution
            .value
            .filter(|code| code.trim().parse::<i32>().is_ok());
        resolution
    }

    /// Multi-value field rendered into items; empty when nothing resolves.
    pub fn resolve_items(
        &self,
        field: FieldName,
        event: &LogEvent,
        context: &dyn AmbientContext,
    ) -> (Vec<Item>, Option<String>) {
        let resolution = self.resolve_detailed(field, event, context);
        let items = resolution
            .value
            .as_deref()
            .map(render_items)
            .unwrap_or_default();
        (items, resolution.consumed_property)
    }

    fn walk_chain(
        &self,
        field: FieldName,
        event: &LogEvent,
        context: &dyn AmbientContext,
    ) -> Resolution {
        for source in self.chain(field) {
            match *source {
                FieldSource::EventProperty(name) => {
                    if let Some((key, value)) = event.property_ignore_case(name)
                        && let Some(value) = non_blank(format_value(value))
                    {
                        return Resolution {
                            value: Some(value),
                            consumed_property: Some(key.to_string()),
                        };
                    }
                }
                FieldSource::Scoped(key) => {
                    if let Some(value) = context.scoped_value(key).and_then(non_blank) {
                        return Resolution {
                            value: Some(value),
                            consumed_property: None,
                        };
                    }
                }
                FieldSource::Global(key) => {
                    if let Some(value) = context.global_value(key).and_then(non_blank) {
                        return Resolution {
                            value: Some(value),
                            consumed_property: None,
                        };
                    }
                }
                FieldSource::Host(key) => {
                    if let Some(value) = self.host.value(key).and_then(non_blank) {
                        return Resolution {
                            value: Some(value),
                            consumed_property: None,
                        };
                    }
                }
            }
        }
        Resolution::default()
    }
}

impl Default for FieldResolver {
    fn default() -> Self {
        Self::new(Arc::new(ProcessHost))
    }
}

fn fallback(field: FieldName, event: &LogEvent) -> Option<String> {
    match field {
        FieldName::Type => event
            .exception
            .as_ref()
            .and_then(|e| e.base().type_name.clone()),
        FieldName::Source => event
            .exception
            .as_ref()
            .and_then(|e| e.base().source.clone())
            .or_else(|| non_blank(event.logger.clone())),
        FieldName::Category => non_blank(event.logger.clone()),
        _ => None,
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Absolute URLs are reduced to their path; anything else is kept as written.
pub fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) if !url.cannot_be_a_base() => url.path().to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use crate::domain::{ExceptionInfo, LogLevel};
    use crate::enrich::layout::Layout;

    struct FakeHost(HashMap<HostValue, String>);

    impl HostEnvironment for FakeHost {
        fn value(&self, key: HostValue) -> Option<String> {
            self.0.get(&key).cloned()
        }
    }

    fn resolver_with_host(values: &[(HostValue, &str)]) -> FieldResolver {
        let host = FakeHost(values.iter().map(|(k, v)| (*k, v.to_string())).collect());
        FieldResolver::new(Arc::new(host))
    }

    fn event() -> LogEvent {
        LogEvent::new(LogLevel::Error, "Orders.Controller", "failed")
    }

    #[test]
    fn test_event_property_wins_over_context_and_host() {
        let resolver = resolver_with_host(&[(HostValue::MachineName, "box")]);
        let event = event().with_property("HostName", "from-property");
        let context = StaticContext::new().with_scoped("hostname", "from-scope");

        let resolution = resolver.resolve_detailed(FieldName::Hostname, &event, &context);
        assert_eq!(resolution.value.as_deref(), Some("from-property"));
        assert_eq!(resolution.consumed_property.as_deref(), Some("HostName"));
    }

    #[test]
    fn test_scoped_context_before_global() {
        let resolver = resolver_with_host(&[]);
        let context = StaticContext::new()
            .with_scoped("User", "scoped-user")
            .with_global("user", "global-user");

        assert_eq!(
            resolver.resolve(FieldName::User, &event(), &context).as_deref(),
            Some("scoped-user")
        );
    }

    #[test]
    fn test_host_tier_is_last() {
        let resolver = resolver_with_host(&[
            (HostValue::RequestHost, ""),
            (HostValue::MachineName, "box-1"),
        ]);

        assert_eq!(
            resolver
                .resolve(FieldName::Hostname, &event(), &StaticContext::new())
                .as_deref(),
            Some("box-1")
        );
    }

    #[test]
    fn test_blank_values_fall_through() {
        let resolver = resolver_with_host(&[]);
        let event = event().with_property("method", "  ");
        let context = StaticContext::new().with_global("Method", "POST");

        assert_eq!(
            resolver.resolve(FieldName::Method, &event, &context).as_deref(),
            Some("POST")
        );
    }

    #[test]
    fn test_unresolved_field_is_none() {
        let resolver = resolver_with_host(&[]);
        assert!(
            resolver
                .resolve(FieldName::Version, &event(), &StaticContext::new())
                .is_none()
        );
    }

    #[test]
    fn test_type_falls_back_to_base_exception_type() {
        let resolver = resolver_with_host(&[]);
        let event = event().with_exception(
            ExceptionInfo::new("Outer", "o").with_inner(ExceptionInfo::new("Inner", "i")),
        );

        assert_eq!(
            resolver
                .resolve(FieldName::Type, &event, &StaticContext::new())
                .as_deref(),
            Some("Inner")
        );
    }

    #[test]
    fn test_source_falls_back_to_logger_or_exception_source() {
        let resolver = resolver_with_host(&[]);
        let context = StaticContext::new();

        assert_eq!(
            resolver.resolve(FieldName::Source, &event(), &context).as_deref(),
            Some("Orders.Controller")
        );

        let with_exception =
            event().with_exception(ExceptionInfo::new("E", "m").with_source("Orders.Data"));
        assert_eq!(
            resolver
                .resolve(FieldName::Source, &with_exception, &context)
                .as_deref(),
            Some("Orders.Data")
        );
    }

    #[test]
    fn test_url_is_normalized() {
        let resolver = resolver_with_host(&[]);
        let context = StaticContext::new();

        let absolute = event().with_property("url", "http://a.b/path?x=1");
        assert_eq!(
            resolver.resolve(FieldName::Url, &absolute, &context).as_deref(),
            Some("/path")
        );

        let relative = event().with_property("Url", "/relative");
        assert_eq!(
            resolver.resolve(FieldName::Url, &relative, &context).as_deref(),
            Some("/relative")
        );
    }

    #[test]
    fn test_status_code_parse_failure_is_none() {
        let resolver = resolver_with_host(&[]);
        let context = StaticContext::new();

        let numeric = event().with_property("statusCode", 404);
        assert_eq!(
            resolver.resolve_status_code(&numeric, &context).value.as_deref(),
            Some("404")
        );

        let garbage = event().with_property("StatusCode", "not-a-number");
        let resolution = resolver.resolve_status_code(&garbage, &context);
        assert!(resolution.value.is_none());
        assert_eq!(resolution.consumed_property.as_deref(), Some("StatusCode"));
    }

    #[test]
    fn test_override_layout_replaces_chain() {
        let resolver = resolver_with_host(&[]).with_override(
            FieldName::Application,
            Arc::new(Layout::parse("billing-${gdc:env}").unwrap()),
        );
        let event = event().with_property("application", "ignored");
        let context = StaticContext::new().with_global("env", "prod");

        let resolution = resolver.resolve_detailed(FieldName::Application, &event, &context);
        assert_eq!(resolution.value.as_deref(), Some("billing-prod"));
        assert!(resolution.consumed_property.is_none());
    }

    #[test]
    fn test_configured_default_is_last_resort() {
        let resolver = resolver_with_host(&[]).with_default(FieldName::Application, "shop");
        let context = StaticContext::new();

        assert_eq!(
            resolver
                .resolve(FieldName::Application, &event(), &context)
                .as_deref(),
            Some("shop")
        );

        let named = event().with_property("Application", "billing");
        assert_eq!(
            resolver
                .resolve(FieldName::Application, &named, &context)
                .as_deref(),
            Some("billing")
        );
    }

    #[test]
    fn test_items_resolve_to_empty_list_when_missing() {
        let resolver = resolver_with_host(&[(HostValue::RequestCookies, r#"[{"session":"abc"}]"#)]);
        let context = StaticContext::new();

        let (cookies, _) = resolver.resolve_items(FieldName::Cookies, &event(), &context);
        assert_eq!(cookies, vec![Item::new("session", Some("abc".into()))]);

        let (form, consumed) = resolver.resolve_items(FieldName::Form, &event(), &context);
        assert!(form.is_empty());
        assert!(consumed.is_none());
    }
}
