//! Ambient diagnostic context.
//!
//! Values stored here decorate every subsequent log event without being passed
//! per call. Two scopes exist: a scoped (thread or span) store consulted first,
//! and a process-wide global store consulted second. Resolution code only sees
//! the `AmbientContext` trait, so tests inject a `StaticContext` instead of
//! touching process state.

use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Capability for looking up ambient values by key.
pub trait AmbientContext: Send + Sync {
    fn scoped_value(&self, _key: &str) -> Option<String> {
        None
    }

    fn global_value(&self, _key: &str) -> Option<String> {
        None
    }
}

static GLOBAL_CONTEXT: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

thread_local! {
    static SCOPED_CONTEXT: RefCell<Vec<(String, String)>> = const { RefCell::new(Vec::new()) };
}

/// Process-wide key/value store shared by all threads.
pub struct GlobalDiagnosticContext;

impl GlobalDiagnosticContext {
    pub fn set(key: impl Into<String>, value: impl Into<String>) {
        GLOBAL_CONTEXT.write().insert(key.into(), value.into());
    }

    pub fn get(key: &str) -> Option<String> {
        GLOBAL_CONTEXT.read().get(key).cloned()
    }

    pub fn remove(key: &str) -> Option<String> {
        GLOBAL_CONTEXT.write().remove(key)
    }

    pub fn clear() {
        GLOBAL_CONTEXT.write().clear();
    }
}

/// Thread-scoped stack of key/value pairs. Later pushes shadow earlier ones.
pub struct ScopedDiagnosticContext;

impl ScopedDiagnosticContext {
    /// Pushes a value for the current thread; it is popped when the guard drops.
    #[must_use = "the value is removed as soon as the guard is dropped"]
    pub fn push(key: impl Into<String>, value: impl Into<String>) -> ScopeGuard {
        SCOPED_CONTEXT.with(|scope| {
            let mut scope = scope.borrow_mut();
            scope.push((key.into(), value.into()));
            ScopeGuard {
                depth: scope.len(),
            }
        })
    }

    pub fn get(key: &str) -> Option<String> {
        SCOPED_CONTEXT.with(|scope| {
            scope
                .borrow()
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }
}

/// Removes a scoped value (and anything pushed after it) on drop.
pub struct ScopeGuard {
    depth: usize,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPED_CONTEXT.with(|scope| scope.borrow_mut().truncate(self.depth - 1));
    }
}

/// Default context: thread-scoped values, then the global store.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticContext;

impl AmbientContext for DiagnosticContext {
    fn scoped_value(&self, key: &str) -> Option<String> {
        ScopedDiagnosticContext::get(key)
    }

    fn global_value(&self, key: &str) -> Option<String> {
        GlobalDiagnosticContext::get(key)
    }
}

/// Fixed context, mainly for tests and for callers that carry their own request scope.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    scoped: HashMap<String, String>,
    global: HashMap<String, String>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scoped(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scoped.insert(key.into(), value.into());
        self
    }

    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global.insert(key.into(), value.into());
        self
    }
}

impl AmbientContext for StaticContext {
    fn scoped_value(&self, key: &str) -> Option<String> {
        self.scoped.get(key).cloned()
    }

    fn global_value(&self, key: &str) -> Option<String> {
        self.global.get(key).cloned()
    }
}

/// Scoped values captured elsewhere (e.g. from tracing spans) layered over a base context.
pub struct ScopeOverlay<'a> {
    fields: Vec<(String, String)>,
    base: &'a dyn AmbientContext,
}

impl<'a> ScopeOverlay<'a> {
    /// `fields` are ordered outermost first; the innermost match wins.
    pub fn new(fields: Vec<(String, String)>, base: &'a dyn AmbientContext) -> Self {
        Self { fields, base }
    }
}

impl AmbientContext for ScopeOverlay<'_> {
    fn scoped_value(&self, key: &str) -> Option<String> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .or_else(|| self.base.scoped_value(key))
    }

    fn global_value(&self, key: &str) -> Option<String> {
        self.base.global_value(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_values_shadow_and_pop() {
        let _outer = ScopedDiagnosticContext::push("user", "outer");
        {
            let _inner = ScopedDiagnosticContext::push("user", "inner");
            assert_eq!(ScopedDiagnosticContext::get("user").as_deref(), Some("inner"));
        }
        assert_eq!(ScopedDiagnosticContext::get("user").as_deref(), Some("outer"));
    }

    #[test]
    fn test_scoped_values_are_thread_local() {
        let _guard = ScopedDiagnosticContext::push("method", "GET");
        let seen = std::thread::spawn(|| ScopedDiagnosticContext::get("method"))
            .join()
            .unwrap();
        assert!(seen.is_none());
    }

    #[test]
    fn test_global_context_round_trip() {
        GlobalDiagnosticContext::set("context-test-key", "value");
        assert_eq!(
            DiagnosticContext.global_value("context-test-key").as_deref(),
            Some("value")
        );
        assert_eq!(
            GlobalDiagnosticContext::remove("context-test-key").as_deref(),
            Some("value")
        );
        assert!(GlobalDiagnosticContext::get("context-test-key").is_none());
    }

    #[test]
    fn test_overlay_prefers_innermost_field() {
        let base = StaticContext::new()
            .with_scoped("url", "/base")
            .with_global("application", "app");
        let overlay = ScopeOverlay::new(
            vec![
                ("url".into(), "/outer".into()),
                ("url".into(), "/inner".into()),
            ],
            &base,
        );

        assert_eq!(overlay.scoped_value("url").as_deref(), Some("/inner"));
        assert_eq!(overlay.global_value("application").as_deref(), Some("app"));
        assert!(overlay.scoped_value("missing").is_none());
    }
}
