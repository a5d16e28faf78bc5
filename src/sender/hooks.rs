use super::client::ClientError;
use super::installation::Installation;
use crate::domain::OutboundRecord;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

type MessageHook = Arc<dyn Fn(&OutboundRecord) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&OutboundRecord, &ClientError) + Send + Sync>;
type FilterHook = Arc<dyn Fn(&OutboundRecord) -> bool + Send + Sync>;
type InstallationHook = Arc<dyn Fn(&mut Installation) + Send + Sync>;

/// Callbacks invoked at fixed points of a record's life.
///
/// Built once and passed at construction; every hook is optional. Hooks run
/// synchronously on whichever task reaches that point. A panic inside a
/// hook is caught and logged.
#[derive(Clone, Default)]
pub struct MessageHooks {
    on_message: Option<MessageHook>,
    on_error: Option<ErrorHook>,
    on_filter: Option<FilterHook>,
    on_installation: Option<InstallationHook>,
}

impl MessageHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for each record right before it is sent.
    pub fn on_message<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutboundRecord) + Send + Sync + 'static,
    {
        self.on_message = Some(Arc::new(hook));
        self
    }

    /// Called for each record whose delivery failed after the last attempt.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutboundRecord, &ClientError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Returning `true` discards the record before it is queued.
    pub fn on_filter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutboundRecord) -> bool + Send + Sync + 'static,
    {
        self.on_filter = Some(Arc::new(hook));
        self
    }

    pub fn on_installation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Installation) + Send + Sync + 'static,
    {
        self.on_installation = Some(Arc::new(hook));
        self
    }

    pub(crate) fn message(&self, record: &OutboundRecord) {
        if let Some(hook) = &self.on_message {
            guarded("on_message", || hook(record));
        }
    }

    pub(crate) fn error(&self, record: &OutboundRecord, error: &ClientError) {
        if let Some(hook) = &self.on_error {
            guarded("on_error", || hook(record, error));
        }
    }

    /// A panicking filter keeps the record.
    pub(crate) fn filtered(&self, record: &OutboundRecord) -> bool {
        self.on_filter
            .as_ref()
            .and_then(|hook| guarded("on_filter", || hook(record)))
            .unwrap_or(false)
    }

    pub(crate) fn installation(&self, installation: &mut Installation) {
        if let Some(hook) = &self.on_installation {
            guarded("on_installation", || hook(installation));
        }
    }
}

/// Runs a user hook, containing any panic so it never reaches the producer
/// or the dispatcher worker.
fn guarded<T>(name: &str, hook: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("{} hook panicked: {}", name, reason);
            None
        }
    }
}

impl fmt::Debug for MessageHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHooks")
            .field("on_message", &self.on_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_filter", &self.on_filter.is_some())
            .field("on_installation", &self.on_installation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_missing_hooks_are_no_ops() {
        let hooks = MessageHooks::new();
        let record = OutboundRecord::new("t", Severity::Information, Utc::now());

        hooks.message(&record);
        assert!(!hooks.filtered(&record));
    }

    #[test]
    fn test_registered_hooks_fire() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let hooks = MessageHooks::new()
            .on_message(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .on_filter(|record| record.title.contains("noise"));

        let kept = OutboundRecord::new("real problem", Severity::Error, Utc::now());
        let noisy = OutboundRecord::new("noise", Severity::Error, Utc::now());

        hooks.message(&kept);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(!hooks.filtered(&kept));
        assert!(hooks.filtered(&noisy));
    }

    #[test]
    fn test_panicking_hooks_are_contained() {
        let hooks = MessageHooks::new()
            .on_message(|_| panic!("message hook bug"))
            .on_error(|_, _| panic!("error hook bug"))
            .on_filter(|_| panic!("filter hook bug"))
            .on_installation(|_| panic!("installation hook bug"));
        let record = OutboundRecord::new("t", Severity::Error, Utc::now());
        let error = ClientError::RequestTimeout("slow".to_string());

        hooks.message(&record);
        hooks.error(&record, &error);
        assert!(!hooks.filtered(&record), "a failing filter keeps the record");
        hooks.installation(&mut Installation::current(None));
    }
}
