//! The adapter façade: events in, batched deliveries out.

use crate::app::config::ForwarderConfig;
use crate::buffer::{BatchConfig, BatchingDispatcher, BufferError, DispatcherConfig, DispatcherStatsSnapshot};
use crate::context::{AmbientContext, DiagnosticContext};
use crate::domain::{ForwarderError, LogEvent, LogLevel};
use crate::enrich::{
    FieldResolver, HostEnvironment, Layout, MessageAssembler, ProcessHost, TemplateRenderer,
};
use crate::layer::ElmahIoLayer;
use crate::sender::{DeliveryClient, HttpClient, Installation, MessageHooks};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Collects the optional collaborators of an [`ElmahIoTarget`].
pub struct TargetBuilder {
    config: ForwarderConfig,
    hooks: MessageHooks,
    host: Arc<dyn HostEnvironment>,
    context: Arc<dyn AmbientContext>,
    title: Option<Arc<dyn TemplateRenderer>>,
}

impl TargetBuilder {
    pub fn hooks(mut self, hooks: MessageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replaces the host tier (machine name, OS user) used during resolution.
    pub fn host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = host;
        self
    }

    /// Replaces the process-wide diagnostic context used by `write`.
    pub fn context(mut self, context: Arc<dyn AmbientContext>) -> Self {
        self.context = context;
        self
    }

    /// Renders titles with a custom engine instead of `title_layout`.
    pub fn title_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.title = Some(renderer);
        self
    }

    /// Builds the target on top of the reqwest client.
    pub fn build(self) -> Result<ElmahIoTarget, ForwarderError> {
        let config = prepare(self.config.clone())?;
        let client = HttpClient::new(config.client_config())?;
        self.assemble(config, Arc::new(client))
    }

    /// Builds the target on top of any delivery client.
    pub fn build_with_client<D: DeliveryClient>(
        self,
        client: Arc<D>,
    ) -> Result<ElmahIoTarget, ForwarderError> {
        let config = prepare(self.config.clone())?;
        self.assemble(config, client)
    }

    fn assemble<D: DeliveryClient>(
        self,
        config: ForwarderConfig,
        client: Arc<D>,
    ) -> Result<ElmahIoTarget, ForwarderError> {
        let mut resolver = FieldResolver::new(self.host);
        for (field, layout) in config.layouts.overrides() {
            resolver = resolver.with_override(field, Arc::new(Layout::parse(layout)?));
        }
        if let Some(application) = &config.application {
            resolver = resolver.with_default(crate::enrich::FieldName::Application, application);
        }

        let mut assembler = MessageAssembler::new(resolver).with_hooks(self.hooks.clone());
        let title = match (self.title, &config.title_layout) {
            (Some(renderer), _) => Some(renderer),
            (None, Some(layout)) => Some(Arc::new(Layout::parse(layout)?) as Arc<dyn TemplateRenderer>),
            (None, None) => None,
        };
        if let Some(title) = title {
            assembler = assembler.with_title_layout(title);
        }

        let dispatcher_config = DispatcherConfig {
            log_id: config.log_id.clone(),
            batch: BatchConfig {
                max_size: config.batch_size,
                max_wait_time: config.flush_delay,
            },
            flush_timeout: config.flush_timeout,
            retry_count: config.retry_count,
            retry_delay: config.retry_delay,
            queue_capacity: config.queue_capacity,
            installation: config
                .send_installation
                .then(|| Installation::current(config.application.as_deref())),
        };
        let dispatcher = BatchingDispatcher::start(client, dispatcher_config, self.hooks)?;

        info!(
            "elmah.io target ready (log_id={}, minimum_level={})",
            config.log_id,
            config.minimum_level()
        );

        Ok(ElmahIoTarget {
            assembler,
            dispatcher,
            minimum_level: config.minimum_level(),
            context: self.context,
        })
    }
}

fn prepare(mut config: ForwarderConfig) -> Result<ForwarderConfig, ForwarderError> {
    config.post_process()?;
    config.validate()?;
    Ok(config)
}

/// Receives log events, turns them into records and hands them to the dispatcher.
///
/// Logging calls never fail: dropped, filtered and undeliverable records are
/// only visible through hooks, stats and the crate's own diagnostics.
pub struct ElmahIoTarget {
    assembler: MessageAssembler,
    dispatcher: BatchingDispatcher,
    minimum_level: LogLevel,
    context: Arc<dyn AmbientContext>,
}

impl ElmahIoTarget {
    pub fn builder(config: ForwarderConfig) -> TargetBuilder {
        TargetBuilder {
            config,
            hooks: MessageHooks::default(),
            host: Arc::new(ProcessHost),
            context: Arc::new(DiagnosticContext),
            title: None,
        }
    }

    /// Must be called from within a Tokio runtime.
    pub fn new(config: ForwarderConfig) -> Result<Self, ForwarderError> {
        Self::builder(config).build()
    }

    pub fn minimum_level(&self) -> &LogLevel {
        &self.minimum_level
    }

    pub fn is_enabled(&self, level: &LogLevel) -> bool {
        level.is_at_least(&self.minimum_level)
    }

    pub fn write(&self, event: &LogEvent) {
        self.write_with_context(event, self.context.as_ref());
    }

    /// Like `write`, resolving ambient values through `context`.
    pub fn write_with_context(&self, event: &LogEvent, context: &dyn AmbientContext) {
        if !self.is_enabled(&event.level) {
            return;
        }

        let Some(record) = self.assembler.assemble(event, context) else {
            self.dispatcher.record_filtered();
            return;
        };

        match self.dispatcher.append(record) {
            Ok(()) => {}
            Err(BufferError::BufferFull) => {}
            Err(e) => debug!("Record not queued: {}", e),
        }
    }

    /// Ambient context used by `write`.
    pub fn context(&self) -> &dyn AmbientContext {
        self.context.as_ref()
    }

    pub async fn flush(&self) -> Result<(), ForwarderError> {
        Ok(self.dispatcher.flush().await?)
    }

    /// Drains queued records, waiting at most `wait`. Idempotent.
    pub async fn shutdown(&self, wait: Duration) -> Result<(), ForwarderError> {
        Ok(self.dispatcher.shutdown(wait).await?)
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.dispatcher.stats()
    }

    /// A `tracing` layer that forwards events to this target.
    pub fn layer(self: &Arc<Self>) -> ElmahIoLayer {
        ElmahIoLayer::new(self.clone())
    }
}
