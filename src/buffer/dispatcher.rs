use super::batch::{Batch, BatchConfig, BatchFormer, BatchType};
use super::error::BufferError;
use super::stats::{DispatcherStats, DispatcherStatsSnapshot};
use crate::domain::OutboundRecord;
use crate::sender::{ClientError, DeliveryClient, Installation, MessageHooks};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub log_id: String,
    pub batch: BatchConfig,
    /// Bound for one flush, retries included.
    pub flush_timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub queue_capacity: usize,
    /// Sent once by the worker before it starts draining records.
    pub installation: Option<Installation>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            log_id: String::new(),
            batch: BatchConfig::default(),
            flush_timeout: Duration::from_secs(150),
            retry_count: 0,
            retry_delay: Duration::from_millis(50),
            queue_capacity: 10_000,
            installation: None,
        }
    }
}

enum Command {
    Record(Box<OutboundRecord>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Accumulates records and delivers them in single or bulk calls.
///
/// Producers only ever touch a bounded channel; one background worker owns
/// the batch, the flush timer and the delivery client, so at most one flush
/// is in flight at any time.
pub struct BatchingDispatcher {
    tx: mpsc::Sender<Command>,
    stats: Arc<DispatcherStats>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchingDispatcher {
    /// Spawns the worker on the current Tokio runtime.
    pub fn start<D: DeliveryClient>(
        client: Arc<D>,
        config: DispatcherConfig,
        hooks: MessageHooks,
    ) -> Result<Self, BufferError> {
        if config.queue_capacity == 0 {
            return Err(BufferError::InvalidCapacity { capacity: 0 });
        }
        if config.batch.max_size == 0 {
            return Err(BufferError::InvalidCapacity { capacity: 0 });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BufferError::NoRuntime)?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let stats = Arc::new(DispatcherStats::new());

        info!(
            "Starting dispatcher (batch_size={}, flush_delay={:?}, flush_timeout={:?}, retries={})",
            config.batch.max_size, config.batch.max_wait_time, config.flush_timeout, config.retry_count
        );

        let worker = Worker {
            client,
            former: BatchFormer::new(config.batch.clone()),
            config,
            hooks,
            stats: stats.clone(),
        };
        let handle = runtime.spawn(worker.run(rx));

        Ok(Self {
            tx,
            stats,
            closed: AtomicBool::new(false),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queues a record without waiting. A full queue drops the record.
    pub fn append(&self, record: OutboundRecord) -> Result<(), BufferError> {
        if self.closed.load(Ordering::Acquire) {
            self.stats.record_dropped();
            return Err(BufferError::BufferClosed);
        }

        match self.tx.try_send(Command::Record(Box::new(record))) {
            Ok(()) => {
                self.stats.record_appended();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.record_dropped();
                warn!("Dispatcher queue full, dropping record");
                Err(BufferError::BufferFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.record_dropped();
                Err(BufferError::BufferClosed)
            }
        }
    }

    /// Delivers everything queued so far and waits for it.
    pub async fn flush(&self) -> Result<(), BufferError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .await
            .map_err(|_| BufferError::BufferClosed)?;
        ack_rx.await.map_err(|_| BufferError::BufferClosed)
    }

    /// Stops accepting records, drains what is queued and waits at most
    /// `wait` for the worker. Later calls return immediately.
    pub async fn shutdown(&self, wait: Duration) -> Result<(), BufferError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("Draining dispatcher (timeout {:?})", wait);

        let (ack_tx, ack_rx) = oneshot::channel();
        let drain = async {
            if self.tx.send(Command::Shutdown(ack_tx)).await.is_ok() {
                let _ = ack_rx.await;
            }
            let handle = self.worker.lock().take();
            if let Some(handle) = handle
                && let Err(e) = handle.await
            {
                error!("Dispatcher worker ended abnormally: {}", e);
            }
        };

        timeout(wait, drain).await.map_err(|_| {
            warn!("Dispatcher drain did not finish within {:?}", wait);
            BufferError::DrainTimeout {
                waited_ms: wait.as_millis() as u64,
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn record_filtered(&self) {
        self.stats.record_filtered();
    }
}

struct Worker<D> {
    client: Arc<D>,
    former: BatchFormer,
    config: DispatcherConfig,
    hooks: MessageHooks,
    stats: Arc<DispatcherStats>,
}

impl<D: DeliveryClient> Worker<D> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        if let Some(mut installation) = self.config.installation.take() {
            self.send_installation(&mut installation).await;
        }

        loop {
            let deadline = self.former.deadline();

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Record(record)) => {
                        if self.former.push(*record) {
                            self.flush(BatchType::SizeBased).await;
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        self.flush(BatchType::Explicit).await;
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.drain_closed(&mut rx).await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.flush(BatchType::Explicit).await;
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() => {
                    self.flush(BatchType::TimeBased).await;
                }
            }
        }

        info!("Dispatcher stopped");
    }

    /// Closes the channel and delivers whatever producers managed to queue
    /// before it closed. Later appends see a closed channel and count as dropped.
    async fn drain_closed(&mut self, rx: &mut mpsc::Receiver<Command>) {
        rx.close();
        let mut acks = Vec::new();
        while let Some(command) = rx.recv().await {
            match command {
                Command::Record(record) => {
                    if self.former.push(*record) {
                        self.flush(BatchType::SizeBased).await;
                    }
                }
                Command::Flush(ack) | Command::Shutdown(ack) => acks.push(ack),
            }
        }
        self.flush(BatchType::Explicit).await;
        for ack in acks {
            let _ = ack.send(());
        }
    }

    async fn send_installation(&self, installation: &mut Installation) {
        self.hooks.installation(installation);
        let attempt = self
            .client
            .create_installation(&self.config.log_id, installation);

        match timeout(self.config.flush_timeout, attempt).await {
            Ok(Ok(())) => debug!("Installation reported"),
            Ok(Err(e)) => warn!("Failed to report installation: {}", e),
            Err(_) => warn!("Installation report timed out"),
        }
    }

    async fn flush(&mut self, batch_type: BatchType) {
        let Some(batch) = self.former.take(batch_type) else {
            return;
        };

        debug!(
            "Flushing batch {} with {} records ({:?})",
            batch.id(),
            batch.size(),
            batch.batch_type()
        );

        for record in batch.records() {
            self.hooks.message(record);
        }

        let result = match timeout(self.config.flush_timeout, self.deliver(&batch)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::RequestTimeout(format!(
                "Flush did not complete within {:?}",
                self.config.flush_timeout
            ))),
        };

        self.stats.record_flush(batch.size(), result.is_ok());

        if let Err(e) = result {
            error!(
                "Failed to deliver batch {} ({} records): {}",
                batch.id(),
                batch.size(),
                e
            );
            for record in batch.records() {
                self.hooks.error(record, &e);
            }
        }
    }

    async fn deliver(&self, batch: &Batch) -> Result<(), ClientError> {
        let mut attempt = 0;
        loop {
            let result = match batch.records() {
                [record] => self.client.create_one(&self.config.log_id, record).await,
                records => self.client.create_bulk(&self.config.log_id, records).await,
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.retry_count => {
                    attempt += 1;
                    warn!(
                        "Delivery of batch {} failed (attempt {}): {}",
                        batch.id(),
                        attempt,
                        e
                    );
                    sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365)
}
