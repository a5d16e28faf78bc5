use crate::domain::OutboundRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// What caused a batch to be cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchType {
    SizeBased,
    TimeBased,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_size: usize,
    pub max_wait_time: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: 50,
            max_wait_time: Duration::from_millis(250),
        }
    }
}

/// Records accumulated between two flushes, in submission order.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    records: Vec<OutboundRecord>,
    batch_type: BatchType,
}

impl Batch {
    pub fn new(records: Vec<OutboundRecord>, batch_type: BatchType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            records,
            batch_type,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[OutboundRecord] {
        &self.records
    }

    pub fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The single mutable accumulator owned by the dispatcher worker.
///
/// The flush deadline is armed by the first record and cleared when the
/// batch is taken.
#[derive(Debug)]
pub struct BatchFormer {
    pending: Vec<OutboundRecord>,
    deadline: Option<Instant>,
    config: BatchConfig,
}

impl BatchFormer {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            pending: Vec::with_capacity(config.max_size),
            deadline: None,
            config,
        }
    }

    /// Buffers a record. Returns `true` once the batch ceiling is reached.
    pub fn push(&mut self, record: OutboundRecord) -> bool {
        if self.pending.is_empty() {
            self.deadline = Some(Instant::now() + self.config.max_wait_time);
        }
        self.pending.push(record);
        self.pending.len() >= self.config.max_size
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Snapshot-and-clear; `None` when nothing is buffered.
    pub fn take(&mut self, batch_type: BatchType) -> Option<Batch> {
        self.deadline = None;
        if self.pending.is_empty() {
            return None;
        }
        let records = std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(self.config.max_size),
        );
        Some(Batch::new(records, batch_type))
    }
}
