//! Measurement ingestion queue
//!
//! The provider's receive thread pushes whole batches; the presentation tick
//! drains them. Pushing never blocks and never fails.
//!
//! The queue is unbounded. The host is expected to keep ticking; a stalled
//! presentation thread lets batches pile up in memory.

use crate::types::MeasurementBatch;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Cloneable producer side of an [`IngestionQueue`]
#[derive(Clone)]
pub struct IngestionProducer {
    tx: Sender<MeasurementBatch>,
}

impl IngestionProducer {
    /// Queue a batch for the next drain
    pub fn push(&self, batch: MeasurementBatch) {
        if batch.is_empty() {
            return;
        }
        // The queue owns a receiver for as long as it lives; after it is
        // dropped there is nobody left to deliver to.
        let _ = self.tx.send(batch);
    }
}

/// Unbounded multi-producer, single-consumer queue of measurement batches
pub struct IngestionQueue {
    tx: Sender<MeasurementBatch>,
    rx: Receiver<MeasurementBatch>,
}

impl Default for IngestionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Create a producer handle for another thread
    pub fn producer(&self) -> IngestionProducer {
        IngestionProducer {
            tx: self.tx.clone(),
        }
    }

    /// Queue a batch from the consumer side
    pub fn push(&self, batch: MeasurementBatch) {
        if !batch.is_empty() {
            let _ = self.tx.send(batch);
        }
    }

    /// Take every batch queued before this call, oldest first
    pub fn drain_all(&self) -> Vec<MeasurementBatch> {
        let available = self.rx.len();
        let mut batches = Vec::with_capacity(available);
        for _ in 0..available {
            match self.rx.try_recv() {
                Ok(batch) => batches.push(batch),
                Err(_) => break,
            }
        }
        batches
    }

    /// Drop everything currently queued, returning the number of batches discarded
    pub fn discard_all(&self) -> usize {
        self.drain_all().len()
    }

    /// Number of batches waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
