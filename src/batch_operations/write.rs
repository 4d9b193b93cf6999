//! Batch write operations for DynamoDB.

use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::conversions::Item;
use crate::errors::{Error, Result};
use crate::metrics::OperationMetrics;
use crate::store::{StoreClient, BATCH_WRITE_MAX_ITEMS};

/// Batch size after a call that left more than half its items unprocessed.
pub fn shrink_batch_size(batch_size: usize) -> usize {
    batch_size / 2 + 1
}

/// Where a [`WriteQueue`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Items are waiting and the last call wrote at least one item.
    Pending,
    /// Items are waiting after `attempts` consecutive calls that wrote nothing.
    Backoff { attempts: u32 },
    Done,
}

/// Work queue for putting items in adaptive batches.
///
/// The batch size starts at [`BATCH_WRITE_MAX_ITEMS`] and only ever shrinks.
/// Unprocessed items go to the back of the queue so later items are not starved.
#[derive(Debug, Clone)]
pub struct WriteQueue {
    queue: VecDeque<Item>,
    batch_size: usize,
    attempts: u32,
}

impl WriteQueue {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            queue: items.into(),
            batch_size: BATCH_WRITE_MAX_ITEMS,
            attempts: 0,
        }
    }

    pub fn state(&self) -> WriteState {
        if self.queue.is_empty() {
            WriteState::Done
        } else if self.attempts > 0 {
            WriteState::Backoff {
                attempts: self.attempts,
            }
        } else {
            WriteState::Pending
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Items still waiting to be written.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop the next batch from the front of the queue.
    pub fn next_batch(&mut self) -> Vec<Item> {
        let n = self.batch_size.min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    /// Apply the outcome of writing a batch of `submitted` items.
    pub fn record(&mut self, submitted: usize, unprocessed: Vec<Item>) {
        if unprocessed.is_empty() {
            self.attempts = 0;
            return;
        }

        // Only calls that wrote nothing count against the policy
        if unprocessed.len() < submitted {
            self.attempts = 0;
        } else {
            self.attempts += 1;
        }

        if unprocessed.len() > submitted / 2 {
            let shrunk = shrink_batch_size(self.batch_size);
            if shrunk < self.batch_size {
                warn!(
                    unprocessed = unprocessed.len(),
                    submitted,
                    from = self.batch_size,
                    to = shrunk,
                    "batch_write shrinking batch size"
                );
            }
            self.batch_size = shrunk;
        }
        self.queue.extend(unprocessed);
    }
}

/// Put many items.
///
/// Runs a [`WriteQueue`] to completion: each call takes up to the current
/// batch size from the front, and anything the store leaves unprocessed is
/// queued again at the back. Calls that write at least one item never count
/// against `policy`; only a run of calls that write nothing can end in
/// [`Error::RetriesExhausted`].
pub fn batch_write<S: StoreClient + ?Sized>(
    store: &S,
    table: &str,
    items: Vec<Item>,
    policy: &RetryPolicy,
) -> Result<OperationMetrics> {
    let total = items.len();
    let mut queue = WriteQueue::new(items);
    let mut metrics = OperationMetrics::default();
    let mut calls = 0usize;

    loop {
        match queue.state() {
            WriteState::Done => break,
            WriteState::Pending => {}
            WriteState::Backoff { attempts } => {
                if policy.exhausted(attempts) {
                    return Err(Error::RetriesExhausted {
                        pending: queue.pending(),
                        attempts,
                    });
                }
                let delay = policy.delay(attempts);
                if !delay.is_zero() {
                    debug!(
                        table,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "batch_write backing off"
                    );
                    std::thread::sleep(delay);
                }
            }
        }

        let batch = queue.next_batch();
        let submitted = batch.len();
        let output = store.batch_write_item(table, batch)?;
        calls += 1;
        metrics.accumulate(&output.metrics);

        debug!(
            table,
            submitted,
            unprocessed = output.unprocessed_items.len(),
            pending = queue.pending(),
            "batch_write call"
        );
        queue.record(submitted, output.unprocessed_items);
    }

    info!(table, items = total, calls, "batch_write complete");
    Ok(metrics)
}
