//! Debounced processing scheduler
//!
//! Each admission that fills a queue arms a short one-shot timer instead of
//! processing immediately, so a burst of joins coalesces into a single run.
//! Re-arming replaces the pending timer; cancelling aborts it before it
//! fires. A timer that has already fired cannot be cancelled.

use crate::types::QueueId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// One pending one-shot timer per queue
#[derive(Debug, Default)]
pub struct ProcessingScheduler {
    pending: Arc<Mutex<HashMap<QueueId, JoinHandle<()>>>>,
}

impl ProcessingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for a queue. After `delay` the task runs
    /// once; an earlier pending timer for the same queue is replaced.
    pub fn schedule<F, Fut>(&self, queue_id: &str, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pending_map = Arc::clone(&self.pending);
        let key = queue_id.to_string();
        let handle = tokio::spawn({
            let key = key.clone();
            async move {
                tokio::time::sleep(delay).await;
                // Drop our own entry so a later cancel cannot abort the run
                if let Ok(mut pending) = pending_map.lock() {
                    pending.remove(&key);
                }
                task().await;
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.insert(key.clone(), handle) {
                previous.abort();
                debug!("Re-armed processing timer for queue {}", key);
            } else {
                debug!("Armed processing timer for queue {}", key);
            }
        }
    }

    /// Abort a pending timer. Returns false when nothing was pending, which
    /// includes the case where the timer already fired.
    pub fn cancel(&self, queue_id: &str) -> bool {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.remove(queue_id) {
                handle.abort();
                debug!("Cancelled processing timer for queue {}", queue_id);
                return true;
            }
        }
        false
    }

    /// Whether a timer is currently armed for the queue
    pub fn is_pending(&self, queue_id: &str) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains_key(queue_id))
            .unwrap_or(false)
    }
}
