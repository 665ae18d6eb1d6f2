//! Job delivery and the bounded worker pool that consumes it.

pub mod worker;

pub use worker::{ActiveRuns, WorkerPool};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

/// Delivers `campaign_id` work items. At-least-once: the same id may
/// arrive more than once and consumers must tolerate it.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn enqueue(&self, campaign_id: &str);

    /// Drop a not-yet-delivered job. True when one was removed.
    async fn remove(&self, campaign_id: &str) -> bool;

    /// Wait for the next job; `None` once the source is closed and drained.
    async fn next_job(&self) -> Option<String>;

    fn close(&self);
}

/// FIFO queue held in process memory.
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<String>>,
    notify: Notify,
    closed: AtomicBool,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop(&self) -> Option<String> {
        self.jobs.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[async_trait]
impl JobSource for MemoryJobQueue {
    async fn enqueue(&self, campaign_id: &str) {
        if let Ok(mut q) = self.jobs.lock() {
            q.push_back(campaign_id.to_string());
        }
        debug!(campaign_id = %campaign_id, "Job enqueued");
        self.notify.notify_one();
    }

    async fn remove(&self, campaign_id: &str) -> bool {
        let Ok(mut q) = self.jobs.lock() else {
            return false;
        };
        let before = q.len();
        q.retain(|id| id != campaign_id);
        before != q.len()
    }

    async fn next_job(&self) -> Option<String> {
        loop {
            // Register interest before checking so a concurrent enqueue is not lost.
            let notified = self.notify.notified();
            if let Some(id) = self.pop() {
                return Some(id);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}
