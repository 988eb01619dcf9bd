//! Retry policy and per-service retry bookkeeping
//!
//! A service has at most one live retry task. The task owns the name's
//! registry slot from the moment it is spawned until its attempt is over.
//! Deleted and Modified events release the slot, which aborts a task still
//! waiting out its delay and makes a task already fetching abandon its commit.
//! Nothing is kept for a name once its retry chain ends.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Bounded retry for transient network failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Whether a failed `attempt` (0 = initial) may be followed by another
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

struct PendingRetry {
    task: u64,
    handle: AbortHandle,
}

#[derive(Default)]
pub(crate) struct RetryState {
    pending: DashMap<String, PendingRetry>,
    next_task: AtomicU64,
}

impl RetryState {
    /// Whether `task` still holds the name's slot
    pub(crate) fn owns(&self, name: &str, task: u64) -> bool {
        self.pending.get(name).is_some_and(|p| p.task == task)
    }

    /// Release the name's slot and abort the task holding it
    ///
    /// Returns whether a retry was cancelled.
    pub(crate) fn invalidate(&self, name: &str) -> bool {
        match self.pending.remove(name) {
            Some((_, pending)) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Spawn `make_task(task_id)` and give it the name's slot
    ///
    /// `successor_of` is the task scheduling its own follow-up; its handle is
    /// not aborted. Any other holder is. The registry entry is held while
    /// spawning, so the task cannot release the slot before it owns it.
    pub(crate) fn spawn<F, Fut>(&self, name: &str, successor_of: Option<u64>, make_task: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = self.next_task.fetch_add(1, Ordering::Relaxed);
        let entry = self.pending.entry(name.to_string());
        let handle = tokio::spawn(make_task(task)).abort_handle();
        let pending = PendingRetry { task, handle };
        match entry {
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(pending);
                if Some(previous.task) != successor_of {
                    previous.handle.abort();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(pending);
            }
        }
    }

    /// Release the name's slot if `task` still holds it
    pub(crate) fn finish(&self, name: &str, task: u64) {
        self.pending.remove_if(name, |_, pending| pending.task == task);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_pending(&self, name: &str) -> bool {
        self.pending.contains_key(name)
    }
}
