//! In-process conduit for follow-on work produced by a job.
//!
//! The queue only collects work; dispatching it is the host's business.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// A unit of follow-on work (e.g. an outbound notification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedWork {
    pub kind: String,
    pub payload: serde_json::Value,
}

impl QueuedWork {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// FIFO work queue shared between a job and its runner.
///
/// Clones share the same underlying queue.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    inner: Arc<Mutex<VecDeque<QueuedWork>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, work: QueuedWork) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(work);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<QueuedWork> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}
