use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::models::notification::{NotificationRequest, Priority};

/// Multi-level FIFO holding area for pending notifications. One bucket per
/// priority tier, all behind a single lock; critical sections never await,
/// so producers and consumers on any number of tasks stay safe.
pub struct PriorityNotificationQueue {
    buckets: Mutex<[VecDeque<NotificationRequest>; 4]>,
}

impl PriorityNotificationQueue {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new([
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
            ]),
        }
    }

    /// Appends the request to its priority bucket. Never blocks beyond the
    /// lock and never fails for a well-formed request.
    pub fn enqueue(&self, request: NotificationRequest) {
        let priority = request.priority;
        let mut buckets = self.lock_buckets();
        buckets[priority.bucket_index()].push_back(request);

        debug!(?priority, "Notification enqueued");
    }

    /// Non-blocking poll: pops the oldest entry of the highest non-empty
    /// tier, or `None` when every bucket is empty.
    pub fn try_dequeue(&self) -> Option<NotificationRequest> {
        let mut buckets = self.lock_buckets();

        for priority in Priority::DESCENDING {
            if let Some(request) = buckets[priority.bucket_index()].pop_front() {
                return Some(request);
            }
        }

        None
    }

    /// Total pending count across all tiers.
    pub fn len(&self) -> usize {
        self.lock_buckets().iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_buckets(&self) -> MutexGuard<'_, [VecDeque<NotificationRequest>; 4]> {
        // A poisoned lock only means another thread panicked mid-push;
        // the bucket contents are still structurally valid.
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PriorityNotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}
