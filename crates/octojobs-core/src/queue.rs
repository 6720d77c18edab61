use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::job::Job;

/// A single per-class MPMC job queue, plus an approximate size counter so
/// callers can inspect backlog depth without draining it.
///
/// Backed by an unbounded `crossbeam_channel`, the way `gridiron`'s
/// `ThreadPool` hands work to its workers — unbounded because a spawning
/// thread must never block on a full queue (`spec.md` §5: spawn is
/// non-blocking).
pub struct JobQueue {
    sender: crossbeam_channel::Sender<Job>,
    receiver: crossbeam_channel::Receiver<Job>,
    len: AtomicI64,
}

impl JobQueue {
    pub(crate) fn new_unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            len: AtomicI64::new(0),
        }
    }

    pub fn push(&self, job: Job) {
        self.len.fetch_add(1, Ordering::AcqRel);
        // The receiver lives alongside the sender for the queue's whole
        // lifetime (both owned by the same `JobQueue`), so this never fails.
        self.sender
            .send(job)
            .expect("job queue receiver dropped while queue still alive");
    }

    pub fn pop(&self) -> Option<Job> {
        match self.receiver.try_recv() {
            Ok(job) => {
                self.len.fetch_sub(1, Ordering::AcqRel);
                Some(job)
            }
            Err(_) => None,
        }
    }

    /// Approximate pending count. May be stale by the time a caller reads
    /// it under concurrent pushes/pops; callers must not rely on an exact
    /// value for correctness (`spec.md` §3's `approx_size`).
    pub fn approx_len(&self) -> i64 {
        self.len.load(Ordering::Acquire).max(0)
    }
}

/// Lazily-created, never-destroyed-until-teardown map from `class_id` to its
/// queue (`spec.md` §3/§4.B).
///
/// A `parking_lot::RwLock` guards the map itself, not the queues inside it:
/// most accesses are reads (an existing queue's `Arc` clone), and a write
/// lock is only taken the first time a given `class_id` is seen.
pub struct QueueMap {
    queues: RwLock<HashMap<i32, Arc<JobQueue>>>,
}

impl QueueMap {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the queue for `class_id`, creating it on first use.
    pub fn queue_for(&self, class_id: i32) -> Arc<JobQueue> {
        if let Some(queue) = self.queues.read().get(&class_id) {
            return queue.clone();
        }
        self.queues
            .write()
            .entry(class_id)
            .or_insert_with(|| Arc::new(JobQueue::new_unbounded()))
            .clone()
    }

    pub fn push(&self, class_id: i32, job: Job) {
        self.queue_for(class_id).push(job);
    }

    pub fn pop(&self, class_id: i32) -> Option<Job> {
        self.queue_for(class_id).pop()
    }

    pub fn approx_size(&self, class_id: i32) -> i64 {
        self.queues
            .read()
            .get(&class_id)
            .map(|q| q.approx_len())
            .unwrap_or(0)
    }

    /// Sum of `approx_len` across every class queue created so far.
    pub fn total_pending(&self) -> i64 {
        self.queues.read().values().map(|q| q.approx_len()).sum()
    }

    /// Every class_id that has had a queue created for it, in arbitrary
    /// order. Used by consumer loops that round-robin "every known class".
    pub fn known_class_ids(&self) -> Vec<i32> {
        self.queues.read().keys().copied().collect()
    }
}

impl Default for QueueMap {
    fn default() -> Self {
        Self::new()
    }
}
