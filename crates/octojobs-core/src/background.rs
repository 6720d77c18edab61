use std::sync::atomic::{AtomicI32, Ordering};

use crate::error::{JobSystemError, Result};
use crate::job::Job;
use crate::queue::JobQueue;

/// Sentinel for `max_concurrent_bg_consumers`: never launch a background
/// consumer; background jobs sit queued until an explicit
/// `process_background_jobs` call drains them.
///
/// Grounded on `tarch::multicore::BackgroundTasks.h`'s
/// `DontUseAnyBackgroundTasks`.
pub const DONT_USE_ANY_BACKGROUND_JOBS: i32 = -1;

/// Sentinel for `max_concurrent_bg_consumers`: run every background job
/// inline on the spawning thread, as if it had been tagged
/// `ProcessImmediately`.
///
/// Grounded on `tarch::multicore::BackgroundTasks.h`'s
/// `ProcessBackgroundTasksImmediately`.
pub const PROCESS_IMMEDIATELY: i32 = -2;

/// The background job queue plus its consumer throttle.
///
/// `max_concurrent_consumers` holds one of the two sentinels above, `0`
/// (only jobs explicitly flagged `LongRunningBackground` get a dedicated
/// consumer; everything else waits), or a positive budget of concurrently
/// running background consumers.
pub struct BackgroundQueue {
    queue: JobQueue,
    max_concurrent_consumers: AtomicI32,
    running_consumers: AtomicI32,
}

impl BackgroundQueue {
    pub fn new(max_concurrent_consumers: i32) -> Self {
        Self {
            queue: JobQueue::new_unbounded(),
            max_concurrent_consumers: AtomicI32::new(max_concurrent_consumers),
            running_consumers: AtomicI32::new(0),
        }
    }

    pub fn set_max_concurrent_consumers(&self, n: i32) {
        self.max_concurrent_consumers.store(n, Ordering::Release);
    }

    pub fn max_concurrent_consumers(&self) -> i32 {
        self.max_concurrent_consumers.load(Ordering::Acquire)
    }

    pub fn push(&self, job: Job) {
        self.queue.push(job);
    }

    pub fn pop(&self) -> Option<Job> {
        self.queue.pop()
    }

    pub fn approx_len(&self) -> i64 {
        self.queue.approx_len()
    }

    /// Attempts to reserve one slot in the consumer budget. Returns `true`
    /// if the caller may now start a background consumer.
    ///
    /// Never reserves against a negative sentinel: those are handled by the
    /// caller before this is reached (`DONT_USE_ANY_BACKGROUND_JOBS` never
    /// launches a consumer at all; `PROCESS_IMMEDIATELY` never enqueues in
    /// the first place).
    pub fn try_reserve_consumer(&self) -> bool {
        let max = self.max_concurrent_consumers.load(Ordering::Acquire);
        if max < 0 {
            return false;
        }
        loop {
            let running = self.running_consumers.load(Ordering::Acquire);
            if running >= max {
                return false;
            }
            if self
                .running_consumers
                .compare_exchange_weak(running, running + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Reserves a slot unconditionally, bypassing the budget. Used for
    /// `LongRunningBackground` jobs, which always get a dedicated consumer
    /// (`tarch::multicore::tbb::Jobs.cpp`'s handling of
    /// `LongRunningBackgroundJob` calls `BackgroundJobConsumerTask::enqueue`
    /// unconditionally). `running_consumers` may transiently exceed the
    /// configured budget by the number of long-running jobs in flight.
    pub fn force_reserve_consumer(&self) {
        self.running_consumers.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases one slot in the consumer budget. Saturates at zero rather
    /// than going negative: `fetch_update` only applies the decrement when
    /// the counter is strictly positive, so a double-release can never
    /// produce UB, just a reported [`JobSystemError::BackgroundBudgetUnderflow`].
    /// Still `debug_assert!`s first, since a double-release is always a
    /// caller bug and should fail loudly in debug builds.
    pub fn release_consumer(&self) -> Result<()> {
        let prev = self.running_consumers.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |running| (running > 0).then_some(running - 1),
        );
        match prev {
            Ok(_) => Ok(()),
            Err(running) => {
                debug_assert!(
                    running > 0,
                    "background consumer budget underflowed: running={running}"
                );
                Err(JobSystemError::BackgroundBudgetUnderflow)
            }
        }
    }

    pub fn running_consumers(&self) -> i32 {
        self.running_consumers.load(Ordering::Acquire)
    }
}
