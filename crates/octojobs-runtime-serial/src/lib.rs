//! Serial fallback backend: no threads at all.
//!
//! Grounded on the `#ifndef SharedMemoryParallelisation` branch of
//! `tarch::multicore::Jobs.cpp`: every "task" and every background
//! consumer just runs inline on whichever thread calls into the job
//! system. Useful for single-threaded builds, deterministic tests, and as
//! a baseline to validate the other two backends against.
//!
//! Unlike `octojobs-runtime-thread`/`octojobs-runtime-tokio`, this backend
//! spawns no persistent consumer for plain `Job`-kind class queues either:
//! the `#ifndef SharedMemoryParallelisation` branch it mirrors never
//! instantiates a `JobConsumer` at all, because there is no second thread
//! to run one on. A `JobKind::Job` spawned here sits in its class queue
//! until `process_jobs`/`wait_for_*`/a `spawn_and_wait` drain loop visits
//! it — the single available thread is both the only producer and the
//! only possible consumer, so "autonomous" and "caller-driven" draining
//! are the same thing.

use std::sync::Arc;

use octojobs_core::{BackgroundConsumerFn, Job, JobSystem, JobSystemConfig, Runtime};

/// [`Runtime`] implementation with no concurrency: everything runs on the
/// calling thread, synchronously, before the triggering call returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialRuntime;

impl Runtime for SerialRuntime {
    fn spawn_task(&self, job: Job) {
        let mut job = job;
        while job.run_once() {}
    }

    fn spawn_background_consumer(&self, body: BackgroundConsumerFn) {
        // There is no dedicated consumer thread; the body (which already
        // loops until the background queue is observed empty) just runs
        // inline on whichever thread triggered it.
        body();
    }

    fn yield_now(&self) {
        // No other worker could make progress in our absence; yielding
        // would be a pure no-op busy-wait aid, so skip it.
    }

    fn worker_count(&self) -> usize {
        1
    }
}

/// Starts a job system with no concurrency backend at all. `config`'s
/// `worker_count` is accepted for API symmetry with the other backends but
/// has no effect.
pub fn start(config: JobSystemConfig) -> Arc<JobSystem<SerialRuntime>> {
    JobSystem::start(SerialRuntime, config)
}
