//! `JobSystem<R>`: the explicitly constructed handle spawn/spawn-and-wait
//! and the consumer engine hang off of (`SPEC_FULL.md` §6's resolution of
//! the open "singleton vs. handle" question in `spec.md` §9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::background::{self, BackgroundQueue};
use crate::config::JobSystemConfig;
use crate::consumer;
use crate::error::{JobSystemError, Result};
use crate::fork_join::{self, SpawnAndWaitJob};
use crate::job::{Job, JobKind};
use crate::queue::QueueMap;
use crate::runtime::Runtime;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// The job system: per-class queues, the background queue and its throttle,
/// and the backend [`Runtime`] that actually executes task-kind jobs and
/// schedules background consumers.
pub struct JobSystem<R: Runtime> {
    queues: QueueMap,
    background: BackgroundQueue,
    runtime: R,
    telemetry: Arc<dyn TelemetrySink>,
    min_chunk: usize,
    shutting_down: AtomicBool,
    bg_consumers_terminated: AtomicBool,
}

impl<R: Runtime> JobSystem<R> {
    /// Builds a job system on top of `runtime`, applying `config`.
    pub fn start(runtime: R, config: JobSystemConfig) -> Arc<Self> {
        Arc::new(Self {
            queues: QueueMap::new(),
            background: BackgroundQueue::new(config.max_concurrent_background_consumers),
            runtime,
            telemetry: config.telemetry,
            min_chunk: config.min_chunk.max(1),
            shutting_down: AtomicBool::new(false),
            bg_consumers_terminated: AtomicBool::new(false),
        })
    }

    pub(crate) fn queues(&self) -> &QueueMap {
        &self.queues
    }

    pub(crate) fn background_queue(&self) -> &BackgroundQueue {
        &self.background
    }

    pub(crate) fn runtime(&self) -> &R {
        &self.runtime
    }

    pub(crate) fn telemetry_sink(&self) -> Arc<dyn TelemetrySink> {
        Arc::clone(&self.telemetry)
    }

    /// `spawn(job)` — dispatch by `kind` (`spec.md` §4.E). Never blocks on
    /// another job's completion; may allocate.
    pub fn spawn(self: &Arc<Self>, job: Job) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(JobSystemError::RuntimeShuttingDown);
        }
        match job.kind() {
            JobKind::ProcessImmediately => {
                let mut job = job;
                while job.run_once() {}
                Ok(())
            }
            kind if kind.is_task() => {
                self.runtime.spawn_task(job);
                Ok(())
            }
            kind if kind.is_background() => self.spawn_background(job),
            JobKind::Job => {
                if job.class_id() < 0 {
                    return Err(JobSystemError::InvalidJobClass(job.class_id()));
                }
                self.queues.push(job.class_id(), job);
                Ok(())
            }
            // Every `JobKind` variant is covered by one of the arms above;
            // `is_task()`/`is_background()` partition the rest.
            _ => unreachable!("JobKind variants are exhaustively classified"),
        }
    }

    fn spawn_background(self: &Arc<Self>, job: Job) -> Result<()> {
        let max = self.background.max_concurrent_consumers();

        if max == background::PROCESS_IMMEDIATELY {
            let mut job = job;
            while job.run_once() {}
            return Ok(());
        }

        let is_long_running = matches!(job.kind(), JobKind::LongRunningBackground);
        self.background.push(job);
        self.telemetry.report(TelemetryEvent::BackgroundQueueDepth(
            self.background.approx_len(),
        ));

        if max == background::DONT_USE_ANY_BACKGROUND_JOBS {
            // Enqueued only; drained solely by an explicit
            // `process_background_jobs` call.
            return Ok(());
        }

        if is_long_running {
            if !self.bg_consumers_terminated.load(Ordering::Acquire) {
                self.background.force_reserve_consumer();
                self.start_background_consumer();
            }
            return Ok(());
        }

        if max == 0 {
            // Only explicitly long-running background work gets a
            // dedicated consumer; everything else waits for an explicit
            // drain call.
            return Ok(());
        }

        self.maybe_start_background_consumer();
        Ok(())
    }

    fn maybe_start_background_consumer(self: &Arc<Self>) {
        if self.bg_consumers_terminated.load(Ordering::Acquire) {
            return;
        }
        if !self.background.try_reserve_consumer() {
            return;
        }
        self.start_background_consumer();
    }

    /// Schedules a background consumer body via the runtime, assuming a
    /// slot has already been reserved in the budget. Implements the
    /// `Scheduled -> Running -> Draining -> (Empty, resubmit-if-nonempty)
    /// -> Terminated` state machine of `spec.md` §4.D.
    fn start_background_consumer(self: &Arc<Self>) {
        let system = Arc::clone(self);
        system.telemetry.report(TelemetryEvent::BackgroundConsumerStarted);
        self.runtime.spawn_background_consumer(Box::new(move || {
            loop {
                let cap =
                    consumer::chunk_size(system.background.approx_len(), system.runtime.worker_count())
                        .max(system.min_chunk);
                consumer::drain_background(&system.background, cap, &system.telemetry);
                if system.background.approx_len() == 0 {
                    break;
                }
                system.runtime.yield_now();
            }
            if system.background.release_consumer().is_err() {
                system
                    .telemetry
                    .report(TelemetryEvent::BackgroundBudgetUnderflow);
            }
            system
                .telemetry
                .report(TelemetryEvent::BackgroundConsumerStopped);
            // A producer may have raced the last drain; if the queue is
            // non-empty at termination, respawn a successor so a
            // non-empty background queue always eventually has a consumer
            // (`spec.md` §4.D liveness property).
            if system.background.approx_len() > 0 {
                system.maybe_start_background_consumer();
            }
        }));
    }

    /// `spawn_and_wait` — fork-join for 2..=6 heterogeneous jobs
    /// (`spec.md` §4.F).
    pub fn spawn_and_wait(self: &Arc<Self>, jobs: Vec<SpawnAndWaitJob>, parallelise: bool) -> Result<()> {
        fork_join::spawn_and_wait(self, jobs, parallelise)
    }

    /// `process_jobs(class_id, max_jobs)` — drain up to `max_jobs` from one
    /// class queue; returns whether any work was done (`spec.md` §6).
    pub fn process_jobs(&self, class_id: i32, max_jobs: usize) -> bool {
        consumer::drain_class_queue(&self.queues, class_id, max_jobs, &self.telemetry)
    }

    /// One round-robin consumer pass: at most one job from every class
    /// queue known so far, then at most one job from the background queue.
    /// Returns whether any work was done.
    ///
    /// This is the primitive a concurrent [`Runtime`] backend's persistent
    /// workers loop on to realize the consumer engine (`spec.md` §4.D) for
    /// plain `Job`-kind work, the way `tarch::multicore::cpp::JobConsumer`'s
    /// `operator()` round-robins its standard queues ahead of background
    /// work. `process_jobs`/`wait_for_*` remain the caller-driven path for
    /// draining a specific class on demand; this is the autonomous one.
    pub fn drain_once(&self) -> bool {
        let mut did_work = consumer::drain_class_queues_once(&self.queues, &self.telemetry);
        if consumer::drain_background_once(&self.background, &self.telemetry) {
            did_work = true;
        }
        did_work
    }

    /// `process_background_jobs()` — drains the background queue up to a
    /// policy-determined cap. This implementation uses
    /// `max(min_chunk, approx_size / worker_count)`, the same cap a
    /// background consumer uses per visit; see `DESIGN.md` for why this
    /// option was chosen over "exactly half" or "the whole queue"
    /// (`spec.md` §9 open question).
    pub fn process_background_jobs(&self) -> bool {
        let cap = consumer::chunk_size(self.background.approx_len(), self.runtime.worker_count())
            .max(self.min_chunk);
        consumer::drain_background(&self.background, cap, &self.telemetry)
    }

    /// Approximate total pending jobs across every class queue created so
    /// far (`spec.md` §6's `pending_jobs`).
    pub fn pending_jobs(&self) -> i64 {
        self.queues.total_pending()
    }

    /// Approximate pending jobs in a single class queue.
    pub fn pending_jobs_in_class(&self, class_id: i32) -> i64 {
        self.queues.approx_size(class_id)
    }

    /// Approximate pending background jobs (`spec.md` §6's
    /// `pending_background_jobs`).
    pub fn pending_background_jobs(&self) -> i64 {
        self.background.approx_len()
    }

    /// Number of background consumers currently running. Exposed for
    /// monitoring/tests of the budget bound (`spec.md` §8 P4); never
    /// load-bearing for correctness.
    pub fn running_background_consumers(&self) -> i32 {
        self.background.running_consumers()
    }

    /// `set_max_concurrent_background_consumers(n)` — throttle, accepting
    /// the sentinels from [`crate::background`] (`spec.md` §4.C/§6).
    pub fn set_max_concurrent_background_consumers(&self, n: i32) {
        self.background.set_max_concurrent_consumers(n);
    }

    /// `terminate_background_consumers()` — cancels queued consumer slots;
    /// already-running consumers drain to completion (`spec.md` §6).
    pub fn terminate_background_consumers(&self) {
        self.bg_consumers_terminated.store(true, Ordering::Release);
    }

    /// Requests shutdown: subsequent `spawn` calls are rejected and queued
    /// background consumer slots are cancelled. Already-running consumers
    /// and in-flight task-kind jobs still run to completion; a backend's
    /// `Runtime::worker_count`/thread handles are joined by the backend's
    /// own shutdown path (`SPEC_FULL.md` §6).
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.terminate_background_consumers();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}
