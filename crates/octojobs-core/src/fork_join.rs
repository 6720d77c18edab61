//! Spawn-and-wait: the fork-join primitive from `spec.md` §4.F.
//!
//! The hardest subsystem in the core. The deadlock-avoidance rationale is
//! spelled out in `spec.md` §4.F: every sibling job is enqueued (or handed
//! to the runtime as a task) *before* the waiter begins draining, so a
//! machine with fewer workers than siblings can never end up with a
//! started job blocked on an unscheduled sibling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::background::BackgroundQueue;
use crate::consumer;
use crate::error::{JobSystemError, Result};
use crate::job::{Job, JobFn, JobKind};
use crate::queue::QueueMap;
use crate::runtime::Runtime;
use crate::system::JobSystem;
use crate::telemetry::TelemetryEvent;

/// Minimum/maximum number of sub-jobs a single `spawn_and_wait` call may
/// carry (`spec.md` §4.F: "2 ≤ N ≤ 6").
pub const MIN_ARITY: usize = 2;
pub const MAX_ARITY: usize = 6;

/// One sub-job handed to `spawn_and_wait`: its scheduling hint, target
/// class (ignored for task/background kinds per `spec.md` §3), and the
/// callable itself.
pub struct SpawnAndWaitJob {
    pub kind: JobKind,
    pub class_id: i32,
    pub run: JobFn,
}

impl SpawnAndWaitJob {
    pub fn new(kind: JobKind, class_id: i32, run: impl FnMut() -> bool + Send + 'static) -> Self {
        Self {
            kind,
            class_id,
            run: Box::new(run),
        }
    }
}

/// The shared completion counter a `spawn_and_wait` call decrements exactly
/// once per sub-job, on that sub-job's final `run` returning `false`
/// (`spec.md` §3's "Completion counter").
struct CompletionCounter {
    remaining: AtomicI64,
}

impl CompletionCounter {
    fn new(n: usize) -> Self {
        Self {
            remaining: AtomicI64::new(n as i64),
        }
    }

    /// `Release` so the decrement happens-before any `Acquire` read that
    /// observes zero (`spec.md` §5: "the decrement … happens-before any
    /// observation of zero by the waiter").
    fn complete_one(&self) {
        self.remaining.fetch_sub(1, Ordering::Release);
    }

    fn is_done(&self) -> bool {
        self.remaining.load(Ordering::Acquire) <= 0
    }
}

pub(crate) fn spawn_and_wait<R: Runtime>(
    system: &Arc<JobSystem<R>>,
    jobs: Vec<SpawnAndWaitJob>,
    parallelise: bool,
) -> Result<()> {
    if !(MIN_ARITY..=MAX_ARITY).contains(&jobs.len()) {
        return Err(JobSystemError::InvalidSpawnAndWaitArity(jobs.len()));
    }

    if !parallelise {
        for mut sub in jobs {
            while (sub.run)() {}
        }
        return Ok(());
    }

    let n = jobs.len();
    let telemetry = system.telemetry_sink();
    telemetry.report(TelemetryEvent::ConcurrencyDelta(n as i64));

    let counter = Arc::new(CompletionCounter::new(n));
    let involved_classes: Vec<i32> = jobs
        .iter()
        .filter(|sub| matches!(sub.kind, JobKind::Job))
        .map(|sub| sub.class_id)
        .collect();

    for sub in jobs {
        let SpawnAndWaitJob {
            kind,
            class_id,
            mut run,
        } = sub;
        let counter = Arc::clone(&counter);
        let wrapped = Job::new(kind, class_id, move || {
            let reschedule = run();
            if !reschedule {
                counter.complete_one();
            }
            reschedule
        });
        // `spawn` enqueues `Job`-kind wrappers without also starting a
        // consumer; task-kind wrappers go straight to the runtime. Either
        // way this call never blocks on the sub-job's own completion.
        system.spawn(wrapped)?;
    }

    drain_until_complete(
        system.queues(),
        system.background_queue(),
        &involved_classes,
        &counter,
        system.runtime(),
        &telemetry,
    );

    telemetry.report(TelemetryEvent::ConcurrencyDelta(-(n as i64)));
    Ok(())
}

/// The active-wait drain loop: serve each involved class at most once,
/// then the background queue at most once, then yield, until the counter
/// reaches zero (`spec.md` §4.F tie-break rules).
fn drain_until_complete<R: Runtime>(
    queues: &QueueMap,
    background: &BackgroundQueue,
    involved_classes: &[i32],
    counter: &CompletionCounter,
    runtime: &R,
    telemetry: &Arc<dyn crate::telemetry::TelemetrySink>,
) {
    while !counter.is_done() {
        let mut did_work = false;
        for &class_id in involved_classes {
            if consumer::drain_class_queue(queues, class_id, 1, telemetry) {
                did_work = true;
            }
        }
        if consumer::drain_background_once(background, telemetry) {
            did_work = true;
        }
        if counter.is_done() {
            break;
        }
        if !did_work {
            // Nothing of ours was ready this pass; give other workers a
            // chance to make progress on the siblings we're waiting on.
            runtime.yield_now();
        }
    }
}
