//! The consumer loop contract (`spec.md` §4.D): free functions that pop a
//! bounded chunk of jobs from a queue, run each once, and re-append the ones
//! that ask to be rescheduled.
//!
//! Backend crates (`octojobs-runtime-*`) decide *who* calls these and how
//! often; this module only encodes *what happens* on one pass, so every
//! backend observes the same §4.D/§4.C semantics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::background::BackgroundQueue;
use crate::job::Job;
use crate::queue::QueueMap;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Smallest chunk a consumer drains per visit, even if `approx_size /
/// worker_count` would round down to zero (`spec.md` §4.D: "chunk size is
/// >= a small constant").
pub const MIN_CHUNK: usize = 1;

/// Runs one job to completion-or-reschedule, catching a panic from the
/// user callable so it cannot poison the queue (`spec.md` §7: "exceptions
/// from user code … must not poison queues; the contract is that they are
/// caught at the consumer boundary and logged").
///
/// Returns `true` if the job asked to be rescheduled (caller re-appends
/// it), `false` if it is finished (caller drops it) — including the case
/// where the callable panicked, which is always treated as "do not
/// re-enqueue".
fn run_once_catching(job: &mut Job, telemetry: &Arc<dyn TelemetrySink>) -> bool {
    let id = job.id();
    match panic::catch_unwind(AssertUnwindSafe(|| job.run_once())) {
        Ok(reschedule) => reschedule,
        Err(_) => {
            telemetry.report(TelemetryEvent::JobPanicked {
                job_id: id.to_string(),
            });
            false
        }
    }
}

/// Picks a chunk size for a queue of `approx_size` pending jobs shared
/// across `worker_count` consumers, bounded below by [`MIN_CHUNK`]
/// (`spec.md` §4.D).
pub fn chunk_size(approx_size: i64, worker_count: usize) -> usize {
    let worker_count = worker_count.max(1);
    let per_worker = (approx_size.max(0) as usize) / worker_count;
    per_worker.max(MIN_CHUNK)
}

/// Drains up to `max_jobs` from a single class queue, running and
/// re-appending rescheduled jobs as it goes. Returns whether any job was
/// popped (`spec.md` §6: `process_jobs` "returns whether any work was
/// done").
pub fn drain_class_queue(
    queues: &QueueMap,
    class_id: i32,
    max_jobs: usize,
    telemetry: &Arc<dyn TelemetrySink>,
) -> bool {
    let queue = queues.queue_for(class_id);
    let mut did_work = false;
    for _ in 0..max_jobs {
        let Some(mut job) = queue.pop() else {
            break;
        };
        did_work = true;
        if run_once_catching(&mut job, telemetry) {
            queue.push(job);
        }
    }
    did_work
}

/// One round-robin pass over every class queue known to `queues`, draining
/// at most one job from each (the tie-break rule `spec.md` §4.F specifies
/// for the spawn-and-wait drain loop, reused here as the shared primitive).
pub fn drain_class_queues_once(queues: &QueueMap, telemetry: &Arc<dyn TelemetrySink>) -> bool {
    let mut did_work = false;
    for class_id in queues.known_class_ids() {
        if drain_class_queue(queues, class_id, 1, telemetry) {
            did_work = true;
        }
    }
    did_work
}

/// Drains at most one job from the background queue. Used by the
/// spawn-and-wait drain loop's "background queue at most one job" tie-break
/// and by dedicated background consumers' inner loop.
pub fn drain_background_once(bg: &BackgroundQueue, telemetry: &Arc<dyn TelemetrySink>) -> bool {
    let Some(mut job) = bg.pop() else {
        return false;
    };
    telemetry.report(TelemetryEvent::BackgroundQueueDepth(bg.approx_len()));
    if run_once_catching(&mut job, telemetry) {
        bg.push(job);
    }
    true
}

/// Drains the background queue up to `max_jobs`, the building block for
/// both `process_background_jobs` (policy-determined cap, §4.C/§6) and a
/// background consumer's per-visit chunk.
pub fn drain_background(
    bg: &BackgroundQueue,
    max_jobs: usize,
    telemetry: &Arc<dyn TelemetrySink>,
) -> bool {
    let mut did_work = false;
    for _ in 0..max_jobs {
        if !drain_background_once(bg, telemetry) {
            break;
        }
        did_work = true;
    }
    did_work
}
