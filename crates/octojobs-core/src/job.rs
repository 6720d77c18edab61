use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Classifies a [`Job`] the way `spec.md` §3's `JobType` function does.
///
/// `ProcessImmediately` is shared between the "plain job" family and the
/// background family: wherever it appears, the job runs inline on the
/// spawning thread and never touches a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Has no dependencies recorded beyond its class queue; picked up by
    /// whichever consumer drains that class next.
    Job,
    /// Pure, dependency-free work; a `Runtime` may run it concurrently the
    /// moment it is spawned.
    Task,
    /// A task-kind job waiting on an external event (e.g. inbound MPI
    /// traffic in the original framework). Scheduled like `Task`.
    ReceiveTask,
    /// Task-kind, but the caller asked for it to run before other queued
    /// work if the backend can arrange that.
    RunAsSoonAsPossible,
    /// Runs synchronously on the calling thread, looping while it
    /// reschedules itself, bypassing every queue.
    ProcessImmediately,
    /// Routed to the background queue under the normal throttle.
    Background,
    /// Routed to the background queue; always gets a dedicated consumer
    /// regardless of the current throttle budget.
    LongRunningBackground,
    /// Routed to the background queue; conventionally re-enqueues itself
    /// until some external condition makes its callable return `false`.
    PersistentBackground,
    /// Background-family task: no dependencies, so a `Runtime` may run it
    /// as a real concurrent task rather than queuing it.
    RunAsap,
}

impl JobKind {
    /// True for kinds a `Runtime` may dispatch as a real concurrent task
    /// instead of merely enqueuing, per `spec.md` §3's `IsTask` classifier.
    pub fn is_task(self) -> bool {
        matches!(
            self,
            JobKind::Task | JobKind::ReceiveTask | JobKind::RunAsSoonAsPossible | JobKind::RunAsap
        )
    }

    /// True for the background-queue family (excludes `ProcessImmediately`,
    /// which never touches any queue regardless of which family it tags).
    pub fn is_background(self) -> bool {
        matches!(
            self,
            JobKind::Background
                | JobKind::LongRunningBackground
                | JobKind::PersistentBackground
                | JobKind::RunAsap
        )
    }
}

/// Process-wide identity for a spawned job, assigned purely for telemetry
/// and test assertions. It has no bearing on scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
}

/// The callable a job wraps: returning `true` asks to be re-enqueued and run
/// again later; `false` means it is done and may be dropped.
pub type JobFn = Box<dyn FnMut() -> bool + Send>;

/// A unit of schedulable work: a `kind`, a `class_id`, and a callable.
///
/// `class_id` is meaningful for non-background kinds (it selects which
/// per-class queue the job lives in) and ignored for background kinds.
pub struct Job {
    id: JobId,
    kind: JobKind,
    class_id: i32,
    run: JobFn,
}

impl Job {
    pub fn new(kind: JobKind, class_id: i32, run: impl FnMut() -> bool + Send + 'static) -> Self {
        Self::boxed(kind, class_id, Box::new(run))
    }

    pub fn boxed(kind: JobKind, class_id: i32, run: JobFn) -> Self {
        Self {
            id: next_job_id(),
            kind,
            class_id,
            run,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    /// Runs the callable once. `true` means "reschedule me".
    pub fn run_once(&mut self) -> bool {
        (self.run)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("class_id", &self.class_id)
            .finish_non_exhaustive()
    }
}
