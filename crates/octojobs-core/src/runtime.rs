//! The seam between `octojobs-core` and a concrete concurrency backend.
//!
//! `spec.md` §9 calls for "a single trait/interface for the underlying
//! runtime … with independent implementations selectable at build time; the
//! core is written once against the trait." `Runtime` is that trait; the
//! three backend crates (`octojobs-runtime-thread`, `-tokio`, `-serial`)
//! each implement it once.

use crate::job::Job;

/// A unit of background-consumer work the core hands to a backend: drain
/// the background queue, observe it empty, decide whether to respawn a
/// successor. The backend only decides *how* to execute this closure
/// (a dedicated OS thread, a `tokio::spawn`ed task, or inline); the state
/// machine inside the closure is the same for every backend.
pub type BackgroundConsumerFn = Box<dyn FnOnce() + Send>;

/// The concurrency backend a [`crate::system::JobSystem`] is built on.
///
/// Implementors decide *how* task-kind jobs run and how background
/// consumers are scheduled; they never decide *what* runs, since that is
/// fully described by the `Job`/`BackgroundConsumerFn` they are handed.
pub trait Runtime: Send + Sync + 'static {
    /// Dispatches a task-kind job (`JobKind::is_task()` is true) for
    /// immediate, dependency-free execution — "may start on any idle
    /// worker immediately" per `spec.md` §4.E.
    fn spawn_task(&self, job: Job);

    /// Schedules a background consumer to run `body` to completion.
    /// Called only after the caller has already reserved a consumer slot
    /// in the background budget (`spec.md` §4.C/§4.D); `body` itself is
    /// responsible for releasing that slot when it terminates.
    fn spawn_background_consumer(&self, body: BackgroundConsumerFn);

    /// Yields the calling thread so sibling consumers/tasks get a chance
    /// to run. Called between drain-loop passes in spawn-and-wait
    /// (`spec.md` §4.F: "it may also yield to let the underlying runtime
    /// schedule other workers").
    fn yield_now(&self);

    /// The number of workers the backend considers itself to have.
    /// Used only to size consumer chunk reads (`spec.md` §4.D); never
    /// load-bearing for correctness.
    fn worker_count(&self) -> usize;
}
