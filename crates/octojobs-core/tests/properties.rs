//! The testable properties and concrete scenarios from `spec.md` §8,
//! exercised with real threads and bounded iteration counts (no `loom` or
//! `proptest` in the pack's dependency graph for this kind of concurrency
//! code; see `SPEC_FULL.md` §12).
//!
//! These tests use a minimal in-test `Runtime` rather than any of the
//! `octojobs-runtime-*` backend crates, so `octojobs-core` can validate its
//! own contract independent of a specific backend's scheduling policy.
//! `TestRuntime` spawns one OS thread per task/background job and provides
//! no autonomous class-queue consumer of its own, so the FIFO, reschedule,
//! and panic-containment tests below drive `process_jobs` explicitly
//! rather than waiting on one; a backend's autonomous consumer (wired up
//! via `JobSystem::drain_once`) is exercised end to end by
//! `octojobs-runtime-thread`'s and `octojobs-runtime-tokio`'s own
//! `job_kind_class_queue_drains_without_an_explicit_process_jobs_call`
//! tests instead.

use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Context;

use octojobs_core::{
    BackgroundConsumerFn, Job, JobKind, JobSystem, JobSystemConfig, Runtime, SpawnAndWaitJob,
    DONT_USE_ANY_BACKGROUND_JOBS, PROCESS_IMMEDIATELY,
};

/// Spawns every task-kind job and every background consumer on its own OS
/// thread. Not a realistic production backend, but enough to exercise the
/// core's contract under genuine concurrency.
struct TestRuntime {
    worker_count: usize,
}

impl Runtime for TestRuntime {
    fn spawn_task(&self, job: Job) {
        let mut job = job;
        thread::spawn(move || {
            while job.run_once() {}
        });
    }

    fn spawn_background_consumer(&self, body: BackgroundConsumerFn) {
        thread::spawn(body);
    }

    fn yield_now(&self) {
        thread::yield_now();
    }

    fn worker_count(&self) -> usize {
        self.worker_count
    }
}

fn system(max_concurrent_background_consumers: i32) -> Arc<JobSystem<TestRuntime>> {
    JobSystem::start(
        TestRuntime { worker_count: 4 },
        JobSystemConfig {
            worker_count: 4,
            max_concurrent_background_consumers,
            ..Default::default()
        },
    )
}

/// Scenario 1: serial sequencing. `parallelise=false` runs sub-jobs in
/// argument order on the caller.
#[test]
fn serial_sequencing_preserves_argument_order() -> anyhow::Result<()> {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    let order = Arc::new(Mutex::new(Vec::new()));

    let order_a = Arc::clone(&order);
    let order_b = Arc::clone(&order);
    system
        .spawn_and_wait(
            vec![
                SpawnAndWaitJob::new(JobKind::Job, 0, move || {
                    order_a.lock().unwrap().push(1);
                    false
                }),
                SpawnAndWaitJob::new(JobKind::Job, 0, move || {
                    order_b.lock().unwrap().push(2);
                    false
                }),
            ],
            false,
        )
        .context("serial spawn_and_wait")?;

    assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    Ok(())
}

/// Scenario 2: fork-join reduction. Two callables each increment a shared
/// atomic under `parallelise=true`; the call returns only once both have
/// finished (P1 completion).
#[test]
fn fork_join_reduction_reaches_exact_total() -> anyhow::Result<()> {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    const PER_JOB: u64 = 50_000;
    let counter = Arc::new(AtomicU64::new(0));

    let counter_a = Arc::clone(&counter);
    let counter_b = Arc::clone(&counter);
    system
        .spawn_and_wait(
            vec![
                SpawnAndWaitJob::new(JobKind::Job, 1, move || {
                    for _ in 0..PER_JOB {
                        counter_a.fetch_add(1, Ordering::Relaxed);
                    }
                    false
                }),
                SpawnAndWaitJob::new(JobKind::Job, 2, move || {
                    for _ in 0..PER_JOB {
                        counter_b.fetch_add(1, Ordering::Relaxed);
                    }
                    false
                }),
            ],
            true,
        )
        .context("parallel spawn_and_wait")?;

    assert_eq!(counter.load(Ordering::Relaxed), PER_JOB * 2);
    Ok(())
}

/// Scenario 3: cross-class dependency. Job A (class 1) produces into a
/// channel; job B (class 2) consumes. Forked together, this must not
/// deadlock — the deadlock-avoidance rationale in `spec.md` §4.F is
/// exactly about this shape.
#[test]
fn cross_class_dependency_completes_without_deadlock() -> anyhow::Result<()> {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    let (tx, rx) = crossbeam_channel::bounded::<u64>(1);
    let received = Arc::new(AtomicU64::new(0));
    let received2 = Arc::clone(&received);

    system
        .spawn_and_wait(
            vec![
                SpawnAndWaitJob::new(JobKind::Job, 1, move || {
                    let _ = tx.send(42);
                    false
                }),
                SpawnAndWaitJob::new(JobKind::Job, 2, move || {
                    if let Ok(value) = rx.recv() {
                        received2.store(value, Ordering::Relaxed);
                    }
                    false
                }),
            ],
            true,
        )
        .context("cross-class spawn_and_wait")?;

    assert_eq!(received.load(Ordering::Relaxed), 42);
    Ok(())
}

/// Scenario 4: background throttle. With a budget of 2, ten sleeping
/// background jobs must never see more than `2 + 1` concurrent consumers
/// (P4) and all ten must eventually run (P2's no-loss property applied to
/// the background queue).
#[test]
fn background_throttle_bounds_concurrent_consumers() -> anyhow::Result<()> {
    let system = system(2);
    let completed = Arc::new(AtomicUsize::new(0));
    let observed_max = Arc::new(AtomicI32::new(0));

    for _ in 0..10 {
        let completed = Arc::clone(&completed);
        let observed_max = Arc::clone(&observed_max);
        let system_for_sample = Arc::clone(&system);
        system
            .spawn(Job::new(JobKind::Background, 0, move || {
                let running = system_for_sample.running_background_consumers();
                observed_max.fetch_max(running, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                completed.fetch_add(1, Ordering::SeqCst);
                false
            }))
            .context("spawning background job")?;
    }

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while completed.load(Ordering::SeqCst) < 10 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(completed.load(Ordering::SeqCst), 10);
    assert!(
        observed_max.load(Ordering::SeqCst) <= 2 + 1,
        "observed {} concurrent background consumers, budget was 2",
        observed_max.load(Ordering::SeqCst)
    );
    Ok(())
}

/// Scenario 5: a persistent background job counts its own invocations and
/// asks to stop (returns `false`) on the fifth. Exactly five calls are
/// observed.
#[test]
fn persistent_background_job_runs_exactly_five_times() -> anyhow::Result<()> {
    let system = system(1);
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);

    system
        .spawn(Job::new(JobKind::PersistentBackground, 0, move || {
            calls2.fetch_add(1, Ordering::SeqCst) + 1 < 5
        }))
        .context("spawning persistent background job")?;

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while calls.load(Ordering::SeqCst) < 5 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    Ok(())
}

/// Scenario 6: immediate mode. With `PROCESS_IMMEDIATELY`, every
/// background spawn runs synchronously on the spawning thread and nothing
/// ever touches the background queue (P5).
#[test]
fn process_immediately_sentinel_never_queues() -> anyhow::Result<()> {
    let system = system(PROCESS_IMMEDIATELY);
    let spawning_thread = thread::current().id();
    let ran_on_spawning_thread = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let ran_on_spawning_thread = Arc::clone(&ran_on_spawning_thread);
        system
            .spawn(Job::new(JobKind::Background, 0, move || {
                if thread::current().id() == spawning_thread {
                    ran_on_spawning_thread.fetch_add(1, Ordering::SeqCst);
                }
                false
            }))
            .context("spawning immediate background job")?;
        assert_eq!(system.pending_background_jobs(), 0);
    }

    assert_eq!(ran_on_spawning_thread.load(Ordering::SeqCst), 100);
    Ok(())
}

/// `DONT_USE_ANY_BACKGROUND_JOBS`: jobs are enqueued only; nothing drains
/// them until an explicit `process_background_jobs` call.
#[test]
fn dont_use_any_background_jobs_requires_explicit_drain() -> anyhow::Result<()> {
    let system = system(DONT_USE_ANY_BACKGROUND_JOBS);
    let ran = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let ran = Arc::clone(&ran);
        system
            .spawn(Job::new(JobKind::Background, 0, move || {
                ran.fetch_add(1, Ordering::SeqCst);
                false
            }))
            .context("spawning enqueue-only background job")?;
    }

    thread::sleep(Duration::from_millis(50));
    assert_eq!(
        ran.load(Ordering::SeqCst),
        0,
        "no consumer should have started without an explicit drain"
    );
    assert_eq!(system.pending_background_jobs(), 5);

    while system.process_background_jobs() {}
    assert_eq!(ran.load(Ordering::SeqCst), 5);
    assert_eq!(system.pending_background_jobs(), 0);
    Ok(())
}

/// P2 no loss + P3 FIFO within a class: K jobs pushed to one class queue,
/// drained by a single consumer, must come back in push order and exactly
/// once each.
#[test]
fn single_consumer_drains_class_queue_in_fifo_order() -> anyhow::Result<()> {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..200 {
        let order = Arc::clone(&order);
        system
            .spawn(Job::new(JobKind::Job, 7, move || {
                order.lock().unwrap().push(i);
                false
            }))
            .context("spawning FIFO job")?;
    }

    while system.process_jobs(7, usize::MAX) {}

    let order = order.lock().unwrap();
    let expected: Vec<i32> = (0..200).collect();
    assert_eq!(*order, expected);
    Ok(())
}

/// P6 reschedule: a job returning `true` is re-run until it returns
/// `false`, and is observed exactly that many times.
#[test]
fn reschedule_reruns_job_until_it_reports_done() -> anyhow::Result<()> {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);

    system
        .spawn(Job::new(JobKind::Job, 3, move || {
            calls2.fetch_add(1, Ordering::SeqCst) + 1 < 4
        }))
        .context("spawning reschedule job")?;

    while system.process_jobs(3, usize::MAX) {}

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    Ok(())
}

/// A user callable that panics must not poison the queue: later jobs in
/// the same class still run, and the panicking job is treated as "do not
/// re-enqueue" (`spec.md` §7).
#[test]
fn panicking_job_does_not_poison_the_queue() -> anyhow::Result<()> {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    let ran_after = Arc::new(AtomicUsize::new(0));
    let ran_after2 = Arc::clone(&ran_after);

    system
        .spawn(Job::new(JobKind::Job, 9, || {
            panic!("boom");
        }))
        .context("spawning panicking job")?;
    system
        .spawn(Job::new(JobKind::Job, 9, move || {
            ran_after2.fetch_add(1, Ordering::SeqCst);
            false
        }))
        .context("spawning follow-up job")?;

    while system.process_jobs(9, usize::MAX) {}

    assert_eq!(ran_after.load(Ordering::SeqCst), 1);
    Ok(())
}

/// `spawn_and_wait` rejects arities outside `2..=6` (`spec.md` §4.F).
#[test]
fn spawn_and_wait_rejects_invalid_arity() {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    let err = system
        .spawn_and_wait(
            vec![SpawnAndWaitJob::new(JobKind::Job, 0, || false)],
            true,
        )
        .expect_err("a single sub-job must be rejected");
    assert!(matches!(
        err,
        octojobs_core::JobSystemError::InvalidSpawnAndWaitArity(1)
    ));
}

/// `spawn` on a shutting-down system is rejected rather than silently
/// enqueued.
#[test]
fn spawn_after_shutdown_is_rejected() {
    let system = system(JobSystemConfig::DEFAULT_BACKGROUND_CONSUMERS);
    system.shutdown();
    let err = system
        .spawn(Job::new(JobKind::Job, 0, || false))
        .expect_err("spawn after shutdown must fail");
    assert!(matches!(
        err,
        octojobs_core::JobSystemError::RuntimeShuttingDown
    ));
}
