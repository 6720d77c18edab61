//! Generic in-house consumer-thread pool backend.
//!
//! Grounded on `tarch::multicore::cpp::JobConsumer`/`JobQueue`: a persistent
//! pool of OS threads that pull task-kind jobs from a shared injector
//! channel, plus on-demand dedicated threads for background consumers
//! (`spec.md` §9's "generic in-house consumer-thread pool").

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::TryRecvError;
use octojobs_core::{BackgroundConsumerFn, Job, JobSystem, JobSystemConfig, Runtime};

/// Runs the body of a single persistent worker thread. Each pass first
/// drains one task-kind job from the shared injector if one is waiting,
/// re-enqueueing it if it asks to be rescheduled, then falls through to
/// [`JobSystem::drain_once`] so plain `Job`-kind class queues also get an
/// autonomous consumer rather than only a caller-driven one
/// (`tarch::multicore::cpp::JobConsumer::operator()`'s round-robin over its
/// standard queues). Exits once shutdown has been requested and a pass
/// finds nothing left to do.
fn worker_loop(
    system: Arc<JobSystem<ThreadRuntime>>,
    receiver: crossbeam_channel::Receiver<Job>,
    sender: crossbeam_channel::Sender<Job>,
) {
    loop {
        match receiver.try_recv() {
            Ok(mut job) => {
                if job.run_once() {
                    let _ = sender.send(job);
                }
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        if system.drain_once() {
            continue;
        }

        if system.is_shutting_down() {
            break;
        }

        thread::yield_now();
        thread::sleep(Duration::from_millis(1));
    }
}

/// [`Runtime`] implementation backed by a fixed pool of OS threads.
pub struct ThreadRuntime {
    task_tx: crossbeam_channel::Sender<Job>,
    worker_count: usize,
}

impl Runtime for ThreadRuntime {
    fn spawn_task(&self, job: Job) {
        // The injector channel's receivers live alongside this sender for
        // the runtime's whole lifetime, so this only fails once every
        // worker thread has already exited (post-shutdown).
        let _ = self.task_tx.send(job);
    }

    fn spawn_background_consumer(&self, body: BackgroundConsumerFn) {
        // On-demand: a dedicated thread per background consumer, not
        // drawn from the task-worker pool, so a saturated task pool can
        // never starve background throttling.
        let spawned = thread::Builder::new()
            .name("octojobs-bg-consumer".to_string())
            .spawn(body);
        if let Err(err) = spawned {
            // Matching the core's "best-effort, must not poison" stance:
            // a failed spawn here just leaves the reserved budget slot
            // stuck, which would show up as a stalled background queue —
            // acceptable only because OS thread spawn failure is itself
            // an unrecoverable resource exhaustion condition.
            panic!("failed to spawn background consumer thread: {err}");
        }
    }

    fn yield_now(&self) {
        thread::yield_now();
    }

    fn worker_count(&self) -> usize {
        self.worker_count
    }
}

/// Join handles and the injector sender for a started [`ThreadRuntime`]'s
/// persistent worker pool, mirroring the teacher's `EngineHandle` shape
/// (`client-engine::api::EngineHandle`).
pub struct ThreadRuntimeHandle {
    workers: Vec<JoinHandle<()>>,
}

impl ThreadRuntimeHandle {
    /// Joins every persistent worker thread. Workers exit once
    /// [`JobSystem::shutdown`] has been called and a pass finds no
    /// task-channel, class-queue, or background work left; call
    /// `system.shutdown()` before this, as `octojobs-demo` does.
    pub fn join(self) {
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

/// Starts a job system on a fresh pool of `config.worker_count` OS
/// threads (minimum 1).
pub fn start(config: JobSystemConfig) -> (Arc<JobSystem<ThreadRuntime>>, ThreadRuntimeHandle) {
    let worker_count = config.worker_count.max(1);
    let (task_tx, task_rx) = crossbeam_channel::unbounded::<Job>();

    let runtime = ThreadRuntime {
        task_tx: task_tx.clone(),
        worker_count,
    };
    // Built before the persistent workers are spawned so each worker
    // thread can hold an `Arc<JobSystem<ThreadRuntime>>` and drive
    // `drain_once` directly, rather than the backend knowing nothing
    // beyond the task injector channel.
    let system = JobSystem::start(runtime, config);

    let workers = (0..worker_count)
        .map(|idx| {
            let system = Arc::clone(&system);
            let receiver = task_rx.clone();
            let sender = task_tx.clone();
            thread::Builder::new()
                .name(format!("octojobs-worker-{idx}"))
                .spawn(move || worker_loop(system, receiver, sender))
                .expect("failed to spawn octojobs worker thread")
        })
        .collect();

    (system, ThreadRuntimeHandle { workers })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use octojobs_core::{Job, JobKind};

    use super::*;

    #[test]
    fn task_kind_job_runs_on_a_worker_thread() -> anyhow::Result<()> {
        use anyhow::Context;

        let (system, handle) = start(JobSystemConfig {
            worker_count: 2,
            ..Default::default()
        });
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        system
            .spawn(Job::new(JobKind::Task, 0, move || {
                ran2.fetch_add(1, Ordering::SeqCst);
                false
            }))
            .context("spawning task-kind job")?;

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while ran.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        system.shutdown();
        drop(system);
        handle.join();
        Ok(())
    }

    /// A plain `Job`-kind class queue must drain on its own — no caller
    /// ever calls `process_jobs` here — because the worker pool's
    /// persistent threads round-robin class queues between task-channel
    /// checks.
    #[test]
    fn job_kind_class_queue_drains_without_an_explicit_process_jobs_call() -> anyhow::Result<()> {
        use anyhow::Context;

        let (system, handle) = start(JobSystemConfig {
            worker_count: 2,
            ..Default::default()
        });
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        system
            .spawn(Job::new(JobKind::Job, 5, move || {
                ran2.fetch_add(1, Ordering::SeqCst);
                false
            }))
            .context("spawning class-queue job")?;

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while ran.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(system.pending_jobs_in_class(5), 0);

        system.shutdown();
        drop(system);
        handle.join();
        Ok(())
    }
}
