//! Multicore job scheduling core.
//!
//! A typed job/task abstraction, per-class FIFO job queues, a throttled
//! background-job queue, a spawn-and-wait fork-join primitive, and a
//! phase-typed task-set façade, all written once against a [`Runtime`]
//! trait so independent concurrency backends can satisfy the same
//! contract (see `octojobs-runtime-thread`, `octojobs-runtime-tokio`,
//! `octojobs-runtime-serial`).

pub mod background;
pub mod config;
pub mod consumer;
pub mod error;
pub mod facade;
pub mod fork_join;
pub mod job;
pub mod queue;
pub mod runtime;
pub mod system;
pub mod telemetry;

pub use background::{BackgroundQueue, DONT_USE_ANY_BACKGROUND_JOBS, PROCESS_IMMEDIATELY};
pub use config::JobSystemConfig;
pub use error::{JobSystemError, Result};
pub use facade::{Phase, TaskSetFacade};
pub use fork_join::SpawnAndWaitJob;
pub use job::{Job, JobFn, JobId, JobKind};
pub use queue::{JobQueue, QueueMap};
pub use runtime::{BackgroundConsumerFn, Runtime};
pub use system::JobSystem;
pub use telemetry::{ChannelTelemetry, NoopTelemetry, TelemetryEvent, TelemetrySink};
