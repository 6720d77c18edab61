//! Construction-time configuration for a [`crate::system::JobSystem`].
//!
//! `spec.md` §9 leaves the choice between a process-wide singleton and an
//! explicitly constructed handle open; `SPEC_FULL.md` §6 resolves it in
//! favor of an explicit handle built from a plain config struct, the way
//! the teacher's `EngineConfig` feeds `start_engine` (`client-engine::api`).

use std::sync::Arc;

use crate::telemetry::{NoopTelemetry, TelemetrySink};

/// Configuration consumed by `JobSystem::start`.
///
/// There is no config file or environment variable at this layer
/// (`spec.md` §6: "Environment variables: none defined by the core"); a
/// caller such as a CLI façade is expected to populate this from its own
/// flags, the way `bbr-client::cli::Cli` populates `EngineConfig`.
#[derive(Clone)]
pub struct JobSystemConfig {
    /// Hint passed to the backend for how many workers to run. Backends
    /// are free to ignore it (the serial backend always runs on the
    /// caller's thread).
    pub worker_count: usize,

    /// Initial value for `max_concurrent_bg_consumers` (`spec.md` §4.C),
    /// including the `DONT_USE_ANY_BACKGROUND_JOBS`/`PROCESS_IMMEDIATELY`
    /// sentinels from [`crate::background`].
    pub max_concurrent_background_consumers: i32,

    /// The smallest number of jobs a consumer drains per visit to a queue,
    /// floor under `approx_size / worker_count` (`spec.md` §4.D).
    pub min_chunk: usize,

    /// Telemetry sink; defaults to [`NoopTelemetry`] when not set.
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl JobSystemConfig {
    /// A budget of 2 concurrent background consumers, matching the
    /// throttle used in `spec.md` §8 scenario 4.
    pub const DEFAULT_BACKGROUND_CONSUMERS: i32 = 2;

    /// Floor on a consumer's per-visit chunk size (`spec.md` §4.D).
    pub const DEFAULT_MIN_CHUNK: usize = 1;
}

impl Default for JobSystemConfig {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_concurrent_background_consumers: Self::DEFAULT_BACKGROUND_CONSUMERS,
            min_chunk: Self::DEFAULT_MIN_CHUNK,
            telemetry: Arc::new(NoopTelemetry),
        }
    }
}

impl std::fmt::Debug for JobSystemConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSystemConfig")
            .field("worker_count", &self.worker_count)
            .field(
                "max_concurrent_background_consumers",
                &self.max_concurrent_background_consumers,
            )
            .field("min_chunk", &self.min_chunk)
            .finish_non_exhaustive()
    }
}
