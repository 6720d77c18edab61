use clap::{Parser, ValueEnum};

fn default_parallel() -> u16 {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(512) as u16
}

/// Which `Runtime` backend to wire the job system onto for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Persistent OS-thread pool (`octojobs-runtime-thread`).
    Thread,
    /// `tokio::task::spawn_blocking` on the current tokio runtime
    /// (`octojobs-runtime-tokio`).
    Tokio,
    /// No concurrency at all; everything runs on the calling thread
    /// (`octojobs-runtime-serial`).
    Serial,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "octojobs-demo",
    version,
    about = "Exercises the octojobs job-scheduling core with a toy space-tree-traversal-shaped workload"
)]
pub struct Cli {
    /// Which concurrency backend to run the workload on.
    #[arg(long, value_enum, default_value_t = Backend::Thread)]
    pub backend: Backend,

    /// Worker count hint passed to the chosen backend.
    #[arg(short = 'p', long, default_value_t = default_parallel())]
    pub parallel: u16,

    /// Number of traversal "sweeps" (LoadCells..StoreVertices) to run.
    #[arg(short = 's', long, default_value_t = 3)]
    pub sweeps: u32,

    /// Number of background housekeeping jobs to enqueue per sweep.
    #[arg(long, default_value_t = 4)]
    pub background_jobs_per_sweep: u32,

    /// Background consumer throttle (see `octojobs_core::background` for
    /// the `DontUseAnyBackgroundJobs`/`ProcessImmediately` sentinels).
    #[arg(long, default_value_t = 2)]
    pub max_background_consumers: i32,
}
