use thiserror::Error;

/// Errors the core can report back to a caller.
///
/// Per the error handling design, most violations here are preconditions a
/// well-behaved caller never trips; they exist so a misuse fails loudly
/// instead of corrupting queue state.
#[derive(Debug, Error)]
pub enum JobSystemError {
    #[error("job class {0} is invalid; class ids must be >= 0")]
    InvalidJobClass(i32),

    #[error("spawn_and_wait accepts 2..=6 jobs, got {0}")]
    InvalidSpawnAndWaitArity(usize),

    #[error("background consumer budget underflowed")]
    BackgroundBudgetUnderflow,

    #[error("job system is shutting down, spawn rejected")]
    RuntimeShuttingDown,
}

/// Result alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, JobSystemError>;
