//! One-way reporting of concurrency changes and background-queue pressure.
//!
//! Mirrors the teacher's `EngineEvent` broadcast channel (`client-engine::api`):
//! the core never blocks on a sink and never treats a missing/lagging
//! subscriber as an error (`spec.md` §4.H: "best-effort … absence must not
//! alter correctness").

/// Events the job system reports to a [`TelemetrySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A `spawn_and_wait` fork/join changed the number of jobs in flight.
    /// Positive at fork, negative (by the same magnitude) at join.
    ConcurrencyDelta(i64),
    /// The approximate number of jobs waiting in the background queue,
    /// sampled on every background spawn and on every consumer entry.
    BackgroundQueueDepth(i64),
    /// A background consumer started or stopped.
    BackgroundConsumerStarted,
    BackgroundConsumerStopped,
    /// A user callable panicked; the job is treated as "do not re-enqueue".
    JobPanicked { job_id: String },
    /// A background consumer's release would have driven the running-count
    /// below zero; the counter saturated at its current value instead of
    /// underflowing (`spec.md` §7).
    BackgroundBudgetUnderflow,
}

/// A sink the job system reports to. Implementations must not block the
/// calling thread for any meaningful duration; `report` is called from
/// spawn, spawn-and-wait, and consumer hot paths.
pub trait TelemetrySink: Send + Sync {
    fn report(&self, event: TelemetryEvent);
}

/// Discards every event. The default sink, matching a `JobSystem` built
/// without an explicit `TelemetrySink` configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn report(&self, _event: TelemetryEvent) {}
}

/// Forwards events over a bounded `crossbeam_channel`, the way the teacher
/// forwards `EngineEvent` over a `tokio::sync::broadcast::Sender`. Unlike a
/// broadcast channel this has a single consumer; a full channel drops the
/// oldest-pending send rather than block, preserving "sink absence/backlog
/// must not alter correctness".
pub struct ChannelTelemetry {
    sender: crossbeam_channel::Sender<TelemetryEvent>,
}

impl ChannelTelemetry {
    /// Creates a sink/receiver pair with the given channel capacity.
    pub fn new(capacity: usize) -> (Self, crossbeam_channel::Receiver<TelemetryEvent>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn report(&self, event: TelemetryEvent) {
        // A full channel means nobody is draining telemetry fast enough;
        // drop the event rather than block the scheduler.
        let _ = self.sender.try_send(event);
    }
}
