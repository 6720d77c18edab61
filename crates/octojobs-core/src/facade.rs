//! The task-set façade (`spec.md` §4.G): a thin adapter translating
//! domain-level traversal-phase hints into `(class_id, kind)` pairs and
//! invoking the spawn/spawn-and-wait primitives on a [`JobSystem`].

use std::sync::Arc;

use crate::error::Result;
use crate::fork_join::SpawnAndWaitJob;
use crate::job::{Job, JobKind};
use crate::runtime::Runtime;
use crate::system::JobSystem;

/// A traversal phase, the caller-facing vocabulary the façade translates
/// into `(class_id, kind)` per the table in `spec.md` §4.G.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    LoadCells,
    LoadVertices,
    TriggerEvents,
    StoreCells,
    StoreVertices,
    RunAsSoonAsPossible,
    RunImmediately,
    Background,
    LongRunningBackground,
    PersistentBackground,
}

impl Phase {
    /// The class queue a `Job`-kind phase routes to. Meaningless (and
    /// unused) for task/background/immediate phases (`spec.md` §3).
    pub const fn class_id(self) -> i32 {
        match self {
            Phase::LoadCells => 1,
            Phase::LoadVertices => 2,
            Phase::TriggerEvents => 3,
            Phase::StoreCells => 4,
            Phase::StoreVertices => 5,
            Phase::RunAsSoonAsPossible => 0,
            Phase::RunImmediately
            | Phase::Background
            | Phase::LongRunningBackground
            | Phase::PersistentBackground => 0,
        }
    }

    pub const fn kind(self) -> JobKind {
        match self {
            Phase::LoadCells
            | Phase::LoadVertices
            | Phase::TriggerEvents
            | Phase::StoreCells
            | Phase::StoreVertices => JobKind::Job,
            Phase::RunAsSoonAsPossible => JobKind::Task,
            Phase::RunImmediately => JobKind::ProcessImmediately,
            Phase::Background => JobKind::Background,
            Phase::LongRunningBackground => JobKind::LongRunningBackground,
            Phase::PersistentBackground => JobKind::PersistentBackground,
        }
    }
}

/// Adapter around a [`JobSystem`] exposing phase-typed entry points instead
/// of raw `(class_id, kind)` pairs.
pub struct TaskSetFacade<R: Runtime> {
    system: Arc<JobSystem<R>>,
}

impl<R: Runtime> TaskSetFacade<R> {
    pub fn new(system: Arc<JobSystem<R>>) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &Arc<JobSystem<R>> {
        &self.system
    }

    /// Spawns `callable` classified by `phase`, per the table in
    /// `spec.md` §4.G.
    pub fn spawn_task(&self, phase: Phase, callable: impl FnMut() -> bool + Send + 'static) -> Result<()> {
        let job = Job::new(phase.kind(), phase.class_id(), callable);
        self.system.spawn(job)
    }

    /// Forks `jobs` (already phase-classified) and waits for all of them,
    /// per `spec.md` §4.F.
    pub fn spawn_and_wait(&self, jobs: Vec<SpawnAndWaitJob>, parallelise: bool) -> Result<()> {
        self.system.spawn_and_wait(jobs, parallelise)
    }

    fn wait_for_phase(&self, phase: Phase) {
        // Cooperative drain: keep processing this class until it is
        // observed empty. A sub-job that reschedules itself re-enters the
        // same loop, per `spec.md` §4.G ("may re-enter the drain loop if
        // sub-jobs re-enqueue themselves").
        while self.system.process_jobs(phase.class_id(), usize::MAX) {}
    }

    pub fn wait_for_load_cells(&self) {
        self.wait_for_phase(Phase::LoadCells);
    }

    pub fn wait_for_load_vertices(&self) {
        self.wait_for_phase(Phase::LoadVertices);
    }

    pub fn wait_for_events(&self) {
        self.wait_for_phase(Phase::TriggerEvents);
    }

    pub fn wait_for_store_cells(&self) {
        self.wait_for_phase(Phase::StoreCells);
    }

    pub fn wait_for_store_vertices(&self) {
        self.wait_for_phase(Phase::StoreVertices);
    }
}
