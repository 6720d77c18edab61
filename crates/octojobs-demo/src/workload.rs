//! A toy space-tree-traversal-shaped workload exercising every façade entry
//! point, the way `bbr-client` exercises `bbr-client-engine` end to end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use octojobs_core::{JobKind, Phase, Runtime, SpawnAndWaitJob, TaskSetFacade};

/// Running totals updated by the workload, printed at the end of each
/// sweep.
#[derive(Default)]
pub struct SweepTotals {
    pub cells_loaded: AtomicU64,
    pub vertices_loaded: AtomicU64,
    pub events_triggered: AtomicU64,
    pub cells_stored: AtomicU64,
    pub vertices_stored: AtomicU64,
    pub background_ticks: AtomicU64,
}

/// Runs one traversal sweep: load phases, a cross-class dependent pair via
/// `spawn_and_wait`, trigger-events, store phases, then a batch of
/// background housekeeping jobs.
pub fn run_sweep<R: Runtime>(
    facade: &TaskSetFacade<R>,
    totals: &Arc<SweepTotals>,
    background_jobs: u32,
) -> anyhow::Result<()> {
    for _ in 0..8 {
        let totals = Arc::clone(totals);
        facade.spawn_task(Phase::LoadCells, move || {
            totals.cells_loaded.fetch_add(1, Ordering::Relaxed);
            false
        })?;
    }
    for _ in 0..8 {
        let totals = Arc::clone(totals);
        facade.spawn_task(Phase::LoadVertices, move || {
            totals.vertices_loaded.fetch_add(1, Ordering::Relaxed);
            false
        })?;
    }
    facade.wait_for_load_cells();
    facade.wait_for_load_vertices();

    // Cross-class dependency (`spec.md` §8 scenario 3): a producer in
    // class `LoadCells` and a consumer in class `TriggerEvents`, forked
    // together so the drain loop cannot deadlock regardless of worker
    // count.
    let (tx, rx) = crossbeam_channel::bounded::<u64>(1);
    let totals_producer = Arc::clone(totals);
    let totals_consumer = Arc::clone(totals);
    facade.spawn_and_wait(
        vec![
            SpawnAndWaitJob::new(JobKind::Job, Phase::LoadCells.class_id(), move || {
                totals_producer.cells_loaded.fetch_add(1, Ordering::Relaxed);
                let _ = tx.send(1);
                false
            }),
            SpawnAndWaitJob::new(JobKind::Job, Phase::TriggerEvents.class_id(), move || {
                if let Ok(n) = rx.recv() {
                    totals_consumer
                        .events_triggered
                        .fetch_add(n, Ordering::Relaxed);
                }
                false
            }),
        ],
        true,
    )?;

    for _ in 0..8 {
        let totals = Arc::clone(totals);
        facade.spawn_task(Phase::TriggerEvents, move || {
            totals.events_triggered.fetch_add(1, Ordering::Relaxed);
            false
        })?;
    }
    facade.wait_for_events();

    for _ in 0..8 {
        let totals = Arc::clone(totals);
        facade.spawn_task(Phase::StoreCells, move || {
            totals.cells_stored.fetch_add(1, Ordering::Relaxed);
            false
        })?;
    }
    for _ in 0..8 {
        let totals = Arc::clone(totals);
        facade.spawn_task(Phase::StoreVertices, move || {
            totals.vertices_stored.fetch_add(1, Ordering::Relaxed);
            false
        })?;
    }
    facade.wait_for_store_cells();
    facade.wait_for_store_vertices();

    for _ in 0..background_jobs {
        let totals = Arc::clone(totals);
        facade.spawn_task(Phase::Background, move || {
            totals.background_ticks.fetch_add(1, Ordering::Relaxed);
            false
        })?;
    }

    Ok(())
}
