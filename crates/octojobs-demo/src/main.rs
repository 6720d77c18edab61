mod cli;
mod workload;

use std::sync::Arc;
use std::thread;

use clap::Parser;
use octojobs_core::{ChannelTelemetry, JobSystemConfig, TaskSetFacade, TelemetryEvent};

use cli::{Backend, Cli};
use workload::SweepTotals;

fn print_totals(sweep: u32, totals: &SweepTotals) {
    use std::sync::atomic::Ordering::Relaxed;
    println!(
        "sweep {sweep}: cells={} vertices={} events={} cells_stored={} vertices_stored={} bg_ticks={}",
        totals.cells_loaded.load(Relaxed),
        totals.vertices_loaded.load(Relaxed),
        totals.events_triggered.load(Relaxed),
        totals.cells_stored.load(Relaxed),
        totals.vertices_stored.load(Relaxed),
        totals.background_ticks.load(Relaxed),
    );
}

fn spawn_telemetry_printer(
    receiver: crossbeam_channel::Receiver<TelemetryEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(event) = receiver.recv() {
            println!("telemetry: {event:?}");
        }
    })
}

fn run_thread_backend(cli: &Cli) -> anyhow::Result<()> {
    let (telemetry, telemetry_rx) = ChannelTelemetry::new(256);
    let printer = spawn_telemetry_printer(telemetry_rx);
    let config = JobSystemConfig {
        worker_count: cli.parallel as usize,
        max_concurrent_background_consumers: cli.max_background_consumers,
        telemetry: Arc::new(telemetry),
        ..Default::default()
    };
    let (system, handle) = octojobs_runtime_thread::start(config);
    let facade = TaskSetFacade::new(system.clone());

    let totals = Arc::new(SweepTotals::default());
    for sweep in 0..cli.sweeps {
        workload::run_sweep(&facade, &totals, cli.background_jobs_per_sweep)?;
        print_totals(sweep, &totals);
    }

    system.shutdown();
    drop(system);
    drop(facade);
    handle.join();
    drop(printer);
    Ok(())
}

fn run_serial_backend(cli: &Cli) -> anyhow::Result<()> {
    let (telemetry, telemetry_rx) = ChannelTelemetry::new(256);
    let printer = spawn_telemetry_printer(telemetry_rx);
    let config = JobSystemConfig {
        worker_count: 1,
        max_concurrent_background_consumers: cli.max_background_consumers,
        telemetry: Arc::new(telemetry),
        ..Default::default()
    };
    let system = octojobs_runtime_serial::start(config);
    let facade = TaskSetFacade::new(system.clone());

    let totals = Arc::new(SweepTotals::default());
    for sweep in 0..cli.sweeps {
        workload::run_sweep(&facade, &totals, cli.background_jobs_per_sweep)?;
        print_totals(sweep, &totals);
    }

    system.shutdown();
    drop(facade);
    drop(printer);
    Ok(())
}

async fn run_tokio_backend(cli: &Cli) -> anyhow::Result<()> {
    let (telemetry, telemetry_rx) = ChannelTelemetry::new(256);
    let printer = spawn_telemetry_printer(telemetry_rx);
    let config = JobSystemConfig {
        worker_count: cli.parallel as usize,
        max_concurrent_background_consumers: cli.max_background_consumers,
        telemetry: Arc::new(telemetry),
        ..Default::default()
    };
    let system = octojobs_runtime_tokio::start(config);
    let facade = TaskSetFacade::new(system.clone());

    let totals = Arc::new(SweepTotals::default());
    for sweep in 0..cli.sweeps {
        workload::run_sweep(&facade, &totals, cli.background_jobs_per_sweep)?;
        print_totals(sweep, &totals);
        // Let any still-draining spawn_blocking background consumers
        // settle before the next sweep's telemetry reads.
        tokio::task::yield_now().await;
    }

    system.shutdown();
    drop(facade);
    drop(printer);
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.backend {
        Backend::Thread => run_thread_backend(&cli),
        Backend::Serial => run_serial_backend(&cli),
        Backend::Tokio => run_tokio_backend(&cli).await,
    }
}
