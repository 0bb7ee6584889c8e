//! Process entry point: CLI parsing, configuration loading, logging setup,
//! and wiring the reconciler loop to its input sources.
//!
//! The orchestrator's watch-API transport is an external collaborator
//! — this binary wires up the tick source and shutdown signal
//! that are fully in-repo; a real deployment plugs a
//! [`floor_scheduler::reconciler::ApiWatcher`] implementation in for the
//! schedule and autoscaler streams via [`floor_scheduler::reconciler::drive_stream`].

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use floor_scheduler::calendar::SystemClock;
use floor_scheduler::cli::Cli;
use floor_scheduler::config::AppConfig;
use floor_scheduler::patch::LoggingPatchClient;
use floor_scheduler::reconciler::{run_ticker, FatalLoopError, Reconciler, StopReason};

/// Grace window the reconciler gets to drain pending events after a
/// shutdown signal before it is forcibly aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    floor_scheduler::logging::init(cli.log_format);

    let config = match AppConfig::load(cli.config.as_deref(), &cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "fatal configuration error at startup");
            return ExitCode::from(1);
        }
    };

    info!(timezone = %config.policy_timezone, "floor-scheduler starting");

    let clock = Arc::new(SystemClock::new(config.policy_timezone));
    let patch_client = Arc::new(LoggingPatchClient);
    let reconciler = Reconciler::new(clock, patch_client, config.reconciler.clone());

    let (tx, rx) = mpsc::channel(config.reconciler.channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ticker = tokio::spawn(run_ticker(
        tx.clone(),
        config.reconciler.tick_interval,
        shutdown_rx,
    ));
    // Drop our own sender; once the ticker task (the only remaining
    // sender) exits on shutdown, the channel closes and the reconciler
    // drains to completion.
    drop(tx);

    let mut reconciler_task = tokio::spawn(reconciler.run(rx));

    let exit_code = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!(grace = ?SHUTDOWN_GRACE, "shutdown signal received, draining input queue");
            let _ = shutdown_tx.send(true);
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut reconciler_task).await {
                Ok(join_result) => exit_code_for(join_result),
                Err(_elapsed) => {
                    error!("reconciler did not drain within grace window, aborting");
                    reconciler_task.abort();
                    ExitCode::from(1)
                }
            }
        }
        join_result = &mut reconciler_task => exit_code_for(join_result),
    };

    let _ = ticker.await;
    exit_code
}

fn exit_code_for(
    join_result: Result<Result<StopReason, FatalLoopError>, tokio::task::JoinError>,
) -> ExitCode {
    match join_result {
        Ok(Ok(StopReason::Shutdown)) => ExitCode::SUCCESS,
        Ok(Err(FatalLoopError::PersistentStreamFailure(d))) => {
            error!(silent_for = ?d, "persistent stream failure, both streams down");
            ExitCode::from(2)
        }
        Err(join_err) => {
            error!(error = %join_err, "reconciler task ended unexpectedly");
            ExitCode::from(1)
        }
    }
}
