use std::path::Path;

use tokio::{
    select,
    signal::{
        ctrl_c,
        unix::{SignalKind, signal},
    },
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info};

use crate::{
    config_manager::{DaemonConfig, load_policy},
    devices_manager::{DiscoveryError, discover_sessions},
    errors::NvfandError,
    fan_curve::{HysteresisController, PolicyTable},
    fan_manager::FanManager,
    gpu_device::{GpuBackend, nvidia_device::NvidiaBackend},
};

// Discover the controllable GPUs and build the fan manager for them.
// Returns None when GPUs were found but none has controllable fans
pub fn prepare<B: GpuBackend>(
    backend: B,
    config: &DaemonConfig,
    table: PolicyTable,
) -> Result<Option<FanManager<B>>, DiscoveryError> {
    let sessions = discover_sessions(&backend)?;

    if sessions.is_empty() {
        return Ok(None);
    }

    let manager =
        FanManager::new(backend, HysteresisController::new(table), sessions)
            .with_restore_auto(config.restore_auto_on_exit);

    Ok(Some(manager))
}

// Run the daemon until SIGINT or SIGTERM is received
pub async fn run(config_path: &Path) -> Result<(), NvfandError> {
    let (config, table) = load_policy(config_path)?;

    let backend = NvidiaBackend::init()?;

    let Some(fan_manager) = prepare(backend, &config, table)? else {
        info!("No GPU with controllable fans was found. Exiting");
        return Ok(());
    };

    // This token and tracker will be used to handle graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let handle = tracker.spawn(fan_manager.run(token.clone()));

    let signal_result = wait_for_termination().await;

    // Cancel the token to communicate the program
    // termination to the running tasks
    token.cancel();

    // Wait for the tasks to finish
    tracker.close();
    tracker.wait().await;

    match handle.await {
        Ok(backend) => {
            if let Err(err) = backend.shutdown() {
                error!("Unable to shutdown NVML cleanly: {err}");
            }
        }
        Err(err) => error!("Fan manager task failed: {err}"),
    }

    signal_result?;

    info!("Shutdown complete");

    Ok(())
}

async fn wait_for_termination() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    select! {
        result = ctrl_c() => result?,
        _ = terminate.recv() => {},
    }

    info!("Termination requested");

    Ok(())
}
