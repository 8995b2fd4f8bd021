use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use podgrid_controller::reconcile_deployments;
use podgrid_persist::{ControlLoop, open_backend};
use podgrid_scheduler::schedule_pending_pods;
use podgrid_state::ClusterState;

use crate::config::PodgridConfig;

/// Run the control loop against the configured backend until Ctrl-C, or
/// for a single iteration with `once`.
pub async fn run(config: &PodgridConfig, interval_secs: Option<u64>, once: bool) -> anyhow::Result<String> {
    let backend = open_backend(config.state.backend, &config.state.path)?;
    let control = ControlLoop::new(
        backend,
        Box::new(|state: &ClusterState| {
            reconcile_deployments(state);
        }),
        Box::new(|state: &ClusterState| {
            schedule_pending_pods(state);
        }),
    );

    if once {
        let state = control.iterate()?;
        return Ok(format!(
            "Control loop iteration complete ({} pods, {} deployments)",
            state.pods().len(),
            state.deployments().len()
        ));
    }

    let interval = Duration::from_secs(interval_secs.unwrap_or(config.control_loop.interval_secs).max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let iterations = control.run(interval, shutdown_rx).await?;
    Ok(format!("Control loop stopped after {iterations} iterations"))
}
