//! Periodic load → reconcile → schedule → save driver.
//!
//! The loop does not know about controllers or the scheduler; both are
//! handed in as capabilities so this crate sits below them in the graph.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use podgrid_state::ClusterState;

use crate::backend::StateBackend;
use crate::error::PersistResult;

/// An operation applied to the loaded state during one iteration.
pub type StateFn = Box<dyn Fn(&ClusterState) + Send + Sync>;

pub struct ControlLoop {
    backend: Box<dyn StateBackend>,
    reconcile: StateFn,
    schedule: StateFn,
}

impl ControlLoop {
    pub fn new(backend: Box<dyn StateBackend>, reconcile: StateFn, schedule: StateFn) -> Self {
        Self {
            backend,
            reconcile,
            schedule,
        }
    }

    pub fn backend(&self) -> &dyn StateBackend {
        self.backend.as_ref()
    }

    /// Run one full iteration and return the state that was saved.
    pub fn iterate(&self) -> PersistResult<ClusterState> {
        let state = self.backend.load()?;
        (self.reconcile)(&state);
        (self.schedule)(&state);
        self.backend.save(&state)?;
        debug!(
            backend = %self.backend.describe(),
            pods = state.pods().len(),
            "control loop iteration complete"
        );
        Ok(state)
    }

    /// Iterate every `interval` until `shutdown` flips or an iteration fails.
    ///
    /// The first iteration runs immediately. Returns the number of completed
    /// iterations. Errors are returned as-is; nothing is retried.
    pub async fn run(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> PersistResult<u64> {
        info!(
            interval_secs = interval.as_secs(),
            backend = %self.backend.describe(),
            "control loop started"
        );

        let mut iterations = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.iterate()?;
            iterations += 1;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(iterations, "control loop shutting down");
        Ok(iterations)
    }
}
