//! Periodic background rebuilds.

use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::sleep;

use super::{BuildOutcome, IndexService};

/// Handle to a running auto-rebuild task.
///
/// Clones control the same task. Dropping every handle does not stop it;
/// call `stop` or destroy the service.
#[derive(Debug, Clone)]
pub struct AutoUpdateHandle {
    shutdown: Arc<watch::Sender<bool>>,
    task: AbortHandle,
}

impl AutoUpdateHandle {
    /// Signals the task to exit and aborts it if it is mid-build.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Spawns the rebuild loop on the current tokio runtime.
///
/// The interval is re-read from the service config before every wait, so
/// config updates apply from the next cycle. A zero interval ends the task.
/// The task only holds a weak reference and exits once the service is gone.
pub(super) fn spawn_auto_update(
    runtime: &tokio::runtime::Handle,
    service: Weak<IndexService>,
    root: String,
) -> AutoUpdateHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let join = runtime.spawn(async move {
        loop {
            let interval = match service.upgrade() {
                Some(service) => service.config().update_interval(),
                None => break,
            };
            let Some(interval) = interval else {
                log::info!("file index auto update disabled root={}", root);
                break;
            };

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
                _ = sleep(interval) => {}
            }

            let Some(service) = service.upgrade() else {
                break;
            };
            match service.build_index(Some(&root)).await {
                Ok(BuildOutcome::Completed(summary)) => log::info!(
                    "file index auto update root={} entries={} duration_ms={}",
                    root,
                    summary.entries,
                    summary.duration_ms
                ),
                Ok(BuildOutcome::AlreadyRunning) => {
                    log::debug!("file index auto update skipped root={}: build in progress", root)
                }
                Err(error) => log::warn!("file index auto update failed root={}: {}", root, error),
            }
        }
    });

    AutoUpdateHandle {
        shutdown: Arc::new(shutdown_tx),
        task: join.abort_handle(),
    }
}
