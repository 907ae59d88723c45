//! Background removal of expired refresh sessions.
//!
//! Expiry is already enforced lazily at refresh time; the sweeper only keeps
//! the store from accumulating dead records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use learnhub_auth::{SessionStore, StoreError};
use learnhub_core::Clock;

/// Delete every record past its expiry, returning how many were removed.
pub async fn sweep_once<S>(store: &S, clock: &dyn Clock) -> Result<u64, StoreError>
where
    S: SessionStore + ?Sized,
{
    let removed = store.delete_expired(clock.now()).await?;
    if removed > 0 {
        info!(removed, "swept expired sessions");
    } else {
        debug!("no expired sessions");
    }
    Ok(removed)
}

/// Handle for a running sweeper (shutdown hook).
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

/// Spawn a tokio task that sweeps every `interval`.
///
/// Failures are logged and the loop keeps going.
pub fn spawn_session_sweeper<S>(
    store: S,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> SweeperHandle
where
    S: SessionStore + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "session sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sweep_once(&store, clock.as_ref()).await {
                        error!(error = %e, "session sweep failed");
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
        info!("session sweeper stopped");
    });

    SweeperHandle {
        shutdown: shutdown_tx,
        join,
    }
}
