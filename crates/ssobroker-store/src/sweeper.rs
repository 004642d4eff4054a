use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::traits::SessionStore;

/// `tokio::time::interval` panics on a zero period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Start the background expiry sweep.
///
/// Calls [`SessionStore::purge_expired`] every `every` until `shutdown` is
/// cancelled. The sweep only reclaims memory; reads never depend on it.
pub fn spawn_sweeper(
    store: Arc<dyn SessionStore>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let every = every.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        tracing::debug!(interval_ms = every.as_millis() as u64, "Session sweeper started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => match store.purge_expired().await {
                    Ok(purged) if purged > 0 => {
                        tracing::debug!(purged = purged, "Purged expired session entries");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Session sweep failed");
                    }
                },
            }
        }

        tracing::debug!("Session sweeper stopped");
    })
}
