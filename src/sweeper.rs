/// Expired-session sweep
///
/// Best effort: expiry is already enforced at read time, the sweep only
/// reclaims rows. Failures are logged and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::store::SessionStore;

/// Shortest period the sweeper will tick at
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Delete every session past its expiry, returning how many were removed
pub async fn sweep_expired_sessions(sessions: &dyn SessionStore) -> Result<u64, AppError> {
    let removed = sessions.delete_expired().await?;
    if removed > 0 {
        tracing::info!(removed, "Expired sessions swept");
    } else {
        tracing::debug!("No expired sessions to sweep");
    }
    Ok(removed)
}

/// Run `sweep_expired_sessions` every `interval` until the runtime shuts down
///
/// Intervals below `MIN_SWEEP_INTERVAL` are raised to it.
pub fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired_sessions(sessions.as_ref()).await {
                tracing::error!(error = %e, "Session sweep failed");
            }
        }
    })
}
