use std::time::Duration;
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{debug, error, info};

pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Start the background task that periodically removes expired sessions.
pub fn spawn_cleanup_job(store: SqliteStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            target: "cleanup",
            interval_secs = CLEANUP_INTERVAL.as_secs(),
            "starting session cleanup background task"
        );

        let mut ticker = interval(CLEANUP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_cleanup_cycle(&store).await;
        }
    })
}

async fn run_cleanup_cycle(store: &SqliteStore) {
    match store.delete_expired().await {
        Ok(()) => debug!(target: "cleanup", "expired sessions pruned"),
        Err(err) => error!(target: "cleanup", %err, "failed to prune expired sessions"),
    }
}
