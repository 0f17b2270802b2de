//! Cluster tick loop
//!
//! Drives the cluster at a fixed period and publishes each snapshot.
//! On cancellation the final odometer reading is persisted.

use crate::cluster::Cluster;
use crate::state::AppState;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main tick loop
pub async fn run(mut cluster: Cluster, state: AppState, cancel: CancellationToken) {
    let mut interval = time::interval(cluster.tick_period());
    // A late tick runs once; the sim doesn't try to catch up
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Tick loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let snapshot = cluster.tick();
                state.publish(snapshot).await;
            }
        }
    }

    cluster.shutdown();
    info!("Tick loop stopped after {} ticks", cluster.tick_count());
}
