//! The 1 Hz tick source.

use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::handle::DispatcherHandle;

/// Spawn the monotonic 1 Hz tick task feeding the dispatcher.
///
/// Missed ticks are skipped, not bunched: after a stall the time engine
/// catches up through its `(last_tick, now]` crossing semantics rather than
/// through a burst of stale ticks.
pub fn spawn_tick_source(handle: DispatcherHandle, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    handle.inject_tick(Local::now().naive_local());
                },
            }
        }
    })
}
