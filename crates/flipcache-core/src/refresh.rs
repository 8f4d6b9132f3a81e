//! Background refresh of the project list.
//!
//! The loop re-runs [`SyncOrchestrator::load_projects`] on a fixed interval
//! and whenever the UI becomes visible again. Both paths go through the
//! cache, so a tick shortly after a fresh load costs nothing until the TTL
//! runs out. Ticks are skipped while the UI is hidden.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::ProjectViewModel;
use crate::sync::SyncOrchestrator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// What woke the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Tick,
    BecameVisible,
}

/// Outcome of one refresh run.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Projects(Vec<ProjectViewModel>),
    Error(SyncError),
}

/// Spawn the refresh loop. It exits when `shutdown` turns true (or its
/// sender is dropped) or when nobody listens to `events` any more, and
/// returns the number of refresh runs.
pub fn spawn_refresh_loop(
    orchestrator: SyncOrchestrator,
    period: Duration,
    mut visibility: watch::Receiver<Visibility>,
    mut shutdown: watch::Receiver<bool>,
    events: mpsc::Sender<RefreshEvent>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut runs: u64 = 0;
        let mut watch_visibility = true;

        info!(period_secs = period.as_secs_f64(), "Refresh loop started");

        loop {
            let trigger = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    None
                }
                changed = visibility.changed(), if watch_visibility => match changed {
                    Ok(()) => {
                        let now = *visibility.borrow_and_update();
                        debug!(visibility = ?now, "Visibility changed");
                        (now == Visibility::Visible).then_some(Trigger::BecameVisible)
                    }
                    Err(_) => {
                        watch_visibility = false;
                        None
                    }
                },
                _ = ticker.tick() => {
                    // A change seen here is served by this run.
                    let now = *visibility.borrow_and_update();
                    (now == Visibility::Visible).then_some(Trigger::Tick)
                }
            };

            let Some(trigger) = trigger else {
                continue;
            };

            runs += 1;
            let purged = orchestrator.cache().purge_expired();
            if purged > 0 {
                debug!(purged, "Dropped expired cache entries");
            }
            let event = match orchestrator.load_projects().await {
                Ok(projects) => RefreshEvent::Projects(projects),
                Err(e) => {
                    warn!(error = %e, "Refresh failed");
                    RefreshEvent::Error(e)
                }
            };
            // The next periodic run counts from this one.
            if trigger == Trigger::BecameVisible {
                ticker.reset();
            }
            if events.send(event).await.is_err() {
                debug!("Refresh listener gone");
                break;
            }
        }

        info!(runs, "Refresh loop stopped");
        runs
    })
}
