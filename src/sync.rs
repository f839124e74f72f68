use crate::connectivity::{ConnectivityMonitor, NetState};
use crate::db::{self, Pool};
use crate::events::{EventBus, QueueEvent};
use crate::queue::OfflineQueue;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Settings key for the persisted "don't ask again" decision. Suppresses
/// only the startup sync-review prompt, never automatic or manual replay.
pub const PROMPT_SUPPRESSED_KEY: &str = "sync.prompt_suppressed";

/// Drives the pending-queue lifecycle: announces pending work at startup and
/// replays the queue on every offline-to-online transition.
pub struct SyncAgent {
    pool: Pool,
    queue: Arc<OfflineQueue>,
    connectivity: ConnectivityMonitor,
    events: EventBus,
}

impl SyncAgent {
    pub fn new(
        pool: Pool,
        queue: Arc<OfflineQueue>,
        connectivity: ConnectivityMonitor,
        events: EventBus,
    ) -> Self {
        Self {
            pool,
            queue,
            connectivity,
            events,
        }
    }

    /// Emit the startup sync-review prompt when pending work exists and the
    /// user has not opted out.
    pub async fn announce_pending(&self) -> Result<()> {
        if !self.queue.has_pending_actions().await? {
            return Ok(());
        }
        if db::get_flag(&self.pool, PROMPT_SUPPRESSED_KEY).await? {
            info!("pending actions present; sync prompt suppressed by preference");
            return Ok(());
        }
        let actions = self.queue.pending_actions().await?;
        self.events.emit(QueueEvent::SyncAvailable { actions });
        Ok(())
    }

    /// Run until every connectivity handle is dropped. Replay failures are
    /// reported and retried on the next transition, never fatal.
    pub async fn run(mut self) -> Result<()> {
        self.announce_pending().await?;
        loop {
            let state = match self.connectivity.changed().await {
                Ok(state) => state,
                Err(_) => {
                    info!("connectivity source closed; sync agent stopping");
                    return Ok(());
                }
            };
            match state {
                NetState::Online => {
                    info!("connection restored");
                    self.events.emit(QueueEvent::ConnectionRestored);
                    match self.queue.replay().await {
                        Ok(Some(summary)) if summary.is_clean() => {
                            info!(success = summary.success, "sync complete");
                        }
                        Ok(Some(summary)) => {
                            warn!(
                                success = summary.success,
                                failed = summary.failed,
                                "partial sync; failed actions will be retried"
                            );
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(?err, "replay failed; queued actions retained");
                        }
                    }
                }
                NetState::Offline => {
                    info!("connection lost; new actions will be queued locally");
                    self.events.emit(QueueEvent::ConnectionLost);
                }
            }
        }
    }
}
