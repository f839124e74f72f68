use crate::backend::{BackendService, MutationRequest};
use crate::db::{self, Pool};
use crate::events::{EventBus, QueueEvent};
use crate::model::{
    describe, ActionSummary, MutationKind, NewMutation, QueueState, ReplaySummary, ResourceKind,
};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// The only sanctioned entry and exit point for queue contents.
///
/// Construct one instance at the composition root and share it; the backing
/// store persists independently of the instance lifetime.
pub struct OfflineQueue {
    pool: Pool,
    backend: Arc<dyn BackendService>,
    events: EventBus,
    /// Held for the duration of a replay run so overlapping triggers cannot
    /// double-send records that are still awaiting removal.
    replay_guard: Mutex<()>,
}

impl OfflineQueue {
    pub fn new(pool: Pool, backend: Arc<dyn BackendService>, events: EventBus) -> Self {
        Self {
            pool,
            backend,
            events,
            replay_guard: Mutex::new(()),
        }
    }

    /// Store a mutation for later replay and announce it to the UI.
    ///
    /// The queue does not deduplicate: callers own idempotence at the call
    /// site, and rapid repeated edits become separate sequential records.
    #[instrument(skip_all)]
    pub async fn enqueue(&self, method: &str, url: &str, body: Option<Value>) -> Result<i64> {
        let new = NewMutation::new(method, url, body);
        let id = db::insert_mutation(&self.pool, &new).await?;

        let kind = MutationKind::classify(&new.method, &new.url);
        let resource = ResourceKind::classify(&new.url);
        let message = describe(kind, resource);
        info!(id, method = %new.method, url = %new.url, "queued offline mutation");
        self.events.emit(QueueEvent::ActionQueued {
            kind,
            resource,
            message,
        });
        Ok(id)
    }

    pub async fn has_pending_actions(&self) -> Result<bool> {
        db::has_pending(&self.pool).await
    }

    /// Full pending list enriched with display metadata, for the sync-review
    /// UI.
    pub async fn pending_actions(&self) -> Result<Vec<ActionSummary>> {
        let records = db::list_mutations(&self.pool).await?;
        Ok(records.iter().map(ActionSummary::from_mutation).collect())
    }

    pub async fn state(&self) -> Result<QueueState> {
        if self.replay_guard.try_lock().is_err() {
            return Ok(QueueState::Syncing);
        }
        Ok(if db::has_pending(&self.pool).await? {
            QueueState::Pending
        } else {
            QueueState::Idle
        })
    }

    /// Attempt delivery of every currently stored record, in enqueue order.
    ///
    /// Returns `None` when a replay is already in flight; the running pass
    /// covers every record this trigger could see. Records added during the
    /// run are picked up by the next trigger, not this one.
    #[instrument(skip_all)]
    pub async fn replay(&self) -> Result<Option<ReplaySummary>> {
        let Ok(_guard) = self.replay_guard.try_lock() else {
            info!("replay already in flight; skipping trigger");
            return Ok(None);
        };

        let snapshot = db::list_mutations(&self.pool).await?;
        let mut summary = ReplaySummary::default();
        for record in snapshot {
            let request = MutationRequest::from_queued(&record);
            match self.backend.send(&request).await {
                Ok(res) if res.is_success() => {
                    summary.success += 1;
                    if let Err(err) = db::delete_mutation(&self.pool, record.id).await {
                        // Delivered but still stored: the next replay resends
                        // it with the same idempotency key.
                        warn!(?err, id = record.id, "delivered but failed to remove from store");
                    } else {
                        info!(id = record.id, status = res.status, "queued mutation delivered");
                    }
                }
                Ok(res) => {
                    summary.failed += 1;
                    warn!(
                        id = record.id,
                        status = res.status,
                        "backend rejected queued mutation; will retry"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(id = record.id, error = %err, "transport failure; will retry");
                }
            }
        }

        self.events.emit(QueueEvent::SyncFinished { summary });
        Ok(Some(summary))
    }
}
