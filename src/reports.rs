use crate::backend::{BackendService, MutationRequest, TransportError};
use crate::connectivity::{ConnectivityMonitor, NetState};
use crate::queue::OfflineQueue;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a mutating call made through the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend acknowledged the mutation.
    Delivered { status: u16 },
    /// The mutation was stored for replay.
    Queued { id: i64 },
}

/// Wraps the report endpoints so that a mutation attempted while offline, or
/// failing with a network-class error, is queued instead of surfacing a hard
/// error. A non-2xx response while online is a real API error and is
/// returned, not queued.
pub struct ReportsClient {
    backend: Arc<dyn BackendService>,
    queue: Arc<OfflineQueue>,
    connectivity: ConnectivityMonitor,
}

impl ReportsClient {
    pub fn new(
        backend: Arc<dyn BackendService>,
        queue: Arc<OfflineQueue>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        Self {
            backend,
            queue,
            connectivity,
        }
    }

    pub async fn submit(
        &self,
        method: &str,
        url: &str,
        body: Option<Value>,
    ) -> Result<MutationOutcome> {
        if self.connectivity.current() == NetState::Offline {
            let id = self.queue.enqueue(method, url, body).await?;
            return Ok(MutationOutcome::Queued { id });
        }

        let request = MutationRequest::new(method, url, body.clone());
        match self.backend.send(&request).await {
            Ok(res) if res.is_success() => Ok(MutationOutcome::Delivered { status: res.status }),
            Ok(res) => Err(anyhow!(
                "backend rejected {} {}: status {}",
                request.method,
                request.url,
                res.status
            )),
            Err(err @ (TransportError::Timeout | TransportError::Connect(_))) => {
                warn!(error = %err, method, url, "network failure; queueing for replay");
                let id = self.queue.enqueue(method, url, body).await?;
                Ok(MutationOutcome::Queued { id })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn create_daily_report(&self, report: Value) -> Result<MutationOutcome> {
        self.submit("POST", "/api/reports/daily/", Some(report)).await
    }

    pub async fn update_daily_report(&self, id: i64, report: Value) -> Result<MutationOutcome> {
        self.submit("PUT", &format!("/api/reports/daily/{id}/"), Some(report))
            .await
    }

    pub async fn create_weekly_report(&self, report: Value) -> Result<MutationOutcome> {
        self.submit("POST", "/api/reports/weekly/", Some(report)).await
    }

    pub async fn update_weekly_report(&self, id: i64, report: Value) -> Result<MutationOutcome> {
        self.submit("PUT", &format!("/api/reports/weekly/{id}/"), Some(report))
            .await
    }

    pub async fn create_general_report(&self, report: Value) -> Result<MutationOutcome> {
        self.submit("POST", "/api/reports/", Some(report)).await
    }

    /// Request an AI-assisted rewrite of a stored report.
    pub async fn enhance_report(&self, id: i64) -> Result<MutationOutcome> {
        self.submit("POST", &format!("/api/reports/{id}/enhance/"), None)
            .await
    }

    pub async fn delete_report(&self, id: i64) -> Result<MutationOutcome> {
        self.submit("DELETE", &format!("/api/reports/{id}/"), None).await
    }

    pub async fn update_profile(&self, profile: Value) -> Result<MutationOutcome> {
        self.submit("PUT", "/api/profile/", Some(profile)).await
    }
}
