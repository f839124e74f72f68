use async_trait::async_trait;
use logbook_sync::backend::{BackendResponse, BackendService, MutationRequest, TransportError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SentCall {
    pub method: String,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// Scripted transport double: pops one response per call and records every
/// call in order. Runs of the script default to 200.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    responses: Arc<Mutex<VecDeque<Result<BackendResponse, TransportError>>>>,
    calls: Arc<Mutex<Vec<SentCall>>>,
}

impl RecordingBackend {
    pub fn with_responses(responses: Vec<Result<BackendResponse, TransportError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl BackendService for RecordingBackend {
    async fn send(&self, req: &MutationRequest) -> Result<BackendResponse, TransportError> {
        self.calls.lock().await.push(SentCall {
            method: req.method.clone(),
            url: req.url.clone(),
            body: req.body.clone(),
        });
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(BackendResponse { status: 200 }))
    }
}

pub fn status(code: u16) -> Result<BackendResponse, TransportError> {
    Ok(BackendResponse { status: code })
}

pub async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
