use crate::config::Config;
use crate::model::QueuedMutation;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// One mutation to deliver: the fetch-shaped slice of an HTTP request the
/// queue knows how to persist and resend.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub method: String,
    pub url: String,
    pub body: Option<Value>,
    pub idempotency_key: Uuid,
}

impl MutationRequest {
    pub fn new(method: &str, url: &str, body: Option<Value>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            body,
            idempotency_key: Uuid::new_v4(),
        }
    }

    pub fn from_queued(record: &QueuedMutation) -> Self {
        Self {
            method: record.method.clone(),
            url: record.url.clone(),
            body: record.body.clone(),
            idempotency_key: record.client_ref,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackendResponse {
    pub status: u16,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-class failures. A response that arrived, whatever its status, is
/// not a transport error.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("malformed request: {0}")]
    Build(String),
}

#[async_trait]
pub trait BackendService: Send + Sync {
    async fn send(&self, req: &MutationRequest) -> Result<BackendResponse, TransportError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("logbook-sync/0.1")
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.api_base()).context("invalid api.base_url")?;
        Ok(Self::new(
            base_url,
            cfg.api.token.clone(),
            cfg.request_timeout(),
        ))
    }

    pub fn build_request(&self, req: &MutationRequest) -> Result<reqwest::Request, TransportError> {
        let method = Method::from_bytes(req.method.as_bytes())
            .map_err(|err| TransportError::Build(err.to_string()))?;
        let endpoint = self
            .base_url
            .join(req.url.trim_start_matches('/'))
            .map_err(|err| TransportError::Build(err.to_string()))?;

        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Content-Type", "application/json")
            .header("Idempotency-Key", req.idempotency_key.to_string());
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        builder
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))
    }
}

#[async_trait]
impl BackendService for HttpBackend {
    async fn send(&self, req: &MutationRequest) -> Result<BackendResponse, TransportError> {
        let request = self.build_request(req)?;
        debug!(method = %req.method, url = %request.url(), "dispatching mutation");
        match self.http.execute(request).await {
            Ok(res) => Ok(BackendResponse {
                status: res.status().as_u16(),
            }),
            Err(err) if err.is_timeout() => Err(TransportError::Timeout),
            Err(err) => Err(TransportError::Connect(err.to_string())),
        }
    }
}
