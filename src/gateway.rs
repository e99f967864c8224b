//! Outbound leg of the relay: one POST to the prediction service per call.
//!
//! The gateway never looks inside the response. It hands back the decoded
//! body or a typed failure so transport problems stay distinguishable from
//! a malformed prediction.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::types::ConditionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Transport,
    UpstreamStatus,
    /// The service answered 2xx but put an `error` in the body.
    Upstream,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("prediction service timed out after {0} ms")]
    Timeout(u64),
    #[error("prediction service unreachable: {0}")]
    Transport(String),
    #[error("prediction service responded with status {status}")]
    Upstream { status: u16, body: Option<Value> },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Timeout(_) => ErrorKind::Timeout,
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::Upstream { .. } => ErrorKind::UpstreamStatus,
        }
    }

    /// Error payload for the caller. An upstream body is passed through as-is.
    pub fn detail(&self) -> Value {
        match self {
            GatewayError::Upstream {
                body: Some(body), ..
            } => body.clone(),
            other => json!(other.to_string()),
        }
    }
}

/// Anything that can turn a condition record into a raw prediction body.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, request: &ConditionRequest) -> Result<Value, GatewayError>;
}

pub struct PredictionGateway {
    client: Client,
    url: String,
    timeout_ms: u64,
}

impl PredictionGateway {
    pub fn new(cfg: &RelayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: cfg.predict_url(),
            timeout_ms: cfg.timeout_ms,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forwards `body` unchanged and returns the decoded response body.
    pub async fn forward<T: Serialize + ?Sized>(&self, body: &T) -> Result<Value, GatewayError> {
        debug!("forwarding to {}", self.url);

        let resp = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            warn!("predict error: upstream status {}", status);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body: decode_body(&text),
            });
        }

        // A 2xx body that is not JSON is a malformed prediction, not a
        // transport failure. It is handed on as text (or null when empty).
        Ok(decode_body(&text).unwrap_or(Value::Null))
    }

    fn classify(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            warn!("predict error: timeout after {} ms", self.timeout_ms);
            GatewayError::Timeout(self.timeout_ms)
        } else {
            warn!("predict error: {}", e);
            GatewayError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl PredictionBackend for PredictionGateway {
    async fn predict(&self, request: &ConditionRequest) -> Result<Value, GatewayError> {
        self.forward(request).await
    }
}

fn decode_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
