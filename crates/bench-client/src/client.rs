//! HTTP inference client for a KServe v2 endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use bench_core::{config::EndpointConfig, Error, InputTensor};

use crate::wire::{find_output, rank_outputs, InferRequest, InferResponse};

/// Outcome of a single successful inference call
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// Class indices ranked best-first, at most `top_k` long
    pub ranked: Vec<usize>,
    /// Raw output values for the scored batch row
    pub values: Vec<f32>,
    /// Wall-clock time from request send to full response body received
    pub latency: Duration,
}

/// Failure modes of a single inference call
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("server returned status {status}: {body}")]
    NonSuccessStatus { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("no recognized output tensor in response")]
    OutputNotFound,
}

impl InferenceError {
    /// Whether a retry might succeed. Malformed payloads and missing
    /// output tensors are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::Unreachable(_) | InferenceError::NonSuccessStatus { .. }
        )
    }
}

/// A classifier endpoint that scores one preprocessed tensor at a time.
///
/// Implementations perform exactly one attempt per call; retry policy
/// lives in wrappers like [`crate::RetryClient`].
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn infer(&self, tensor: &InputTensor) -> Result<InferenceResult, InferenceError>;
}

/// KServe v2 JSON client over reqwest
pub struct HttpInferenceClient {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
    input_name: String,
    top_k: usize,
}

impl HttpInferenceClient {
    pub fn new(config: &EndpointConfig) -> bench_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            input_name: config.input_name.clone(),
            top_k: config.top_k,
        })
    }

    fn infer_url(&self) -> String {
        format!("{}/v2/models/{}/infer", self.base_url, self.model_name)
    }

    /// Probes the server readiness endpoint. An `Err` means the server is
    /// unreachable; `Ok(false)` means it answered but is not ready.
    pub async fn ready(&self) -> Result<bool, InferenceError> {
        let url = format!("{}/v2/health/ready", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(InferenceError::Unreachable)?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn infer(&self, tensor: &InputTensor) -> Result<InferenceResult, InferenceError> {
        let request = InferRequest::from_tensor(&self.input_name, tensor);
        let url = self.infer_url();

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(InferenceError::Unreachable)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(InferenceError::Unreachable)?;
        // Latency covers the full exchange including body transfer.
        let latency = start.elapsed();

        if !status.is_success() {
            return Err(InferenceError::NonSuccessStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(256).collect(),
            });
        }

        let parsed: InferResponse = serde_json::from_slice(&body)
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        let output = find_output(&parsed).ok_or(InferenceError::OutputNotFound)?;
        let row = output.batch_row(0).ok_or_else(|| {
            InferenceError::MalformedResponse(format!(
                "output '{}' data length {} does not match shape {:?}",
                output.name,
                output.data.len(),
                output.shape
            ))
        })?;

        let ranked = rank_outputs(row, self.top_k);
        debug!(latency_ms = latency.as_millis() as u64, top1 = ?ranked.first(), "inference complete");

        Ok(InferenceResult {
            ranked,
            values: row.to_vec(),
            latency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_url_trims_trailing_slash() {
        let config = EndpointConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..Default::default()
        };
        let client = HttpInferenceClient::new(&config).unwrap();
        assert_eq!(
            client.infer_url(),
            format!("http://localhost:8000/v2/models/{}/infer", config.model_name)
        );
    }

    #[test]
    fn test_retryable_classification() {
        let err = InferenceError::NonSuccessStatus {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_retryable());
        assert!(!InferenceError::OutputNotFound.is_retryable());
        assert!(!InferenceError::MalformedResponse("bad".to_string()).is_retryable());
    }
}
