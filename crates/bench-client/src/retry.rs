//! Retry wrapper around an inference client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use bench_core::InputTensor;

use crate::client::{InferenceClient, InferenceError, InferenceResult};

/// Retries transient failures with a fixed backoff. Non-retryable errors
/// (malformed responses, missing output tensors) are returned immediately.
pub struct RetryClient<C> {
    inner: C,
    attempts: u32,
    backoff: Duration,
}

impl<C> RetryClient<C> {
    pub fn new(inner: C, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

#[async_trait]
impl<C: InferenceClient> InferenceClient for RetryClient<C> {
    async fn infer(&self, tensor: &InputTensor) -> Result<InferenceResult, InferenceError> {
        let mut attempt = 0;
        loop {
            match self.inner.infer(tensor).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt + 1 < self.attempts => {
                    attempt += 1;
                    warn!(attempt, error = %err, "inference failed, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyClient {
        calls: AtomicU32,
        fail_first: u32,
        retryable: bool,
    }

    #[async_trait]
    impl InferenceClient for FlakyClient {
        async fn infer(&self, _tensor: &InputTensor) -> Result<InferenceResult, InferenceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                if self.retryable {
                    Err(InferenceError::NonSuccessStatus {
                        status: 503,
                        body: String::new(),
                    })
                } else {
                    Err(InferenceError::OutputNotFound)
                }
            } else {
                Ok(InferenceResult {
                    ranked: vec![0],
                    values: vec![1.0],
                    latency: Duration::from_millis(1),
                })
            }
        }
    }

    fn tensor() -> InputTensor {
        InputTensor::new(vec![1, 1], vec![0.0])
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let client = RetryClient::new(
            FlakyClient {
                calls: AtomicU32::new(0),
                fail_first: 2,
                retryable: true,
            },
            3,
            Duration::from_millis(1),
        );
        let result = client.infer(&tensor()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let inner = FlakyClient {
            calls: AtomicU32::new(0),
            fail_first: 10,
            retryable: true,
        };
        let client = RetryClient::new(inner, 3, Duration::from_millis(1));
        let result = client.infer(&tensor()).await;
        assert!(result.is_err());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let inner = FlakyClient {
            calls: AtomicU32::new(0),
            fail_first: 10,
            retryable: false,
        };
        let client = RetryClient::new(inner, 3, Duration::from_millis(1));
        let result = client.infer(&tensor()).await;
        assert!(matches!(result, Err(InferenceError::OutputNotFound)));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }
}
