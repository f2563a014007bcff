//! Timeout and retry policy for calls to external model services

use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Bounded timeout per attempt plus exponential backoff between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Delay before the first retry; doubled on each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout: Duration::from_secs(60),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create from LLM configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            ..Default::default()
        }
    }

    /// Run `operation`, retrying retryable failures with exponential backoff
    ///
    /// Each attempt is bounded by `timeout`; an attempt that overruns fails
    /// with [`Error::Timeout`].
    pub async fn run<F, Fut, T>(&self, operation: &str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match timeout(self.timeout, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    operation: operation.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Turn a non-success provider response into an error
///
/// 4xx responses other than 429 become [`Error::Rejected`] and are not
/// retried; everything else goes through `transient`.
pub(crate) async fn status_error(
    operation: &str,
    response: Response,
    transient: fn(String) -> Error,
) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_status(operation, status, body, transient)
}

fn classify_status(
    operation: &str,
    status: StatusCode,
    body: String,
    transient: fn(String) -> Error,
) -> Error {
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        Error::Rejected {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: body,
        }
    } else {
        transient(format!("{} failed: HTTP {} - {}", operation, status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            timeout: Duration::from_millis(50),
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast_policy(2)
            .run("embed", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::embedding("flaky"))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = fast_policy(5)
            .run("generate", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::config("bad key"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out() {
        let err = fast_policy(0)
            .run("generate", || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_errors_are_rejected() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status("google embedding", status, "denied".into(), Error::Embedding);
            assert!(matches!(err, Error::Rejected { status: s, .. } if s == status.as_u16()));
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_throttling_and_server_errors_stay_transient() {
        let err = classify_status(
            "ollama generation",
            StatusCode::TOO_MANY_REQUESTS,
            "slow down".into(),
            Error::Llm,
        );
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.is_retryable());

        let err = classify_status(
            "ollama embedding",
            StatusCode::SERVICE_UNAVAILABLE,
            String::new(),
            Error::Embedding,
        );
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_rejected_request_is_attempted_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = fast_policy(3)
            .run("google generation", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(classify_status(
                    "google generation",
                    StatusCode::UNAUTHORIZED,
                    "API key not valid".into(),
                    Error::Llm,
                ))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Rejected { status: 401, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
