/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API, Azure OpenAI deployments and LM Studio
 * - Anthropic: Anthropic API integration
 */

use std::fmt::Debug;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::error;
use reqwest::{Response, StatusCode};
use tokio::sync::Mutex;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the provider translator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Spaces requests to stay under a requests-per-minute budget
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `None` or zero disables limiting
    pub fn new(requests_per_minute: Option<u32>) -> Self {
        Self {
            interval: requests_per_minute
                .filter(|rpm| *rpm > 0)
                .map(|rpm| Duration::from_millis(60_000 / rpm as u64)),
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next request is allowed
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Map a transport failure
pub(crate) fn send_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, error))
    }
}

/// Map a non-success HTTP response
pub(crate) async fn status_error(provider: &str, response: Response) -> ProviderError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", provider, status, message);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// Whether retrying the same request can succeed
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::ConnectionError(_)
        | ProviderError::RequestFailed(_)
        | ProviderError::RateLimitExceeded(_) => true,
        ProviderError::ApiError { status_code, .. } => *status_code >= 500,
        ProviderError::ParseError(_) | ProviderError::AuthenticationError(_) => false,
    }
}

pub mod anthropic;
pub mod ollama;
pub mod openai;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isRetryable_shouldSeparateTransientFailures() {
        assert!(is_retryable(&ProviderError::RateLimitExceeded("slow".into())));
        assert!(is_retryable(&ProviderError::ApiError {
            status_code: 503,
            message: String::new()
        }));
        assert!(!is_retryable(&ProviderError::ApiError {
            status_code: 400,
            message: String::new()
        }));
        assert!(!is_retryable(&ProviderError::AuthenticationError("bad key".into())));
    }

    #[tokio::test]
    async fn test_rateLimiter_disabled_shouldNotWait() {
        let limiter = RateLimiter::new(Some(0));
        let started = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
