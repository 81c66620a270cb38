//! External image analysis API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::config::HttpSettings;
use crate::error::{AppError, AppResult};
use crate::models::AnalysisApiResponse;

/// Image submitted for analysis.
#[derive(Debug, Clone)]
pub struct AnalysisImage {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Posts an image to an item's analysis endpoint.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn post_image(
        &self,
        url: &str,
        auth_token: &str,
        master_image: &str,
        image: AnalysisImage,
    ) -> AppResult<AnalysisApiResponse>;
}

/// File name of an object key: the part after the last slash.
pub fn file_name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Statuses that are retried.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

/// Backoff before retry `attempt` (1-based): 1s, 2s, 4s...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(6))
}

/// reqwest based client with bounded timeouts and retries.
#[derive(Clone)]
pub struct HttpAnalysisApi {
    client: reqwest::Client,
    max_retry: u32,
}

impl HttpAnalysisApi {
    pub fn new(settings: &HttpSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(|e| AppError::ExternalApi(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retry: settings.max_retry,
        })
    }

    fn form(auth_token: &str, master_image: &str, image: &AnalysisImage) -> Form {
        Form::new()
            .text("masterImageName", master_image.to_string())
            .text("authentication", auth_token.to_string())
            .part(
                "testImage",
                Part::bytes(image.data.clone()).file_name(image.file_name.clone()),
            )
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn post_image(
        &self,
        url: &str,
        auth_token: &str,
        master_image: &str,
        image: AnalysisImage,
    ) -> AppResult<AnalysisApiResponse> {
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(url)
                .multipart(Self::form(auth_token, master_image, &image))
                .send()
                .await;

            let retry_reason = match result {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await.map_err(|e| {
                        AppError::ExternalApi(format!("Failed to read analysis response: {}", e))
                    })?;
                    debug!("Analysis API response: {}", body);
                    return serde_json::from_str(&body).map_err(|e| {
                        AppError::ExternalApi(format!("Invalid analysis response '{}': {}", body, e))
                    });
                }
                Ok(response) if is_retryable(response.status()) => {
                    format!("status {}", response.status())
                }
                Ok(response) => {
                    return Err(AppError::ExternalApi(format!(
                        "Analysis API returned {}",
                        response.status()
                    )));
                }
                Err(e) => e.to_string(),
            };

            attempt += 1;
            if attempt > self.max_retry {
                return Err(AppError::ExternalApi(format!(
                    "Analysis API failed after {} retries: {}",
                    self.max_retry, retry_reason
                )));
            }
            warn!(
                "Analysis API call failed ({}), retry {}/{}",
                retry_reason, attempt, self.max_retry
            );
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("trim/2024/plate.jpg"), "plate.jpg");
        assert_eq!(file_name_of("plate.jpg"), "plate.jpg");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::NOT_IMPLEMENTED));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
    }
}
