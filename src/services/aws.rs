//! Shared AWS SDK configuration.

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

use crate::config::AwsSettings;

/// Load the SDK configuration shared by the S3, SQS and Textract clients.
///
/// Credentials come from the default provider chain.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(settings.connect_timeout)
                .build(),
        )
        .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts));

    // LocalStack or another emulator in development
    if let Some(ref endpoint) = settings.endpoint {
        info!("Using AWS endpoint override: {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}
