//! S3 object storage.
//!
//! Stored image paths are `"bucket/key"` strings; [`split_bucket_path`] and
//! [`join_bucket_path`] convert between the two forms.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Split a stored `"bucket/key"` path at the first slash.
///
/// A path without a slash is all bucket and an empty key.
pub fn split_bucket_path(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

pub fn join_bucket_path(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, key)
}

/// Object storage operations used by the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>>;

    /// Copy an object within a bucket, returning the new `"bucket/key"` path.
    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> AppResult<String>;

    async fn delete(&self, bucket: &str, key: &str) -> AppResult<()>;

    /// Store an object with its content type and user metadata.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<()>;

    /// Presigned GET URL valid for `expires`.
    async fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> AppResult<String>;
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    /// Create a client from the shared SDK configuration.
    ///
    /// Path-style addressing is forced when an endpoint override is set,
    /// which LocalStack and MinIO require.
    pub fn new(sdk_config: &SdkConfig, path_style: bool) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(path_style)
            .build();
        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

/// Percent-encode each segment of a key for the `x-amz-copy-source` header.
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", bucket, encoded.join("/"))
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn get(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to get s3://{}/{}: {}",
                    bucket,
                    key,
                    e.into_service_error()
                ))
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> AppResult<String> {
        debug!("Copying s3://{}/{} to {}", bucket, source_key, dest_key);
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to copy s3://{}/{} to {}: {}",
                    bucket,
                    source_key,
                    dest_key,
                    e.into_service_error()
                ))
            })?;

        Ok(join_bucket_path(bucket, dest_key))
    }

    async fn delete(&self, bucket: &str, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to delete s3://{}/{}: {}",
                    bucket,
                    key,
                    e.into_service_error()
                ))
            })?;

        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data));
        for (name, value) in metadata {
            request = request.metadata(*name, value);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file to S3: {}", e)))?;

        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(expires)
            .map_err(|e| AppError::Storage(format!("Invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to presign S3 URL: {}", e)))?;

        Ok(request.uri().to_string())
    }
}
