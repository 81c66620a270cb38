//! Textract text detection.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_textract::Client;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::Document;

use crate::error::{AppError, AppResult};

/// One detected block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    /// `PAGE`, `LINE` or `WORD`
    pub block_type: String,
    pub text: Option<String>,
}

impl TextBlock {
    pub fn line(text: &str) -> Self {
        Self {
            block_type: LINE_BLOCK.to_string(),
            text: Some(text.to_string()),
        }
    }
}

/// Block type of a detected line.
pub const LINE_BLOCK: &str = "LINE";

/// Detects text in an image.
#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect_text(&self, image: Vec<u8>) -> AppResult<Vec<TextBlock>>;
}

/// Textract client wrapper.
#[derive(Clone)]
pub struct TextractDetector {
    client: Client,
}

impl TextractDetector {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl TextDetector for TextractDetector {
    async fn detect_text(&self, image: Vec<u8>) -> AppResult<Vec<TextBlock>> {
        let document = Document::builder().bytes(Blob::new(image)).build();

        let output = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await
            .map_err(|e| {
                AppError::TextDetection(format!(
                    "Failed to detect document text: {}",
                    e.into_service_error()
                ))
            })?;

        Ok(output
            .blocks()
            .iter()
            .map(|b| TextBlock {
                block_type: b
                    .block_type()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                text: b.text().map(str::to_string),
            })
            .collect())
    }
}
