//! Analysis kinds, verdicts and the analysis request payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::{Validate, check_len};
use crate::error::ValidationError;

/// File name segment the client uses for the verdict before analysis.
pub const RESULT_MARKER: &str = "AI判定結果";

/// File name segment the client uses for the NG comment before analysis.
pub const COMMENT_MARKER: &str = "NGコメント";

/// Verdict and comment segments as they appear together in a fresh upload.
pub const RESULT_COMMENT_MARKER: &str = "AI判定結果_NGコメント";

/// Analysis performed for an inspection item, taken from its item master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    /// Text detection of the model and serial number plate.
    Ocr,
    /// Image classification by the external analysis API.
    Ai,
    /// No automated analysis.
    Other,
}

impl AnalysisType {
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Ocr => 1,
            Self::Ai => 2,
            Self::Other => 3,
        }
    }

    /// Unknown codes fall back to `Other`.
    pub fn from_i16(value: i16) -> Self {
        match value {
            1 => Self::Ocr,
            2 => Self::Ai,
            _ => Self::Other,
        }
    }

    /// Analysis type of an item given its optional master code.
    pub fn from_master(code: Option<i16>) -> Self {
        code.map(Self::from_i16).unwrap_or(Self::Other)
    }
}

/// Normalized AI analysis verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiVerdict {
    Ok,
    Ng,
    Failed,
}

impl AiVerdict {
    /// Numeric code used by the analysis API and the image linkage export.
    pub fn code(&self) -> i16 {
        match self {
            Self::Ok => 0,
            Self::Ng => 1,
            Self::Failed => -1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Ng),
            -1 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Label stored in `ai_result` and substituted into storage paths.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Ng => "NG",
            Self::Failed => "解析失敗",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "OK" => Some(Self::Ok),
            "NG" => Some(Self::Ng),
            "解析失敗" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Status reported by the external analysis API.
pub const AI_STATUS_SUCCESS: i32 = 1;

/// Raw response of the external analysis API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisApiResponse {
    pub status: i32,
    pub value: String,
}

impl AnalysisApiResponse {
    /// Response used when the API could not be reached.
    pub fn failed() -> Self {
        Self {
            status: 0,
            value: "-1,".to_string(),
        }
    }
}

/// Begin-analysis request body, also forwarded verbatim as the queue message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalysisRequest {
    pub inspection_id: i64,
    pub inspection_item_id: i64,
    pub bucket_name: String,
    /// Key of the uploaded image containing the result and comment markers.
    pub original_image_path: String,
    /// Key of the cropped image the analysis runs on.
    pub trimming_image_path: String,
}

impl Validate for AnalysisRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_len("originalImagePath", &self.original_image_path, 1, 300)?;
        check_len("trimmingImagePath", &self.trimming_image_path, 1, 300)?;
        Ok(())
    }
}

/// Begin-analysis response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisAccepted {
    pub inspection_id: i64,
    pub inspection_item_id: i64,
    #[schema(value_type = i16)]
    pub progress: super::Progress,
    pub version: i64,
}
