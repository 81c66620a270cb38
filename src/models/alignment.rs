//! Image linkage export DTOs.
//!
//! Field names follow the external system's upper-case wire format.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::Validate;
use crate::error::ValidationError;

/// Most items exported in one call; the inspection that crosses it is left for the next call.
pub const MAX_ALIGNMENT_ITEMS: usize = 20;

/// Send count saturates here.
pub const MAX_SEND_COUNT: i16 = 9;

/// Largest worksheet number accepted.
pub const MAX_WORKSHEET_NO: u64 = 9_999_999_999;

/// Request body of the image linkage export.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AlignmentRequest {
    pub request: AlignmentRequestBody,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AlignmentRequestBody {
    pub common_head: AlignmentCommonHead,
    #[serde(default)]
    pub gyomu_body: Option<AlignmentWorksheet>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AlignmentCommonHead {
    /// 0 exports every unsent inspection, 1 exports one worksheet.
    #[serde(rename = "STATUS")]
    pub status: u8,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AlignmentWorksheet {
    #[serde(rename = "WSHEETNO")]
    pub worksheet_no: u64,
}

/// What an alignment request selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentSelection {
    /// Every unsent exportable inspection; marks them sent.
    Unsent,
    /// Inspections of one worksheet code; send bookkeeping untouched.
    Worksheet(String),
}

impl AlignmentRequest {
    pub fn selection(&self) -> Result<AlignmentSelection, ValidationError> {
        match self.request.common_head.status {
            0 => Ok(AlignmentSelection::Unsent),
            1 => {
                let body = self.request.gyomu_body.as_ref().ok_or_else(|| {
                    ValidationError::MissingRequired("gyomu_body".to_string())
                })?;
                Ok(AlignmentSelection::Worksheet(format!(
                    "{:010}",
                    body.worksheet_no
                )))
            }
            other => Err(ValidationError::OutOfRange(format!("STATUS: {}", other))),
        }
    }
}

impl Validate for AlignmentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(body) = &self.request.gyomu_body
            && body.worksheet_no > MAX_WORKSHEET_NO
        {
            return Err(ValidationError::OutOfRange(format!(
                "WSHEETNO: {}",
                body.worksheet_no
            )));
        }
        self.selection()?;
        Ok(())
    }
}

/// One exported inspection.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AlignmentRecord {
    #[serde(rename = "KAISHACD")]
    pub company_code: String,
    #[serde(rename = "WSHEETNO")]
    pub worksheet_code: String,
    #[serde(rename = "UUKAKUTEIDATE")]
    pub receipt_confirmation_date: i32,
    #[serde(rename = "EVIDENCENM")]
    pub inspection_name: String,
    #[serde(rename = "EVIDENCEPT")]
    pub evidence_id: Option<i16>,
    #[serde(rename = "SENDCOUNT")]
    pub send_count: i16,
    #[serde(rename = "SHOOTCNT")]
    pub shoot_count: usize,
    pub shoot_list: Vec<AlignmentShot>,
}

/// One exported image.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AlignmentShot {
    /// 1-based position within the inspection.
    #[serde(rename = "SHOOTNO")]
    pub shoot_no: usize,
    #[serde(rename = "SHOOTYPE")]
    pub shoot_type: Option<i16>,
    #[serde(rename = "SHOOTNM")]
    pub item_name: String,
    /// Capture time as a YYYYMMDDhhmm number.
    #[serde(rename = "SHOOTDATE")]
    pub taken_at: Option<i64>,
    /// Verdict code: 0 OK, 1 NG, -1 analysis failed.
    #[serde(rename = "JUDGEKB")]
    pub verdict: Option<i16>,
    /// Base64 encoded image.
    #[serde(rename = "IMG")]
    pub image: Option<String>,
    #[serde(rename = "HININCOMMENT")]
    pub ng_comment: Option<String>,
    #[serde(rename = "KATASIKI")]
    pub model: Option<String>,
    #[serde(rename = "SEIZOUNO")]
    pub serial_number: Option<String>,
}

/// Status reported in `common_head` of every linkage response.
pub const LINKAGE_SUCCESS: u8 = 1;
pub const LINKAGE_ERROR: u8 = 9;

#[derive(Debug, Serialize)]
pub struct LinkageResponse<T> {
    pub response: T,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkageCommonHead {
    #[serde(rename = "STATUS")]
    pub status: u8,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkageSuccess {
    pub common_head: LinkageCommonHead,
    pub gyomu_head: LinkageRecordCount,
    pub gyomu_body: LinkageResults,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkageRecordCount {
    #[serde(rename = "RECORDCOUNT")]
    pub record_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkageResults {
    #[serde(rename = "RESULTS")]
    pub results: Vec<AlignmentRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkageFailure {
    pub common_head: LinkageCommonHead,
    pub error_body: LinkageErrorBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkageErrorBody {
    #[serde(rename = "CODE")]
    pub code: i32,
    #[serde(rename = "MESSAGE")]
    pub message: String,
}

impl LinkageResponse<LinkageSuccess> {
    pub fn success(results: Vec<AlignmentRecord>) -> Self {
        Self {
            response: LinkageSuccess {
                common_head: LinkageCommonHead {
                    status: LINKAGE_SUCCESS,
                },
                gyomu_head: LinkageRecordCount {
                    record_count: results.len(),
                },
                gyomu_body: LinkageResults { results },
            },
        }
    }
}

impl LinkageResponse<LinkageFailure> {
    pub fn failure(code: i32, message: &str) -> Self {
        Self {
            response: LinkageFailure {
                common_head: LinkageCommonHead {
                    status: LINKAGE_ERROR,
                },
                error_body: LinkageErrorBody {
                    code,
                    message: message.to_string(),
                },
            },
        }
    }
}
