//! Inspection and inspection item DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::{Validate, check_len, check_pattern};
use super::{AnalysisType, Progress};
use crate::entity::inspection_item;
use crate::error::ValidationError;
use crate::services::storage::split_bucket_path;

/// Inspection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionStatus {
    Pending,
    InProgress,
    Reinspection,
    ConditionallyCompleted,
    Completed,
}

impl InspectionStatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Reinspection => 2,
            Self::ConditionallyCompleted => 3,
            Self::Completed => 4,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Pending),
            1 => Some(Self::InProgress),
            2 => Some(Self::Reinspection),
            3 => Some(Self::ConditionallyCompleted),
            4 => Some(Self::Completed),
            _ => None,
        }
    }

    /// Statuses whose inspections are handed to the image linkage export.
    pub const EXPORTABLE: [InspectionStatus; 3] = [
        Self::Reinspection,
        Self::ConditionallyCompleted,
        Self::Completed,
    ];
}

// ----------------------------------------------------------------------------
// Inspection item lookup
// ----------------------------------------------------------------------------

/// Request body for looking up (or creating) the items of an inspection.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InspectionItemsRequest {
    /// Worksheet code, exactly 10 characters.
    pub worksheet_code: String,
    pub receipt_confirmation_date: i32,
    /// Master inspection name, 1 to 15 characters.
    pub inspection_name: String,
    /// Inspection date as a YYYYMMDD number.
    pub inspection_date: i32,
    /// Company code, 1 to 8 characters.
    pub company_code: String,
}

impl Validate for InspectionItemsRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_len("worksheetCode", &self.worksheet_code, 10, 10)?;
        check_len("inspectionName", &self.inspection_name, 1, 15)?;
        check_len("companyCode", &self.company_code, 1, 8)?;
        Ok(())
    }
}

/// Inspection summary returned with its items.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InspectionSchedule {
    pub id: i64,
    pub inspection_name_id: i64,
    pub status: i16,
}

/// One inspection item as returned to clients.
///
/// `s3ImagePath` carries the object key only; the bucket is stripped.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InspectionItemView {
    pub inspection_item_id: i64,
    pub inspection_id: i64,
    pub inspection_item_name_id: Option<i64>,
    pub item_name: String,
    pub taken_dt: Option<DateTime<Utc>>,
    pub s3_image_path: Option<String>,
    pub ai_result: Option<String>,
    pub ng_comment: Option<String>,
    pub model: Option<String>,
    pub edited_model: Option<String>,
    pub serial_number: Option<String>,
    pub edited_serial_number: Option<String>,
    #[schema(value_type = i16)]
    pub progress: Progress,
    pub version: i64,
}

impl From<&inspection_item::Model> for InspectionItemView {
    fn from(item: &inspection_item::Model) -> Self {
        Self {
            inspection_item_id: item.id,
            inspection_id: item.inspection_id,
            inspection_item_name_id: item.item_name_id,
            item_name: item.item_name.clone(),
            taken_dt: item.taken_dt,
            s3_image_path: object_key(item.image_path.as_deref()),
            ai_result: item.ai_result.clone(),
            ng_comment: item.ng_comment.clone(),
            model: item.detected_model.clone(),
            edited_model: item.edited_model.clone(),
            serial_number: item.detected_serial_number.clone(),
            edited_serial_number: item.edited_serial_number.clone(),
            progress: item.progress(),
            version: item.version,
        }
    }
}

/// Response body for the inspection item lookup.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InspectionItemsResponse {
    pub schedule: InspectionSchedule,
    pub items: Vec<InspectionItemView>,
}

/// Strip the bucket from a stored "bucket/key" path.
fn object_key(path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| split_bucket_path(p).1.to_string())
}

// ----------------------------------------------------------------------------
// Result submission
// ----------------------------------------------------------------------------

/// One item of a result submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResultItem {
    /// Absent for items added on the device.
    #[serde(default)]
    pub inspection_item_id: Option<i64>,
    pub inspection_item_name: String,
    #[serde(default)]
    pub taken_dt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edited_model: Option<String>,
    #[serde(default)]
    pub edited_serial_number: Option<String>,
    #[serde(default)]
    pub ng_comment: Option<String>,
    #[serde(default)]
    pub s3_image_path: Option<String>,
}

/// Reference to an item to delete.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteItem {
    pub inspection_item_id: i64,
}

/// Request body for submitting the results of an inspection.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InspectionResultRequest {
    pub inspection_id: i64,
    pub status: i16,
    #[serde(default)]
    pub evidence_id: Option<i16>,
    #[serde(default)]
    pub inspection_result_items: Vec<ResultItem>,
    #[serde(default)]
    pub delete_list: Vec<DeleteItem>,
}

impl InspectionResultRequest {
    pub fn status(&self) -> Result<InspectionStatus, ValidationError> {
        InspectionStatus::from_i16(self.status)
            .ok_or_else(|| ValidationError::OutOfRange(format!("status: {}", self.status)))
    }
}

impl Validate for InspectionResultRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.status()?;
        for item in &self.inspection_result_items {
            check_len("inspectionItemName", &item.inspection_item_name, 0, 16)?;
            if let Some(model) = &item.edited_model {
                check_len("editedModel", model, 0, 20)?;
            }
            if let Some(serial) = &item.edited_serial_number {
                check_len("editedSerialNumber", serial, 0, 12)?;
            }
            if let Some(comment) = &item.ng_comment {
                check_len("ngComment", comment, 0, 50)?;
            }
            if let Some(path) = &item.s3_image_path {
                check_len("s3ImagePath", path, 0, 300)?;
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Analysis results
// ----------------------------------------------------------------------------

/// Query for items of an inspection updated since a point in time.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalysisResultsQuery {
    /// Inspection id as 1 to 18 digits.
    pub inspection_id: String,
    pub last_updated_at: DateTime<Utc>,
}

impl AnalysisResultsQuery {
    pub fn inspection_id(&self) -> Result<i64, ValidationError> {
        self.inspection_id
            .parse::<i64>()
            .map_err(|_| ValidationError::OutOfRange(format!("inspectionId: {}", self.inspection_id)))
    }
}

impl Validate for AnalysisResultsQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        check_pattern("inspectionId", &self.inspection_id, |s| {
            (1..=18).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
        })?;
        self.inspection_id()?;
        Ok(())
    }
}

/// One analysis result.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultItem {
    pub inspection_id: i64,
    pub inspection_item_id: i64,
    pub result: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    #[schema(value_type = i16)]
    pub progress: Progress,
    pub s3_image_path: Option<String>,
    pub version: i64,
}

impl From<&inspection_item::Model> for AnalysisResultItem {
    fn from(item: &inspection_item::Model) -> Self {
        Self {
            inspection_id: item.inspection_id,
            inspection_item_id: item.id,
            result: item.ai_result.clone(),
            model: item.detected_model.clone(),
            serial_number: item.detected_serial_number.clone(),
            progress: item.progress(),
            s3_image_path: object_key(item.image_path.as_deref()),
            version: item.version,
        }
    }
}

/// Response body for the analysis result query.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultsResponse {
    pub analysis_result_items: Vec<AnalysisResultItem>,
}

// ----------------------------------------------------------------------------
// Master data
// ----------------------------------------------------------------------------

/// One master inspection name.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InspectionNameView {
    pub inspection_name_id: i64,
    pub inspection_name: String,
}

/// Response body for the inspection name listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InspectionNamesResponse {
    pub inspection_names: Vec<InspectionNameView>,
}

/// Item master entry as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMaster {
    pub item_name_id: i64,
    pub inspection_name_id: i64,
    pub item_name: String,
    pub analysis_type: AnalysisType,
    pub api_url: Option<String>,
    pub master_image: Option<String>,
    pub auth_token: Option<String>,
    pub shoot_type: Option<i16>,
}
