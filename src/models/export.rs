//! Inspection result export DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::validation::Validate;
use crate::error::ValidationError;

/// Query parameters of the inspection result export.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportQuery {
    pub inspection_name_id: i64,
    /// Optional worksheet code filter, at most 10 characters.
    #[serde(default)]
    pub wscd: Option<String>,
    /// First inspection date, `YYYY/MM/DD`.
    pub start_date: String,
    /// Last inspection date, `YYYY/MM/DD`.
    pub end_date: String,
    /// Maximum number of inspections.
    pub output_count: u64,
}

impl ExportQuery {
    /// Inclusive inspection date range as YYYYMMDD numbers.
    pub fn date_range(&self) -> Result<(i32, i32), ValidationError> {
        Ok((
            parse_export_date("startDate", &self.start_date)?,
            parse_export_date("endDate", &self.end_date)?,
        ))
    }

    pub fn worksheet_code(&self) -> Option<&str> {
        self.wscd.as_deref().filter(|code| !code.is_empty())
    }
}

impl Validate for ExportQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(code) = &self.wscd
            && code.chars().count() > 10
        {
            return Err(ValidationError::WrongType(format!("wscd: {}", code)));
        }
        self.date_range()?;
        Ok(())
    }
}

fn parse_export_date(field: &str, value: &str) -> Result<i32, ValidationError> {
    let date = NaiveDate::parse_from_str(value, "%Y/%m/%d")
        .map_err(|_| ValidationError::WrongType(format!("{}: {}", field, value)))?;
    Ok(date_number(date))
}

/// A date as its YYYYMMDD number.
pub fn date_number(date: NaiveDate) -> i32 {
    date.format("%Y%m%d")
        .to_string()
        .parse()
        .unwrap_or_default()
}

/// Format a YYYYMMDD number as `YYYY/MM/DD`.
pub fn format_date_number(value: i32) -> String {
    let digits = format!("{:08}", value);
    format!("{}/{}/{}", &digits[0..4], &digits[4..6], &digits[6..8])
}

/// Item master row of the export.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExportItemMaster {
    pub item_name_id: i64,
    pub item_name: String,
    pub analysis_type: i16,
}

/// One inspection joined with one of its analysed items.
///
/// Inspections without analysed items produce a single row with empty item fields.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExportResultRow {
    pub inspection_name: String,
    pub inspection_id: i64,
    pub worksheet_code: String,
    pub inspection_date: String,
    pub item_name_id: Option<i64>,
    pub analysis_type: Option<i16>,
    pub model: String,
    pub edited_model: String,
    pub serial_number: String,
    pub edited_serial_number: String,
    pub ai_result: String,
    pub ng_comment: String,
    pub s3_image_path: String,
}

/// Response body of the export.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub inspection_item_results_url: String,
    pub inspection_results_url: String,
}
