//! Domain error types for the inspection pipeline.
//!
//! Every failure is mapped onto a numeric result code carried in the JSON
//! body of each response, alongside the HTTP status.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

/// Result codes returned in the `resultCode` field of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    NoMatchingData,
    MissingRequired,
    InvalidType,
    InvalidValue,
    DatabaseError,
    QueueError,
    StorageError,
    ExternalApiError,
    UnexpectedError,
}

impl ResultCode {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 20000,
            Self::NoMatchingData => 20001,
            Self::MissingRequired => 40000,
            Self::InvalidType => 40001,
            Self::InvalidValue => 40002,
            Self::DatabaseError => 50000,
            Self::QueueError => 50001,
            Self::StorageError => 50002,
            Self::ExternalApiError => 50003,
            Self::UnexpectedError => 50004,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success | Self::NoMatchingData => StatusCode::OK,
            Self::MissingRequired | Self::InvalidType | Self::InvalidValue => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Completed successfully",
            Self::NoMatchingData => "No matching data",
            Self::MissingRequired => "A required parameter is missing",
            Self::InvalidType => "A parameter has an invalid type",
            Self::InvalidValue => "A parameter has an invalid value",
            Self::DatabaseError => "A database error occurred",
            Self::QueueError => "A queue error occurred",
            Self::StorageError => "An object storage error occurred",
            Self::ExternalApiError => "An external API error occurred",
            Self::UnexpectedError => "An unexpected error occurred",
        }
    }
}

/// Sub-kinds of request validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingRequired(String),

    #[error("unexpected field: {0}")]
    UnexpectedField(String),

    #[error("wrong type or format: {0}")]
    WrongType(String),

    #[error("out of range or pattern mismatch: {0}")]
    OutOfRange(String),
}

impl ValidationError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::MissingRequired(_) => ResultCode::MissingRequired,
            Self::UnexpectedField(_) | Self::WrongType(_) => ResultCode::InvalidType,
            Self::OutOfRange(_) => ResultCode::InvalidValue,
        }
    }
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// A versioned update lost the race against another writer
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Expected business miss, answered with the no-matching-data code
    #[error("No matching record: {0}")]
    MissingRecord(String),

    /// Begin-analysis was requested for an item with no analysis queue
    #[error("Unmatched analysis target: {0}")]
    UnmatchedAnalysisTarget(String),

    /// Queue operation failed
    #[error("Queue error: {0}")]
    Queue(String),

    /// Storage (S3) operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// External analysis API or secrets endpoint failed
    #[error("External API error: {0}")]
    ExternalApi(String),

    /// Text detection service failed
    #[error("Text detection error: {0}")]
    TextDetection(String),

    /// Anything else
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            AppError::Validation(kind) => kind.result_code(),
            AppError::Database(_) | AppError::ConcurrencyConflict(_) => ResultCode::DatabaseError,
            AppError::MissingRecord(_) => ResultCode::NoMatchingData,
            AppError::Queue(_) => ResultCode::QueueError,
            AppError::Storage(_) => ResultCode::StorageError,
            AppError::ExternalApi(_) | AppError::TextDetection(_) => ResultCode::ExternalApiError,
            AppError::UnmatchedAnalysisTarget(_) | AppError::Unexpected(_) => {
                ResultCode::UnexpectedError
            }
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::ConcurrencyConflict(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.result_code().status()
    }

    fn error_response(&self) -> HttpResponse {
        let code = self.result_code();
        crate::api::response::with_headers(HttpResponse::build(code.status()))
            .json(ErrorResponse::new(code))
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub result_code: i32,
}

impl ErrorResponse {
    pub fn new(code: ResultCode) -> Self {
        Self {
            result_code: code.code(),
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}
