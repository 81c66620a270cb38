//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inspection Pipeline Server",
        version = "0.1.0",
        description = "Inspection item tracking with queued OCR and AI image analysis, result submission and external image linkage"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Inspection endpoints
        api::inspections::lookup_items,
        api::inspections::begin_analysis,
        api::inspections::submit_results,
        api::inspections::analysis_results,
        api::inspections::inspection_names,
        // Linkage and export endpoints
        api::alignment::align_images,
        api::export::export_results,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Inspections
            models::InspectionItemsRequest,
            models::InspectionSchedule,
            models::InspectionItemView,
            models::InspectionItemsResponse,
            models::AnalysisRequest,
            models::AnalysisAccepted,
            models::ResultItem,
            models::DeleteItem,
            models::InspectionResultRequest,
            models::AnalysisResultItem,
            models::AnalysisResultsResponse,
            models::InspectionNameView,
            models::InspectionNamesResponse,
            // Linkage
            models::AlignmentRequest,
            models::AlignmentRequestBody,
            models::AlignmentCommonHead,
            models::AlignmentWorksheet,
            models::AlignmentRecord,
            models::AlignmentShot,
            models::LinkageSuccess,
            models::LinkageFailure,
            models::LinkageCommonHead,
            models::LinkageRecordCount,
            models::LinkageResults,
            models::LinkageErrorBody,
            // Export
            models::ExportQuery,
            models::ExportResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Inspections", description = "Inspection items, analysis requests and results"),
        (name = "Linkage", description = "External image linkage export"),
        (name = "Export", description = "Inspection result export")
    )
)]
pub struct ApiDoc;
