//! Inspection item, analysis and result submission handlers.

use actix_web::{HttpRequest, HttpResponse, web};
use tracing::debug;

use super::response::{Empty, respond};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::validation::{parse_json, parse_query};
use crate::models::{
    AnalysisAccepted, AnalysisRequest, AnalysisResultsQuery, AnalysisResultsResponse,
    InspectionItemsRequest, InspectionItemsResponse, InspectionNamesResponse,
    InspectionResultRequest,
};
use crate::services::Pipeline;

/// Look up the items of an inspection.
///
/// The inspection and one item per master entry are created on first lookup.
#[utoipa::path(
    post,
    path = "/api/v1/inspections/items",
    tag = "Inspections",
    request_body = InspectionItemsRequest,
    responses(
        (status = 200, description = "Inspection and its items", body = InspectionItemsResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
    )
)]
pub async fn lookup_items(
    pipeline: web::Data<Pipeline>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    const PROCESS: &str = "Inspection item lookup";
    debug!("{} started", PROCESS);

    let result = match parse_json::<InspectionItemsRequest>(&body) {
        Ok(req) => pipeline.inspection_items(&req).await,
        Err(e) => Err(e.into()),
    };
    respond(PROCESS, result)
}

/// Request analysis of an uploaded image.
///
/// Answers `20001` when the item does not exist and `50004` when its item
/// has no automated analysis.
#[utoipa::path(
    post,
    path = "/api/v1/inspections/items/analysis",
    tag = "Inspections",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis queued, or no matching item", body = AnalysisAccepted),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
    )
)]
pub async fn begin_analysis(
    pipeline: web::Data<Pipeline>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    const PROCESS: &str = "Begin analysis";
    debug!("{} started", PROCESS);

    let result = match parse_json::<AnalysisRequest>(&body) {
        Ok(req) => pipeline.begin_analysis(&req).await,
        Err(e) => Err(e.into()),
    };
    respond(PROCESS, result)
}

/// Submit the results of an inspection.
#[utoipa::path(
    post,
    path = "/api/v1/inspections/results",
    tag = "Inspections",
    request_body = InspectionResultRequest,
    responses(
        (status = 200, description = "Results recorded", body = ErrorResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
    )
)]
pub async fn submit_results(
    pipeline: web::Data<Pipeline>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    const PROCESS: &str = "Result submission";
    debug!("{} started", PROCESS);

    let result = match parse_json::<InspectionResultRequest>(&body) {
        Ok(req) => pipeline.submit_results(&req).await.map(|()| Empty {}),
        Err(e) => Err(e.into()),
    };
    respond(PROCESS, result)
}

/// Analysis results of an inspection updated since a point in time.
#[utoipa::path(
    get,
    path = "/api/v1/inspections/items/analysis-results",
    tag = "Inspections",
    params(
        ("inspectionId" = String, Query, description = "Inspection id, 1 to 18 digits"),
        ("lastUpdatedAt" = String, Query, description = "RFC 3339 timestamp"),
    ),
    responses(
        (status = 200, description = "Updated items", body = AnalysisResultsResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
    )
)]
pub async fn analysis_results(
    pipeline: web::Data<Pipeline>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    const PROCESS: &str = "Analysis result query";
    debug!("{} started", PROCESS);

    let result = match parse_query::<AnalysisResultsQuery>(req.query_string()) {
        Ok(query) => match query.inspection_id() {
            Ok(id) => pipeline.analysis_results(id, query.last_updated_at).await,
            Err(e) => Err(AppError::from(e)),
        },
        Err(e) => Err(e.into()),
    };
    respond(PROCESS, result)
}

/// Master inspection names.
#[utoipa::path(
    get,
    path = "/api/v1/inspection-names",
    tag = "Inspections",
    responses(
        (status = 200, description = "Inspection names", body = InspectionNamesResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
    )
)]
pub async fn inspection_names(pipeline: web::Data<Pipeline>) -> AppResult<HttpResponse> {
    const PROCESS: &str = "Inspection name listing";
    debug!("{} started", PROCESS);

    respond(PROCESS, pipeline.inspection_names().await)
}

/// Configure inspection routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/inspections/items").route(web::post().to(lookup_items)))
        .service(
            web::resource("/inspections/items/analysis").route(web::post().to(begin_analysis)),
        )
        .service(
            web::resource("/inspections/items/analysis-results")
                .route(web::get().to(analysis_results)),
        )
        .service(web::resource("/inspections/results").route(web::post().to(submit_results)))
        .service(web::resource("/inspection-names").route(web::get().to(inspection_names)));
}
