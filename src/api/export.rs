//! Inspection result export endpoint.

use actix_web::{HttpRequest, HttpResponse, web};
use tracing::debug;

use super::response::respond;
use crate::error::{AppResult, ErrorResponse, ValidationError};
use crate::models::validation::parse_query;
use crate::models::{ExportQuery, ExportResponse};
use crate::services::Pipeline;

/// Write the results of matching inspections to the export bucket.
///
/// Answers presigned URLs for the item master list and the result rows.
#[utoipa::path(
    get,
    path = "/api/v1/inspection-results/export",
    tag = "Export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Presigned download URLs", body = ExportResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Export failed", body = ErrorResponse),
    )
)]
pub async fn export_results(
    pipeline: web::Data<Pipeline>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    const PROCESS: &str = "Inspection result export";
    debug!("{} started", PROCESS);

    let result = match parse_export_query(req.query_string()) {
        Ok(query) => pipeline.export_results(&query).await,
        Err(e) => Err(e.into()),
    };
    respond(PROCESS, result)
}

/// Unknown parameters are range errors on this endpoint.
fn parse_export_query(query: &str) -> Result<ExportQuery, ValidationError> {
    parse_query(query).map_err(|e| match e {
        ValidationError::UnexpectedField(field) => ValidationError::OutOfRange(field),
        other => other,
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/inspection-results/export").route(web::get().to(export_results)),
    );
}
