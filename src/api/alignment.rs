//! External image linkage endpoint.
//!
//! Answers in the linkage system's own envelope rather than the
//! `resultCode` body the other endpoints use.

use actix_web::{HttpResponse, web};
use tracing::debug;

use super::response::{log_outcome, with_headers};
use crate::error::AppResult;
use crate::models::validation::parse_json;
use crate::models::{AlignmentRecord, AlignmentRequest, LinkageFailure, LinkageResponse, LinkageSuccess};
use crate::services::Pipeline;

/// Export inspections and their images to the linkage system.
#[utoipa::path(
    post,
    path = "/api/v1/image-alignment",
    tag = "Linkage",
    request_body = AlignmentRequest,
    responses(
        (status = 200, description = "Exported inspections", body = LinkageSuccess),
        (status = 400, description = "Invalid request", body = LinkageFailure),
        (status = 500, description = "Export failed", body = LinkageFailure),
    )
)]
pub async fn align_images(pipeline: web::Data<Pipeline>, body: web::Bytes) -> HttpResponse {
    const PROCESS: &str = "Image alignment";
    debug!("{} started", PROCESS);

    let result = export(&pipeline, &body).await;
    log_outcome(PROCESS, &result);

    match result {
        Ok(records) => with_headers(HttpResponse::Ok()).json(LinkageResponse::success(records)),
        Err(e) => {
            let code = e.result_code();
            with_headers(HttpResponse::build(code.status()))
                .json(LinkageResponse::failure(code.code(), code.message()))
        }
    }
}

async fn export(pipeline: &Pipeline, body: &[u8]) -> AppResult<Vec<AlignmentRecord>> {
    let req: AlignmentRequest = parse_json(body)?;
    pipeline.align_images(&req.selection()?).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/image-alignment").route(web::post().to(align_images)));
}
