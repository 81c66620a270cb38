//! JSON responses carrying the result code and the security headers.

use actix_web::http::header;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{AppError, AppResult, ResultCode};

/// Add the headers every JSON response carries.
pub fn with_headers(mut builder: HttpResponseBuilder) -> HttpResponseBuilder {
    builder
        .insert_header((header::CONTENT_TYPE, "application/json; charset=UTF-8"))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .insert_header((header::CONTENT_SECURITY_POLICY, "default-src 'self'"))
        .insert_header((
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ));
    builder
}

/// Response body with `resultCode` merged into it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WithResultCode<T> {
    result_code: i32,
    #[serde(flatten)]
    body: T,
}

/// Body of responses with nothing but the result code.
#[derive(Debug, Serialize)]
pub struct Empty {}

/// 200 response with the success result code.
pub fn success<T: Serialize>(body: T) -> HttpResponse {
    with_headers(HttpResponse::Ok()).json(WithResultCode {
        result_code: ResultCode::Success.code(),
        body,
    })
}

/// Log how a process ended.
pub fn log_outcome<T>(process: &str, result: &AppResult<T>) {
    if let Err(e) = result {
        log_error(process, e);
    }
    debug!("{} finished", process);
}

fn log_error(process: &str, e: &AppError) {
    if e.result_code().status().is_server_error() {
        error!("{} failed: {}", process, e);
    } else {
        warn!("{} rejected: {}", process, e);
    }
}

/// Log the outcome and turn a successful body into a response.
pub fn respond<T: Serialize>(process: &str, result: AppResult<T>) -> AppResult<HttpResponse> {
    log_outcome(process, &result);
    result.map(success)
}
