//! Health check endpoints.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::db::DbRouter;

/// Health check response.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

/// Readiness check response.
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    status: &'static str,
    source: &'static str,
    /// Absent when the service runs against a single endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    replica: Option<&'static str>,
}

/// Health check endpoint.
///
/// Returns 200 if the service is running.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Returns 200 if every configured database endpoint answers.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service unavailable", body = ReadyResponse)
    )
)]
#[get("/ready")]
pub async fn ready(router: web::Data<DbRouter>) -> HttpResponse {
    let source = ping(router.source()).await;
    let replica = match router.replica() {
        Some(conn) => Some(ping(conn).await),
        None => None,
    };

    let healthy = source.is_ok() && replica.as_ref().is_none_or(Result::is_ok);
    let body = ReadyResponse {
        status: if healthy { "ready" } else { "not_ready" },
        source: state(&source),
        replica: replica.as_ref().map(state),
    };

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

async fn ping(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    conn.query_one_raw(stmt).await.map(|_| ()).inspect_err(|e| {
        warn!("Readiness probe failed: {}", e);
    })
}

fn state(result: &Result<(), DbErr>) -> &'static str {
    match result {
        Ok(()) => "connected",
        Err(_) => "unreachable",
    }
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
