//! Inspection pipeline server - main entry point.
//!
//! Resolves database endpoints, runs migrations, starts the analysis queue
//! workers and serves the HTTP API.

use std::fmt::Display;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use secrecy::ExposeSecret;
use sea_orm_migration::MigratorTrait;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use inspection_pipeline_lib::api::{self, ApiDoc};
use inspection_pipeline_lib::config::{Config, DatabaseTopology};
use inspection_pipeline_lib::db::{DbRouter, TransactionSource};
use inspection_pipeline_lib::middleware::RequestLogger;
use inspection_pipeline_lib::migration::Migrator;
use inspection_pipeline_lib::services::analysis_api::HttpAnalysisApi;
use inspection_pipeline_lib::services::aws::load_sdk_config;
use inspection_pipeline_lib::services::interpreter::PlateReader;
use inspection_pipeline_lib::services::queue::SqsQueue;
use inspection_pipeline_lib::services::secrets::SecretsClient;
use inspection_pipeline_lib::services::storage::S3Storage;
use inspection_pipeline_lib::services::text_detection::TextractDetector;
use inspection_pipeline_lib::services::{Capabilities, Pipeline, start_analysis_workers};

/// Log a startup failure and exit.
fn or_exit<T, E: Display>(result: Result<T, E>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{}: {}", what, e);
            std::process::exit(1);
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if Config::from_env().is_ok() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, a database endpoint and both queue URLs must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Inspection Pipeline Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    // Resolve database endpoints, through the secrets extension when configured
    let secrets = or_exit(
        SecretsClient::new(&config.secrets, &config.http),
        "Failed to create secrets client",
    );
    let (source_url, replica_url) = match &config.database.topology {
        DatabaseTopology::Single(target) => (
            or_exit(secrets.resolve(target).await, "Failed to resolve database"),
            None,
        ),
        DatabaseTopology::ReadReplica { source, replica } => (
            or_exit(secrets.resolve(source).await, "Failed to resolve source database"),
            Some(or_exit(
                secrets.resolve(replica).await,
                "Failed to resolve replica database",
            )),
        ),
    };

    let router = Arc::new(or_exit(
        DbRouter::connect(
            &config.database,
            source_url.expose_secret(),
            replica_url.as_ref().map(|url| url.expose_secret()),
        )
        .await,
        "Failed to connect to database",
    ));
    info!("Database connection established");

    or_exit(
        Migrator::up(router.source(), None).await,
        "Failed to run migrations",
    );
    info!("Database migrations complete");

    // Capability adapters
    let sdk_config = load_sdk_config(&config.aws).await;
    let path_style = config.aws.endpoint.is_some();
    let caps = Capabilities {
        storage: Arc::new(S3Storage::new(&sdk_config, path_style)),
        queue: Arc::new(SqsQueue::new(&sdk_config)),
        text: Arc::new(TextractDetector::new(&sdk_config)),
        analysis: Arc::new(or_exit(
            HttpAnalysisApi::new(&config.http),
            "Failed to create analysis API client",
        )),
    };
    let plate_reader = or_exit(PlateReader::new(), "Failed to build plate reader");

    let db: Arc<dyn TransactionSource> = router.clone();
    let pipeline = Arc::new(Pipeline::new(
        db,
        caps,
        plate_reader,
        config.queues.clone(),
        config.export.clone(),
    ));

    start_analysis_workers(pipeline.clone());

    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::from(pipeline.clone()))
            .app_data(web::Data::from(router.clone()))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_inspection_routes)
                    .configure(api::configure_alignment_routes)
                    .configure(api::configure_export_routes),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
