//! API endpoint modules.

pub mod alignment;
pub mod export;
pub mod health;
pub mod inspections;
pub mod openapi;
pub mod response;

pub use alignment::configure_routes as configure_alignment_routes;
pub use export::configure_routes as configure_export_routes;
pub use health::configure_health_routes;
pub use inspections::configure_routes as configure_inspection_routes;
pub use openapi::ApiDoc;
