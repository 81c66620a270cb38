//! Inspection pipeline server library.
//!
//! Inspection item lookup, analysis dispatch and result recording over
//! PostgreSQL, S3, SQS, Textract and an external image analysis API.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
