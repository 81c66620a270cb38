//! Pipeline services and the external capabilities they use.

pub mod alignment;
pub mod analysis_api;
pub mod aws;
pub mod export;
pub mod interpreter;
pub mod pipeline;
pub mod queue;
pub mod rename;
pub mod secrets;
pub mod storage;
pub mod submission;
pub mod text_detection;
pub mod workers;

pub use pipeline::{Capabilities, Pipeline};
pub use workers::{AnalysisQueue, MessageOutcome, start_analysis_workers};
