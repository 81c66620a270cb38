//! Data models and DTOs.

pub mod alignment;
pub mod analysis;
pub mod export;
pub mod inspection;
pub mod progress;
pub mod validation;

pub use alignment::*;
pub use analysis::*;
pub use export::*;
pub use inspection::*;
pub use progress::*;
