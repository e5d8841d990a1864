//! Pipeline orchestration and run reporting

mod orchestrator;
mod summary;

pub use orchestrator::Orchestrator;
pub use summary::{FailureCounts, PayerSummary, RunSummary, StageCounts};
