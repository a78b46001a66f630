//! Pipeline orchestration: typed steps, sequencing, progress

pub mod runner;
pub mod step;

pub use runner::{run_standard, Pipeline, RunSummary};
pub use step::{
    NoopObserver, PipelineStep, ProgressObserver, StepContext, StepReport, StepStatus,
};
