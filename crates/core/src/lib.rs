//! # Moduleo Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The pipeline orchestrator and its typed step descriptors
//! - Extraction steps for each data category
//! - The join/merge engine for the combined report
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `moduleo-domain`
//! - No HTTP or filesystem code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod ports;

// Re-export specific items to avoid ambiguity
pub use pipeline::{
    run_standard, NoopObserver, Pipeline, PipelineStep, ProgressObserver, RunSummary, StepContext,
    StepReport, StepStatus,
};
pub use ports::{ArtifactKind, ArtifactStore, ModuleoApi};
