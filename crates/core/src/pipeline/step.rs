//! Typed step descriptors and the step state machine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use moduleo_domain::{MappingTables, ModuleoError, Period, Result};
use serde::{Deserialize, Serialize};

use crate::ports::{ArtifactKind, ArtifactStore, ModuleoApi};

/// Lifecycle of a single step.
///
/// Pending → Running → {Succeeded, Failed}; steps after a failure
/// stay Pending because the orchestrator never schedules them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Per-step provenance reported after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub produces: ArtifactKind,
    pub status: StepStatus,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl StepReport {
    pub(crate) fn pending(name: &str, produces: ArtifactKind) -> Self {
        Self { name: name.to_string(), produces, status: StepStatus::Pending, output: None, error: None }
    }
}

/// Shared, read-only context handed to each step.
///
/// Steps communicate exclusively through the artifact store; there is
/// no in-memory state carried across step boundaries.
#[derive(Clone)]
pub struct StepContext {
    pub api: Arc<dyn ModuleoApi>,
    pub store: Arc<dyn ArtifactStore>,
    pub mappings: Arc<MappingTables>,
    pub period: Period,
}

impl StepContext {
    pub fn new(
        api: Arc<dyn ModuleoApi>,
        store: Arc<dyn ArtifactStore>,
        mappings: Arc<MappingTables>,
        period: Period,
    ) -> Self {
        Self { api, store, mappings, period }
    }

    /// `YYYYMM` token naming every artifact of this run.
    pub fn token(&self) -> String {
        self.period.token()
    }
}

/// A single pipeline step.
///
/// Each step declares the artifact it produces; dependencies on prior
/// steps are expressed by reading their named artifacts from the
/// store, never by string-matching step names.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Human-readable step name, used for progress reporting only.
    fn name(&self) -> &'static str;

    /// The artifact this step writes.
    fn produces(&self) -> ArtifactKind;

    /// Execute the step, returning the path of the written artifact.
    async fn run(&self, ctx: &StepContext) -> Result<PathBuf>;
}

/// Side channel for step-by-step progress reporting. Not part of the
/// data contract; observers must not influence step outcomes.
pub trait ProgressObserver: Send + Sync {
    fn step_started(&self, index: usize, total: usize, name: &str);
    fn step_succeeded(&self, index: usize, total: usize, name: &str, output: &Path);
    fn step_failed(&self, index: usize, total: usize, name: &str, error: &ModuleoError);
}

/// Observer that ignores all progress events.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn step_started(&self, _index: usize, _total: usize, _name: &str) {}
    fn step_succeeded(&self, _index: usize, _total: usize, _name: &str, _output: &Path) {}
    fn step_failed(&self, _index: usize, _total: usize, _name: &str, _error: &ModuleoError) {}
}
