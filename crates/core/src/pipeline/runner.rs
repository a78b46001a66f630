//! Pipeline orchestrator
//!
//! Runs the fixed step sequence strictly in order, halting on the
//! first failure. Artifacts written by earlier steps stay on disk for
//! inspection, so a failed run can be diagnosed step by step.

use std::path::PathBuf;

use moduleo_domain::{Period, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::step::{PipelineStep, ProgressObserver, StepContext, StepReport, StepStatus};
use crate::extract::details::{DetailFetchStep, DetailMergeStep};
use crate::extract::devis::DevisIntegrationStep;
use crate::extract::factures::FactureIntegrationStep;
use crate::extract::tempspasses::{
    EnrichStep, PerAffaireFetchStep, RawFetchStep, SalePriceStep, UniqueStep,
};

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub period: Period,
    pub reports: Vec<StepReport>,
    /// Path of the combined report when every step succeeded.
    pub final_artifact: Option<PathBuf>,
    /// Stable copy handed to the dashboard renderer, when published.
    pub dashboard_copy: Option<PathBuf>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.reports.iter().all(|r| r.status == StepStatus::Succeeded)
    }

    /// Name of the failed step, if any.
    pub fn failed_step(&self) -> Option<&str> {
        self.reports
            .iter()
            .find(|r| r.status == StepStatus::Failed)
            .map(|r| r.name.as_str())
    }
}

/// The fixed, domain-specific step sequence.
pub struct Pipeline {
    ctx: StepContext,
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    /// Build the standard nine-step report pipeline for a period.
    pub fn standard(ctx: StepContext) -> Self {
        let steps: Vec<Box<dyn PipelineStep>> = vec![
            Box::new(RawFetchStep),
            Box::new(EnrichStep),
            Box::new(UniqueStep),
            Box::new(PerAffaireFetchStep),
            Box::new(SalePriceStep),
            Box::new(DetailFetchStep),
            Box::new(DetailMergeStep),
            Box::new(DevisIntegrationStep),
            Box::new(FactureIntegrationStep),
        ];
        Self { ctx, steps }
    }

    /// Build a pipeline over an explicit step sequence (tests, partial
    /// reruns).
    pub fn with_steps(ctx: StepContext, steps: Vec<Box<dyn PipelineStep>>) -> Self {
        Self { ctx, steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run all steps in order, halting on the first failure.
    ///
    /// The summary always covers every declared step; steps after a
    /// failure are reported Pending since they never ran. A user abort
    /// between steps simply stops the next step from being scheduled —
    /// there is no mid-step cancellation.
    pub async fn run(&self, observer: &dyn ProgressObserver) -> RunSummary {
        let total = self.steps.len();
        let period = self.ctx.period;
        let mut reports: Vec<StepReport> =
            self.steps.iter().map(|s| StepReport::pending(s.name(), s.produces())).collect();
        let mut final_artifact = None;

        info!(
            period_start = %period.date_min(),
            period_end = %period.date_max(),
            steps = total,
            "starting report pipeline"
        );

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            reports[index].status = StepStatus::Running;
            observer.step_started(index + 1, total, name);
            info!(step = name, index = index + 1, total, "step started");

            match step.run(&self.ctx).await {
                Ok(output) => {
                    info!(step = name, output = %output.display(), "step succeeded");
                    observer.step_succeeded(index + 1, total, name, &output);
                    reports[index].status = StepStatus::Succeeded;
                    final_artifact = Some(output.clone());
                    reports[index].output = Some(output);
                }
                Err(err) => {
                    error!(step = name, error = %err, "step failed, halting pipeline");
                    observer.step_failed(index + 1, total, name, &err);
                    reports[index].status = StepStatus::Failed;
                    reports[index].error = Some(err.to_string());
                    return RunSummary {
                        period,
                        reports,
                        final_artifact: None,
                        dashboard_copy: None,
                    };
                }
            }
        }

        // Hand the final report to the presentation layer under a
        // stable name. The pipeline's own contract was fulfilled by
        // the combined artifact, so a copy failure only warns.
        let dashboard_copy = match self.ctx.store.publish_dashboard_copy(&self.ctx.token()) {
            Ok(path) => {
                info!(path = %path.display(), "dashboard data published");
                Some(path)
            }
            Err(err) => {
                warn!(error = %err, "failed to publish dashboard copy");
                None
            }
        };

        info!("pipeline completed successfully");
        RunSummary { period, reports, final_artifact, dashboard_copy }
    }
}

/// Convenience wrapper mirroring the one-call entry point used by the
/// CLI: build the standard pipeline and run it.
pub async fn run_standard(ctx: StepContext, observer: &dyn ProgressObserver) -> Result<RunSummary> {
    let pipeline = Pipeline::standard(ctx);
    let summary = pipeline.run(observer).await;
    Ok(summary)
}
