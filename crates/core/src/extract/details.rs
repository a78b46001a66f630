//! Affaire detail extraction and the detail/price merge

use std::path::PathBuf;

use async_trait::async_trait;
use moduleo_domain::utils::parse_date_flexible;
use moduleo_domain::{AffaireRow, AffaireState, Result};
use tracing::debug;

use crate::merge;
use crate::pipeline::step::{PipelineStep, StepContext};
use crate::ports::ArtifactKind;

/// Batched detail lookup for the unique affaire set.
///
/// Applies the state-code mapping, the ClosedFinal reclassification
/// for closures after the period end, and the best-effort service and
/// collaborator label mappings.
pub struct DetailFetchStep;

#[async_trait]
impl PipelineStep for DetailFetchStep {
    fn name(&self) -> &'static str {
        "Fetch affaire details"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::AffaireDetails
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let affaire_ids = ctx.store.read_unique_affaires(&token)?;
        let details = ctx.api.fetch_affaires_multi(&affaire_ids).await?;
        debug!(requested = affaire_ids.len(), received = details.len(), "affaire details");

        let period_end = ctx.period.end();
        let rows: Vec<AffaireRow> = details
            .into_iter()
            .map(|detail| {
                let closure = detail.closure_date.as_deref().and_then(parse_date_flexible);
                let state = detail
                    .state_code
                    .map(|code| {
                        AffaireState::from_code(code).as_of_period_end(closure, period_end).label()
                    })
                    .unwrap_or_default();

                AffaireRow {
                    affaire_id: detail.id,
                    number: detail.number.unwrap_or_default(),
                    state,
                    subject: detail.subject.unwrap_or_default(),
                    service: ctx.mappings.service_label(detail.service_id),
                    collaborator: ctx.mappings.collaborator_label(detail.collaborator_id),
                    closure_date: detail.closure_date.unwrap_or_default(),
                }
            })
            .collect();

        merge::ensure_unique_ids(&rows, |r| r.affaire_id, "affaire detail fetch")?;
        ctx.store.write_affaire_details(&token, &rows)
    }
}

/// Inner-join the detail artifact with the sale-price sums into the
/// initial combined artifact.
pub struct DetailMergeStep;

#[async_trait]
impl PipelineStep for DetailMergeStep {
    fn name(&self) -> &'static str {
        "Merge details and prices"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::Combined
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let details = ctx.store.read_affaire_details(&token)?;
        let totals = ctx.store.read_sale_price_totals(&token)?;

        let combined = merge::inner_join_details(details, &totals)?;
        ctx.store.write_combined(&token, &combined)
    }
}
