//! Devis (quote) integration step

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use moduleo_domain::constants::DEVIS_STATE_ORDERED;
use moduleo_domain::Result;
use tracing::debug;

use crate::merge;
use crate::pipeline::step::{PipelineStep, StepContext};
use crate::ports::ArtifactKind;

/// Integrate ordered-quote totals into the combined artifact.
///
/// For every affaire in the unique set, collect its quote ids, batch
/// fetch the details, keep only ordered quotes (state code 0), sum
/// per affaire and left-merge into the combined artifact. The quote
/// column is replaced wholesale, so re-running the step never
/// accumulates.
pub struct DevisIntegrationStep;

#[async_trait]
impl PipelineStep for DevisIntegrationStep {
    fn name(&self) -> &'static str {
        "Integrate devis"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::Combined
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let affaire_ids = ctx.store.read_unique_affaires(&token)?;

        let mut affaire_by_devis: HashMap<i64, i64> = HashMap::new();
        let mut devis_ids: BTreeSet<i64> = BTreeSet::new();
        for affaire_id in &affaire_ids {
            for devis_id in ctx.api.fetch_affaire_devis_ids(*affaire_id).await? {
                affaire_by_devis.insert(devis_id, *affaire_id);
                devis_ids.insert(devis_id);
            }
        }

        let ids: Vec<i64> = devis_ids.into_iter().collect();
        let details = ctx.api.fetch_devis_multi(&ids).await?;

        let records: Vec<(i64, f64)> = details
            .iter()
            .filter(|d| d.state_code == Some(DEVIS_STATE_ORDERED))
            .filter_map(|d| {
                affaire_by_devis
                    .get(&d.id)
                    .map(|affaire_id| (*affaire_id, d.total_excl_tax.unwrap_or(0.0)))
            })
            .collect();
        debug!(quotes = details.len(), ordered = records.len(), "devis details fetched");

        let totals = merge::sum_by_affaire(&records);

        let mut combined = ctx.store.read_combined(&token)?;
        merge::ensure_unique_ids(&combined, |r| r.affaire_id, "combined artifact")?;
        merge::apply_devis_totals(&mut combined, &totals);

        ctx.store.write_combined(&token, &combined)
    }
}
