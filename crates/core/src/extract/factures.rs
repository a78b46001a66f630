//! Facture (invoice) integration step

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use moduleo_domain::Result;
use tracing::debug;

use crate::merge;
use crate::pipeline::step::{PipelineStep, StepContext};
use crate::ports::ArtifactKind;

/// Integrate invoice aggregates into the combined artifact.
///
/// Symmetric to the devis step: collect invoice ids per affaire (an
/// affaire without invoices yields an empty list), batch fetch the
/// details, aggregate amount sum plus latest issue date per affaire,
/// and left-merge, replacing both facture columns.
pub struct FactureIntegrationStep;

#[async_trait]
impl PipelineStep for FactureIntegrationStep {
    fn name(&self) -> &'static str {
        "Integrate factures"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::Combined
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let affaire_ids = ctx.store.read_unique_affaires(&token)?;

        let mut affaire_by_facture: HashMap<i64, i64> = HashMap::new();
        let mut facture_ids: BTreeSet<i64> = BTreeSet::new();
        for affaire_id in &affaire_ids {
            for facture_id in ctx.api.fetch_affaire_facture_ids(*affaire_id).await? {
                affaire_by_facture.insert(facture_id, *affaire_id);
                facture_ids.insert(facture_id);
            }
        }

        let ids: Vec<i64> = facture_ids.into_iter().collect();
        let details = ctx.api.fetch_factures_multi(&ids).await?;
        debug!(invoices = details.len(), "facture details fetched");

        let records: Vec<(i64, f64, String)> = details
            .iter()
            .filter_map(|d| {
                affaire_by_facture.get(&d.id).map(|affaire_id| {
                    (
                        *affaire_id,
                        d.total_excl_tax.unwrap_or(0.0),
                        d.issue_date.clone().unwrap_or_default(),
                    )
                })
            })
            .collect();

        let aggregates = merge::facture_aggregates(&records);

        let mut combined = ctx.store.read_combined(&token)?;
        merge::ensure_unique_ids(&combined, |r| r.affaire_id, "combined artifact")?;
        merge::apply_facture_aggregates(&mut combined, &aggregates);

        ctx.store.write_combined(&token, &combined)
    }
}
