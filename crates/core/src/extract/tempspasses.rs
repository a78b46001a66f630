//! Time-entry (tempspasse) extraction steps
//!
//! Five steps: raw bulk fetch, affaire enrichment, unique-affaire
//! extraction, per-affaire re-fetch and sale-price aggregation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use moduleo_domain::constants::is_excluded_affaire;
use moduleo_domain::utils::parse_date_flexible;
use moduleo_domain::{Result, SalePriceTotal, TempsPasse};
use tracing::{debug, warn};

use crate::pipeline::step::{PipelineStep, StepContext};
use crate::ports::ArtifactKind;

/// Bulk fetch of every time entry in the period, no affaire filter.
pub struct RawFetchStep;

#[async_trait]
impl PipelineStep for RawFetchStep {
    fn name(&self) -> &'static str {
        "Import time entries"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::RawTempspasses
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let entries = ctx.api.fetch_tempspasses(&ctx.period).await?;
        debug!(entries = entries.len(), "fetched raw time entries");
        ctx.store.write_raw_tempspasses(&ctx.token(), &entries)
    }
}

/// Resolve the owning affaire of every raw entry via batched detail
/// lookups. Entries whose affaire cannot be resolved are segregated
/// into the unassigned artifact, never dropped silently.
pub struct EnrichStep;

#[async_trait]
impl PipelineStep for EnrichStep {
    fn name(&self) -> &'static str {
        "Enrich entries with affaires"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::EnrichedTempspasses
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let raw = ctx.store.read_raw_tempspasses(&token)?;

        let ids: Vec<i64> = raw.iter().map(|e| e.id).collect();
        let details = ctx.api.fetch_tempspasses_multi(&ids).await?;

        // Re-key by entry id; chunked results carry no order guarantee.
        let affaire_by_entry: HashMap<i64, i64> =
            details.iter().filter_map(|d| d.affaire_id.map(|aid| (d.id, aid))).collect();

        let enriched: Vec<TempsPasse> = raw
            .into_iter()
            .map(|mut entry| {
                entry.affaire_id = affaire_by_entry.get(&entry.id).copied();
                entry
            })
            .collect();

        let unassigned: Vec<TempsPasse> =
            enriched.iter().filter(|e| e.affaire_id.is_none()).cloned().collect();
        if !unassigned.is_empty() {
            warn!(count = unassigned.len(), "entries without a resolvable affaire");
        }
        ctx.store.write_unassigned_tempspasses(&token, &unassigned)?;

        ctx.store.write_enriched_tempspasses(&token, &enriched)
    }
}

/// Distinct, sorted affaire ids from the enriched entries, minus the
/// permanent exclusion set.
pub struct UniqueStep;

#[async_trait]
impl PipelineStep for UniqueStep {
    fn name(&self) -> &'static str {
        "Export unique affaires"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::UniqueAffaires
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let enriched = ctx.store.read_enriched_tempspasses(&token)?;

        let unique: Vec<i64> = enriched
            .iter()
            .filter_map(|e| e.affaire_id)
            .filter(|id| !is_excluded_affaire(*id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(affaires = unique.len(), "unique affaires for period");
        ctx.store.write_unique_affaires(&token, &unique)
    }
}

/// Re-fetch time entries scoped per affaire for the same period.
///
/// Deliberately not reusing the global fetch: the per-affaire endpoint
/// is the authoritative source for an affaire's entries.
pub struct PerAffaireFetchStep;

#[async_trait]
impl PipelineStep for PerAffaireFetchStep {
    fn name(&self) -> &'static str {
        "Fetch time entries per affaire"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::AffaireTempspasses
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let affaire_ids = ctx.store.read_unique_affaires(&token)?;

        let mut all_entries = Vec::new();
        for affaire_id in affaire_ids {
            let mut entries = ctx.api.fetch_affaire_tempspasses(affaire_id, &ctx.period).await?;
            for entry in &mut entries {
                entry.affaire_id = Some(affaire_id);
            }
            all_entries.append(&mut entries);
        }

        ctx.store.write_affaire_tempspasses(&token, &all_entries)
    }
}

/// Compute the per-affaire sale-price sum.
///
/// Entry details are re-fetched in batch; any entry whose own date
/// falls strictly after the period end is excluded from the sum (a
/// look-ahead guard against late-arriving mis-dated records). The
/// affaire still appears with a 0.0 sum when all its entries are
/// filtered out.
pub struct SalePriceStep;

#[async_trait]
impl PipelineStep for SalePriceStep {
    fn name(&self) -> &'static str {
        "Aggregate sale prices"
    }

    fn produces(&self) -> ArtifactKind {
        ArtifactKind::SalePriceTotals
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf> {
        let token = ctx.token();
        let entries = ctx.store.read_affaire_tempspasses(&token)?;

        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        let details = ctx.api.fetch_tempspasses_multi(&ids).await?;
        let details_by_id: HashMap<i64, &TempsPasse> =
            details.iter().map(|d| (d.id, d)).collect();

        let period_end = ctx.period.end();
        let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
        let mut dropped = 0usize;

        for entry in &entries {
            let Some(affaire_id) = entry.affaire_id else {
                continue;
            };
            let sum = totals.entry(affaire_id).or_insert(0.0);

            let Some(detail) = details_by_id.get(&entry.id) else {
                continue;
            };
            let entry_date = detail.date.as_deref().and_then(parse_date_flexible);
            if entry_date.is_some_and(|d| d > period_end) {
                dropped += 1;
                continue;
            }
            *sum += detail.sale_price.unwrap_or(0.0);
        }

        if dropped > 0 {
            warn!(dropped, "entries dated after period end excluded from sale-price sums");
        }

        let rows: Vec<SalePriceTotal> = totals
            .into_iter()
            .map(|(affaire_id, sale_price_total)| SalePriceTotal { affaire_id, sale_price_total })
            .collect();

        ctx.store.write_sale_price_totals(&token, &rows)
    }
}
