//! Join/merge engine for the combined artifact
//!
//! All joins are keyed by affaire id. Inputs from batched remote
//! calls carry no ordering guarantee, so every aggregation re-keys by
//! id before summing. Duplicate ids on a join side are a data-shape
//! error, never silently collapsed.

use std::collections::BTreeMap;

use moduleo_domain::utils::parse_date_flexible;
use moduleo_domain::{AffaireRow, CombinedRow, ModuleoError, Result, SalePriceTotal};

/// Per-affaire invoice aggregate: summed amount and latest issue date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactureAggregate {
    pub total: f64,
    pub last_date: String,
}

/// Verify that every id produced by `id` is unique within `items`.
pub fn ensure_unique_ids<T>(items: &[T], id: impl Fn(&T) -> i64, context: &str) -> Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for item in items {
        let id = id(item);
        if !seen.insert(id) {
            return Err(ModuleoError::DataShape(format!(
                "duplicate affaire id {id} in {context}"
            )));
        }
    }
    Ok(())
}

/// Sum amounts per affaire, order-independent.
pub fn sum_by_affaire(records: &[(i64, f64)]) -> BTreeMap<i64, f64> {
    let mut totals = BTreeMap::new();
    for (affaire_id, amount) in records {
        *totals.entry(*affaire_id).or_insert(0.0) += amount;
    }
    totals
}

/// Aggregate invoice records per affaire: amount sum plus the latest
/// parseable issue date. Records with unparseable dates still count
/// toward the sum.
pub fn facture_aggregates(records: &[(i64, f64, String)]) -> BTreeMap<i64, FactureAggregate> {
    let mut aggregates: BTreeMap<i64, FactureAggregate> = BTreeMap::new();
    let mut latest: BTreeMap<i64, chrono::NaiveDate> = BTreeMap::new();

    for (affaire_id, amount, issue_date) in records {
        let entry = aggregates.entry(*affaire_id).or_default();
        entry.total += amount;

        if let Some(date) = parse_date_flexible(issue_date) {
            let is_newer = latest.get(affaire_id).map_or(true, |current| date > *current);
            if is_newer {
                latest.insert(*affaire_id, date);
                entry.last_date = issue_date.clone();
            }
        }
    }
    aggregates
}

/// Inner-join affaire details with their sale-price sums into the
/// initial combined table. Both sides must be unique on affaire id;
/// details without a price row (or vice versa) are dropped, matching
/// the inner-join contract of the detail merge.
pub fn inner_join_details(
    details: Vec<AffaireRow>,
    totals: &[SalePriceTotal],
) -> Result<Vec<CombinedRow>> {
    ensure_unique_ids(&details, |d| d.affaire_id, "affaire details")?;
    ensure_unique_ids(totals, |t| t.affaire_id, "sale-price totals")?;

    let totals: BTreeMap<i64, f64> =
        totals.iter().map(|t| (t.affaire_id, t.sale_price_total)).collect();

    Ok(details
        .into_iter()
        .filter_map(|detail| {
            totals.get(&detail.affaire_id).map(|total| CombinedRow::from_parts(detail, *total))
        })
        .collect())
}

/// Replace the devis column across the combined table: every row gets
/// its summed ordered-quote total, or 0.0 when the affaire has none.
/// Left-merge semantics — no row is ever dropped, and rerunning with
/// the same totals is idempotent.
pub fn apply_devis_totals(rows: &mut [CombinedRow], totals: &BTreeMap<i64, f64>) {
    for row in rows {
        row.devis_total_ht = totals.get(&row.affaire_id).copied().unwrap_or(0.0);
    }
}

/// Replace the facture columns across the combined table; affaires
/// with no invoices get 0.0 and an empty date.
pub fn apply_facture_aggregates(
    rows: &mut [CombinedRow],
    aggregates: &BTreeMap<i64, FactureAggregate>,
) {
    for row in rows {
        match aggregates.get(&row.affaire_id) {
            Some(agg) => {
                row.factures_total_ht = agg.total;
                row.last_facture_date = agg.last_date.clone();
            }
            None => {
                row.factures_total_ht = 0.0;
                row.last_facture_date = String::new();
            }
        }
    }
}
