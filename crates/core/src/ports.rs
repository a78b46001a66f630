//! Port interfaces for the extraction pipeline
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use std::path::PathBuf;

use async_trait::async_trait;
use moduleo_domain::{
    AffaireDetail, AffaireRow, CombinedRow, DevisDetail, FactureDetail, Period, Result,
    SalePriceTotal, TempsPasse,
};

/// Named intermediate artifacts, in pipeline order.
///
/// Each step declares the artifact it produces; file naming is derived
/// here from the period's `YYYYMM` token, never from step names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArtifactKind {
    RawTempspasses,
    EnrichedTempspasses,
    UnassignedTempspasses,
    UniqueAffaires,
    AffaireTempspasses,
    SalePriceTotals,
    AffaireDetails,
    Combined,
}

impl ArtifactKind {
    /// Deterministic file name for this artifact and period token.
    pub fn file_name(&self, token: &str) -> String {
        match self {
            Self::RawTempspasses => format!("tempspasses_{token}_raw.csv"),
            Self::EnrichedTempspasses => format!("tempspasses_{token}_affaires.csv"),
            Self::UnassignedTempspasses => format!("sans_affaire_{token}.csv"),
            Self::UniqueAffaires => format!("unique_affaires_{token}.csv"),
            Self::AffaireTempspasses => format!("tempspasses_affaires_{token}.csv"),
            Self::SalePriceTotals => format!("prixventecollab_affaires_{token}.csv"),
            Self::AffaireDetails => format!("affaires_acteur_service_{token}.csv"),
            Self::Combined => format!("affaires_combinees_{token}.csv"),
        }
    }
}

/// Trait for the remote case-management API.
///
/// Implementations own authentication, chunking of batch calls and
/// the shared retry policy; results are already normalized into
/// fixed-field records. Chunked results are concatenated, but callers
/// must never rely on cross-chunk ordering — always re-key by id.
#[async_trait]
pub trait ModuleoApi: Send + Sync {
    /// Bulk time entries for the period, no affaire filter.
    async fn fetch_tempspasses(&self, period: &Period) -> Result<Vec<TempsPasse>>;

    /// Time entries scoped to a single affaire for the period.
    async fn fetch_affaire_tempspasses(
        &self,
        affaire_id: i64,
        period: &Period,
    ) -> Result<Vec<TempsPasse>>;

    /// Batched time-entry details by id.
    async fn fetch_tempspasses_multi(&self, ids: &[i64]) -> Result<Vec<TempsPasse>>;

    /// Batched affaire details by id.
    async fn fetch_affaires_multi(&self, ids: &[i64]) -> Result<Vec<AffaireDetail>>;

    /// Quote ids attached to an affaire; no quotes yields an empty
    /// list (including the remote 404 case).
    async fn fetch_affaire_devis_ids(&self, affaire_id: i64) -> Result<Vec<i64>>;

    /// Batched quote details by id.
    async fn fetch_devis_multi(&self, ids: &[i64]) -> Result<Vec<DevisDetail>>;

    /// Invoice ids attached to an affaire; no invoices yields an
    /// empty list (including the remote 404 case).
    async fn fetch_affaire_facture_ids(&self, affaire_id: i64) -> Result<Vec<i64>>;

    /// Batched invoice details by id.
    async fn fetch_factures_multi(&self, ids: &[i64]) -> Result<Vec<FactureDetail>>;
}

/// Trait for reading and writing the named intermediate artifacts.
///
/// Artifacts are immutable once written; the combined artifact is the
/// one exception and is atomically rewritten as integration steps
/// replace the columns they own.
pub trait ArtifactStore: Send + Sync {
    fn write_raw_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf>;
    fn read_raw_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>>;

    fn write_enriched_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf>;
    fn read_enriched_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>>;

    /// Entries whose affaire could not be resolved, segregated for
    /// manual inspection rather than dropped.
    fn write_unassigned_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf>;

    fn write_unique_affaires(&self, token: &str, ids: &[i64]) -> Result<PathBuf>;
    fn read_unique_affaires(&self, token: &str) -> Result<Vec<i64>>;

    fn write_affaire_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf>;
    fn read_affaire_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>>;

    fn write_sale_price_totals(&self, token: &str, rows: &[SalePriceTotal]) -> Result<PathBuf>;
    fn read_sale_price_totals(&self, token: &str) -> Result<Vec<SalePriceTotal>>;

    fn write_affaire_details(&self, token: &str, rows: &[AffaireRow]) -> Result<PathBuf>;
    fn read_affaire_details(&self, token: &str) -> Result<Vec<AffaireRow>>;

    fn write_combined(&self, token: &str, rows: &[CombinedRow]) -> Result<PathBuf>;
    fn read_combined(&self, token: &str) -> Result<Vec<CombinedRow>>;

    /// Copy the final combined artifact to the stable dashboard file.
    fn publish_dashboard_copy(&self, token: &str) -> Result<PathBuf>;
}
