//! Shared test doubles for pipeline integration tests

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use moduleo_core::ports::{ArtifactKind, ArtifactStore, ModuleoApi};
use moduleo_domain::{
    AffaireDetail, AffaireRow, CombinedRow, DevisDetail, FactureDetail, ModuleoError, Period,
    Result, SalePriceTotal, TempsPasse,
};

/// In-memory API double serving canned data, keyed by id like the
/// real batch endpoints.
#[derive(Default)]
pub struct MockApi {
    pub tempspasses: Vec<TempsPasse>,
    pub entry_details: HashMap<i64, TempsPasse>,
    pub per_affaire: HashMap<i64, Vec<TempsPasse>>,
    pub affaires: HashMap<i64, AffaireDetail>,
    pub devis_by_affaire: HashMap<i64, Vec<i64>>,
    pub devis: HashMap<i64, DevisDetail>,
    pub factures_by_affaire: HashMap<i64, Vec<i64>>,
    pub factures: HashMap<i64, FactureDetail>,
    /// When set, the affaire detail fetch fails with a network error.
    pub fail_affaire_details: bool,
}

#[async_trait]
impl ModuleoApi for MockApi {
    async fn fetch_tempspasses(&self, _period: &Period) -> Result<Vec<TempsPasse>> {
        Ok(self.tempspasses.clone())
    }

    async fn fetch_affaire_tempspasses(
        &self,
        affaire_id: i64,
        _period: &Period,
    ) -> Result<Vec<TempsPasse>> {
        Ok(self.per_affaire.get(&affaire_id).cloned().unwrap_or_default())
    }

    async fn fetch_tempspasses_multi(&self, ids: &[i64]) -> Result<Vec<TempsPasse>> {
        Ok(ids.iter().filter_map(|id| self.entry_details.get(id).cloned()).collect())
    }

    async fn fetch_affaires_multi(&self, ids: &[i64]) -> Result<Vec<AffaireDetail>> {
        if self.fail_affaire_details {
            return Err(ModuleoError::Network("affaire detail endpoint unavailable".to_string()));
        }
        Ok(ids.iter().filter_map(|id| self.affaires.get(id).cloned()).collect())
    }

    async fn fetch_affaire_devis_ids(&self, affaire_id: i64) -> Result<Vec<i64>> {
        Ok(self.devis_by_affaire.get(&affaire_id).cloned().unwrap_or_default())
    }

    async fn fetch_devis_multi(&self, ids: &[i64]) -> Result<Vec<DevisDetail>> {
        Ok(ids.iter().filter_map(|id| self.devis.get(id).cloned()).collect())
    }

    async fn fetch_affaire_facture_ids(&self, affaire_id: i64) -> Result<Vec<i64>> {
        Ok(self.factures_by_affaire.get(&affaire_id).cloned().unwrap_or_default())
    }

    async fn fetch_factures_multi(&self, ids: &[i64]) -> Result<Vec<FactureDetail>> {
        Ok(ids.iter().filter_map(|id| self.factures.get(id).cloned()).collect())
    }
}

#[derive(Default)]
struct Artifacts {
    raw: HashMap<String, Vec<TempsPasse>>,
    enriched: HashMap<String, Vec<TempsPasse>>,
    unassigned: HashMap<String, Vec<TempsPasse>>,
    unique: HashMap<String, Vec<i64>>,
    per_affaire: HashMap<String, Vec<TempsPasse>>,
    totals: HashMap<String, Vec<SalePriceTotal>>,
    details: HashMap<String, Vec<AffaireRow>>,
    combined: HashMap<String, Vec<CombinedRow>>,
}

/// In-memory artifact store. Paths are synthesized from the artifact
/// names; reads of artifacts that were never written fail like a
/// missing file would.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Artifacts>,
}

impl MemoryStore {
    pub fn combined(&self, token: &str) -> Option<Vec<CombinedRow>> {
        self.inner.lock().unwrap().combined.get(token).cloned()
    }

    pub fn unique(&self, token: &str) -> Option<Vec<i64>> {
        self.inner.lock().unwrap().unique.get(token).cloned()
    }

    pub fn unassigned(&self, token: &str) -> Option<Vec<TempsPasse>> {
        self.inner.lock().unwrap().unassigned.get(token).cloned()
    }

    pub fn sale_price_totals(&self, token: &str) -> Option<Vec<SalePriceTotal>> {
        self.inner.lock().unwrap().totals.get(token).cloned()
    }

    fn path(kind: ArtifactKind, token: &str) -> PathBuf {
        PathBuf::from(kind.file_name(token))
    }

    fn missing(kind: ArtifactKind, token: &str) -> ModuleoError {
        ModuleoError::NotFound(format!("artifact {} not written", kind.file_name(token)))
    }
}

impl ArtifactStore for MemoryStore {
    fn write_raw_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.inner.lock().unwrap().raw.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::RawTempspasses, token))
    }

    fn read_raw_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>> {
        self.inner
            .lock()
            .unwrap()
            .raw
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::RawTempspasses, token))
    }

    fn write_enriched_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.inner.lock().unwrap().enriched.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::EnrichedTempspasses, token))
    }

    fn read_enriched_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>> {
        self.inner
            .lock()
            .unwrap()
            .enriched
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::EnrichedTempspasses, token))
    }

    fn write_unassigned_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.inner.lock().unwrap().unassigned.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::UnassignedTempspasses, token))
    }

    fn write_unique_affaires(&self, token: &str, ids: &[i64]) -> Result<PathBuf> {
        self.inner.lock().unwrap().unique.insert(token.to_string(), ids.to_vec());
        Ok(Self::path(ArtifactKind::UniqueAffaires, token))
    }

    fn read_unique_affaires(&self, token: &str) -> Result<Vec<i64>> {
        self.inner
            .lock()
            .unwrap()
            .unique
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::UniqueAffaires, token))
    }

    fn write_affaire_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.inner.lock().unwrap().per_affaire.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::AffaireTempspasses, token))
    }

    fn read_affaire_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>> {
        self.inner
            .lock()
            .unwrap()
            .per_affaire
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::AffaireTempspasses, token))
    }

    fn write_sale_price_totals(&self, token: &str, rows: &[SalePriceTotal]) -> Result<PathBuf> {
        self.inner.lock().unwrap().totals.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::SalePriceTotals, token))
    }

    fn read_sale_price_totals(&self, token: &str) -> Result<Vec<SalePriceTotal>> {
        self.inner
            .lock()
            .unwrap()
            .totals
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::SalePriceTotals, token))
    }

    fn write_affaire_details(&self, token: &str, rows: &[AffaireRow]) -> Result<PathBuf> {
        self.inner.lock().unwrap().details.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::AffaireDetails, token))
    }

    fn read_affaire_details(&self, token: &str) -> Result<Vec<AffaireRow>> {
        self.inner
            .lock()
            .unwrap()
            .details
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::AffaireDetails, token))
    }

    fn write_combined(&self, token: &str, rows: &[CombinedRow]) -> Result<PathBuf> {
        self.inner.lock().unwrap().combined.insert(token.to_string(), rows.to_vec());
        Ok(Self::path(ArtifactKind::Combined, token))
    }

    fn read_combined(&self, token: &str) -> Result<Vec<CombinedRow>> {
        self.inner
            .lock()
            .unwrap()
            .combined
            .get(token)
            .cloned()
            .ok_or_else(|| Self::missing(ArtifactKind::Combined, token))
    }

    fn publish_dashboard_copy(&self, token: &str) -> Result<PathBuf> {
        let inner = self.inner.lock().unwrap();
        if inner.combined.contains_key(token) {
            Ok(PathBuf::from("dashboard_data.csv"))
        } else {
            Err(Self::missing(ArtifactKind::Combined, token))
        }
    }
}

/// Builders for canned records.
pub fn entry(id: i64, date: &str) -> TempsPasse {
    TempsPasse {
        id,
        affaire_id: None,
        collaborator_id: Some(5),
        sale_price: None,
        date: Some(date.to_string()),
    }
}

pub fn entry_detail(id: i64, affaire_id: Option<i64>, sale_price: f64, date: &str) -> TempsPasse {
    TempsPasse {
        id,
        affaire_id,
        collaborator_id: Some(5),
        sale_price: Some(sale_price),
        date: Some(date.to_string()),
    }
}

pub fn affaire(id: i64, state_code: i64, closure_date: Option<&str>) -> AffaireDetail {
    AffaireDetail {
        id,
        number: Some(format!("AF-{id}")),
        state_code: Some(state_code),
        subject: Some("survey".to_string()),
        service_id: Some(3),
        collaborator_id: Some(5),
        closure_date: closure_date.map(str::to_string),
    }
}

pub fn devis(id: i64, state_code: i64, total: f64) -> DevisDetail {
    DevisDetail { id, state_code: Some(state_code), total_excl_tax: Some(total) }
}

pub fn facture(id: i64, total: f64, issue_date: &str) -> FactureDetail {
    FactureDetail { id, total_excl_tax: Some(total), issue_date: Some(issue_date.to_string()) }
}
