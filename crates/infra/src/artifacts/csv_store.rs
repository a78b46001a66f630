//! CSV-backed artifact store.
//!
//! Extraction artifacts (time entries, unique ids, price totals) are
//! plain comma-separated files. The detail and combined artifacts use
//! the downstream reporting convention instead: semicolon separator
//! and decimal comma. Every write goes through a temp file and rename
//! so a failed step never leaves a half-written artifact behind.

use std::fs;
use std::path::PathBuf;

use moduleo_core::{ArtifactKind, ArtifactStore};
use moduleo_domain::constants::DASHBOARD_DATA_FILE;
use moduleo_domain::{
    AffaireRow, CombinedRow, ModuleoError, Result, SalePriceTotal, TempsPasse,
};
use tracing::debug;

use crate::errors::InfraError;

const TEMPSPASSE_HEADERS: [&str; 5] =
    ["idTempsPasse", "idAffaire", "idCollaborateur", "PrixVenteCollaborateur", "Date"];
const DETAIL_HEADERS: [&str; 7] =
    ["idAffaire", "Numero", "Etat", "Objet", "Service", "Collaborateur", "DateCloture"];
const COMBINED_HEADERS: [&str; 11] = [
    "idAffaire",
    "Numero",
    "Etat",
    "Objet",
    "Service",
    "Collaborateur",
    "DateCloture",
    "PrixVenteCollaborateur",
    "MontantTotalHT",
    "MontantFacturesHT",
    "DateEmission_Facture",
];

/// Artifact store writing one CSV per artifact into a run directory.
pub struct CsvArtifactStore {
    output_dir: PathBuf,
}

impl CsvArtifactStore {
    /// Create a store rooted at `output_dir`, creating it if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|err| {
            let infra: InfraError = err.into();
            ModuleoError::from(infra)
        })?;
        Ok(Self { output_dir })
    }

    /// Path an artifact lands at for a given period token.
    pub fn artifact_path(&self, kind: ArtifactKind, token: &str) -> PathBuf {
        self.output_dir.join(kind.file_name(token))
    }

    fn write_rows<I>(
        &self,
        kind: ArtifactKind,
        token: &str,
        delimiter: u8,
        headers: &[&str],
        rows: I,
    ) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let path = self.artifact_path(kind, token);
        let tmp = path.with_extension("csv.tmp");

        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_path(&tmp)
                .map_err(into_domain)?;
            writer.write_record(headers).map_err(into_domain)?;
            for row in rows {
                writer.write_record(&row).map_err(into_domain)?;
            }
            writer.flush().map_err(|err| {
                let infra: InfraError = err.into();
                ModuleoError::from(infra)
            })?;
        }

        fs::rename(&tmp, &path).map_err(|err| {
            let infra: InfraError = err.into();
            ModuleoError::from(infra)
        })?;
        debug!(path = %path.display(), "artifact written");
        Ok(path)
    }

    fn read_rows(
        &self,
        kind: ArtifactKind,
        token: &str,
        delimiter: u8,
    ) -> Result<(Vec<String>, Vec<csv::StringRecord>)> {
        let path = self.artifact_path(kind, token);
        if !path.exists() {
            return Err(ModuleoError::NotFound(format!(
                "artifact not found: {}",
                path.display()
            )));
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(&path)
            .map_err(into_domain)?;
        let headers =
            reader.headers().map_err(into_domain)?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record.map_err(into_domain)?);
        }
        Ok((headers, records))
    }

    fn write_tempspasses(
        &self,
        kind: ArtifactKind,
        token: &str,
        rows: &[TempsPasse],
    ) -> Result<PathBuf> {
        self.write_rows(
            kind,
            token,
            b',',
            &TEMPSPASSE_HEADERS,
            rows.iter().map(|row| {
                vec![
                    row.id.to_string(),
                    opt_to_field(row.affaire_id),
                    opt_to_field(row.collaborator_id),
                    row.sale_price.map(|v| v.to_string()).unwrap_or_default(),
                    row.date.clone().unwrap_or_default(),
                ]
            }),
        )
    }

    fn read_tempspasses(&self, kind: ArtifactKind, token: &str) -> Result<Vec<TempsPasse>> {
        let (headers, records) = self.read_rows(kind, token, b',')?;
        let cols = Columns::new(&headers);
        records
            .iter()
            .map(|record| {
                Ok(TempsPasse {
                    id: cols.required_i64(record, "idTempsPasse")?,
                    affaire_id: cols.opt_i64(record, "idAffaire")?,
                    collaborator_id: cols.opt_i64(record, "idCollaborateur")?,
                    sale_price: cols.opt_f64(record, "PrixVenteCollaborateur", b',')?,
                    date: cols.opt_string(record, "Date"),
                })
            })
            .collect()
    }
}

impl ArtifactStore for CsvArtifactStore {
    fn write_raw_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.write_tempspasses(ArtifactKind::RawTempspasses, token, rows)
    }

    fn read_raw_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>> {
        self.read_tempspasses(ArtifactKind::RawTempspasses, token)
    }

    fn write_enriched_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.write_tempspasses(ArtifactKind::EnrichedTempspasses, token, rows)
    }

    fn read_enriched_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>> {
        self.read_tempspasses(ArtifactKind::EnrichedTempspasses, token)
    }

    fn write_unassigned_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.write_tempspasses(ArtifactKind::UnassignedTempspasses, token, rows)
    }

    fn write_unique_affaires(&self, token: &str, ids: &[i64]) -> Result<PathBuf> {
        self.write_rows(
            ArtifactKind::UniqueAffaires,
            token,
            b',',
            &["idAffaire"],
            ids.iter().map(|id| vec![id.to_string()]),
        )
    }

    fn read_unique_affaires(&self, token: &str) -> Result<Vec<i64>> {
        let (headers, records) = self.read_rows(ArtifactKind::UniqueAffaires, token, b',')?;
        let cols = Columns::new(&headers);
        records.iter().map(|record| cols.required_i64(record, "idAffaire")).collect()
    }

    fn write_affaire_tempspasses(&self, token: &str, rows: &[TempsPasse]) -> Result<PathBuf> {
        self.write_tempspasses(ArtifactKind::AffaireTempspasses, token, rows)
    }

    fn read_affaire_tempspasses(&self, token: &str) -> Result<Vec<TempsPasse>> {
        self.read_tempspasses(ArtifactKind::AffaireTempspasses, token)
    }

    fn write_sale_price_totals(&self, token: &str, rows: &[SalePriceTotal]) -> Result<PathBuf> {
        self.write_rows(
            ArtifactKind::SalePriceTotals,
            token,
            b',',
            &["idAffaire", "PrixVenteCollaborateur"],
            rows.iter().map(|row| vec![row.affaire_id.to_string(), row.sale_price_total.to_string()]),
        )
    }

    fn read_sale_price_totals(&self, token: &str) -> Result<Vec<SalePriceTotal>> {
        let (headers, records) = self.read_rows(ArtifactKind::SalePriceTotals, token, b',')?;
        let cols = Columns::new(&headers);
        records
            .iter()
            .map(|record| {
                Ok(SalePriceTotal {
                    affaire_id: cols.required_i64(record, "idAffaire")?,
                    sale_price_total: cols
                        .opt_f64(record, "PrixVenteCollaborateur", b',')?
                        .unwrap_or(0.0),
                })
            })
            .collect()
    }

    fn write_affaire_details(&self, token: &str, rows: &[AffaireRow]) -> Result<PathBuf> {
        self.write_rows(
            ArtifactKind::AffaireDetails,
            token,
            b';',
            &DETAIL_HEADERS,
            rows.iter().map(|row| {
                vec![
                    row.affaire_id.to_string(),
                    row.number.clone(),
                    row.state.clone(),
                    row.subject.clone(),
                    row.service.clone(),
                    row.collaborator.clone(),
                    row.closure_date.clone(),
                ]
            }),
        )
    }

    fn read_affaire_details(&self, token: &str) -> Result<Vec<AffaireRow>> {
        let (headers, records) = self.read_rows(ArtifactKind::AffaireDetails, token, b';')?;
        let cols = Columns::new(&headers);
        records
            .iter()
            .map(|record| {
                Ok(AffaireRow {
                    affaire_id: cols.required_i64(record, "idAffaire")?,
                    number: cols.opt_string(record, "Numero").unwrap_or_default(),
                    state: cols.opt_string(record, "Etat").unwrap_or_default(),
                    subject: cols.opt_string(record, "Objet").unwrap_or_default(),
                    service: cols.opt_string(record, "Service").unwrap_or_default(),
                    collaborator: cols.opt_string(record, "Collaborateur").unwrap_or_default(),
                    closure_date: cols.opt_string(record, "DateCloture").unwrap_or_default(),
                })
            })
            .collect()
    }

    fn write_combined(&self, token: &str, rows: &[CombinedRow]) -> Result<PathBuf> {
        self.write_rows(
            ArtifactKind::Combined,
            token,
            b';',
            &COMBINED_HEADERS,
            rows.iter().map(|row| {
                vec![
                    row.affaire_id.to_string(),
                    row.number.clone(),
                    row.state.clone(),
                    row.subject.clone(),
                    row.service.clone(),
                    row.collaborator.clone(),
                    row.closure_date.clone(),
                    decimal_comma(row.sale_price_total),
                    decimal_comma(row.devis_total_ht),
                    decimal_comma(row.factures_total_ht),
                    row.last_facture_date.clone(),
                ]
            }),
        )
    }

    fn read_combined(&self, token: &str) -> Result<Vec<CombinedRow>> {
        let (headers, records) = self.read_rows(ArtifactKind::Combined, token, b';')?;
        let cols = Columns::new(&headers);
        records
            .iter()
            .map(|record| {
                Ok(CombinedRow {
                    affaire_id: cols.required_i64(record, "idAffaire")?,
                    number: cols.opt_string(record, "Numero").unwrap_or_default(),
                    state: cols.opt_string(record, "Etat").unwrap_or_default(),
                    subject: cols.opt_string(record, "Objet").unwrap_or_default(),
                    service: cols.opt_string(record, "Service").unwrap_or_default(),
                    collaborator: cols.opt_string(record, "Collaborateur").unwrap_or_default(),
                    closure_date: cols.opt_string(record, "DateCloture").unwrap_or_default(),
                    sale_price_total: cols
                        .opt_f64(record, "PrixVenteCollaborateur", b';')?
                        .unwrap_or(0.0),
                    devis_total_ht: cols.opt_f64(record, "MontantTotalHT", b';')?.unwrap_or(0.0),
                    factures_total_ht: cols
                        .opt_f64(record, "MontantFacturesHT", b';')?
                        .unwrap_or(0.0),
                    last_facture_date: cols
                        .opt_string(record, "DateEmission_Facture")
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    fn publish_dashboard_copy(&self, token: &str) -> Result<PathBuf> {
        let combined = self.artifact_path(ArtifactKind::Combined, token);
        if !combined.exists() {
            return Err(ModuleoError::NotFound(format!(
                "combined artifact not found: {}",
                combined.display()
            )));
        }
        let target = self.output_dir.join(DASHBOARD_DATA_FILE);
        fs::copy(&combined, &target).map_err(|err| {
            let infra: InfraError = err.into();
            ModuleoError::from(infra)
        })?;
        Ok(target)
    }
}

/// Header-name to index lookup for one artifact file.
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn new(headers: &[String]) -> Self {
        Self { headers: headers.to_vec() }
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn opt_string(&self, record: &csv::StringRecord, name: &str) -> Option<String> {
        let raw = record.get(self.index(name)?)?.trim();
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }

    fn opt_i64(&self, record: &csv::StringRecord, name: &str) -> Result<Option<i64>> {
        match self.opt_string(record, name) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .map(|v| Some(v as i64))
                .map_err(|_| ModuleoError::Artifact(format!("column {name} holds non-numeric value '{raw}'"))),
        }
    }

    fn required_i64(&self, record: &csv::StringRecord, name: &str) -> Result<i64> {
        self.opt_i64(record, name)?
            .ok_or_else(|| ModuleoError::Artifact(format!("column {name} is missing or empty")))
    }

    fn opt_f64(
        &self,
        record: &csv::StringRecord,
        name: &str,
        delimiter: u8,
    ) -> Result<Option<f64>> {
        match self.opt_string(record, name) {
            None => Ok(None),
            Some(raw) => {
                // Semicolon artifacts store decimals with a comma.
                let normalized =
                    if delimiter == b';' { raw.replace(',', ".") } else { raw.clone() };
                normalized.parse::<f64>().map(Some).map_err(|_| {
                    ModuleoError::Artifact(format!("column {name} holds non-numeric value '{raw}'"))
                })
            }
        }
    }
}

fn opt_to_field(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render a float with a decimal comma for the semicolon artifacts.
fn decimal_comma(value: f64) -> String {
    value.to_string().replace('.', ",")
}

fn into_domain(err: csv::Error) -> ModuleoError {
    let infra: InfraError = err.into();
    ModuleoError::from(infra)
}
