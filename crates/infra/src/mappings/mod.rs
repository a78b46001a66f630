//! Static lookup tables for service and collaborator labels.
//!
//! Loading is best effort: an absent or unreadable file logs a
//! warning and yields an empty table, the report then falls back to
//! raw numeric codes instead of failing the run.

use std::collections::HashMap;
use std::path::Path;

use moduleo_domain::{MappingTables, ModuleoError, PipelineConfig, Result};
use tracing::warn;

/// Load both lookup tables from the configured CSV files.
pub fn load_mapping_tables(pipeline: &PipelineConfig) -> MappingTables {
    let services = load_optional(pipeline.services_csv.as_deref(), "IdService", "Nom", "services");
    let collaborators = load_optional(
        pipeline.collaborators_csv.as_deref(),
        "Id",
        "Nom complet",
        "collaborators",
    );
    MappingTables::new(services, collaborators)
}

fn load_optional(
    path: Option<&Path>,
    id_column: &str,
    label_column: &str,
    what: &str,
) -> HashMap<i64, String> {
    let Some(path) = path else {
        return HashMap::new();
    };
    match load_csv_mapping(path, id_column, label_column) {
        Ok(map) => map,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to load {what} mapping, labels fall back to raw codes");
            HashMap::new()
        }
    }
}

/// Read an id→label CSV into a map, keyed by the named columns.
pub fn load_csv_mapping(
    path: &Path,
    id_column: &str,
    label_column: &str,
) -> Result<HashMap<i64, String>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| ModuleoError::Artifact(format!("cannot open {}: {err}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|err| ModuleoError::Artifact(format!("cannot read headers: {err}")))?
        .clone();
    let id_idx = headers.iter().position(|h| h == id_column).ok_or_else(|| {
        ModuleoError::DataShape(format!("mapping file {} lacks column {id_column}", path.display()))
    })?;
    let label_idx = headers.iter().position(|h| h == label_column).ok_or_else(|| {
        ModuleoError::DataShape(format!(
            "mapping file {} lacks column {label_column}",
            path.display()
        ))
    })?;

    let mut map = HashMap::new();
    for record in reader.records() {
        let record =
            record.map_err(|err| ModuleoError::Artifact(format!("bad mapping row: {err}")))?;
        let raw_id = record.get(id_idx).unwrap_or_default().trim();
        if raw_id.is_empty() {
            continue;
        }
        // Ids exported from spreadsheets sometimes carry a decimal part.
        let id = raw_id.parse::<f64>().map_err(|_| {
            ModuleoError::DataShape(format!("non-numeric id '{raw_id}' in {}", path.display()))
        })? as i64;
        let label = record.get(label_idx).unwrap_or_default().trim().to_string();
        map.insert(id, label);
    }
    Ok(map)
}
