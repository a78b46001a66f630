//! Wire-format records returned by the remote API.
//!
//! The API is inconsistent about field casing (`idAffaire` vs
//! `IdAffaire`) and sometimes returns bare ids where object lists are
//! expected. Everything is normalized here, at the gateway boundary,
//! so the rest of the pipeline only sees the domain records.

use moduleo_domain::{AffaireDetail, DevisDetail, FactureDetail, TempsPasse};
use serde::Deserialize;
use serde_json::Value;

/// A raw time-tracking record.
#[derive(Debug, Deserialize)]
pub(crate) struct TempsPasseWire {
    #[serde(default, alias = "idTempsPasse", alias = "IdTempsPasse", alias = "idPointage")]
    pub id: Option<i64>,
    #[serde(default, alias = "idAffaire", alias = "IdAffaire")]
    pub affaire_id: Option<i64>,
    #[serde(default, alias = "idCollaborateur", alias = "IdCollaborateur")]
    pub collaborator_id: Option<i64>,
    #[serde(default, alias = "PrixVenteCollaborateur", alias = "prixVenteCollaborateur")]
    pub sale_price: Option<f64>,
    #[serde(default, alias = "Date")]
    pub date: Option<String>,
}

impl TempsPasseWire {
    /// Records without an id cannot be joined downstream and are
    /// discarded.
    pub fn into_domain(self) -> Option<TempsPasse> {
        let id = self.id?;
        Some(TempsPasse {
            id,
            affaire_id: self.affaire_id,
            collaborator_id: self.collaborator_id,
            sale_price: self.sale_price,
            date: self.date,
        })
    }
}

/// One element of a per-affaire time-entry list, either a bare id or
/// a full record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TempsPasseEntry {
    Record(TempsPasseWire),
    Id(i64),
}

impl TempsPasseEntry {
    pub fn into_domain(self) -> Option<TempsPasse> {
        match self {
            Self::Record(wire) => wire.into_domain(),
            Self::Id(id) => Some(TempsPasse {
                id,
                affaire_id: None,
                collaborator_id: None,
                sale_price: None,
                date: None,
            }),
        }
    }
}

/// Affaire metadata from the batch detail endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct AffaireWire {
    #[serde(default, alias = "idAffaire", alias = "IdAffaire")]
    pub id: Option<i64>,
    #[serde(default, alias = "Numero", alias = "numero")]
    pub number: Option<String>,
    #[serde(default, alias = "Etat", alias = "etat")]
    pub state_code: Option<i64>,
    #[serde(default, alias = "Objet", alias = "objet")]
    pub subject: Option<String>,
    #[serde(default, alias = "IdService", alias = "idService")]
    pub service_id: Option<i64>,
    #[serde(default, alias = "IdActeurEnCharge", alias = "idActeurEnCharge")]
    pub collaborator_id: Option<i64>,
    #[serde(default, alias = "DateCloture", alias = "dateCloture")]
    pub closure_date: Option<String>,
}

impl AffaireWire {
    pub fn into_domain(self) -> Option<AffaireDetail> {
        let id = self.id?;
        Some(AffaireDetail {
            id,
            number: self.number,
            state_code: self.state_code,
            subject: self.subject,
            service_id: self.service_id,
            collaborator_id: self.collaborator_id,
            closure_date: self.closure_date,
        })
    }
}

/// Quote detail from the batch devis endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct DevisWire {
    #[serde(default, alias = "idDevis", alias = "IdDevis")]
    pub id: Option<i64>,
    #[serde(default, alias = "etat", alias = "Etat")]
    pub state_code: Option<i64>,
    #[serde(default, alias = "montantTotalHT", alias = "MontantTotalHT")]
    pub total_excl_tax: Option<f64>,
}

impl DevisWire {
    pub fn into_domain(self) -> Option<DevisDetail> {
        let id = self.id?;
        Some(DevisDetail { id, state_code: self.state_code, total_excl_tax: self.total_excl_tax })
    }
}

/// Invoice detail from the batch facture endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct FactureWire {
    #[serde(default, alias = "idFacture", alias = "IdFacture")]
    pub id: Option<i64>,
    #[serde(default, alias = "MontantTotalHT", alias = "montantTotalHT")]
    pub total_excl_tax: Option<f64>,
    #[serde(default, alias = "DateEmission", alias = "dateEmission")]
    pub issue_date: Option<String>,
}

impl FactureWire {
    pub fn into_domain(self) -> Option<FactureDetail> {
        let id = self.id?;
        Some(FactureDetail { id, total_excl_tax: self.total_excl_tax, issue_date: self.issue_date })
    }
}

/// One element of a child-id list (`/affaire/{id}/devis` and
/// `/affaire/{id}/factures`): a bare number, a digit string or an
/// object carrying the id under some casing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChildIdEntry {
    Id(i64),
    Text(String),
    Record(serde_json::Map<String, Value>),
}

impl ChildIdEntry {
    /// Extract the child id, matching `key` case-insensitively for
    /// object entries.
    pub fn id(&self, key: &str) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Text(raw) => raw.trim().parse().ok(),
            Self::Record(map) => map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .and_then(|(_, v)| value_as_i64(v)),
        }
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
