//! Common data types used throughout the pipeline

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{ModuleoError, Result};

/// Inclusive report period, calendar-day granularity.
///
/// The period start also determines the `YYYYMM` token used to name
/// every intermediate artifact of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

/// Date format used by the remote API and the CLI (`DD/MM/YYYY`).
pub const API_DATE_FORMAT: &str = "%d/%m/%Y";

impl Period {
    /// Create a period, rejecting inverted bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ModuleoError::InvalidInput(format!(
                "period start {start} is after period end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a period from `DD/MM/YYYY` bounds.
    pub fn parse(date_min: &str, date_max: &str) -> Result<Self> {
        let start = parse_api_date(date_min)?;
        let end = parse_api_date(date_max)?;
        Self::new(start, end)
    }

    /// The previous calendar month relative to `today`, first day to
    /// last day. Default period when the CLI is given no dates.
    pub fn previous_month(today: NaiveDate) -> Self {
        let first_of_current = today.with_day(1).unwrap_or(today);
        let last_prev = first_of_current.pred_opt().unwrap_or(first_of_current);
        let first_prev = last_prev.with_day(1).unwrap_or(last_prev);
        Self { start: first_prev, end: last_prev }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `YYYYMM` token derived from the period start, used in artifact
    /// file names.
    pub fn token(&self) -> String {
        self.start.format("%Y%m").to_string()
    }

    /// Period start in the API's `DD/MM/YYYY` form.
    pub fn date_min(&self) -> String {
        self.start.format(API_DATE_FORMAT).to_string()
    }

    /// Period end in the API's `DD/MM/YYYY` form.
    pub fn date_max(&self) -> String {
        self.end.format(API_DATE_FORMAT).to_string()
    }

    /// Whether the period spans more than a year. Long periods are
    /// allowed but worth a warning at the CLI edge.
    pub fn is_unusually_long(&self) -> bool {
        self.start.checked_add_months(Months::new(12)).is_some_and(|limit| self.end >= limit)
    }
}

fn parse_api_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), API_DATE_FORMAT)
        .map_err(|_| ModuleoError::InvalidInput(format!("invalid date '{raw}', expected DD/MM/YYYY")))
}

/// Affaire lifecycle state, mapped from the API's numeric codes.
///
/// Unknown codes are carried through as [`AffaireState::Other`] so a
/// new upstream state degrades to a raw code in the report instead of
/// failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffaireState {
    Created,
    Pending,
    Accepted,
    InProduction,
    Closed,
    Suspended,
    ClosedFinal,
    Cancelled,
    Other(i64),
}

impl AffaireState {
    /// Map the API state code to a state.
    pub fn from_code(code: i64) -> Self {
        match code {
            4 => Self::Created,
            8 => Self::Pending,
            7 => Self::Accepted,
            1 => Self::InProduction,
            5 => Self::Closed,
            9 => Self::Suspended,
            2 => Self::ClosedFinal,
            6 => Self::Cancelled,
            other => Self::Other(other),
        }
    }

    /// Label written to report artifacts. Unknown codes render as the
    /// raw number, downstream consumers must tolerate either.
    pub fn label(&self) -> String {
        match self {
            Self::Created => "Created".to_string(),
            Self::Pending => "Pending".to_string(),
            Self::Accepted => "Accepted".to_string(),
            Self::InProduction => "InProduction".to_string(),
            Self::Closed => "Closed".to_string(),
            Self::Suspended => "Suspended".to_string(),
            Self::ClosedFinal => "ClosedFinal".to_string(),
            Self::Cancelled => "Cancelled".to_string(),
            Self::Other(code) => code.to_string(),
        }
    }

    /// State as of the period end.
    ///
    /// An affaire reported ClosedFinal whose closure date falls
    /// strictly after the period end was still in production during
    /// the reported period, so it is reclassified.
    pub fn as_of_period_end(self, closure_date: Option<NaiveDate>, period_end: NaiveDate) -> Self {
        match (self, closure_date) {
            (Self::ClosedFinal, Some(closed)) if closed > period_end => Self::InProduction,
            (state, _) => state,
        }
    }
}

/// A single time-tracking record (tempspasse), normalized at the
/// gateway boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempsPasse {
    pub id: i64,
    /// Owning affaire; absent on raw bulk fetches until the
    /// enrichment step resolves it.
    pub affaire_id: Option<i64>,
    pub collaborator_id: Option<i64>,
    pub sale_price: Option<f64>,
    /// Entry date as reported by the API (ISO or `DD/MM/YYYY`); kept
    /// raw and parsed on demand.
    pub date: Option<String>,
}

/// Affaire metadata as returned by the batch detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffaireDetail {
    pub id: i64,
    pub number: Option<String>,
    pub state_code: Option<i64>,
    pub subject: Option<String>,
    pub service_id: Option<i64>,
    pub collaborator_id: Option<i64>,
    pub closure_date: Option<String>,
}

/// Quote (devis) detail. Only ordered quotes (state code 0) count
/// toward revenue totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevisDetail {
    pub id: i64,
    pub state_code: Option<i64>,
    pub total_excl_tax: Option<f64>,
}

/// Invoice (facture) detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactureDetail {
    pub id: i64,
    pub total_excl_tax: Option<f64>,
    pub issue_date: Option<String>,
}

/// Per-affaire sale-price sum, output of the aggregation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalePriceTotal {
    pub affaire_id: i64,
    pub sale_price_total: f64,
}

/// One affaire row of the detail artifact: metadata with state,
/// service and collaborator already rendered as labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffaireRow {
    pub affaire_id: i64,
    pub number: String,
    pub state: String,
    pub subject: String,
    pub service: String,
    pub collaborator: String,
    pub closure_date: String,
}

/// One row of the combined report, one per unique affaire.
///
/// The devis/facture columns default to zero/empty until their
/// integration steps fill them; re-running an integration step
/// replaces its columns rather than accumulating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub affaire_id: i64,
    pub number: String,
    pub state: String,
    pub subject: String,
    pub service: String,
    pub collaborator: String,
    pub closure_date: String,
    pub sale_price_total: f64,
    pub devis_total_ht: f64,
    pub factures_total_ht: f64,
    pub last_facture_date: String,
}

impl CombinedRow {
    /// Build the initial combined row from affaire metadata and its
    /// sale-price sum, integration columns at their defaults.
    pub fn from_parts(affaire: AffaireRow, sale_price_total: f64) -> Self {
        Self {
            affaire_id: affaire.affaire_id,
            number: affaire.number,
            state: affaire.state,
            subject: affaire.subject,
            service: affaire.service,
            collaborator: affaire.collaborator,
            closure_date: affaire.closure_date,
            sale_price_total,
            devis_total_ht: 0.0,
            factures_total_ht: 0.0,
            last_facture_date: String::new(),
        }
    }
}

/// Static lookup tables loaded once at startup.
///
/// Lookups are best effort: a missing key renders the raw numeric
/// code, never an error, so report columns may hold either a label or
/// a code.
#[derive(Debug, Clone, Default)]
pub struct MappingTables {
    pub services: HashMap<i64, String>,
    pub collaborators: HashMap<i64, String>,
}

impl MappingTables {
    pub fn new(services: HashMap<i64, String>, collaborators: HashMap<i64, String>) -> Self {
        Self { services, collaborators }
    }

    /// Service label for an id, falling back to the raw code.
    pub fn service_label(&self, id: Option<i64>) -> String {
        best_effort(&self.services, id)
    }

    /// Collaborator full name for an id, falling back to the raw code.
    pub fn collaborator_label(&self, id: Option<i64>) -> String {
        best_effort(&self.collaborators, id)
    }
}

fn best_effort(map: &HashMap<i64, String>, id: Option<i64>) -> String {
    match id {
        Some(id) => map.get(&id).cloned().unwrap_or_else(|| id.to_string()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_token_comes_from_start_date() {
        let period = Period::parse("01/07/2025", "31/07/2025").unwrap();
        assert_eq!(period.token(), "202507");
        assert_eq!(period.date_min(), "01/07/2025");
        assert_eq!(period.date_max(), "31/07/2025");
    }

    #[test]
    fn period_rejects_inverted_bounds() {
        let result = Period::parse("31/07/2025", "01/07/2025");
        assert!(matches!(result, Err(ModuleoError::InvalidInput(_))));
    }

    #[test]
    fn period_rejects_malformed_dates() {
        assert!(Period::parse("2025-07-01", "2025-07-31").is_err());
        assert!(Period::parse("32/07/2025", "31/07/2025").is_err());
    }

    #[test]
    fn previous_month_spans_full_month() {
        let period = Period::previous_month(date(2025, 8, 15));
        assert_eq!(period.start(), date(2025, 7, 1));
        assert_eq!(period.end(), date(2025, 7, 31));

        // January rolls back across the year boundary
        let period = Period::previous_month(date(2025, 1, 3));
        assert_eq!(period.start(), date(2024, 12, 1));
        assert_eq!(period.end(), date(2024, 12, 31));
    }

    #[test]
    fn state_codes_map_to_labels() {
        assert_eq!(AffaireState::from_code(4), AffaireState::Created);
        assert_eq!(AffaireState::from_code(8), AffaireState::Pending);
        assert_eq!(AffaireState::from_code(7), AffaireState::Accepted);
        assert_eq!(AffaireState::from_code(1), AffaireState::InProduction);
        assert_eq!(AffaireState::from_code(5), AffaireState::Closed);
        assert_eq!(AffaireState::from_code(9), AffaireState::Suspended);
        assert_eq!(AffaireState::from_code(2), AffaireState::ClosedFinal);
        assert_eq!(AffaireState::from_code(6), AffaireState::Cancelled);
    }

    #[test]
    fn unknown_state_code_keeps_raw_value() {
        let state = AffaireState::from_code(42);
        assert_eq!(state, AffaireState::Other(42));
        assert_eq!(state.label(), "42");
    }

    #[test]
    fn closed_final_after_period_end_is_reclassified() {
        let end = date(2025, 7, 31);
        let state = AffaireState::ClosedFinal;

        assert_eq!(
            state.as_of_period_end(Some(date(2025, 8, 2)), end),
            AffaireState::InProduction
        );
        // Closure on or before the period end stays final
        assert_eq!(state.as_of_period_end(Some(date(2025, 7, 31)), end), AffaireState::ClosedFinal);
        assert_eq!(state.as_of_period_end(None, end), AffaireState::ClosedFinal);
        // Other states never move
        assert_eq!(
            AffaireState::Closed.as_of_period_end(Some(date(2025, 8, 2)), end),
            AffaireState::Closed
        );
    }

    #[test]
    fn mapping_lookup_falls_back_to_raw_code() {
        let mut services = HashMap::new();
        services.insert(3, "Etudes".to_string());
        let tables = MappingTables::new(services, HashMap::new());

        assert_eq!(tables.service_label(Some(3)), "Etudes");
        assert_eq!(tables.service_label(Some(99)), "99");
        assert_eq!(tables.service_label(None), "");
        assert_eq!(tables.collaborator_label(Some(7)), "7");
    }
}
