//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! pipeline.

/// Affaire ids that are permanently excluded from every report,
/// whatever the period. Internal bookkeeping affaires that would
/// distort the revenue totals.
pub const EXCLUDED_AFFAIRE_IDS: [i64; 3] = [29966, 35659, 32207];

/// Maximum number of ids per batch ("multi") API call.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Page cap passed to the period-scoped time-entry endpoints.
pub const MAX_RESULTS_PER_FETCH: u32 = 10_000;

/// Devis state code that marks a quote as ordered. Only ordered quotes
/// count toward revenue totals.
pub const DEVIS_STATE_ORDERED: i64 = 0;

// Retry defaults shared by every gateway call
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
pub const DEFAULT_BACKOFF_BASE_SECS: f64 = 2.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Stable filename the final combined report is copied to for the
/// dashboard renderer.
pub const DASHBOARD_DATA_FILE: &str = "dashboard_data.csv";

/// Fixed User-Agent sent with every API request.
pub const USER_AGENT: &str = "ModuleoReport/2.0";

/// Check whether an affaire id belongs to the permanent exclusion set.
pub fn is_excluded_affaire(id: i64) -> bool {
    EXCLUDED_AFFAIRE_IDS.contains(&id)
}
