//! Intermediate artifact persistence.

mod csv_store;

pub use csv_store::CsvArtifactStore;
