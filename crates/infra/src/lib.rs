//! # Moduleo Infra
//!
//! Infrastructure adapters for the Moduleo reporting pipeline:
//! - HTTP transport with retry and the API gateway implementation
//! - CSV-backed artifact store
//! - Mapping table loaders
//! - Configuration loading (environment or file)
//!
//! ## Architecture
//! Implements the ports declared in `moduleo-core` against the real
//! outside world. Nothing here contains business rules; errors are
//! converted into `moduleo_domain::ModuleoError` at the boundary.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod errors;
pub mod http;
pub mod mappings;

pub use api::ModuleoClient;
pub use artifacts::CsvArtifactStore;
pub use errors::InfraError;
pub use http::HttpClient;
pub use mappings::load_mapping_tables;
