//! # Moduleo Domain
//!
//! Business domain types and models for the Moduleo reporting
//! pipeline.
//!
//! This crate contains:
//! - Domain data types (Period, TempsPasse, AffaireDetail, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
