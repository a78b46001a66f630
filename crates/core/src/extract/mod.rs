//! Extraction steps, one module per data category

pub mod details;
pub mod devis;
pub mod factures;
pub mod tempspasses;
