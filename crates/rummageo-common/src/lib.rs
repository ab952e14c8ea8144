//! rummageo-common - Shared types, errors, and helpers used across all RummaGEO crates.

pub mod error;
pub mod entities;
pub mod term;
pub mod species;
pub mod format;
pub mod banner;
pub mod sandbox;

// Re-export commonly used types
pub use entities::{EnrichmentResult, GeneSet, GeneSetPmid, SampleGroups, UserGeneSet};
pub use error::{Result, RummageoError};
pub use species::Species;
pub use term::TermParts;
