//! pathovar-common — Shared types, errors, settings and table I/O used
//! across all Pathovar crates.

pub mod error;
pub mod target_config;
pub mod sandbox;
pub mod table;
pub mod summary;

// Re-export commonly used types
pub use error::{PathovarError, Result};
pub use target_config::{FilterConfig, IngestionConfig, OutputConfig, StructuralConfig, TargetSpec};
pub use table::VariantRecord;
