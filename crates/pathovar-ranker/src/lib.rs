//! pathovar-ranker — Variant prioritisation and structural enrichment.
//!
//! Scores each annotated variant with an additive points matrix, assigns a
//! priority tier, and tests whether High-priority variants are enriched for
//! structural features.

pub mod weights;
pub mod scorer;
pub mod enrichment;
