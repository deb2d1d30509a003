//! pathovar-ingestion — Variant retrieval and annotation from public APIs.
//! - Missense variant mining for one gene (Ensembl REST)
//! - gnomAD allele-frequency extraction and repair
//! - Coordinate correction, UniProt domain assignment, VEP functional scores
//! - ClinVar / PubMed cross-referencing of top-ranked variants

pub mod sources;
pub mod models;
pub mod frequency;
pub mod mining;
pub mod domains;
pub mod annotation;
pub mod clinical;
