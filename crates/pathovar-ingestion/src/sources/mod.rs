//! Clients for the public services the pipeline queries.

pub mod ensembl;
pub mod vep;
pub mod uniprot;
pub mod clinvar;
pub mod pubmed;

use async_trait::async_trait;
use pathovar_common::Result;

use crate::models::{
    ClinVarSummary, GeneInfo, TranscriptVariation, UniProtFeature, VariationBatch, VepResult,
};

/// Gene lookup, translation overlap and variation records (Ensembl REST).
#[async_trait]
pub trait VariationSource: Send + Sync {
    /// Resolve gene, canonical transcript and translation ids for a symbol.
    async fn lookup_gene(&self, symbol: &str) -> Result<GeneInfo>;

    /// All transcript variations overlapping a translation.
    async fn translation_variants(&self, translation_id: &str) -> Result<Vec<TranscriptVariation>>;

    /// Variation records (mappings + population frequencies) for one batch of ids.
    async fn variation_batch(&self, ids: &[String]) -> Result<VariationBatch>;
}

/// Functional consequence predictions (Ensembl VEP).
#[async_trait]
pub trait EffectPredictor: Send + Sync {
    async fn predict(&self, ids: &[String]) -> Result<Vec<VepResult>>;
}

/// Sequence feature annotations (UniProt).
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn features(&self, accession: &str) -> Result<Vec<UniProtFeature>>;
}

/// Clinical significance lookups (ClinVar).
#[async_trait]
pub trait ClinicalSource: Send + Sync {
    async fn summarise(&self, rsid: &str) -> Result<ClinVarSummary>;
}

/// Literature hit counts (PubMed).
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    async fn count(&self, query: &str) -> Result<u64>;
}
