//! Ensembl REST client.
//!
//! Endpoints used:
//!   lookup:    https://rest.ensembl.org/lookup/symbol/homo_sapiens/{symbol}?expand=1
//!   overlap:   https://rest.ensembl.org/overlap/translation/{id}?feature=transcript_variation
//!   variation: https://rest.ensembl.org/variation/homo_sapiens?pops=1  (POST, batched)

use async_trait::async_trait;
use pathovar_common::sandbox::HttpClient;
use pathovar_common::{PathovarError, Result};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::models::{EnsemblGene, GeneInfo, TranscriptVariation, VariationBatch};
use super::VariationSource;

const ENSEMBL_REST: &str = "https://rest.ensembl.org";

pub struct EnsemblClient {
    client: HttpClient,
}

impl EnsemblClient {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VariationSource for EnsemblClient {
    #[instrument(skip(self))]
    async fn lookup_gene(&self, symbol: &str) -> Result<GeneInfo> {
        let url = format!("{}/lookup/symbol/homo_sapiens/{}", ENSEMBL_REST, symbol);
        info!(%url, "Fetching target gene details");

        let gene: EnsemblGene = self.client
            .get(&url)?
            .query(&[("expand", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let info = gene.resolve(symbol).ok_or_else(|| {
            PathovarError::MissingData(format!("Could not resolve IDs for {}", symbol))
        })?;

        info!(
            gene = %info.gene_id,
            transcript = %info.transcript_id,
            translation = %info.translation_id,
            "Resolved {}", symbol
        );
        Ok(info)
    }

    #[instrument(skip(self))]
    async fn translation_variants(&self, translation_id: &str) -> Result<Vec<TranscriptVariation>> {
        let url = format!("{}/overlap/translation/{}", ENSEMBL_REST, translation_id);
        info!(%url, "Fetching transcript variants");

        let variants: Vec<TranscriptVariation> = self.client
            .get(&url)?
            .query(&[("feature", "transcript_variation")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(count = variants.len(), "Fetched overlapping variants for {}", translation_id);
        Ok(variants)
    }

    #[instrument(skip(self, ids), fields(batch = ids.len()))]
    async fn variation_batch(&self, ids: &[String]) -> Result<VariationBatch> {
        let url = format!("{}/variation/homo_sapiens", ENSEMBL_REST);

        let batch: VariationBatch = self.client
            .post(&url)?
            .query(&[("pops", "1")])
            .json(&json!({ "ids": ids }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(returned = batch.len(), "Variation batch resolved");
        Ok(batch)
    }
}
