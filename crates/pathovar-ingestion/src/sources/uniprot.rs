//! UniProt REST client.
//!
//! Endpoint: https://rest.uniprot.org/uniprotkb/{accession}.json

use async_trait::async_trait;
use pathovar_common::sandbox::HttpClient;
use pathovar_common::Result;
use tracing::{info, instrument};

use crate::models::{UniProtEntry, UniProtFeature};
use super::FeatureSource;

const UNIPROTKB_URL: &str = "https://rest.uniprot.org/uniprotkb";

pub struct UniProtClient {
    client: HttpClient,
}

impl UniProtClient {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeatureSource for UniProtClient {
    #[instrument(skip(self))]
    async fn features(&self, accession: &str) -> Result<Vec<UniProtFeature>> {
        let url = format!("{}/{}.json", UNIPROTKB_URL, accession);
        info!("Fetching canonical UniProt record for {}", accession);

        let entry: UniProtEntry = self.client
            .get(&url)?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(entry.features)
    }
}
