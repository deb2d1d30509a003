//! PubMed E-utilities client.
//!
//! Endpoint used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!
//! Only the hit count is needed, so no abstracts are fetched.

use async_trait::async_trait;
use pathovar_common::sandbox::HttpClient;
use pathovar_common::Result;
use tracing::{debug, instrument, warn};

use super::LiteratureSource;

pub(crate) const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";

/// Parameters sent with every E-utilities call.
#[derive(Debug, Clone, Default)]
pub struct EutilsIdentity {
    pub api_key: Option<String>,
    pub email: Option<String>,
}

impl EutilsIdentity {
    pub(crate) fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("retmode", "json".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
            params.push(("tool", "pathovar".to_string()));
        }
        params
    }
}

pub struct PubMedClient {
    client: HttpClient,
    identity: EutilsIdentity,
}

impl PubMedClient {
    pub fn new(client: HttpClient, identity: EutilsIdentity) -> Self {
        Self { client, identity }
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    /// Number of PubMed records matching `query`; 0 when the service refuses.
    #[instrument(skip(self))]
    async fn count(&self, query: &str) -> Result<u64> {
        let mut params = self.identity.base_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", query.to_string()));
        params.push(("retmax", "0".to_string()));

        let resp = self.client
            .get(ESEARCH_URL)?
            .query(&params)
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "PubMed esearch failed");
            return Ok(0);
        }

        let body: serde_json::Value = resp.json().await?;
        let hits = parse_esearch_count(&body);
        debug!(hits, "PubMed esearch count");
        Ok(hits)
    }
}

/// `esearchresult.count` is a decimal string.
pub(crate) fn parse_esearch_count(body: &serde_json::Value) -> u64 {
    let count = &body["esearchresult"]["count"];
    count
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| count.as_u64())
        .unwrap_or(0)
}

/// `esearchresult.idlist` as owned strings.
pub(crate) fn parse_esearch_ids(body: &serde_json::Value) -> Vec<String> {
    body["esearchresult"]["idlist"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
