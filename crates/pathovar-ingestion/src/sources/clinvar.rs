//! ClinVar E-utilities client.
//!
//! Endpoints used:
//!   esearch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?db=clinvar
//!   esummary: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi?db=clinvar

use async_trait::async_trait;
use pathovar_common::sandbox::HttpClient;
use pathovar_common::Result;
use tracing::{debug, instrument, warn};

use crate::models::ClinVarSummary;
use super::pubmed::{parse_esearch_ids, EutilsIdentity, ESEARCH_URL};
use super::ClinicalSource;

const ESUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

pub struct ClinVarClient {
    client: HttpClient,
    identity: EutilsIdentity,
}

impl ClinVarClient {
    pub fn new(client: HttpClient, identity: EutilsIdentity) -> Self {
        Self { client, identity }
    }

    async fn esearch(&self, term: &str) -> Result<Option<Vec<String>>> {
        let mut params = self.identity.base_params();
        params.push(("db", "clinvar".to_string()));
        params.push(("term", term.to_string()));

        let resp = self.client.get(ESEARCH_URL)?.query(&params).send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "ClinVar esearch failed");
            return Ok(None);
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(Some(parse_esearch_ids(&body)))
    }

    async fn esummary(&self, ids: &[String]) -> Result<Option<serde_json::Value>> {
        let mut params = self.identity.base_params();
        params.push(("db", "clinvar".to_string()));
        params.push(("id", ids.join(",")));

        let resp = self.client.get(ESUMMARY_URL)?.query(&params).send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "ClinVar esummary failed");
            return Ok(None);
        }
        Ok(Some(resp.json().await?))
    }
}

#[async_trait]
impl ClinicalSource for ClinVarClient {
    #[instrument(skip(self))]
    async fn summarise(&self, rsid: &str) -> Result<ClinVarSummary> {
        let ids = match self.esearch(rsid).await? {
            Some(ids) if !ids.is_empty() => ids,
            _ => return Ok(ClinVarSummary::not_found()),
        };
        debug!(?ids, "ClinVar esearch returned records");

        let Some(body) = self.esummary(&ids).await? else {
            return Ok(ClinVarSummary::not_found());
        };
        Ok(parse_clinvar_summary(&body, &ids))
    }
}

/// Summarise the first record of an esummary response. A uid without an
/// entry in `result` gives `Not Provided` for both fields.
///
/// Older records carry `clinical_significance`; records reclassified after the
/// 2024 schema change carry `germline_classification` instead.
pub(crate) fn parse_clinvar_summary(body: &serde_json::Value, ids: &[String]) -> ClinVarSummary {
    let Some(uid) = ids.first() else {
        return ClinVarSummary::not_found();
    };
    let record = body["result"].get(uid.as_str()).unwrap_or(&serde_json::Value::Null);

    let significance = [
        &record["clinical_significance"]["description"],
        &record["germline_classification"]["description"],
    ]
    .into_iter()
    .filter_map(|v| v.as_str())
    .find(|s| !s.is_empty())
    .unwrap_or(ClinVarSummary::NOT_PROVIDED)
    .to_string();

    let condition = record["trait_set"]
        .as_array()
        .and_then(|traits| traits.first())
        .and_then(|t| t["trait_name"].as_str())
        .unwrap_or(ClinVarSummary::NOT_PROVIDED)
        .to_string();

    ClinVarSummary { significance, condition }
}
