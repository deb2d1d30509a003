//! Ensembl VEP client with the CADD plugin enabled.
//!
//! Endpoint: https://rest.ensembl.org/vep/human/id?CADD=1  (POST, batched)

use async_trait::async_trait;
use pathovar_common::sandbox::HttpClient;
use pathovar_common::Result;
use serde_json::json;
use tracing::{debug, instrument};

use crate::models::VepResult;
use super::EffectPredictor;

const VEP_ID_URL: &str = "https://rest.ensembl.org/vep/human/id";

pub struct VepClient {
    client: HttpClient,
}

impl VepClient {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EffectPredictor for VepClient {
    #[instrument(skip(self, ids), fields(batch = ids.len()))]
    async fn predict(&self, ids: &[String]) -> Result<Vec<VepResult>> {
        let results: Vec<VepResult> = self.client
            .post(VEP_ID_URL)?
            .query(&[("CADD", "1")])
            .json(&json!({ "ids": ids }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(returned = results.len(), "VEP batch annotated");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::VepResult;

    #[test]
    fn test_parse_vep_response() {
        let json = r#"[{
            "input": "rs1057519678",
            "id": "rs1057519678",
            "most_severe_consequence": "missense_variant",
            "transcript_consequences": [
                {"transcript_id": "ENST00000306901", "variant_allele": "T",
                 "sift_score": 0.01, "sift_prediction": "deleterious",
                 "polyphen_score": 0.998, "polyphen_prediction": "probably_damaging",
                 "cadd_phred": 28.4, "consequence_terms": ["missense_variant"]}
            ]
        }]"#;
        let results: Vec<VepResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results[0].key(), Some("rs1057519678"));
        let tc = &results[0].transcript_consequences[0];
        assert_eq!(tc.cadd_phred, Some(28.4));
        assert_eq!(tc.polyphen_prediction.as_deref(), Some("probably_damaging"));
    }
}
