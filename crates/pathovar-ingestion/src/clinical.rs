//! Clinical and literature cross-reference for prioritised variants.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use pathovar_common::Result;

use crate::sources::{ClinicalSource, LiteratureSource};

/// One row of the clinical/literature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalLiteratureRecord {
    pub rsid: String,
    pub aa_change: String,
    #[serde(rename = "ClinVar_significance")]
    pub clinvar_significance: String,
    #[serde(rename = "ClinVar_condition")]
    pub clinvar_condition: String,
    #[serde(rename = "PubMed_hits")]
    pub pubmed_hits: u64,
}

/// PubMed query pairing the gene with a protein change, e.g. `CHRNA7 AND R123W`.
pub fn literature_query(gene: &str, aa_change: &str) -> String {
    format!("{} AND {}", gene, aa_change)
}

/// Look up ClinVar and PubMed for each `(rsid, amino_acid_change)` pair,
/// pausing `delay` after every variant.
#[instrument(skip_all, fields(gene = %gene, variants = variants.len()))]
pub async fn review_variants(
    clinvar: &dyn ClinicalSource,
    pubmed: &dyn LiteratureSource,
    gene: &str,
    variants: &[(String, String)],
    delay: Duration,
) -> Result<Vec<ClinicalLiteratureRecord>> {
    let mut out = Vec::with_capacity(variants.len());

    for (rsid, aa_change) in variants {
        let clin = clinvar.summarise(rsid).await?;
        let hits = pubmed.count(&literature_query(gene, aa_change)).await?;
        info!(%rsid, significance = %clin.significance, hits, "Reviewed {}", aa_change);

        out.push(ClinicalLiteratureRecord {
            rsid: rsid.clone(),
            aa_change: aa_change.clone(),
            clinvar_significance: clin.significance,
            clinvar_condition: clin.condition,
            pubmed_hits: hits,
        });
        tokio::time::sleep(delay).await;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClinVarSummary;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockClinVar;

    #[async_trait]
    impl ClinicalSource for MockClinVar {
        async fn summarise(&self, rsid: &str) -> Result<ClinVarSummary> {
            Ok(if rsid == "rs1" {
                ClinVarSummary {
                    significance: "Uncertain significance".to_string(),
                    condition: "not provided".to_string(),
                }
            } else {
                ClinVarSummary::not_found()
            })
        }
    }

    #[derive(Default)]
    struct MockPubMed {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LiteratureSource for MockPubMed {
        async fn count(&self, query: &str) -> Result<u64> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(if query.ends_with("R123W") { 3 } else { 0 })
        }
    }

    #[tokio::test]
    async fn test_review_rows() {
        let pubmed = MockPubMed::default();
        let variants = vec![
            ("rs1".to_string(), "R123W".to_string()),
            ("rs2".to_string(), "A10T".to_string()),
        ];
        let rows = review_variants(&MockClinVar, &pubmed, "CHRNA7", &variants, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].clinvar_significance, "Uncertain significance");
        assert_eq!(rows[0].pubmed_hits, 3);
        assert_eq!(rows[1].clinvar_significance, "Not found");
        assert_eq!(rows[1].clinvar_condition, "Not found");
        assert_eq!(
            *pubmed.queries.lock().unwrap(),
            vec!["CHRNA7 AND R123W", "CHRNA7 AND A10T"]
        );
    }

    #[test]
    fn test_csv_headers() {
        let mut w = csv::Writer::from_writer(vec![]);
        w.serialize(ClinicalLiteratureRecord {
            rsid: "rs1".to_string(),
            aa_change: "R123W".to_string(),
            clinvar_significance: "Benign".to_string(),
            clinvar_condition: "Epilepsy".to_string(),
            pubmed_hits: 2,
        })
        .unwrap();
        let text = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert!(text.starts_with("rsid,aa_change,ClinVar_significance,ClinVar_condition,PubMed_hits\n"));
    }
}
