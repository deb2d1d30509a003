//! Response models for the REST services used during ingestion.
//! Only the fields the pipeline reads are modelled; everything else is ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Ensembl lookup ────────────────────────────────────────────────────────────

/// `GET /lookup/symbol/homo_sapiens/{symbol}?expand=1`
#[derive(Debug, Clone, Deserialize)]
pub struct EnsemblGene {
    pub id: Option<String>,
    #[serde(rename = "Transcript", default)]
    pub transcripts: Vec<EnsemblTranscript>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnsemblTranscript {
    pub id: Option<String>,
    #[serde(default)]
    pub is_canonical: Option<i64>,
    #[serde(rename = "Translation")]
    pub translation: Option<EnsemblTranslation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnsemblTranslation {
    pub id: Option<String>,
}

/// Identifiers resolved for the target gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneInfo {
    pub symbol: String,
    pub gene_id: String,
    pub transcript_id: String,
    pub translation_id: String,
}

impl EnsemblGene {
    /// Resolve gene, canonical transcript and translation identifiers.
    pub fn resolve(&self, symbol: &str) -> Option<GeneInfo> {
        let gene_id = self.id.clone()?;
        let canonical = self
            .transcripts
            .iter()
            .find(|t| t.is_canonical == Some(1))?;
        let transcript_id = canonical.id.clone()?;
        let translation_id = canonical.translation.as_ref()?.id.clone()?;
        Some(GeneInfo {
            symbol: symbol.to_string(),
            gene_id,
            transcript_id,
            translation_id,
        })
    }
}

// ── Ensembl overlap ───────────────────────────────────────────────────────────

/// One `transcript_variation` feature from `/overlap/translation/{id}`.
/// On a translation, `start` is the protein position.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptVariation {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub consequence: Option<String>,
    pub seq_region_name: Option<String>,
    pub start: Option<i64>,
    pub allele: Option<String>,
    pub residues: Option<String>,
}

// ── Ensembl variation ─────────────────────────────────────────────────────────

/// Value of the id-keyed map returned by `POST /variation/homo_sapiens?pops=1`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariationInfo {
    #[serde(default)]
    pub mappings: Vec<VariationMapping>,
    #[serde(default)]
    pub populations: Vec<PopulationFrequency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariationMapping {
    pub assembly_name: Option<String>,
    pub seq_region_name: Option<String>,
    pub start: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationFrequency {
    pub population: Option<String>,
    pub allele: Option<String>,
    pub frequency: Option<f64>,
    pub allele_frequency: Option<f64>,
}

impl PopulationFrequency {
    pub fn value(&self) -> Option<f64> {
        self.frequency.or(self.allele_frequency)
    }
}

pub type VariationBatch = HashMap<String, Option<VariationInfo>>;

// ── VEP ───────────────────────────────────────────────────────────────────────

/// One element of the `POST /vep/human/id?CADD=1` response array.
#[derive(Debug, Clone, Deserialize)]
pub struct VepResult {
    pub input: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub transcript_consequences: Vec<TranscriptConsequence>,
}

impl VepResult {
    /// The queried identifier; `input` echoes the request, `id` is the fallback.
    pub fn key(&self) -> Option<&str> {
        self.input.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptConsequence {
    pub transcript_id: Option<String>,
    pub variant_allele: Option<String>,
    pub sift_score: Option<f64>,
    pub sift_prediction: Option<String>,
    pub polyphen_score: Option<f64>,
    pub polyphen_prediction: Option<String>,
    pub cadd_phred: Option<f64>,
}

// ── UniProt ───────────────────────────────────────────────────────────────────

/// `GET rest.uniprot.org/uniprotkb/{accession}.json`
#[derive(Debug, Clone, Deserialize)]
pub struct UniProtEntry {
    #[serde(default)]
    pub features: Vec<UniProtFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniProtFeature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub location: Option<FeatureLocation>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureLocation {
    pub start: Option<FeaturePosition>,
    pub end: Option<FeaturePosition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeaturePosition {
    pub value: Option<i64>,
}

impl UniProtFeature {
    /// Start and end residue, when both are known.
    pub fn span(&self) -> Option<(i64, i64)> {
        let loc = self.location.as_ref()?;
        let start = loc.start.as_ref()?.value?;
        let end = loc.end.as_ref()?.value?;
        Some((start, end))
    }
}

// ── ClinVar / PubMed ──────────────────────────────────────────────────────────

/// Clinical assertion summarised from a ClinVar esummary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinVarSummary {
    pub significance: String,
    pub condition: String,
}

impl ClinVarSummary {
    pub const NOT_FOUND: &'static str = "Not found";
    pub const NOT_PROVIDED: &'static str = "Not Provided";

    pub fn not_found() -> Self {
        Self {
            significance: Self::NOT_FOUND.to_string(),
            condition: Self::NOT_FOUND.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_canonical_transcript() {
        let json = r#"{
            "id": "ENSG00000175344",
            "display_name": "CHRNA7",
            "Transcript": [
                {"id": "ENST00000454250", "is_canonical": 0, "Translation": {"id": "ENSP00000407546"}},
                {"id": "ENST00000306901", "is_canonical": 1, "Translation": {"id": "ENSP00000303727"}}
            ]
        }"#;
        let gene: EnsemblGene = serde_json::from_str(json).unwrap();
        let info = gene.resolve("CHRNA7").unwrap();
        assert_eq!(info.gene_id, "ENSG00000175344");
        assert_eq!(info.transcript_id, "ENST00000306901");
        assert_eq!(info.translation_id, "ENSP00000303727");
    }

    #[test]
    fn test_resolve_without_translation() {
        let json = r#"{"id": "ENSG1", "Transcript": [{"id": "ENST1", "is_canonical": 1}]}"#;
        let gene: EnsemblGene = serde_json::from_str(json).unwrap();
        assert!(gene.resolve("X").is_none());
    }

    #[test]
    fn test_variation_batch_with_null_entry() {
        let json = r#"{
            "rs1": {
                "mappings": [{"assembly_name": "GRCh38", "seq_region_name": "15", "start": 32170000, "allele_string": "C/T"}],
                "populations": [{"population": "gnomADg:ALL", "allele": "T", "frequency": 0.00002}]
            },
            "rs2": null
        }"#;
        let batch: VariationBatch = serde_json::from_str(json).unwrap();
        let rs1 = batch["rs1"].as_ref().unwrap();
        assert_eq!(rs1.mappings[0].start, Some(32170000));
        assert_eq!(rs1.mappings[0].seq_region_name.as_deref(), Some("15"));
        assert_eq!(rs1.populations[0].value(), Some(0.00002));
        assert!(batch["rs2"].is_none());
    }

    #[test]
    fn test_feature_without_location_has_no_span() {
        let json = r#"{"features": [
            {"type": "Signal", "location": {"start": {"value": 1}, "end": {"value": 22}}},
            {"type": "Disulfide bond"}
        ]}"#;
        let entry: UniProtEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.features[0].span(), Some((1, 22)));
        assert_eq!(entry.features[1].span(), None);
    }
}
