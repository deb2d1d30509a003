//! Target and stage settings shared by the pipeline crates.
//!
//! These sections are embedded in the binary's `pathovar.toml`; every field
//! has a default so a missing file or section runs the CHRNA7 / 7KOX analysis.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Target Specification ─────────────────────────────────────────────────────

/// Gene, protein and structure under investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    /// HGNC gene symbol (e.g., "CHRNA7")
    #[serde(default = "default_gene_symbol")]
    pub gene_symbol: String,

    /// UniProt accession of the canonical protein (e.g., "P36544")
    #[serde(default = "default_uniprot_id")]
    pub uniprot_id: String,

    /// PDB entry used for spatial mapping (e.g., "7KOX")
    #[serde(default = "default_pdb_id")]
    pub pdb_id: String,

    /// Chain in the PDB entry that carries the target protein
    #[serde(default = "default_chain_id")]
    pub chain_id: char,
}

fn default_gene_symbol() -> String { "CHRNA7".to_string() }
fn default_uniprot_id() -> String { "P36544".to_string() }
fn default_pdb_id() -> String { "7KOX".to_string() }
fn default_chain_id() -> char { 'A' }

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            gene_symbol: default_gene_symbol(),
            uniprot_id: default_uniprot_id(),
            pdb_id: default_pdb_id(),
            chain_id: default_chain_id(),
        }
    }
}

impl TargetSpec {
    /// Lower-cased gene symbol used as the file name prefix.
    pub fn file_prefix(&self) -> String {
        self.gene_symbol.to_lowercase()
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Variants with gnomAD AF at or above this value are dropped
    #[serde(default = "default_af_threshold")]
    pub af_threshold: f64,

    /// Abort annotation when more than this fraction of AF values is exactly 0.0
    #[serde(default = "default_af_zero_abort_fraction")]
    pub af_zero_abort_fraction: f64,
}

fn default_af_threshold() -> f64 { 0.001 }
fn default_af_zero_abort_fraction() -> f64 { 0.80 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            af_threshold: default_af_threshold(),
            af_zero_abort_fraction: default_af_zero_abort_fraction(),
        }
    }
}

// ── Ingestion ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Ids per POST to /variation/homo_sapiens
    #[serde(default = "default_batch_size")]
    pub variation_batch_size: usize,

    /// Ids per POST to /vep/human/id
    #[serde(default = "default_batch_size")]
    pub vep_batch_size: usize,

    /// Pause between VEP batches
    #[serde(default = "default_vep_delay_ms")]
    pub vep_delay_ms: u64,

    /// Pause between NCBI E-utilities calls without an API key
    #[serde(default = "default_entrez_delay_ms")]
    pub entrez_delay_ms: u64,

    /// Contact address sent to NCBI as `email`
    #[serde(default)]
    pub entrez_email: Option<String>,

    /// NCBI API key; falls back to the NCBI_API_KEY environment variable
    #[serde(default)]
    pub ncbi_api_key: Option<String>,
}

fn default_batch_size() -> usize { 100 }
fn default_vep_delay_ms() -> u64 { 100 }
fn default_entrez_delay_ms() -> u64 { 400 }

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            variation_batch_size: default_batch_size(),
            vep_batch_size: default_batch_size(),
            vep_delay_ms: default_vep_delay_ms(),
            entrez_delay_ms: default_entrez_delay_ms(),
            entrez_email: None,
            ncbi_api_key: None,
        }
    }
}

impl IngestionConfig {
    /// NCBI allows 10 requests/s with a key and 3 without.
    pub fn effective_entrez_delay_ms(&self) -> u64 {
        if self.ncbi_api_key.is_some() {
            self.entrez_delay_ms.min(100)
        } else {
            self.entrez_delay_ms
        }
    }
}

// ── Structural ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralConfig {
    /// Atom–atom distance (Å) for binding-site and interface contacts
    #[serde(default = "default_contact_cutoff")]
    pub contact_cutoff: f64,

    /// Warn when fewer than this percentage of positions map onto the structure
    #[serde(default = "default_coverage_warn_percent")]
    pub coverage_warn_percent: f64,

    /// Domain label lining the channel pore
    #[serde(default = "default_pore_domain")]
    pub pore_domain: String,
}

fn default_contact_cutoff() -> f64 { 5.0 }
fn default_coverage_warn_percent() -> f64 { 85.0 }
fn default_pore_domain() -> String { "M2".to_string() }

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            contact_cutoff: default_contact_cutoff(),
            coverage_warn_percent: default_coverage_warn_percent(),
            pore_domain: default_pore_domain(),
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for stage tables and reports
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,

    /// Directory for downloaded structures
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,

    /// Variants carried into mechanistic and clinical review
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Variants listed in the priority summary report
    #[serde(default = "default_report_top_n")]
    pub report_top_n: usize,
}

fn default_processed_dir() -> PathBuf { PathBuf::from("data/processed") }
fn default_raw_dir() -> PathBuf { PathBuf::from("data/raw") }
fn default_top_n() -> usize { 10 }
fn default_report_top_n() -> usize { 15 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
            raw_dir: default_raw_dir(),
            top_n: default_top_n(),
            report_top_n: default_report_top_n(),
        }
    }
}

impl OutputConfig {
    /// Path of a processed artefact named `<prefix>_<suffix>`.
    pub fn processed(&self, prefix: &str, suffix: &str) -> PathBuf {
        self.processed_dir.join(format!("{}_{}", prefix, suffix))
    }
}
