//! The per-variant table passed between pipeline stages.
//!
//! Each stage reads the previous stage's CSV, fills in more columns and writes
//! a new CSV. Columns keep the names used by downstream analysis notebooks
//! (`gnomAD_AF`, `ref`, ...), so the struct renames where Rust naming differs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// One missense variant and every annotation collected for it so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub gene: String,
    pub transcript_id: String,
    pub rsid: String,
    pub chrom: String,
    pub pos: Option<i64>,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    #[serde(rename = "alt")]
    pub alt_allele: String,
    pub protein_position: Option<i64>,
    pub amino_acid_change: String,
    pub consequence: String,
    #[serde(rename = "gnomAD_AF")]
    pub gnomad_af: Option<f64>,

    // Structural domains (annotation phase B)
    pub domain_region: Option<String>,
    pub is_transmembrane: Option<bool>,
    pub is_pore_region: Option<bool>,
    pub is_extracellular: Option<bool>,

    // Functional predictions (annotation phase C)
    pub cadd_phred: Option<f64>,
    pub sift_score: Option<f64>,
    pub sift_pred: Option<String>,
    pub polyphen_score: Option<f64>,
    pub polyphen_pred: Option<String>,

    // Spatial flags
    pub is_binding_site: Option<bool>,
    pub is_interface: Option<bool>,
    pub spatially_unresolved: Option<bool>,
    pub is_tm_core: Option<bool>,

    // Prioritisation
    pub priority_score: Option<u32>,
    pub priority_category: Option<PriorityCategory>,
}

impl VariantRecord {
    pub fn flag(value: Option<bool>) -> bool {
        value.unwrap_or(false)
    }
}

/// Priority tier derived from the integer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityCategory {
    High,
    Medium,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

impl PriorityCategory {
    pub const ALL: [PriorityCategory; 4] = [
        PriorityCategory::High,
        PriorityCategory::Medium,
        PriorityCategory::Low,
        PriorityCategory::VeryLow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityCategory::High    => "High",
            PriorityCategory::Medium  => "Medium",
            PriorityCategory::Low     => "Low",
            PriorityCategory::VeryLow => "Very Low",
        }
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read every row of a CSV file with a header line.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "Read table");
    Ok(rows)
}

/// Write rows to a CSV file, creating the parent directory if needed.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote table");
    Ok(())
}

/// Read the shared variant table.
pub fn read_variants(path: &Path) -> Result<Vec<VariantRecord>> {
    read_table(path)
}

/// Write the shared variant table.
pub fn write_variants(path: &Path, rows: &[VariantRecord]) -> Result<()> {
    write_table(path, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> VariantRecord {
        VariantRecord {
            gene: "CHRNA7".to_string(),
            transcript_id: "ENST00000306901".to_string(),
            rsid: "rs1234".to_string(),
            chrom: "15".to_string(),
            pos: Some(32_170_000),
            ref_allele: "C".to_string(),
            alt_allele: "T".to_string(),
            protein_position: Some(243),
            amino_acid_change: "R243W".to_string(),
            consequence: "missense_variant".to_string(),
            gnomad_af: Some(3.2e-6),
            ..Default::default()
        }
    }

    #[test]
    fn test_unfilled_columns_survive_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("variants.csv");

        let mut annotated = sample();
        annotated.domain_region = Some("M2".to_string());
        annotated.is_pore_region = Some(true);
        annotated.priority_category = Some(PriorityCategory::VeryLow);

        write_variants(&path, &[sample(), annotated.clone()]).unwrap();
        let rows = read_variants(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], sample());
        assert_eq!(rows[0].cadd_phred, None);
        assert_eq!(rows[1], annotated);
    }

    #[test]
    fn test_original_column_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("variants.csv");
        write_variants(&path, &[sample()]).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        let header = header.lines().next().unwrap();
        assert!(header.starts_with("gene,transcript_id,rsid,chrom,pos,ref,alt,"));
        assert!(header.contains("gnomAD_AF"));
        assert!(header.ends_with("priority_score,priority_category"));
    }

    #[test]
    fn test_reads_table_with_fewer_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stage1.csv");
        std::fs::write(
            &path,
            "gene,transcript_id,rsid,chrom,pos,ref,alt,protein_position,amino_acid_change,consequence,gnomAD_AF\n\
             CHRNA7,ENST00000306901,rs1,15,100,G,A,12,A12T,missense_variant,\n",
        )
        .unwrap();

        let rows = read_variants(&path).unwrap();
        assert_eq!(rows[0].rsid, "rs1");
        assert_eq!(rows[0].gnomad_af, None);
        assert_eq!(rows[0].domain_region, None);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(PriorityCategory::VeryLow.to_string(), "Very Low");
        assert_eq!(PriorityCategory::ALL.len(), 4);
    }
}
