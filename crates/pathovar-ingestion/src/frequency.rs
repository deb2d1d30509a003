//! gnomAD allele-frequency extraction, batching and auditing.

use std::collections::HashMap;

use pathovar_common::VariantRecord;
use tracing::{info, warn};

use crate::models::{VariationInfo, VariationMapping};
use crate::sources::VariationSource;

/// Highest gnomAD genome/exome frequency reported for `alt`.
///
/// Populations are matched on a case-insensitive `gnomadg` / `gnomade` name
/// prefix (e.g. `gnomADg:ALL`, `gnomADe:nfe`). Frequencies of other alleles at
/// a multi-allelic site are ignored.
pub fn gnomad_af(info: &VariationInfo, alt: &str) -> Option<f64> {
    info.populations
        .iter()
        .filter(|p| {
            let name = p.population.as_deref().unwrap_or("").to_lowercase();
            (name.contains("gnomadg") || name.contains("gnomade"))
                && p.allele.as_deref() == Some(alt)
        })
        .filter_map(|p| p.value())
        .fold(None, |max: Option<f64>, f| Some(max.map_or(f, |m| m.max(f))))
}

/// First mapping on the GRCh38 assembly.
pub fn grch38_mapping(info: &VariationInfo) -> Option<&VariationMapping> {
    info.mappings
        .iter()
        .find(|m| m.assembly_name.as_deref() == Some("GRCh38"))
}

/// Query variation records for `ids` in batches. Failed batches are skipped
/// with a warning; ids the service returns as `null` are left out.
pub async fn fetch_variation_records(
    source: &dyn VariationSource,
    ids: &[String],
    batch_size: usize,
) -> HashMap<String, VariationInfo> {
    let batch_size = batch_size.max(1);
    info!(count = ids.len(), batch_size, "Batch querying variation records");

    let mut records = HashMap::new();
    for (i, batch) in ids.chunks(batch_size).enumerate() {
        let start = i * batch_size;
        match source.variation_batch(batch).await {
            Ok(resp) => {
                records.extend(resp.into_iter().filter_map(|(id, info)| info.map(|v| (id, v))));
            }
            Err(e) => {
                warn!("Failed to fetch batch {}-{}: {}", start, start + batch.len(), e);
            }
        }
    }

    info!(resolved = records.len(), "Variation records resolved");
    records
}

/// Recompute `gnomAD_AF` for every row from freshly fetched records.
/// Rows whose record is missing end up with no frequency.
pub fn apply_gnomad_af(records: &mut [VariantRecord], variation: &HashMap<String, VariationInfo>) {
    for rec in records.iter_mut() {
        rec.gnomad_af = variation
            .get(&rec.rsid)
            .and_then(|info| gnomad_af(info, &rec.alt_allele));
    }
}

/// Re-query frequencies for an existing table and recompute `gnomAD_AF` in
/// place, returning the audit of the new column.
pub async fn repair_gnomad_af(
    source: &dyn VariationSource,
    records: &mut [VariantRecord],
    batch_size: usize,
) -> AfAudit {
    let rsids: Vec<String> = records.iter().map(|r| r.rsid.clone()).collect();
    let variation = fetch_variation_records(source, &rsids, batch_size).await;
    apply_gnomad_af(records, &variation);

    let audit = AfAudit::from_records(records);
    audit.log();
    audit
}

/// Distribution of the `gnomAD_AF` column.
#[derive(Debug, Clone, PartialEq)]
pub struct AfAudit {
    pub total: usize,
    pub missing: usize,
    pub zeros: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl AfAudit {
    pub fn from_records(records: &[VariantRecord]) -> Self {
        let values: Vec<f64> = records.iter().filter_map(|r| r.gnomad_af).collect();
        let mean = if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        };
        Self {
            total: records.len(),
            missing: records.len() - values.len(),
            zeros: values.iter().filter(|&&v| v == 0.0).count(),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            mean,
        }
    }

    /// Fraction of all rows whose AF is exactly zero.
    pub fn zero_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.zeros as f64 / self.total as f64
        }
    }

    pub fn log(&self) {
        info!(
            "AF == 0.0: {} ({:.2}%)",
            self.zeros,
            self.zero_fraction() * 100.0
        );
        info!("AF is null: {}", self.missing);
        info!("AF min: {:?}, max: {:?}, mean: {:?}", self.min, self.max, self.mean);
    }
}
