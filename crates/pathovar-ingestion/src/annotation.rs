//! Variant annotation in three phases.
//!
//! A. Correct coordinates to GRCh38 and recompute gnomAD frequencies
//! B. Assign UniProt topological domains
//! C. Attach VEP functional predictions (SIFT, PolyPhen, CADD)

use std::collections::HashMap;
use std::time::Duration;

use pathovar_common::summary::{percent, Describe};
use pathovar_common::{FilterConfig, IngestionConfig, PathovarError, Result, VariantRecord};
use tracing::{info, instrument, warn};

use crate::domains::{DomainFlags, DomainMap};
use crate::frequency::{apply_gnomad_af, fetch_variation_records, grch38_mapping, AfAudit};
use crate::mining::is_rare;
use crate::models::{TranscriptConsequence, VepResult};
use crate::sources::{EffectPredictor, FeatureSource, VariationSource};

// ── Phase A ───────────────────────────────────────────────────────────────────

/// Replace chrom/pos with GRCh38 coordinates, recompute AF, audit it and
/// re-apply the rarity filter.
///
/// Fails with [`PathovarError::UnreliableData`] when the share of rows with
/// AF exactly 0.0 exceeds `filters.af_zero_abort_fraction`.
#[instrument(skip_all, fields(rows = records.len()))]
pub async fn correct_coordinates(
    source: &dyn VariationSource,
    mut records: Vec<VariantRecord>,
    filters: &FilterConfig,
    ingestion: &IngestionConfig,
) -> Result<Vec<VariantRecord>> {
    let rsids: Vec<String> = records.iter().map(|r| r.rsid.clone()).collect();
    let variation = fetch_variation_records(source, &rsids, ingestion.variation_batch_size).await;

    let mut corrected = 0;
    for rec in records.iter_mut() {
        if let Some(mapping) = variation.get(&rec.rsid).and_then(grch38_mapping) {
            if let Some(chrom) = &mapping.seq_region_name {
                rec.chrom = chrom.clone();
            }
            if mapping.start.is_some() {
                rec.pos = mapping.start;
            }
            corrected += 1;
        }
    }
    info!(corrected, "Coordinates updated to GRCh38");

    apply_gnomad_af(&mut records, &variation);

    let audit = AfAudit::from_records(&records);
    audit.log();
    if audit.zero_fraction() > filters.af_zero_abort_fraction {
        return Err(PathovarError::UnreliableData(format!(
            "AF unreliable: {:.1}% of variants have gnomAD_AF == 0.0 (limit {:.1}%)",
            audit.zero_fraction() * 100.0,
            filters.af_zero_abort_fraction * 100.0
        )));
    }

    let before = records.len();
    records.retain(|r| r.gnomad_af.map_or(true, |_| is_rare(r, filters.af_threshold)));
    if records.len() < before {
        info!(
            dropped = before - records.len(),
            "Dropped variants no longer below AF {}", filters.af_threshold
        );
    }
    Ok(records)
}

// ── Phase B ───────────────────────────────────────────────────────────────────

/// Fetch UniProt features, build the domain map and annotate every row.
#[instrument(skip(source, records))]
pub async fn assign_domains(
    source: &dyn FeatureSource,
    accession: &str,
    records: &mut [VariantRecord],
    pore_domain: &str,
) -> Result<DomainMap> {
    let features = source.features(accession).await?;
    let domains = DomainMap::from_features(&features);
    if domains.is_empty() {
        warn!("No topological features found for {}", accession);
    }
    for d in domains.iter() {
        info!("  {:<22} {}-{}", d.name, d.start, d.end);
    }

    apply_domains(&domains, records, pore_domain);
    Ok(domains)
}

/// Annotate rows with their domain and the derived flags.
pub fn apply_domains(domains: &DomainMap, records: &mut [VariantRecord], pore_domain: &str) {
    for rec in records.iter_mut() {
        let region = domains.assign(rec.protein_position);
        let flags = DomainFlags::for_domain(region, pore_domain);
        rec.domain_region = Some(region.to_string());
        rec.is_transmembrane = Some(flags.is_transmembrane);
        rec.is_pore_region = Some(flags.is_pore_region);
        rec.is_extracellular = Some(flags.is_extracellular);
    }
}

// ── Phase C ───────────────────────────────────────────────────────────────────

/// Scores copied from the transcript consequence matching a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionalScores {
    pub sift_score: Option<f64>,
    pub sift_pred: Option<String>,
    pub polyphen_score: Option<f64>,
    pub polyphen_pred: Option<String>,
    pub cadd_phred: Option<f64>,
}

impl From<&TranscriptConsequence> for FunctionalScores {
    fn from(tc: &TranscriptConsequence) -> Self {
        Self {
            sift_score: tc.sift_score,
            sift_pred: tc.sift_prediction.clone(),
            polyphen_score: tc.polyphen_score,
            polyphen_pred: tc.polyphen_prediction.clone(),
            cadd_phred: tc.cadd_phred,
        }
    }
}

/// Query VEP in batches and attach predictions to the rows.
#[instrument(skip_all, fields(rows = records.len()))]
pub async fn fetch_functional_scores(
    predictor: &dyn EffectPredictor,
    records: &mut [VariantRecord],
    ingestion: &IngestionConfig,
) -> Result<()> {
    let batch_size = ingestion.vep_batch_size.max(1);
    let rsids: Vec<String> = records.iter().map(|r| r.rsid.clone()).collect();
    let n_batches = rsids.len().div_ceil(batch_size);

    let mut results = Vec::new();
    for (i, batch) in rsids.chunks(batch_size).enumerate() {
        info!("VEP batch {}/{}", i + 1, n_batches);
        match predictor.predict(batch).await {
            Ok(mut r) => results.append(&mut r),
            Err(e) => warn!("VEP batch {} failed: {}", i + 1, e),
        }
        if i + 1 < n_batches {
            tokio::time::sleep(Duration::from_millis(ingestion.vep_delay_ms)).await;
        }
    }

    apply_vep_results(records, &results);

    let missing_cadd = records.iter().filter(|r| r.cadd_phred.is_none()).count();
    if missing_cadd > 0 {
        warn!("{} variants missing CADD scores", missing_cadd);
    }
    warn!("Conservation (phyloP) scores are not retrieved; conservation is not part of the score");
    Ok(())
}

/// Join VEP results onto rows by rsid.
///
/// A result contributes the consequence whose transcript and allele match the
/// row. A matching result replaces an earlier one for the same id; a
/// non-matching result is only kept when nothing was recorded yet.
pub fn apply_vep_results(records: &mut [VariantRecord], results: &[VepResult]) {
    let targets: HashMap<&str, (&str, &str)> = records
        .iter()
        .map(|r| (r.rsid.as_str(), (r.transcript_id.as_str(), r.alt_allele.as_str())))
        .collect();

    let mut scores: HashMap<String, Option<FunctionalScores>> = HashMap::new();
    for result in results {
        let Some(key) = result.key() else { continue };
        let Some((transcript, alt)) = targets.get(key) else { continue };

        let hit = result.transcript_consequences.iter().find(|tc| {
            tc.transcript_id.as_deref() == Some(*transcript)
                && tc.variant_allele.as_deref() == Some(*alt)
        });

        if hit.is_some() || !scores.contains_key(key) {
            scores.insert(key.to_string(), hit.map(FunctionalScores::from));
        }
    }

    for rec in records.iter_mut() {
        let s = scores.get(&rec.rsid).cloned().flatten().unwrap_or_default();
        rec.sift_score = s.sift_score;
        rec.sift_pred = s.sift_pred;
        rec.polyphen_score = s.polyphen_score;
        rec.polyphen_pred = s.polyphen_pred;
        rec.cadd_phred = s.cadd_phred;
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Aggregate view of a fully annotated table.
#[derive(Debug, Clone)]
pub struct AnnotationSummary {
    pub total: usize,
    pub domain_counts: Vec<(String, usize)>,
    pub pct_transmembrane: f64,
    pub pct_pore: f64,
    pub pct_extracellular: f64,
    pub cadd: Describe,
    pub pct_cadd_over_20: f64,
    pub pct_sift_deleterious: f64,
    pub pct_polyphen_probably: f64,
    pub pct_polyphen_possibly: f64,
    pub pct_polyphen_benign: f64,
}

impl AnnotationSummary {
    pub fn from_records(records: &[VariantRecord]) -> Self {
        let total = records.len();
        let count = |pred: &dyn Fn(&VariantRecord) -> bool| records.iter().filter(|r| pred(r)).count();

        let mut domain_counts: Vec<(String, usize)> = Vec::new();
        for rec in records {
            let name = rec.domain_region.clone().unwrap_or_else(|| "other".to_string());
            match domain_counts.iter_mut().find(|(n, _)| *n == name) {
                Some((_, c)) => *c += 1,
                None => domain_counts.push((name, 1)),
            }
        }
        domain_counts.sort_by(|a, b| b.1.cmp(&a.1));

        let polyphen = |label: &str| {
            count(&|r| r.polyphen_pred.as_deref().is_some_and(|p| p.to_lowercase().contains(label)))
        };

        Self {
            total,
            domain_counts,
            pct_transmembrane: percent(count(&|r| VariantRecord::flag(r.is_transmembrane)), total),
            pct_pore: percent(count(&|r| VariantRecord::flag(r.is_pore_region)), total),
            pct_extracellular: percent(count(&|r| VariantRecord::flag(r.is_extracellular)), total),
            cadd: Describe::from_values(records.iter().map(|r| r.cadd_phred)),
            pct_cadd_over_20: percent(count(&|r| r.cadd_phred.is_some_and(|c| c > 20.0)), total),
            pct_sift_deleterious: percent(
                count(&|r| {
                    r.sift_pred.as_deref().is_some_and(|p| {
                        let p = p.to_lowercase();
                        p.contains("damaging") || p.contains("deleterious")
                    })
                }),
                total,
            ),
            pct_polyphen_probably: percent(polyphen("probably_damaging"), total),
            pct_polyphen_possibly: percent(polyphen("possibly_damaging"), total),
            pct_polyphen_benign: percent(polyphen("benign"), total),
        }
    }

    pub fn log(&self) {
        info!("Annotated variants: {}", self.total);
        info!("Domain distribution:");
        for (name, n) in &self.domain_counts {
            info!("  {:<22} {}", name, n);
        }
        info!("% transmembrane: {:.2}", self.pct_transmembrane);
        info!("% M2 pore region: {:.2}", self.pct_pore);
        info!("% extracellular: {:.2}", self.pct_extracellular);
        info!("CADD distribution:\n{}", self.cadd);
        info!("% CADD > 20: {:.2}", self.pct_cadd_over_20);
        info!("% SIFT damaging or deleterious: {:.2}", self.pct_sift_deleterious);
        info!(
            "% PolyPhen probably damaging: {:.2}, possibly damaging: {:.2}, benign: {:.2}",
            self.pct_polyphen_probably, self.pct_polyphen_possibly, self.pct_polyphen_benign
        );
    }
}
