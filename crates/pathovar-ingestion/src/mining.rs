//! Missense variant mining for a single gene.
//!
//! 1. Resolve the canonical transcript and translation for the gene symbol
//! 2. Fetch every transcript variation overlapping the translation
//! 3. Keep missense variants that carry a dbSNP rsid
//! 4. Attach gnomAD allele frequencies and keep the rare ones

use pathovar_common::{FilterConfig, IngestionConfig, Result, VariantRecord};
use tracing::{info, instrument};

use crate::frequency::{apply_gnomad_af, fetch_variation_records};
use crate::models::{GeneInfo, TranscriptVariation};
use crate::sources::VariationSource;

const MISSENSE: &str = "missense_variant";

/// Split an `X/Y` allele or residue string into its first and last parts.
/// Strings without a `/` yield two empty parts.
pub fn split_pair(s: &str) -> (String, String) {
    if !s.contains('/') {
        return (String::new(), String::new());
    }
    let first = s.split('/').next().unwrap_or("");
    let last = s.rsplit('/').next().unwrap_or("");
    (first.to_string(), last.to_string())
}

/// Turn overlap features into variant rows, keeping rsid-bearing missense
/// variants only. Features without a protein start are dropped.
pub fn extract_missense(variants: &[TranscriptVariation], gene: &GeneInfo) -> Vec<VariantRecord> {
    variants
        .iter()
        .filter(|v| v.consequence.as_deref().is_some_and(|c| c.contains(MISSENSE)))
        .filter_map(|v| {
            let rsid = v.id.as_deref().filter(|id| id.starts_with("rs"))?;
            let (ref_allele, alt_allele) = split_pair(v.allele.as_deref().unwrap_or(""));
            let (ref_aa, alt_aa) = split_pair(v.residues.as_deref().unwrap_or(""));
            let start = v.start?;

            Some(VariantRecord {
                gene: gene.symbol.clone(),
                transcript_id: gene.transcript_id.clone(),
                rsid: rsid.to_string(),
                chrom: v.seq_region_name.clone().unwrap_or_default(),
                pos: Some(start),
                ref_allele,
                alt_allele,
                protein_position: Some(start),
                amino_acid_change: format!("{}{}{}", ref_aa, start, alt_aa),
                consequence: MISSENSE.to_string(),
                ..Default::default()
            })
        })
        .collect()
}

/// Whether a row passes the rarity filter. Variants absent from gnomAD count
/// as frequency 0.
pub fn is_rare(record: &VariantRecord, threshold: f64) -> bool {
    record.gnomad_af.unwrap_or(0.0) < threshold
}

/// Run the full mining stage and return the rare missense variants.
#[instrument(skip(source, filters, ingestion))]
pub async fn mine_rare_missense(
    source: &dyn VariationSource,
    gene_symbol: &str,
    filters: &FilterConfig,
    ingestion: &IngestionConfig,
) -> Result<(GeneInfo, Vec<VariantRecord>)> {
    let gene = source.lookup_gene(gene_symbol).await?;
    let variants = source.translation_variants(&gene.translation_id).await?;

    let mut records = extract_missense(&variants, &gene);
    info!("Filtered to {} missense variants with RSIDs", records.len());
    if records.is_empty() {
        return Ok((gene, records));
    }

    let rsids: Vec<String> = records.iter().map(|r| r.rsid.clone()).collect();
    let variation = fetch_variation_records(source, &rsids, ingestion.variation_batch_size).await;
    apply_gnomad_af(&mut records, &variation);

    records.retain(|r| is_rare(r, filters.af_threshold));
    info!(
        "Filtered down to {} rare variants (AF < {})",
        records.len(),
        filters.af_threshold
    );
    Ok((gene, records))
}
