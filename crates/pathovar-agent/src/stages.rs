//! Pipeline stages. Each stage reads the previous stage's table from the
//! processed directory and writes its own.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use pathovar_common::sandbox::HttpClient;
use pathovar_common::table::{read_table, read_variants, write_table, write_variants};
use pathovar_ingestion::annotation::{
    assign_domains, correct_coordinates, fetch_functional_scores, AnnotationSummary,
};
use pathovar_ingestion::clinical::review_variants;
use pathovar_ingestion::frequency::repair_gnomad_af;
use pathovar_ingestion::mining::mine_rare_missense;
use pathovar_ingestion::sources::clinvar::ClinVarClient;
use pathovar_ingestion::sources::ensembl::EnsemblClient;
use pathovar_ingestion::sources::pubmed::{EutilsIdentity, PubMedClient};
use pathovar_ingestion::sources::uniprot::UniProtClient;
use pathovar_ingestion::sources::vep::VepClient;
use pathovar_ranker::enrichment::{render_report, render_tsv, structural_enrichment};
use pathovar_ranker::scorer::{rank_variants, PriorityReport};
use pathovar_structure::mechanistic::{render_table, top_variants, PentamerGeometry, TopVariantMetrics};
use pathovar_structure::pdb::{parse_pdb_file, StructureFetcher};
use pathovar_structure::sifts::fetch_residue_map;
use pathovar_structure::spatial::annotate_spatial;
use pathovar_structure::Structure;

use crate::config::Config;

pub const RARE_VARIANTS: &str = "rare_missense_variants.csv";
pub const MASTER_CORRECTED: &str = "missense_master_corrected.csv";
pub const STRUCTURAL_ANNOTATED: &str = "missense_structural_annotated.csv";
pub const FULL_ANNOTATED: &str = "missense_full_annotated.csv";
pub const DOMAINS: &str = "domains.yaml";
pub const SPATIAL_ANNOTATED: &str = "missense_spatial_annotated.csv";
pub const RANKED: &str = "ranked_variants.csv";
pub const PRIORITY_SUMMARY: &str = "priority_summary.txt";
pub const TOP_VARIANTS: &str = "top_variants.csv";
pub const TOP_METRICS: &str = "top_structural_metrics.csv";
pub const TOP_METRICS_TABLE: &str = "top_structural_metrics.txt";
pub const CLINICAL: &str = "top_clinical_lit.csv";
pub const ENRICHMENT_REPORT: &str = "structural_enrichment.txt";
pub const ENRICHMENT_TSV: &str = "structural_ci.tsv";

/// A single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Mine,
    RepairAf,
    Annotate,
    Spatial,
    Prioritize,
    Mechanistic,
    Clinical,
    Enrichment,
}

impl Stage {
    /// Steps executed by `run`, in order.
    pub const PIPELINE: [Stage; 7] = [
        Stage::Mine,
        Stage::Annotate,
        Stage::Spatial,
        Stage::Prioritize,
        Stage::Mechanistic,
        Stage::Clinical,
        Stage::Enrichment,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Stage::Mine => "variant mining: extract and filter rare missense variants",
            Stage::RepairAf => "gnomAD allele-frequency repair",
            Stage::Annotate => "annotation phases A/B/C",
            Stage::Spatial => "structural mapping against the PDB entry",
            Stage::Prioritize => "priority scoring and categorisation",
            Stage::Mechanistic => "mechanistic distances for top variants",
            Stage::Clinical => "ClinVar and PubMed review",
            Stage::Enrichment => "structural feature enrichment",
        }
    }
}

pub struct Pipeline {
    config: Config,
    client: HttpClient,
    prefix: String,
}

impl Pipeline {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = HttpClient::new().context("building HTTP client")?;
        let prefix = config.target.file_prefix();
        Ok(Self { config, client, prefix })
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.config.output.processed(&self.prefix, suffix)
    }

    fn write_text(&self, suffix: &str, text: &str) -> anyhow::Result<PathBuf> {
        let path = self.path(suffix);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    fn read_stage(&self, suffix: &str) -> anyhow::Result<Vec<pathovar_common::VariantRecord>> {
        let path = self.path(suffix);
        read_variants(&path).with_context(|| format!("reading {}", path.display()))
    }

    fn write_stage(&self, suffix: &str, rows: &[pathovar_common::VariantRecord]) -> anyhow::Result<()> {
        let path = self.path(suffix);
        write_variants(&path, rows).with_context(|| format!("writing {}", path.display()))?;
        info!("Saved {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn identity(&self) -> EutilsIdentity {
        EutilsIdentity {
            api_key: self.config.ingestion.ncbi_api_key.clone(),
            email: self.config.ingestion.entrez_email.clone(),
        }
    }

    pub async fn run_stage(&self, stage: Stage) -> anyhow::Result<()> {
        match stage {
            Stage::Mine => self.mine().await,
            Stage::RepairAf => self.repair_af().await,
            Stage::Annotate => self.annotate().await,
            Stage::Spatial => self.spatial().await,
            Stage::Prioritize => self.prioritize(),
            Stage::Mechanistic => self.mechanistic().await,
            Stage::Clinical => self.clinical().await,
            Stage::Enrichment => self.enrichment(),
        }
    }

    /// Run every step of [`Stage::PIPELINE`], stopping at the first failure.
    pub async fn run_all(&self) -> anyhow::Result<()> {
        let total = Stage::PIPELINE.len();
        info!("=== Starting {} pipeline ===", self.config.target.gene_symbol);
        for (i, stage) in Stage::PIPELINE.iter().enumerate() {
            info!("[{}/{}] Running {}...", i + 1, total, stage.description());
            self.run_stage(*stage)
                .await
                .with_context(|| format!("step {}/{} ({}) failed", i + 1, total, stage.description()))?;
            info!("[{}/{}] SUCCESS", i + 1, total);
        }
        info!("=== Pipeline execution completed successfully ===");
        Ok(())
    }

    async fn mine(&self) -> anyhow::Result<()> {
        let source = EnsemblClient::new(self.client.clone());
        let (gene, records) = mine_rare_missense(
            &source,
            &self.config.target.gene_symbol,
            &self.config.filters,
            &self.config.ingestion,
        )
        .await?;
        info!(
            gene = %gene.gene_id,
            transcript = %gene.transcript_id,
            "Mined {} rare missense variants",
            records.len()
        );
        self.write_stage(RARE_VARIANTS, &records)
    }

    async fn repair_af(&self) -> anyhow::Result<()> {
        let mut records = self.read_stage(RARE_VARIANTS)?;
        let source = EnsemblClient::new(self.client.clone());
        repair_gnomad_af(&source, &mut records, self.config.ingestion.variation_batch_size).await;
        self.write_stage(MASTER_CORRECTED, &records)
    }

    async fn annotate(&self) -> anyhow::Result<()> {
        let records = self.read_stage(RARE_VARIANTS)?;

        info!("Phase A: coordinate correction and AF audit");
        let ensembl = EnsemblClient::new(self.client.clone());
        let mut records =
            correct_coordinates(&ensembl, records, &self.config.filters, &self.config.ingestion).await?;
        self.write_stage(MASTER_CORRECTED, &records)?;

        info!("Phase B: structural domains");
        let uniprot = UniProtClient::new(self.client.clone());
        let domains = assign_domains(
            &uniprot,
            &self.config.target.uniprot_id,
            &mut records,
            &self.config.structural.pore_domain,
        )
        .await?;
        domains.save(&self.path(DOMAINS))?;
        self.write_stage(STRUCTURAL_ANNOTATED, &records)?;

        info!("Phase C: functional scores");
        let vep = VepClient::new(self.client.clone());
        fetch_functional_scores(&vep, &mut records, &self.config.ingestion).await?;
        self.write_stage(FULL_ANNOTATED, &records)?;

        AnnotationSummary::from_records(&records).log();
        Ok(())
    }

    /// Download (or reuse) the configured PDB entry and parse it.
    async fn load_structure(&self) -> anyhow::Result<Structure> {
        let pdb_id = &self.config.target.pdb_id;
        let fetcher = StructureFetcher::new(self.client.clone(), &self.config.output.raw_dir);
        match fetcher.entry_metadata(pdb_id).await {
            Ok(meta) => info!(
                "{}: resolution {} Å, method {}",
                pdb_id,
                meta.resolution.map_or("n/a".to_string(), |r| format!("{:.2}", r)),
                meta.method.as_deref().unwrap_or("n/a")
            ),
            Err(e) => warn!("Could not fetch RCSB metadata for {}: {}", pdb_id, e),
        }
        let path = fetcher.fetch_pdb(pdb_id).await?;
        let structure = parse_pdb_file(&path)?;
        info!(
            "Parsed {}: {} atoms, chains {:?}, ligands {:?}",
            pdb_id,
            structure.atom_count(),
            structure.chain_ids(),
            structure.ligand_names()
        );
        Ok(structure)
    }

    async fn spatial(&self) -> anyhow::Result<()> {
        let mut records = self.read_stage(FULL_ANNOTATED)?;
        let target = &self.config.target;
        let structure = self.load_structure().await?;
        let map = fetch_residue_map(&self.client, &target.pdb_id, &target.uniprot_id, target.chain_id).await?;

        let summary = annotate_spatial(
            &structure,
            &map,
            target.chain_id,
            &mut records,
            &self.config.structural,
        )?;
        summary.log();
        self.write_stage(SPATIAL_ANNOTATED, &records)
    }

    fn prioritize(&self) -> anyhow::Result<()> {
        let records = self.read_stage(SPATIAL_ANNOTATED)?;
        let ranked = rank_variants(records, &self.config.scoring);
        self.write_stage(RANKED, &ranked)?;

        let report = PriorityReport::new(&ranked, self.config.output.report_top_n);
        let text = report.to_string();
        info!("\n{}", text);
        let path = self.write_text(PRIORITY_SUMMARY, &text)?;
        info!("Summary saved to {}", path.display());
        Ok(())
    }

    async fn mechanistic(&self) -> anyhow::Result<()> {
        let ranked = self.read_stage(RANKED)?;
        let top = top_variants(&ranked, self.config.output.top_n);
        let top_path = self.path(TOP_VARIANTS);
        write_table(&top_path, &top).with_context(|| format!("writing {}", top_path.display()))?;

        let target = &self.config.target;
        let structure = self.load_structure().await?;
        let map = fetch_residue_map(&self.client, &target.pdb_id, &target.uniprot_id, target.chain_id).await?;
        let geometry = PentamerGeometry::new(&structure, &map, target.chain_id, &self.config.structural.pore_domain)?;
        if let Some(center) = geometry.center() {
            info!("Pentamer centre: ({:.3}, {:.3}, {:.3})", center.x, center.y, center.z);
        }

        let metrics = geometry.annotate(top);
        let metrics_path = self.path(TOP_METRICS);
        write_table(&metrics_path, &metrics).with_context(|| format!("writing {}", metrics_path.display()))?;

        let table = render_table(&metrics)?;
        info!("\n{}", table);
        self.write_text(TOP_METRICS_TABLE, &table)?;
        Ok(())
    }

    async fn clinical(&self) -> anyhow::Result<()> {
        let path = self.path(TOP_METRICS);
        let rows: Vec<TopVariantMetrics> =
            read_table(&path).with_context(|| format!("reading {}", path.display()))?;
        let variants: Vec<(String, String)> = rows
            .into_iter()
            .map(|r| (r.rsid, r.amino_acid_change))
            .collect();

        let identity = self.identity();
        let clinvar = ClinVarClient::new(self.client.clone(), identity.clone());
        let pubmed = PubMedClient::new(self.client.clone(), identity);
        let delay = Duration::from_millis(self.config.ingestion.effective_entrez_delay_ms());

        let results = review_variants(
            &clinvar,
            &pubmed,
            &self.config.target.gene_symbol,
            &variants,
            delay,
        )
        .await?;
        let out = self.path(CLINICAL);
        write_table(&out, &results).with_context(|| format!("writing {}", out.display()))?;
        info!("Saved {} clinical records to {}", results.len(), out.display());
        Ok(())
    }

    fn enrichment(&self) -> anyhow::Result<()> {
        let ranked = self.read_stage(RANKED)?;
        let results = structural_enrichment(&ranked)?;

        let report = render_report(&results);
        info!("\n{}", report);
        self.write_text(ENRICHMENT_REPORT, &report)?;

        let tsv = render_tsv(&results);
        info!("\n{}", tsv);
        self.write_text(ENRICHMENT_TSV, &tsv)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathovar_common::table::PriorityCategory;
    use pathovar_common::VariantRecord;

    fn pipeline(dir: &std::path::Path) -> Pipeline {
        let mut config = Config::default();
        config.output.processed_dir = dir.to_path_buf();
        Pipeline::new(config).unwrap()
    }

    fn row(rsid: &str, cadd: f64, binding: bool) -> VariantRecord {
        VariantRecord {
            gene: "CHRNA7".to_string(),
            rsid: rsid.to_string(),
            protein_position: Some(100),
            amino_acid_change: "R100W".to_string(),
            gnomad_af: Some(1e-6),
            cadd_phred: Some(cadd),
            polyphen_pred: Some("probably_damaging".to_string()),
            sift_pred: Some("deleterious".to_string()),
            is_binding_site: Some(binding),
            is_pore_region: Some(false),
            is_interface: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(Stage::PIPELINE.first(), Some(&Stage::Mine));
        assert_eq!(Stage::PIPELINE.last(), Some(&Stage::Enrichment));
        assert!(!Stage::PIPELINE.contains(&Stage::RepairAf));
    }

    #[test]
    fn test_prioritize_and_enrichment_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let rows = vec![row("rs1", 31.0, true), row("rs2", 10.0, false), row("rs3", 26.0, false)];
        p.write_stage(SPATIAL_ANNOTATED, &rows).unwrap();

        p.prioritize().unwrap();
        let ranked = p.read_stage(RANKED).unwrap();
        assert_eq!(ranked[0].rsid, "rs1");
        assert_eq!(ranked[0].priority_score, Some(12));
        assert_eq!(ranked[0].priority_category, Some(PriorityCategory::High));
        assert!(dir.path().join("chrna7_priority_summary.txt").exists());

        p.enrichment().unwrap();
        let tsv = std::fs::read_to_string(dir.path().join("chrna7_structural_ci.tsv")).unwrap();
        assert!(tsv.starts_with("Feature\tOR\tLower_CI\tUpper_CI\tp-value"));
        assert_eq!(tsv.lines().count(), 4);
        assert!(dir.path().join("chrna7_structural_enrichment.txt").exists());
    }

    #[test]
    fn test_missing_input_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let err = p.prioritize().unwrap_err();
        assert!(format!("{:#}", err).contains("chrna7_missense_spatial_annotated.csv"));
    }
}
