//! Smoke tests against the live Ensembl, UniProt and NCBI services.
//!
//! Run with: cargo test --package pathovar-ingestion --test test_live_services -- --ignored --nocapture

use pathovar_common::sandbox::HttpClient;
use pathovar_ingestion::domains::DomainMap;
use pathovar_ingestion::sources::clinvar::ClinVarClient;
use pathovar_ingestion::sources::ensembl::EnsemblClient;
use pathovar_ingestion::sources::pubmed::{EutilsIdentity, PubMedClient};
use pathovar_ingestion::sources::uniprot::UniProtClient;
use pathovar_ingestion::sources::vep::VepClient;
use pathovar_ingestion::sources::{
    ClinicalSource, EffectPredictor, FeatureSource, LiteratureSource, VariationSource,
};

#[tokio::test]
#[ignore] // Requires network access
async fn test_ensembl_lookup_chrna7() {
    let client = EnsemblClient::new(HttpClient::new().unwrap());

    let gene = client.lookup_gene("CHRNA7").await.expect("lookup failed");
    println!("{:?}", gene);
    assert!(gene.gene_id.starts_with("ENSG"));
    assert!(gene.transcript_id.starts_with("ENST"));

    let variants = client
        .translation_variants(&gene.translation_id)
        .await
        .expect("overlap failed");
    println!("Fetched {} transcript variations", variants.len());
    assert!(!variants.is_empty());
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_vep_cadd_prediction() {
    let client = VepClient::new(HttpClient::new().unwrap());
    let results = client
        .predict(&["rs56159866".to_string()])
        .await
        .expect("VEP failed");
    assert_eq!(results.len(), 1);
    println!("{:#?}", results[0].transcript_consequences.first());
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_uniprot_domains_p36544() {
    let client = UniProtClient::new(HttpClient::new().unwrap());
    let features = client.features("P36544").await.expect("UniProt failed");
    let domains = DomainMap::from_features(&features);
    for d in domains.iter() {
        println!("{:<22} {}-{}", d.name, d.start, d.end);
    }
    assert!(domains.contains_name("M2"));
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_eutils_lookups() {
    let http = HttpClient::new().unwrap();
    let clinvar = ClinVarClient::new(http.clone(), EutilsIdentity::default());
    let pubmed = PubMedClient::new(http, EutilsIdentity::default());

    let summary = clinvar.summarise("rs1057519678").await.expect("ClinVar failed");
    println!("{:?}", summary);

    let hits = pubmed.count("CHRNA7 AND alpha7").await.expect("PubMed failed");
    println!("PubMed hits: {}", hits);
    assert!(hits > 0);
}
