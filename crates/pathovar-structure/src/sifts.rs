//! UniProt → PDB residue numbering from the PDBe SIFTS mappings API.
//!
//! Endpoint: https://www.ebi.ac.uk/pdbe/api/mappings/uniprot/{pdb_id}

use std::collections::{BTreeMap, HashSet};

use pathovar_common::sandbox::HttpClient;
use pathovar_common::{PathovarError, Result};
use serde::Deserialize;
use tracing::{info, instrument, warn};

const SIFTS_URL: &str = "https://www.ebi.ac.uk/pdbe/api/mappings/uniprot";

#[derive(Debug, Clone, Deserialize)]
struct Segment {
    chain_id: String,
    unp_start: i64,
    unp_end: i64,
    start: ResidueRef,
    end: ResidueRef,
}

#[derive(Debug, Clone, Deserialize)]
struct ResidueRef {
    residue_number: i64,
}

/// UniProt position → author residue number in one chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidueMap {
    positions: BTreeMap<i64, i64>,
}

impl ResidueMap {
    /// Build the map from a SIFTS response body.
    ///
    /// Segments whose UniProt and PDB spans differ in length are skipped
    /// with a warning, since no residue-level offset exists for them.
    pub fn from_sifts(body: &serde_json::Value, pdb_id: &str, accession: &str, chain: char) -> Result<Self> {
        let segments = &body[pdb_id.to_lowercase()]["UniProt"][accession]["mappings"];
        let segments: Vec<Segment> = match segments {
            serde_json::Value::Null => Vec::new(),
            v => serde_json::from_value(v.clone())?,
        };

        let chain = chain.to_string();
        let mut positions = BTreeMap::new();
        for seg in segments.iter().filter(|s| s.chain_id == chain) {
            let pdb_start = seg.start.residue_number;
            let pdb_end = seg.end.residue_number;
            if seg.unp_end - seg.unp_start != pdb_end - pdb_start {
                warn!(
                    "Segment mismatch - UNP {}-{} vs PDB {}-{}",
                    seg.unp_start, seg.unp_end, pdb_start, pdb_end
                );
                continue;
            }
            for offset in 0..=(seg.unp_end - seg.unp_start) {
                positions.insert(seg.unp_start + offset, pdb_start + offset);
            }
        }
        Ok(Self { positions })
    }

    pub fn get(&self, uniprot_position: i64) -> Option<i64> {
        self.positions.get(&uniprot_position).copied()
    }

    pub fn contains(&self, uniprot_position: i64) -> bool {
        self.positions.contains_key(&uniprot_position)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Fetch the SIFTS mapping of `accession` onto `chain` of `pdb_id`.
/// A failed request is an error: no spatial annotation is possible without it.
#[instrument(skip(client))]
pub async fn fetch_residue_map(
    client: &HttpClient,
    pdb_id: &str,
    accession: &str,
    chain: char,
) -> Result<ResidueMap> {
    let url = format!("{}/{}", SIFTS_URL, pdb_id.to_lowercase());
    let resp = client.get(&url)?.send().await?;
    if !resp.status().is_success() {
        return Err(PathovarError::MissingData(format!(
            "Failed to fetch SIFTS mapping for {} (HTTP {})",
            pdb_id,
            resp.status()
        )));
    }
    let body: serde_json::Value = resp.json().await?;
    let map = ResidueMap::from_sifts(&body, pdb_id, accession, chain)?;
    info!(mapped = map.len(), "SIFTS residues mapped for {} chain {}", accession, chain);
    Ok(map)
}

/// How many distinct variant positions can be placed on the structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub mappable: usize,
    pub total: usize,
    pub unmapped: Vec<i64>,
}

impl Coverage {
    pub fn compute<I>(positions: I, map: &ResidueMap) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<i64> = positions.into_iter().filter(|p| seen.insert(*p)).collect();
        let unmapped: Vec<i64> = unique.iter().copied().filter(|p| !map.contains(*p)).collect();
        Self {
            mappable: unique.len() - unmapped.len(),
            total: unique.len(),
            unmapped,
        }
    }

    pub fn percent(&self) -> f64 {
        pathovar_common::summary::percent(self.mappable, self.total)
    }
}
