//! PDB retrieval from RCSB and fixed-column PDB parsing.

use pathovar_common::sandbox::HttpClient;
use pathovar_common::{PathovarError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::model::{element_from_name, Atom, Chain, Point3D, Residue, Structure};

const RCSB_ENTRY_URL: &str = "https://data.rcsb.org/rest/v1/core/entry";
const RCSB_DOWNLOAD_URL: &str = "https://files.rcsb.org/download";

/// Resolution and method reported by the RCSB entry service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryMetadata {
    pub resolution: Option<f64>,
    pub method: Option<String>,
}

impl EntryMetadata {
    pub(crate) fn from_json(body: &serde_json::Value) -> Self {
        Self {
            resolution: body["rcsb_entry_info"]["resolution_combined"]
                .get(0)
                .and_then(|v| v.as_f64()),
            method: body["exptl"]
                .get(0)
                .and_then(|e| e["method"].as_str())
                .map(String::from),
        }
    }
}

/// Downloads PDB entries into a cache directory.
pub struct StructureFetcher {
    client: HttpClient,
    cache_dir: PathBuf,
}

impl StructureFetcher {
    pub fn new<P: AsRef<Path>>(client: HttpClient, cache_dir: P) -> Self {
        Self {
            client,
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// Cache location of an entry, e.g. `data/raw/7KOX.pdb`.
    pub fn cached_path(&self, pdb_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.pdb", pdb_id.to_uppercase()))
    }

    /// Return the cached file, downloading it first if absent.
    #[instrument(skip(self))]
    pub async fn fetch_pdb(&self, pdb_id: &str) -> Result<PathBuf> {
        let file_path = self.cached_path(pdb_id);
        if file_path.exists() {
            debug!("PDB {} found in cache", pdb_id);
            return Ok(file_path);
        }

        info!("Fetching PDB {} from RCSB", pdb_id);
        let url = format!("{}/{}.pdb", RCSB_DOWNLOAD_URL, pdb_id.to_uppercase());
        let content = self.client
            .get(&url)?
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        fs::create_dir_all(&self.cache_dir).await?;
        fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[instrument(skip(self))]
    pub async fn entry_metadata(&self, pdb_id: &str) -> Result<EntryMetadata> {
        let url = format!("{}/{}", RCSB_ENTRY_URL, pdb_id.to_uppercase());
        let body: serde_json::Value = self.client
            .get(&url)?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(EntryMetadata::from_json(&body))
    }
}

/// Parse PDB text. Only the first MODEL is read. Residues that reappear
/// under an already seen chain id (hetero groups listed after `TER`) are
/// appended to that chain.
pub fn parse_pdb(input: &str) -> Result<Structure> {
    let mut id = String::from("UNKN");
    let mut chains: Vec<Chain> = Vec::new();
    let mut atom_count = 0usize;
    let mut seen_model = false;

    for line in input.lines() {
        if line.starts_with("ENDMDL") {
            break;
        }
        if line.starts_with("MODEL") {
            if seen_model {
                break;
            }
            seen_model = true;
            continue;
        }
        if line.starts_with("HEADER") {
            let code = line.get(62..66).map(str::trim).unwrap_or("");
            if !code.is_empty() {
                id = code.to_string();
            }
            continue;
        }

        let is_hetatm = line.starts_with("HETATM");
        if !(is_hetatm || line.starts_with("ATOM  ")) {
            continue;
        }

        let atom = parse_atom_record(line, is_hetatm)?;
        let chain_id = safe_slice(line, 21, 22).chars().next().unwrap_or(' ');
        let seq_num = safe_slice(line, 22, 26)
            .trim()
            .parse::<i32>()
            .map_err(|e| PathovarError::Parse(format!("bad residue number: {}", e)))?;
        let i_code = safe_slice(line, 26, 27).chars().next().filter(|c| *c != ' ');
        let res_name = safe_slice(line, 17, 20).trim().to_string();
        atom_count += 1;

        let chain = match chains.iter().position(|c| c.id == chain_id) {
            Some(i) => &mut chains[i],
            None => {
                chains.push(Chain::new(chain_id, Vec::new()));
                let last = chains.len() - 1;
                &mut chains[last]
            }
        };

        let same_residue = chain.residues.last().is_some_and(|r| {
            r.seq_num == seq_num && r.i_code == i_code && r.name == res_name && r.is_hetero == is_hetatm
        });
        if !same_residue {
            chain.residues.push(Residue {
                name: res_name,
                seq_num,
                i_code,
                is_hetero: is_hetatm,
                atoms: Vec::new(),
            });
        }
        if let Some(residue) = chain.residues.last_mut() {
            residue.atoms.push(atom);
        }
    }

    if atom_count == 0 {
        return Err(PathovarError::Parse("no ATOM records found".into()));
    }
    Ok(Structure { id, chains })
}

pub fn parse_pdb_file(path: &Path) -> Result<Structure> {
    let contents = std::fs::read_to_string(path)?;
    let structure = parse_pdb(&contents)?;
    debug!(
        path = %path.display(),
        chains = structure.chains.len(),
        atoms = structure.atom_count(),
        "Parsed PDB"
    );
    Ok(structure)
}

fn parse_atom_record(line: &str, is_hetatm: bool) -> Result<Atom> {
    if line.len() < 54 {
        return Err(PathovarError::Parse(format!(
            "ATOM record too short ({} chars): {}",
            line.len(),
            line
        )));
    }

    let coord = |start: usize, end: usize, axis: &str| {
        safe_slice(line, start, end)
            .trim()
            .parse::<f64>()
            .map_err(|e| PathovarError::Parse(format!("bad {} coordinate: {}", axis, e)))
    };

    let serial = safe_slice(line, 6, 11).trim().parse::<u32>().unwrap_or(0);
    let name = safe_slice(line, 12, 16).to_string();
    let element = match safe_slice(line, 76, 78).trim() {
        "" => element_from_name(&name),
        e => e.to_uppercase(),
    };

    Ok(Atom {
        serial,
        coords: Point3D::new(coord(30, 38, "x")?, coord(38, 46, "y")?, coord(46, 54, "z")?),
        name,
        element,
        is_hetatm,
    })
}

/// Substring by byte columns that tolerates short lines.
fn safe_slice(s: &str, start: usize, end: usize) -> &str {
    let len = s.len();
    if start >= len {
        return "";
    }
    s.get(start..end.min(len)).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
HEADER    MEMBRANE PROTEIN                        01-JAN-20   7KOX\n\
MODEL        1\n\
ATOM      1  N   LEU A  10       0.000   0.000   0.000  1.00 10.00           N\n\
ATOM      2  CA  LEU A  10       1.000   0.000   0.000  1.00 10.00           C\n\
ATOM      3  H   LEU A  10       1.500   0.500   0.000  1.00 10.00           H\n\
ATOM      4  CA  SER A  11       4.000   0.000   0.000  1.00 10.00           C\n\
TER       5      SER A  11\n\
ATOM      6  CA  LEU B  10      20.000   0.000   0.000  1.00 10.00           C\n\
TER       7      LEU B  10\n\
HETATM    8  C1  NAG A 901       3.000   3.000   0.000  1.00 10.00           C\n\
HETATM    9  O   HOH A 902       1.000   1.000   0.000  1.00 10.00           O\n\
ENDMDL\n\
MODEL        2\n\
ATOM     10  CA  LEU C  10      99.000   0.000   0.000  1.00 10.00           C\n\
ENDMDL\n\
END\n";

    #[test]
    fn test_parse_first_model() {
        let s = parse_pdb(FIXTURE).unwrap();
        assert_eq!(s.id, "7KOX");
        assert_eq!(s.chain_ids(), vec!['A', 'B']);
        assert_eq!(s.atom_count(), 7);
        assert_eq!(s.ligand_names(), vec!["NAG".to_string()]);
    }

    #[test]
    fn test_hetero_groups_join_their_chain() {
        let s = parse_pdb(FIXTURE).unwrap();
        let a = s.chain('A').unwrap();
        assert_eq!(a.residues.len(), 4);
        assert!(a.residues[2].is_ligand());
        assert!(a.residues[3].is_water());
        assert_eq!(a.standard_residue(10).unwrap().atoms.len(), 3);
    }

    #[test]
    fn test_short_or_non_ascii_header() {
        let atom = "ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00 10.00           C\n";

        let short = format!("HEADER    SHORT\n{}", atom);
        assert_eq!(parse_pdb(&short).unwrap().id, "UNKN");

        // column 62 falls inside a two-byte character
        let accented = format!("HEADER     {}\n{}", "\u{e9}".repeat(30), atom);
        assert_eq!(parse_pdb(&accented).unwrap().id, "UNKN");
    }

    #[test]
    fn test_element_fallback() {
        let line = "ATOM      1  CA  ALA A   1       1.000   2.000   3.000";
        let atom = parse_atom_record(line, false).unwrap();
        assert_eq!(atom.element, "C");
        assert_eq!(atom.coords, Point3D::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_malformed_record() {
        assert!(parse_pdb("ATOM   BAD\n").is_err());
        assert!(parse_pdb("HEADER only\n").is_err());
    }

    #[test]
    fn test_entry_metadata() {
        let body = serde_json::json!({
            "rcsb_entry_info": {"resolution_combined": [2.7]},
            "exptl": [{"method": "ELECTRON MICROSCOPY"}]
        });
        let meta = EntryMetadata::from_json(&body);
        assert_eq!(meta.resolution, Some(2.7));
        assert_eq!(meta.method.as_deref(), Some("ELECTRON MICROSCOPY"));
        assert_eq!(EntryMetadata::from_json(&serde_json::json!({})), EntryMetadata::default());
    }

    #[test]
    fn test_cached_path_uses_upper_case() {
        let fetcher = StructureFetcher::new(HttpClient::new().unwrap(), "data/raw");
        assert_eq!(fetcher.cached_path("7kox"), PathBuf::from("data/raw/7KOX.pdb"));
    }
}
