//! Per-variant structural flags on the mapped chain.

use pathovar_common::summary::percent;
use pathovar_common::{PathovarError, Result, StructuralConfig, VariantRecord};
use tracing::{info, warn};

use crate::model::{Chain, Structure};
use crate::neighbor::NeighborGrid;
use crate::sifts::{Coverage, ResidueMap};

/// Contact lookups against ligands and neighbouring chains.
pub struct ContactFinder<'a> {
    chain: &'a Chain,
    map: &'a ResidueMap,
    ligands: NeighborGrid,
    partners: NeighborGrid,
    cutoff: f64,
}

impl<'a> ContactFinder<'a> {
    pub fn new(structure: &'a Structure, map: &'a ResidueMap, chain_id: char, cutoff: f64) -> Result<Self> {
        let chain = structure.chain(chain_id).ok_or_else(|| {
            PathovarError::MissingData(format!("chain {} not present in {}", chain_id, structure.id))
        })?;
        Ok(Self {
            chain,
            map,
            ligands: NeighborGrid::new(structure.ligand_atoms(), cutoff),
            partners: NeighborGrid::new(structure.atoms_outside_chain(chain_id), cutoff),
            cutoff,
        })
    }

    /// Whether any atom of the residue at `uniprot_position` lies within the
    /// cutoff of `grid`. Unmapped or absent residues give `false`.
    fn touches(&self, uniprot_position: Option<i64>, grid: &NeighborGrid) -> bool {
        if grid.is_empty() {
            return false;
        }
        let Some(pdb_pos) = uniprot_position.and_then(|p| self.map.get(p)) else {
            return false;
        };
        let Ok(seq_num) = i32::try_from(pdb_pos) else {
            return false;
        };
        self.chain
            .standard_residue(seq_num)
            .is_some_and(|res| res.atoms.iter().any(|a| grid.any_within(&a.coords, self.cutoff)))
    }

    pub fn is_binding_site(&self, uniprot_position: Option<i64>) -> bool {
        self.touches(uniprot_position, &self.ligands)
    }

    pub fn is_interface(&self, uniprot_position: Option<i64>) -> bool {
        self.touches(uniprot_position, &self.partners)
    }

    pub fn is_mappable(&self, uniprot_position: Option<i64>) -> bool {
        uniprot_position.is_some_and(|p| self.map.contains(p))
    }
}

/// Share of rows carrying each spatial flag.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialSummary {
    pub coverage: Coverage,
    pub pct_binding_site: f64,
    pub pct_interface: f64,
    pub pct_tm_core: f64,
    pub pct_unresolved: f64,
}

impl SpatialSummary {
    pub fn log(&self) {
        info!("% binding_site: {:.2}%", self.pct_binding_site);
        info!("% interface: {:.2}%", self.pct_interface);
        info!("% tm_core: {:.2}%", self.pct_tm_core);
        info!("% spatially_unresolved: {:.2}%", self.pct_unresolved);
    }
}

/// Set `is_binding_site`, `is_interface`, `spatially_unresolved` and
/// `is_tm_core` on every row.
pub fn annotate_spatial(
    structure: &Structure,
    map: &ResidueMap,
    chain_id: char,
    records: &mut [VariantRecord],
    cfg: &StructuralConfig,
) -> Result<SpatialSummary> {
    let coverage = Coverage::compute(records.iter().filter_map(|r| r.protein_position), map);
    info!(
        "Mappable variants: {} / {} ({:.2}%)",
        coverage.mappable,
        coverage.total,
        coverage.percent()
    );
    info!("Unmapped positions: {:?}", coverage.unmapped);
    if coverage.percent() < cfg.coverage_warn_percent {
        warn!(
            "Coverage below {}%, proceeding with unresolved variants flagged",
            cfg.coverage_warn_percent
        );
    }

    let finder = ContactFinder::new(structure, map, chain_id, cfg.contact_cutoff)?;
    for rec in records.iter_mut() {
        let pos = rec.protein_position;
        let unresolved = !finder.is_mappable(pos);
        rec.is_binding_site = Some(finder.is_binding_site(pos));
        rec.is_interface = Some(finder.is_interface(pos));
        rec.spatially_unresolved = Some(unresolved);
        rec.is_tm_core = Some(VariantRecord::flag(rec.is_transmembrane) && !unresolved);
    }

    let total = records.len();
    let count = |f: fn(&VariantRecord) -> Option<bool>| {
        records.iter().filter(|r| VariantRecord::flag(f(r))).count()
    };
    Ok(SpatialSummary {
        coverage,
        pct_binding_site: percent(count(|r| r.is_binding_site), total),
        pct_interface: percent(count(|r| r.is_interface), total),
        pct_tm_core: percent(count(|r| r.is_tm_core), total),
        pct_unresolved: percent(count(|r| r.spatially_unresolved), total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdb::parse_pdb;
    use serde_json::json;

    // Chain A: residues 1 (near ligand), 2 (near chain B), 3 (isolated).
    const PDB: &str = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00 10.00           C\n\
ATOM      2  CA  GLY A   2      20.000   0.000   0.000  1.00 10.00           C\n\
ATOM      3  CA  GLY A   3      40.000  40.000   0.000  1.00 10.00           C\n\
TER\n\
ATOM      4  CA  GLY B   1      23.000   0.000   0.000  1.00 10.00           C\n\
HETATM    5  O   HOH B 100      40.000  42.000   0.000  1.00 10.00           O\n\
TER\n\
HETATM    6  C1  NAG A 901       0.000   4.000   0.000  1.00 10.00           C\n\
END\n";

    fn map() -> ResidueMap {
        let body = json!({"7kox": {"UniProt": {"P36544": {"mappings": [
            {"chain_id": "A", "unp_start": 101, "unp_end": 103,
             "start": {"residue_number": 1}, "end": {"residue_number": 3}}
        ]}}}});
        ResidueMap::from_sifts(&body, "7kox", "P36544", 'A').unwrap()
    }

    fn row(pos: Option<i64>, tm: bool) -> VariantRecord {
        VariantRecord {
            protein_position: pos,
            is_transmembrane: Some(tm),
            ..Default::default()
        }
    }

    #[test]
    fn test_spatial_flags() {
        let structure = parse_pdb(PDB).unwrap();
        let mut rows = vec![
            row(Some(101), false),
            row(Some(102), true),
            row(Some(103), true),
            row(Some(500), true),
            row(None, true),
        ];
        let summary = annotate_spatial(&structure, &map(), 'A', &mut rows, &StructuralConfig::default()).unwrap();

        assert_eq!(rows[0].is_binding_site, Some(true));
        assert_eq!(rows[0].is_interface, Some(false));
        assert_eq!(rows[1].is_interface, Some(true));
        assert_eq!(rows[1].is_binding_site, Some(false));
        // Residue 3 touches only a chain B water.
        assert_eq!(rows[2].is_interface, Some(true));
        assert_eq!(rows[2].is_binding_site, Some(false));
        assert_eq!(rows[2].is_tm_core, Some(true));
        assert_eq!(rows[3].spatially_unresolved, Some(true));
        assert_eq!(rows[3].is_tm_core, Some(false));
        assert_eq!(rows[4].spatially_unresolved, Some(true));

        assert_eq!(summary.coverage.total, 4);
        assert_eq!(summary.coverage.mappable, 3);
        assert_eq!(summary.pct_binding_site, 20.0);
        assert_eq!(summary.pct_unresolved, 40.0);
    }

    #[test]
    fn test_hetero_group_in_other_chain_is_interface() {
        let pdb = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00 10.00           C\n\
TER\n\
HETATM    2  C1  NAG B 901       3.000   0.000   0.000  1.00 10.00           C\n\
END\n";
        let structure = parse_pdb(pdb).unwrap();
        let m = map();
        let finder = ContactFinder::new(&structure, &m, 'A', 5.0).unwrap();
        assert!(finder.is_interface(Some(101)));
        assert!(finder.is_binding_site(Some(101)));
        assert!(!finder.is_interface(Some(102)));
    }

    #[test]
    fn test_tm_core_implies_transmembrane_and_resolved() {
        let structure = parse_pdb(PDB).unwrap();
        let mut rows: Vec<VariantRecord> = [Some(101), Some(102), Some(999), None]
            .into_iter()
            .flat_map(|p| [row(p, true), row(p, false)])
            .collect();
        annotate_spatial(&structure, &map(), 'A', &mut rows, &StructuralConfig::default()).unwrap();
        for r in &rows {
            if r.is_tm_core == Some(true) {
                assert_eq!(r.is_transmembrane, Some(true));
                assert_eq!(r.spatially_unresolved, Some(false));
            }
        }
    }

    #[test]
    fn test_missing_chain_is_an_error() {
        let structure = parse_pdb(PDB).unwrap();
        let mut rows = vec![row(Some(101), false)];
        assert!(annotate_spatial(&structure, &map(), 'Z', &mut rows, &StructuralConfig::default()).is_err());
    }
}
