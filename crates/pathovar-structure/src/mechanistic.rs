//! Distance metrics for the highest-ranked variants.

use pathovar_common::{PathovarError, Result, VariantRecord};
use serde::{Deserialize, Serialize};

use crate::model::{Atom, Point3D, Structure};
use crate::neighbor::min_distance;
use crate::sifts::ResidueMap;

/// Reported columns of a top-ranked variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopVariant {
    pub rsid: String,
    pub protein_position: Option<i64>,
    pub amino_acid_change: String,
    pub domain_region: Option<String>,
    #[serde(rename = "gnomAD_AF")]
    pub gnomad_af: Option<f64>,
    pub cadd_phred: Option<f64>,
    pub sift_prediction: Option<String>,
    pub polyphen_prediction: Option<String>,
    pub is_binding_site: Option<bool>,
    pub is_interface: Option<bool>,
    pub is_pore_core: Option<bool>,
    pub is_tm_core: Option<bool>,
    pub spatially_unresolved: Option<bool>,
    pub priority_score: Option<u32>,
}

impl From<&VariantRecord> for TopVariant {
    fn from(r: &VariantRecord) -> Self {
        Self {
            rsid: r.rsid.clone(),
            protein_position: r.protein_position,
            amino_acid_change: r.amino_acid_change.clone(),
            domain_region: r.domain_region.clone(),
            gnomad_af: r.gnomad_af,
            cadd_phred: r.cadd_phred,
            sift_prediction: r.sift_pred.clone(),
            polyphen_prediction: r.polyphen_pred.clone(),
            is_binding_site: r.is_binding_site,
            is_interface: r.is_interface,
            is_pore_core: r.is_pore_region,
            is_tm_core: r.is_tm_core,
            spatially_unresolved: r.spatially_unresolved,
            priority_score: r.priority_score,
        }
    }
}

/// First `n` rows of a ranked table.
pub fn top_variants(ranked: &[VariantRecord], n: usize) -> Vec<TopVariant> {
    ranked.iter().take(n).map(TopVariant::from).collect()
}

/// A top variant with its structural distances (Å).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopVariantMetrics {
    pub rsid: String,
    pub protein_position: Option<i64>,
    pub amino_acid_change: String,
    pub domain_region: Option<String>,
    #[serde(rename = "gnomAD_AF")]
    pub gnomad_af: Option<f64>,
    pub cadd_phred: Option<f64>,
    pub sift_prediction: Option<String>,
    pub polyphen_prediction: Option<String>,
    pub is_binding_site: Option<bool>,
    pub is_interface: Option<bool>,
    pub is_pore_core: Option<bool>,
    pub is_tm_core: Option<bool>,
    pub spatially_unresolved: Option<bool>,
    pub priority_score: Option<u32>,
    pub min_dist_ligand: Option<f64>,
    pub min_dist_interface: Option<f64>,
    pub radial_dist_center: Option<f64>,
}

impl TopVariantMetrics {
    fn new(v: TopVariant, d: Distances) -> Self {
        Self {
            rsid: v.rsid,
            protein_position: v.protein_position,
            amino_acid_change: v.amino_acid_change,
            domain_region: v.domain_region,
            gnomad_af: v.gnomad_af,
            cadd_phred: v.cadd_phred,
            sift_prediction: v.sift_prediction,
            polyphen_prediction: v.polyphen_prediction,
            is_binding_site: v.is_binding_site,
            is_interface: v.is_interface,
            is_pore_core: v.is_pore_core,
            is_tm_core: v.is_tm_core,
            spatially_unresolved: v.spatially_unresolved,
            priority_score: v.priority_score,
            min_dist_ligand: d.ligand,
            min_dist_interface: d.interface,
            radial_dist_center: d.radial,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Distances {
    ligand: Option<f64>,
    interface: Option<f64>,
    radial: Option<f64>,
}

/// Heavy-atom geometry shared by every measured variant.
pub struct PentamerGeometry<'a> {
    structure: &'a Structure,
    map: &'a ResidueMap,
    chain_id: char,
    pore_domain: String,
    center: Option<Point3D>,
    ligand_atoms: Vec<&'a Atom>,
    partner_atoms: Vec<&'a Atom>,
}

impl<'a> PentamerGeometry<'a> {
    pub fn new(structure: &'a Structure, map: &'a ResidueMap, chain_id: char, pore_domain: &str) -> Result<Self> {
        if structure.chain(chain_id).is_none() {
            return Err(PathovarError::MissingData(format!(
                "chain {} not present in {}",
                chain_id, structure.id
            )));
        }
        let ligand_atoms = structure
            .ligand_atoms()
            .into_iter()
            .filter(|a| a.is_heavy())
            .collect();
        let partner_atoms = structure
            .polymer_atoms_outside_chain(chain_id)
            .into_iter()
            .filter(|a| a.is_heavy())
            .collect();
        Ok(Self {
            structure,
            map,
            chain_id,
            pore_domain: pore_domain.to_string(),
            center: structure.polymer_heavy_centroid(),
            ligand_atoms,
            partner_atoms,
        })
    }

    /// Centroid of all polymer heavy atoms, the pore-axis proxy.
    pub fn center(&self) -> Option<Point3D> {
        self.center
    }

    fn measure(&self, v: &TopVariant) -> Distances {
        if VariantRecord::flag(v.spatially_unresolved) {
            return Distances::default();
        }
        let residue = v
            .protein_position
            .and_then(|p| self.map.get(p))
            .and_then(|p| i32::try_from(p).ok())
            .and_then(|seq| self.structure.chain(self.chain_id)?.standard_residue(seq));
        let Some(residue) = residue else {
            return Distances::default();
        };

        let heavy: Vec<&Atom> = residue.heavy_atoms().collect();
        if heavy.is_empty() {
            return Distances::default();
        }

        let radial = if v.domain_region.as_deref() == Some(self.pore_domain.as_str()) {
            residue
                .heavy_centroid()
                .zip(self.center)
                .map(|(c, center)| c.distance_to(&center))
        } else {
            None
        };

        Distances {
            ligand: min_distance(heavy.iter().copied(), self.ligand_atoms.iter().copied()),
            interface: min_distance(heavy.iter().copied(), self.partner_atoms.iter().copied()),
            radial,
        }
    }

    pub fn annotate(&self, top: Vec<TopVariant>) -> Vec<TopVariantMetrics> {
        top.into_iter()
            .map(|v| {
                let d = self.measure(&v);
                TopVariantMetrics::new(v, d)
            })
            .collect()
    }
}

/// Render rows as a right-aligned plain-text table.
pub fn render_table(rows: &[TopVariantMetrics]) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    for row in rows {
        w.serialize(row)?;
    }
    let bytes = w.into_inner().map_err(|e| PathovarError::Io(e.into_error()))?;
    let text = String::from_utf8_lossy(&bytes).to_string();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(text.as_bytes());
    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        cells.push(
            record
                .iter()
                .map(|c| if c.is_empty() { "NaN".to_string() } else { c.to_string() })
                .collect(),
        );
    }

    let n_cols = cells.iter().map(|r| r.len()).max().unwrap_or(0);
    let widths: Vec<usize> = (0..n_cols)
        .map(|i| cells.iter().filter_map(|r| r.get(i)).map(|c| c.len()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:>width$}", c, width = widths[i]))
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    Ok(out)
}
