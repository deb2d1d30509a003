//! pathovar-structure — Protein structure side of the pipeline.
//!
//! 1. Fetching the PDB entry and its RCSB metadata (cached on disk)
//! 2. Parsing ATOM/HETATM records of the first model
//! 3. Mapping UniProt positions to PDB residues via SIFTS
//! 4. Flagging binding-site, interface and transmembrane-core variants
//! 5. Measuring ligand, interface and pore-axis distances for top variants

pub mod model;
pub mod pdb;
pub mod sifts;
pub mod neighbor;
pub mod spatial;
pub mod mechanistic;

pub use model::{Atom, Chain, Point3D, Residue, Structure};
pub use sifts::ResidueMap;
