//! In-memory representation of a parsed PDB model.

/// Cartesian coordinates in Ångström.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn add(&self, other: &Point3D) -> Point3D {
        Point3D::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    fn scale(&self, s: f64) -> Point3D {
        Point3D::new(self.x * s, self.y * s, self.z * s)
    }

    /// Unweighted mean of `points`, `None` when empty.
    pub fn centroid<'a, I>(points: I) -> Option<Point3D>
    where
        I: IntoIterator<Item = &'a Point3D>,
    {
        let (sum, n) = points
            .into_iter()
            .fold((Point3D::zero(), 0usize), |(sum, n), p| (sum.add(p), n + 1));
        (n > 0).then(|| sum.scale(1.0 / n as f64))
    }
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub serial: u32,
    /// Atom name as written in columns 13-16, untrimmed.
    pub name: String,
    pub coords: Point3D,
    /// Element symbol; inferred from the atom name when columns 77-78 are blank.
    pub element: String,
    pub is_hetatm: bool,
}

impl Atom {
    pub fn is_hydrogen(&self) -> bool {
        self.element.eq_ignore_ascii_case("H") || self.element.eq_ignore_ascii_case("D")
    }

    pub fn is_heavy(&self) -> bool {
        !self.is_hydrogen()
    }
}

/// Guess the element from an atom name: its first alphabetic character.
pub(crate) fn element_from_name(name: &str) -> String {
    name.trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

const WATER: [&str; 3] = ["HOH", "WAT", "DOD"];

#[derive(Debug, Clone)]
pub struct Residue {
    pub name: String,
    pub seq_num: i32,
    pub i_code: Option<char>,
    /// Built from HETATM records.
    pub is_hetero: bool,
    pub atoms: Vec<Atom>,
}

impl Residue {
    /// Polymer residue from ATOM records.
    pub fn is_standard(&self) -> bool {
        !self.is_hetero
    }

    pub fn is_water(&self) -> bool {
        self.is_hetero && WATER.contains(&self.name.as_str())
    }

    /// Hetero group other than water.
    pub fn is_ligand(&self) -> bool {
        self.is_hetero && !self.is_water()
    }

    pub fn heavy_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().filter(|a| a.is_heavy())
    }

    /// Centroid of the heavy atoms.
    pub fn heavy_centroid(&self) -> Option<Point3D> {
        Point3D::centroid(self.heavy_atoms().map(|a| &a.coords))
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub id: char,
    pub residues: Vec<Residue>,
}

impl Chain {
    pub fn new(id: char, residues: Vec<Residue>) -> Self {
        Self { id, residues }
    }

    /// Standard residue `seq_num` without insertion code.
    pub fn standard_residue(&self, seq_num: i32) -> Option<&Residue> {
        self.residues
            .iter()
            .find(|r| r.is_standard() && r.seq_num == seq_num && r.i_code.is_none())
    }

    pub fn atom_count(&self) -> usize {
        self.residues.iter().map(|r| r.atoms.len()).sum()
    }
}

/// First model of a PDB entry.
#[derive(Debug, Clone)]
pub struct Structure {
    pub id: String,
    pub chains: Vec<Chain>,
}

impl Structure {
    pub fn chain(&self, id: char) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Sorted chain identifiers.
    pub fn chain_ids(&self) -> Vec<char> {
        let mut ids: Vec<char> = self.chains.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Sorted, de-duplicated residue names of ligands.
    pub fn ligand_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .residues()
            .filter(|(_, r)| r.is_ligand())
            .map(|(_, r)| r.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn residues(&self) -> impl Iterator<Item = (char, &Residue)> {
        self.chains
            .iter()
            .flat_map(|c| c.residues.iter().map(move |r| (c.id, r)))
    }

    pub fn atom_count(&self) -> usize {
        self.chains.iter().map(|c| c.atom_count()).sum()
    }

    /// Every atom of every ligand residue.
    pub fn ligand_atoms(&self) -> Vec<&Atom> {
        self.residues()
            .filter(|(_, r)| r.is_ligand())
            .flat_map(|(_, r)| r.atoms.iter())
            .collect()
    }

    /// Every atom, hetero groups and waters included, in chains other than
    /// `chain`.
    pub fn atoms_outside_chain(&self, chain: char) -> Vec<&Atom> {
        self.residues()
            .filter(|(c, _)| *c != chain)
            .flat_map(|(_, r)| r.atoms.iter())
            .collect()
    }

    /// Atoms of standard residues in chains other than `chain`.
    pub fn polymer_atoms_outside_chain(&self, chain: char) -> Vec<&Atom> {
        self.residues()
            .filter(|(c, r)| *c != chain && r.is_standard())
            .flat_map(|(_, r)| r.atoms.iter())
            .collect()
    }

    /// Centroid of all heavy atoms of standard residues in all chains.
    pub fn polymer_heavy_centroid(&self) -> Option<Point3D> {
        Point3D::centroid(
            self.residues()
                .filter(|(_, r)| r.is_standard())
                .flat_map(|(_, r)| r.heavy_atoms().map(|a| &a.coords)),
        )
    }
}
