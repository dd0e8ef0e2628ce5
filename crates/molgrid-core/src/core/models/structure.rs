use super::atom::Atom;
use super::element::Element;
use super::topology::{Bond, BondOrder};
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Extra tolerance added to the sum of covalent radii when perceiving bonds.
const BOND_TOLERANCE: f64 = 0.45;
/// Pairs closer than this are treated as overlapping duplicates, not bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("Atom index {index} is out of range for a structure with {len} atoms")]
    AtomIndexOutOfRange { index: usize, len: usize },
    #[error("An atom cannot be bonded to itself (index {0})")]
    SelfBond(usize),
    #[error("Atoms {0} and {1} are already bonded")]
    DuplicateBond(usize, usize),
    #[error("Bond references unknown atom serial {0}")]
    UnknownSerial(usize),
    #[error("Duplicate atom serial: {0}")]
    DuplicateSerial(usize),
}

/// An ordered collection of atoms and the bonds between them.
///
/// Atom order is significant: it is preserved from the input file and determines the
/// order of the coordinates produced for gridding. Connectivity is kept both as a bond
/// list and as a per-atom adjacency list for fast neighborhood queries by typers.
#[derive(Debug, Clone, Default)]
pub struct MolecularStructure {
    title: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
}

impl MolecularStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Adds a bond between two existing atoms.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range, if both indices are equal, or if
    /// the two atoms are already bonded.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<(), StructureError> {
        let len = self.atoms.len();
        for index in [a, b] {
            if index >= len {
                return Err(StructureError::AtomIndexOutOfRange { index, len });
            }
        }
        if a == b {
            return Err(StructureError::SelfBond(a));
        }
        if self.bond_between(a, b).is_some() {
            return Err(StructureError::DuplicateBond(a.min(b), a.max(b)));
        }
        self.bonds.push(Bond::new(a, b, order));
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        Ok(())
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn has_bonds(&self) -> bool {
        !self.bonds.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.atoms.iter().map(|a| &a.position)
    }

    /// Indices of the atoms bonded to `index`; empty for unknown indices.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map_or(&[], |v| v.as_slice())
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        let key = Bond::new(a, b, BondOrder::Single);
        self.bonds
            .iter()
            .find(|bond| bond.atom1 == key.atom1 && bond.atom2 == key.atom2)
    }

    fn neighbor_elements(&self, index: usize) -> impl Iterator<Item = Element> + '_ {
        self.neighbors(index)
            .iter()
            .filter_map(|&n| self.atoms.get(n).map(|a| a.element))
    }

    pub fn degree(&self, index: usize) -> usize {
        self.neighbors(index).len()
    }

    pub fn hydrogen_count(&self, index: usize) -> usize {
        self.neighbor_elements(index)
            .filter(|e| e.is_hydrogen())
            .count()
    }

    pub fn heavy_degree(&self, index: usize) -> usize {
        self.degree(index) - self.hydrogen_count(index)
    }

    pub fn is_bonded_to_heteroatom(&self, index: usize) -> bool {
        self.neighbor_elements(index).any(|e| e.is_heteroatom())
    }

    pub fn is_bonded_to(&self, index: usize, element: Element) -> bool {
        self.neighbor_elements(index).any(|e| e == element)
    }

    /// Flags every atom that participates in an aromatic bond as aromatic.
    pub fn mark_aromatic_from_bonds(&mut self) {
        for bond in &self.bonds {
            if bond.order == BondOrder::Aromatic {
                self.atoms[bond.atom1].aromatic = true;
                self.atoms[bond.atom2].aromatic = true;
            }
        }
    }

    /// Infers single bonds from interatomic distances and covalent radii.
    ///
    /// Two atoms are bonded when their distance is below the sum of their covalent radii
    /// plus a fixed tolerance. Candidates are accepted from shortest to longest, and a
    /// hydrogen never receives more than one bond. Existing bonds are kept. Atoms are
    /// bucketed into a cell list so the cost stays linear for proteins.
    ///
    /// # Return
    ///
    /// The number of bonds added.
    pub fn perceive_bonds(&mut self) -> usize {
        let Some(max_radius) = self
            .atoms
            .iter()
            .map(|a| a.element.covalent_radius() as f64)
            .reduce(f64::max)
        else {
            return 0;
        };
        let cell_size = (2.0 * max_radius + BOND_TOLERANCE).max(1.0);
        let cell_of = |p: &Point3<f64>| {
            (
                (p.x / cell_size).floor() as i64,
                (p.y / cell_size).floor() as i64,
                (p.z / cell_size).floor() as i64,
            )
        };

        let mut cells: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
        for (idx, atom) in self.atoms.iter().enumerate() {
            cells.entry(cell_of(&atom.position)).or_default().push(idx);
        }

        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for (i, atom) in self.atoms.iter().enumerate() {
            let (cx, cy, cz) = cell_of(&atom.position);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                            continue;
                        };
                        for &j in bucket.iter().filter(|&&j| j > i) {
                            let other = &self.atoms[j];
                            if atom.is_hydrogen() && other.is_hydrogen() {
                                continue;
                            }
                            let cutoff = (atom.element.covalent_radius()
                                + other.element.covalent_radius())
                                as f64
                                + BOND_TOLERANCE;
                            let dist = (atom.position - other.position).norm();
                            if dist > MIN_BOND_DISTANCE && dist < cutoff {
                                candidates.push((i, j, dist));
                            }
                        }
                    }
                }
            }
        }

        candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

        let mut added = 0;
        for (i, j, _) in candidates {
            let saturated = |idx: usize| self.atoms[idx].is_hydrogen() && self.degree(idx) > 0;
            if saturated(i) || saturated(j) {
                continue;
            }
            if self.add_bond(i, j, BondOrder::Single).is_ok() {
                added += 1;
            }
        }
        debug!(
            "Perceived {} bonds from distances for {} atoms.",
            added,
            self.atoms.len()
        );
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str, element: Element, x: f64, y: f64, z: f64) -> Atom {
        Atom::new(name, element, Point3::new(x, y, z))
    }

    fn water() -> MolecularStructure {
        let mut s = MolecularStructure::with_title("HOH");
        s.add_atom(atom("O", Element::O, 0.0, 0.0, 0.0));
        s.add_atom(atom("H1", Element::H, 0.9572, 0.0, 0.0));
        s.add_atom(atom("H2", Element::H, -0.24, 0.927, 0.0));
        s
    }

    #[test]
    fn add_bond_updates_adjacency_and_rejects_bad_bonds() {
        let mut s = water();
        s.add_bond(0, 1, BondOrder::Single).unwrap();

        assert_eq!(s.neighbors(0), &[1]);
        assert_eq!(s.neighbors(1), &[0]);
        assert_eq!(
            s.add_bond(1, 0, BondOrder::Single),
            Err(StructureError::DuplicateBond(0, 1))
        );
        assert_eq!(s.add_bond(2, 2, BondOrder::Single), Err(StructureError::SelfBond(2)));
        assert_eq!(
            s.add_bond(0, 9, BondOrder::Single),
            Err(StructureError::AtomIndexOutOfRange { index: 9, len: 3 })
        );
    }

    #[test]
    fn perceive_bonds_connects_water_without_h_h_bond() {
        let mut s = water();
        let added = s.perceive_bonds();

        assert_eq!(added, 2);
        assert_eq!(s.degree(0), 2);
        assert_eq!(s.hydrogen_count(0), 2);
        assert_eq!(s.heavy_degree(0), 0);
        assert!(s.bond_between(1, 2).is_none());
        assert!(s.is_bonded_to(1, Element::O));
    }

    #[test]
    fn perceive_bonds_gives_hydrogen_a_single_partner() {
        let mut s = MolecularStructure::new();
        s.add_atom(atom("C1", Element::C, 0.0, 0.0, 0.0));
        s.add_atom(atom("C2", Element::C, 1.8, 0.0, 0.0));
        s.add_atom(atom("H", Element::H, 0.9, 0.6, 0.0));
        s.perceive_bonds();

        assert_eq!(s.degree(2), 1);
        assert!(s.bond_between(0, 1).is_some());
    }

    #[test]
    fn perceive_bonds_on_empty_structure_is_noop() {
        let mut s = MolecularStructure::new();
        assert_eq!(s.perceive_bonds(), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn heteroatom_queries_and_aromatic_marking() {
        let mut s = MolecularStructure::new();
        s.add_atom(atom("C1", Element::C, 0.0, 0.0, 0.0));
        s.add_atom(atom("N1", Element::N, 1.34, 0.0, 0.0));
        s.add_atom(atom("C2", Element::C, 2.0, 1.2, 0.0));
        s.add_bond(0, 1, BondOrder::Aromatic).unwrap();
        s.add_bond(1, 2, BondOrder::Single).unwrap();
        s.mark_aromatic_from_bonds();

        assert!(s.is_bonded_to_heteroatom(0));
        assert!(!s.is_bonded_to_heteroatom(1));
        assert!(s.atom(0).unwrap().aromatic);
        assert!(s.atom(1).unwrap().aromatic);
        assert!(!s.atom(2).unwrap().aromatic);
    }
}
