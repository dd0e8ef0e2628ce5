use super::atom::Atom;
use super::structure::{MolecularStructure, StructureError};
use super::topology::BondOrder;
use std::collections::HashMap;

/// Incrementally assembles a [`MolecularStructure`] from file records.
///
/// Structure formats refer to atoms by serial number and may list connectivity before
/// all atoms are known, so bonds are collected by serial and resolved in [`build`].
/// The residue and chain context set with [`start_residue`] is stamped onto every atom
/// added afterwards.
///
/// [`build`]: StructureBuilder::build
/// [`start_residue`]: StructureBuilder::start_residue
#[derive(Debug, Default)]
pub struct StructureBuilder {
    structure: MolecularStructure,
    serial_map: HashMap<usize, usize>,
    pending_bonds: Vec<(usize, usize, BondOrder)>,
    chain_id: Option<char>,
    residue: Option<(isize, String)>,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.structure.set_title(title);
        self
    }

    pub fn start_chain(&mut self, id: char) -> &mut Self {
        self.chain_id = Some(id);
        self.residue = None;
        self
    }

    pub fn start_residue(&mut self, number: isize, name: &str) -> &mut Self {
        self.residue = Some((number, name.to_string()));
        self
    }

    pub fn has_serial(&self, serial: usize) -> bool {
        self.serial_map.contains_key(&serial)
    }

    /// Adds an atom under the current chain and residue.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::DuplicateSerial`] if the serial was already used.
    pub fn add_atom(&mut self, serial: usize, mut atom: Atom) -> Result<&mut Self, StructureError> {
        if self.serial_map.contains_key(&serial) {
            return Err(StructureError::DuplicateSerial(serial));
        }
        if let Some(chain_id) = self.chain_id {
            atom.chain_id = chain_id;
        }
        if let Some((number, name)) = &self.residue {
            atom.residue_number = *number;
            atom.residue_name = name.clone();
        }
        let index = self.structure.add_atom(atom);
        self.serial_map.insert(serial, index);
        Ok(self)
    }

    /// Records a bond between two serials; duplicates are merged at build time.
    pub fn add_bond(&mut self, serial1: usize, serial2: usize, order: BondOrder) -> &mut Self {
        self.pending_bonds.push((serial1, serial2, order));
        self
    }

    /// Resolves pending bonds and returns the finished structure.
    ///
    /// Aromatic bonds mark their atoms as aromatic. A bond listed twice keeps the order
    /// of its first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::UnknownSerial`] if a bond names a serial that was never
    /// added, or any error from [`MolecularStructure::add_bond`] other than duplicates.
    pub fn build(mut self) -> Result<MolecularStructure, StructureError> {
        for (serial1, serial2, order) in std::mem::take(&mut self.pending_bonds) {
            let a = *self
                .serial_map
                .get(&serial1)
                .ok_or(StructureError::UnknownSerial(serial1))?;
            let b = *self
                .serial_map
                .get(&serial2)
                .ok_or(StructureError::UnknownSerial(serial2))?;
            match self.structure.add_bond(a, b, order) {
                Ok(()) | Err(StructureError::DuplicateBond(_, _)) => {}
                Err(e) => return Err(e),
            }
        }
        self.structure.mark_aromatic_from_bonds();
        Ok(self.structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn atom(name: &str, element: Element) -> Atom {
        Atom::new(name, element, Point3::origin())
    }

    #[test]
    fn builder_stamps_residue_context_and_resolves_serials() {
        let mut builder = StructureBuilder::new();
        builder.start_chain('A').start_residue(42, "PHE");
        builder.add_atom(10, atom("CG", Element::C)).unwrap();
        builder.add_atom(11, atom("CD1", Element::C)).unwrap();
        builder.add_bond(10, 11, BondOrder::Aromatic);
        builder.add_bond(11, 10, BondOrder::Aromatic);

        let s = builder.build().unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.bonds().len(), 1);
        let cg = s.atom(0).unwrap();
        assert_eq!(cg.chain_id, 'A');
        assert_eq!(cg.residue_number, 42);
        assert_eq!(cg.residue_name, "PHE");
        assert!(cg.aromatic);
    }

    #[test]
    fn builder_rejects_duplicate_and_unknown_serials() {
        let mut builder = StructureBuilder::new();
        builder.add_atom(1, atom("C1", Element::C)).unwrap();
        assert_eq!(
            builder.add_atom(1, atom("C2", Element::C)).err(),
            Some(StructureError::DuplicateSerial(1))
        );
        builder.add_bond(1, 5, BondOrder::Single);
        assert_eq!(builder.build().err(), Some(StructureError::UnknownSerial(5)));
    }
}
