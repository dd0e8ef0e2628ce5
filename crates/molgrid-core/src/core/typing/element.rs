use super::gnina::gnina_type_info;
use super::{AtomTyper, IndexTyper};
use crate::core::models::element::{Element, NUM_ELEMENTS};
use crate::core::models::structure::MolecularStructure;

/// Default number of element types (atomic numbers below 84).
pub const DEFAULT_MAX_ELEMENT: u8 = 84;

/// Types atoms by atomic number.
///
/// Atoms whose atomic number is at or above `max_element` fall into type 0, the same
/// type as the dummy element. Radii are covalent radii.
#[derive(Debug, Clone, Copy)]
pub struct ElementIndexTyper {
    max_element: u8,
}

impl Default for ElementIndexTyper {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ELEMENT)
    }
}

impl ElementIndexTyper {
    pub fn new(max_element: u8) -> Self {
        Self {
            max_element: max_element.clamp(1, NUM_ELEMENTS as u8),
        }
    }

    pub fn max_element(&self) -> u8 {
        self.max_element
    }

    fn type_of(&self, element: Element) -> (i32, f32) {
        let number = element.atomic_number();
        let index = if number < self.max_element { number } else { 0 };
        (index as i32, element.covalent_radius())
    }
}

impl AtomTyper for ElementIndexTyper {
    fn num_types(&self) -> usize {
        self.max_element as usize
    }

    fn type_names(&self) -> Vec<String> {
        (0..self.max_element)
            .filter_map(Element::from_atomic_number)
            .map(|e| e.symbol().to_string())
            .collect()
    }

    fn type_radii(&self) -> Vec<f32> {
        (0..self.max_element)
            .filter_map(Element::from_atomic_number)
            .map(Element::covalent_radius)
            .collect()
    }
}

impl IndexTyper for ElementIndexTyper {
    fn atom_type_index(&self, structure: &MolecularStructure, atom: usize) -> (i32, f32) {
        structure
            .atom(atom)
            .map_or((-1, 0.0), |a| self.type_of(a.element))
    }

    /// Pre-typed gnina atoms are typed by the element of their gnina type. Generic
    /// metals have no single element and are dropped.
    fn int_type_index(&self, t: i32) -> Option<(i32, f32)> {
        Some(match gnina_type_info(t) {
            Some(info) if !info.element.is_dummy() => self.type_of(info.element),
            _ => (-1, 0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    #[test]
    fn types_by_atomic_number_with_covalent_radius() {
        let mut s = MolecularStructure::new();
        s.add_atom(Atom::new("C", Element::C, Point3::origin()));
        s.add_atom(Atom::new("RN", Element::from_symbol_lossy("Rn"), Point3::origin()));
        let typer = ElementIndexTyper::default();
        assert_eq!(typer.atom_type_index(&s, 0), (6, 0.76));
        assert_eq!(typer.atom_type_index(&s, 1).0, 0);
        assert_eq!(typer.num_types(), 84);
        assert_eq!(typer.type_names()[8], "O");
        assert_eq!(typer.type_radii().len(), 84);
    }

    #[test]
    fn small_max_element_collapses_heavier_atoms() {
        let typer = ElementIndexTyper::new(9);
        assert_eq!(typer.type_of(Element::O).0, 8);
        assert_eq!(typer.type_of(Element::F).0, 0);
        assert_eq!(typer.type_names().len(), 9);
    }

    #[test]
    fn pretyped_gnina_atoms_use_their_element() {
        let typer = ElementIndexTyper::default();
        assert_eq!(typer.int_type_index(12).map(|(t, _)| t), Some(8));
        assert_eq!(typer.int_type_index(26), Some((-1, 0.0)));
    }
}
