use super::element::Element;
use nalgebra::Point3;

/// Represents an atom of a molecular structure, as read from a structure file.
///
/// Beyond its element and position, an atom carries the bookkeeping fields that
/// structure formats provide (residue, chain, force field type). Typers use the
/// element, the aromatic flag and the bonded neighborhood to choose a grid channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "O1").
    pub name: String,
    /// The chemical element.
    pub element: Element,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Name of the parent residue, empty for small molecules.
    pub residue_name: String,
    /// Number of the parent residue.
    pub residue_number: isize,
    /// Chain identifier, `' '` when absent.
    pub chain_id: char,
    /// The force field atom type when the format provides one (e.g., "C_R", "N.ar").
    pub force_field_type: String,
    /// The partial atomic charge in elementary charge units.
    pub partial_charge: f64,
    /// Whether the atom is part of an aromatic ring.
    pub aromatic: bool,
    /// Whether the atom came from a HETATM record.
    pub hetero: bool,
}

impl Atom {
    /// Creates a new `Atom` with the given name, element and position.
    ///
    /// Residue and chain fields start empty, the charge at zero and both flags unset.
    pub fn new(name: &str, element: Element, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element,
            position,
            residue_name: String::new(),
            residue_number: 0,
            chain_id: ' ',
            force_field_type: String::new(),
            partial_charge: 0.0,
            aromatic: false,
            hetero: false,
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}
