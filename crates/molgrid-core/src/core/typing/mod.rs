//! Atom typers: the mapping from atoms to grid channels.
//!
//! An [`IndexTyper`] assigns each atom a single type index (negative to ignore the
//! atom) and a radius. A [`VectorTyper`] assigns each atom a weight for every channel.
//! Both report their channel names and per-type radii through [`AtomTyper`].
//! [`Typer`] is the shared, type-erased handle passed around the pipeline.

pub mod callback;
pub mod element;
pub mod gnina;
pub mod mapping;

use crate::core::models::structure::MolecularStructure;
use callback::NullIndexTyper;
use element::ElementIndexTyper;
use gnina::{GninaIndexTyper, GninaVectorTyper};
use mapping::{FileAtomMapper, FileMappedGninaTyper, MappedAtomIndexTyper, SubsettedElementTyper};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TyperError {
    #[error("Unknown typer '{0}' (expected one of: gnina, gnina-receptor, gnina-ligand, element, element-subset, gnina-vector, null, or a mapping file)")]
    UnknownTyper(String),
    #[error("Unknown atom type name '{name}' on line {line} of type mapping")]
    UnknownTypeName { name: String, line: usize },
    #[error("Invalid type mapping: {0}")]
    InvalidMapping(String),
    #[error("I/O error reading type mapping '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Typer '{0}' cannot type pre-typed atoms")]
    UnsupportedPretyped(String),
}

/// Common interface of all typers.
pub trait AtomTyper: Send + Sync {
    /// The number of types (channels) this typer produces.
    fn num_types(&self) -> usize;

    fn type_names(&self) -> Vec<String>;

    /// One radius per type, used when grids are made with type-indexed radii.
    fn type_radii(&self) -> Vec<f32>;
}

/// A typer that assigns each atom one type index.
pub trait IndexTyper: AtomTyper {
    /// Returns the type of `atom` (negative when the atom is ignored) and its radius.
    fn atom_type_index(&self, structure: &MolecularStructure, atom: usize) -> (i32, f32);

    /// Converts a pre-assigned gnina type into this typer's type, if supported.
    fn int_type_index(&self, _t: i32) -> Option<(i32, f32)> {
        None
    }
}

/// A typer that assigns each atom a vector of per-type weights.
pub trait VectorTyper: AtomTyper {
    /// Fills `out` (length `num_types()`) with the type vector of `atom` and returns its
    /// radius.
    fn atom_type_vector(&self, structure: &MolecularStructure, atom: usize, out: &mut [f32]) -> f32;

    /// Converts a pre-assigned gnina type into a type vector, if supported.
    fn int_type_vector(&self, _t: i32, _out: &mut [f32]) -> Option<f32> {
        None
    }
}

/// A shared handle to either kind of typer.
#[derive(Clone)]
pub enum Typer {
    Index(Arc<dyn IndexTyper>),
    Vector(Arc<dyn VectorTyper>),
}

impl Typer {
    pub fn index(typer: impl IndexTyper + 'static) -> Self {
        Self::Index(Arc::new(typer))
    }

    pub fn vector(typer: impl VectorTyper + 'static) -> Self {
        Self::Vector(Arc::new(typer))
    }

    /// Builds a typer from a mapping file over the gnina types.
    pub fn from_map_file<P: AsRef<Path>>(path: P) -> Result<Self, TyperError> {
        Ok(Self::index(FileMappedGninaTyper::from_file(path)?))
    }

    /// Resolves a typer from a [`TyperName`] or, failing that, a path to a gnina
    /// type mapping file.
    pub fn resolve(name: &str) -> Result<Self, TyperError> {
        match name.parse::<TyperName>() {
            Ok(typer_name) => typer_name.build(),
            Err(_) if Path::new(name).is_file() => Self::from_map_file(name),
            Err(err) => Err(err),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    pub fn num_types(&self) -> usize {
        match self {
            Self::Index(t) => t.num_types(),
            Self::Vector(t) => t.num_types(),
        }
    }

    pub fn type_names(&self) -> Vec<String> {
        match self {
            Self::Index(t) => t.type_names(),
            Self::Vector(t) => t.type_names(),
        }
    }

    pub fn type_radii(&self) -> Vec<f32> {
        match self {
            Self::Index(t) => t.type_radii(),
            Self::Vector(t) => t.type_radii(),
        }
    }
}

impl fmt::Debug for Typer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_index() { "Index" } else { "Vector" };
        f.debug_struct("Typer")
            .field("kind", &kind)
            .field("num_types", &self.num_types())
            .finish()
    }
}

/// Built-in typers selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TyperName {
    Gnina,
    GninaReceptor,
    GninaLigand,
    Element,
    ElementSubset,
    GninaVector,
    Null,
}

impl TyperName {
    pub const ALL: [TyperName; 7] = [
        TyperName::Gnina,
        TyperName::GninaReceptor,
        TyperName::GninaLigand,
        TyperName::Element,
        TyperName::ElementSubset,
        TyperName::GninaVector,
        TyperName::Null,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gnina => "gnina",
            Self::GninaReceptor => "gnina-receptor",
            Self::GninaLigand => "gnina-ligand",
            Self::Element => "element",
            Self::ElementSubset => "element-subset",
            Self::GninaVector => "gnina-vector",
            Self::Null => "null",
        }
    }

    pub fn build(self) -> Result<Typer, TyperError> {
        Ok(match self {
            Self::Gnina => Typer::index(GninaIndexTyper::default()),
            Self::GninaReceptor => Typer::index(default_gnina_receptor_typer()?),
            Self::GninaLigand => Typer::index(default_gnina_ligand_typer()?),
            Self::Element => Typer::index(ElementIndexTyper::default()),
            Self::ElementSubset => Typer::index(default_element_typer()?),
            Self::GninaVector => Typer::vector(GninaVectorTyper::default()),
            Self::Null => Typer::index(NullIndexTyper),
        })
    }
}

impl FromStr for TyperName {
    type Err = TyperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == normalized)
            .ok_or_else(|| TyperError::UnknownTyper(s.to_string()))
    }
}

impl fmt::Display for TyperName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DEFAULT_RECEPTOR_MAP: &str = "\
AliphaticCarbonXSHydrophobe
AliphaticCarbonXSNonHydrophobe
AromaticCarbonXSHydrophobe
AromaticCarbonXSNonHydrophobe
Bromine Iodine Chlorine Fluorine
Nitrogen NitrogenXSAcceptor
NitrogenXSDonor NitrogenXSDonorAcceptor
Oxygen OxygenXSAcceptor
OxygenXSDonorAcceptor OxygenXSDonor
Sulfur SulfurAcceptor
Phosphorus
Calcium
Zinc
GenericMetal Boron Manganese Magnesium Iron
";

const DEFAULT_LIGAND_MAP: &str = "\
AliphaticCarbonXSHydrophobe
AliphaticCarbonXSNonHydrophobe
AromaticCarbonXSHydrophobe
AromaticCarbonXSNonHydrophobe
Bromine Iodine
Chlorine
Fluorine
Nitrogen NitrogenXSAcceptor
NitrogenXSDonor NitrogenXSDonorAcceptor
Oxygen OxygenXSAcceptor
OxygenXSDonorAcceptor OxygenXSDonor
Sulfur SulfurAcceptor
Phosphorus
GenericMetal Boron Manganese Magnesium Zinc Calcium Iron
";

/// Atomic numbers kept by [`default_element_typer`]: H C N O F P S Cl Br I.
const DEFAULT_ELEMENTS: [i32; 10] = [1, 6, 7, 8, 9, 15, 16, 17, 35, 53];

fn gnina_mapped(map: &str) -> Result<FileMappedGninaTyper, TyperError> {
    let typer = GninaIndexTyper::default();
    let mapper = FileAtomMapper::from_text(map, &typer.type_names())?;
    Ok(MappedAtomIndexTyper::new(mapper, typer))
}

/// The standard 14-channel receptor typing of gnina models. Hydrogens are ignored.
pub fn default_gnina_receptor_typer() -> Result<FileMappedGninaTyper, TyperError> {
    gnina_mapped(DEFAULT_RECEPTOR_MAP)
}

/// The standard 14-channel ligand typing of gnina models. Hydrogens are ignored.
pub fn default_gnina_ligand_typer() -> Result<FileMappedGninaTyper, TyperError> {
    gnina_mapped(DEFAULT_LIGAND_MAP)
}

/// Element typing over H C N O F P S Cl Br I with a final catch-all channel.
pub fn default_element_typer() -> Result<SubsettedElementTyper, TyperError> {
    SubsettedElementTyper::with_elements(&DEFAULT_ELEMENTS, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gnina_maps_have_fourteen_channels() {
        let rec = default_gnina_receptor_typer().unwrap();
        let lig = default_gnina_ligand_typer().unwrap();
        assert_eq!(rec.num_types(), 14);
        assert_eq!(lig.num_types(), 14);
        assert_eq!(rec.type_names()[4], "Bromine_Iodine_Chlorine_Fluorine");
        assert_eq!(lig.type_names()[5], "Chlorine");
        assert_eq!(rec.int_type_index(gnina::GninaType::Hydrogen.index()), Some((-1, 0.37)));
    }

    #[test]
    fn default_element_typer_has_catch_all() {
        let typer = default_element_typer().unwrap();
        assert_eq!(typer.num_types(), 11);
        assert_eq!(typer.type_names()[10], "Other");
    }

    #[test]
    fn typer_names_parse_and_build() {
        for name in TyperName::ALL {
            assert_eq!(name.as_str().parse::<TyperName>().unwrap(), name);
            let typer = name.build().unwrap();
            assert_eq!(typer.type_names().len(), typer.num_types());
        }
        assert_eq!("GNINA_LIGAND".parse::<TyperName>().unwrap(), TyperName::GninaLigand);
        assert!(matches!(Typer::resolve("nonsense"), Err(TyperError::UnknownTyper(_))));
        assert!(!TyperName::GninaVector.build().unwrap().is_index());
    }

    #[test]
    fn resolve_reads_mapping_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.txt");
        std::fs::write(&path, "Zinc Iron\nOxygen\n").unwrap();
        let typer = Typer::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(typer.type_names(), vec!["Zinc_Iron", "Oxygen"]);
    }
}
