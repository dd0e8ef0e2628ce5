//! Structure file readers and grid writers.
//!
//! Text formats implement [`traits::StructureFile`] and yield a
//! [`MolecularStructure`]. Pre-typed binary inputs (`gninatypes` files and molcache
//! containers) yield [`gninatypes::TypedAtom`] records that bypass typing.

pub mod bgf;
pub mod dx;
pub mod error;
pub mod gninatypes;
pub mod molcache;
pub mod pdb;
pub mod sdf;
pub mod traits;
pub mod xyz;

use crate::core::models::structure::MolecularStructure;
use error::StructureReadError;
use gninatypes::TypedAtom;
use std::path::Path;
use traits::StructureFile;

/// File formats recognized from file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Bgf,
    Pdb,
    Sdf,
    Xyz,
    GninaTypes,
}

impl StructureFormat {
    /// Picks a format from the extension of `path`, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bgf" => Some(Self::Bgf),
            "pdb" | "ent" => Some(Self::Pdb),
            "sdf" | "mol" | "sd" => Some(Self::Sdf),
            "xyz" => Some(Self::Xyz),
            "gninatypes" => Some(Self::GninaTypes),
            _ => None,
        }
    }
}

/// A loaded structure: either atoms that still need typing or atoms typed on disk.
#[derive(Debug, Clone)]
pub enum StructureSource {
    Atoms(MolecularStructure),
    Typed(Vec<TypedAtom>),
}

impl StructureSource {
    pub fn len(&self) -> usize {
        match self {
            Self::Atoms(structure) => structure.len(),
            Self::Typed(atoms) => atoms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads a structure, choosing the reader from the file extension.
///
/// # Errors
///
/// Returns [`StructureReadError::UnsupportedFormat`] for unknown extensions and the
/// reader's error otherwise.
pub fn load_structure<P: AsRef<Path>>(path: P) -> Result<StructureSource, StructureReadError> {
    let path = path.as_ref();
    let format = StructureFormat::from_path(path)
        .ok_or_else(|| StructureReadError::UnsupportedFormat(path.display().to_string()))?;
    let source = match format {
        StructureFormat::Bgf => StructureSource::Atoms(bgf::BgfFile::read_from_path(path)?),
        StructureFormat::Pdb => StructureSource::Atoms(pdb::PdbFile::read_from_path(path)?),
        StructureFormat::Sdf => StructureSource::Atoms(sdf::SdfFile::read_from_path(path)?),
        StructureFormat::Xyz => StructureSource::Atoms(xyz::XyzFile::read_from_path(path)?),
        StructureFormat::GninaTypes => {
            StructureSource::Typed(gninatypes::read_gninatypes(path)?)
        }
    };
    Ok(source)
}
