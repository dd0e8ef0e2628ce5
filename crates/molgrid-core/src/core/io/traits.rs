use super::error::StructureReadError;
use crate::core::models::structure::MolecularStructure;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading molecular structure file formats.
///
/// Implementors handle format-specific parsing; the provided methods take care of
/// opening files. Readers return structures with connectivity populated, either from
/// the file itself or through distance-based perception when the format carries none.
pub trait StructureFile {
    /// Short human-readable format name used in error messages.
    const FORMAT: &'static str;

    /// Reads a molecular structure from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<MolecularStructure, StructureReadError>;

    /// Reads a molecular structure from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<MolecularStructure, StructureReadError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Reads a molecular structure from an in-memory string.
    fn read_from_str(content: &str) -> Result<MolecularStructure, StructureReadError> {
        Self::read_from(&mut content.as_bytes())
    }
}
