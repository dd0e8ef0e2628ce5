//! Binary pre-typed atom records in the `gninatypes` layout.
//!
//! Each record is sixteen little-endian bytes: three `f32` coordinates followed by an
//! `i32` type index. Files carry no header, so the atom count is the file length
//! divided by the record size.

use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Size in bytes of one serialized atom record.
pub const RECORD_SIZE: usize = 16;

/// An atom that already carries a type index, as stored in `gninatypes` files and
/// molecular caches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedAtom {
    pub position: Point3<f32>,
    pub type_index: i32,
}

impl TypedAtom {
    pub fn new(position: Point3<f32>, type_index: i32) -> Self {
        Self {
            position,
            type_index,
        }
    }

    pub(crate) fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        Self {
            position: Point3::new(
                f32::from_le_bytes(word(0)),
                f32::from_le_bytes(word(4)),
                f32::from_le_bytes(word(8)),
            ),
            type_index: i32::from_le_bytes(word(12)),
        }
    }

    pub(crate) fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..4].copy_from_slice(&self.position.x.to_le_bytes());
        out[4..8].copy_from_slice(&self.position.y.to_le_bytes());
        out[8..12].copy_from_slice(&self.position.z.to_le_bytes());
        out[12..16].copy_from_slice(&self.type_index.to_le_bytes());
        out
    }
}

/// Reads `count` consecutive records from a reader.
pub(crate) fn read_records(reader: &mut impl Read, count: usize) -> io::Result<Vec<TypedAtom>> {
    let mut atoms = Vec::with_capacity(count);
    let mut buf = [0u8; RECORD_SIZE];
    for _ in 0..count {
        reader.read_exact(&mut buf)?;
        atoms.push(TypedAtom::from_bytes(&buf));
    }
    Ok(atoms)
}

pub(crate) fn write_records(writer: &mut impl Write, atoms: &[TypedAtom]) -> io::Result<()> {
    for atom in atoms {
        writer.write_all(&atom.to_bytes())?;
    }
    Ok(())
}

/// Parses an in-memory `gninatypes` buffer.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidData`] if the length is not a multiple of the record
/// size.
pub fn parse_gninatypes(bytes: &[u8]) -> io::Result<Vec<TypedAtom>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "gninatypes data length {} is not a multiple of {}",
                bytes.len(),
                RECORD_SIZE
            ),
        ));
    }
    let mut cursor = bytes;
    read_records(&mut cursor, bytes.len() / RECORD_SIZE)
}

/// Reads a whole `gninatypes` file.
pub fn read_gninatypes<P: AsRef<Path>>(path: P) -> io::Result<Vec<TypedAtom>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    parse_gninatypes(&bytes)
}

/// Writes atoms as a `gninatypes` file, replacing any existing file.
pub fn write_gninatypes<P: AsRef<Path>>(path: P, atoms: &[TypedAtom]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_records(&mut writer, atoms)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_layout_is_little_endian_xyz_then_type() {
        let atom = TypedAtom::new(Point3::new(1.0, -2.5, 3.25), 7);
        let bytes = atom.to_bytes();
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-2.5f32).to_le_bytes());
        assert_eq!(&bytes[12..16], &7i32.to_le_bytes());
    }

    #[test]
    fn file_round_trip_preserves_atoms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lig.gninatypes");
        let atoms = vec![
            TypedAtom::new(Point3::new(0.0, 1.0, 2.0), 2),
            TypedAtom::new(Point3::new(-4.0, 5.5, 6.0), -1),
        ];
        write_gninatypes(&path, &atoms).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 32);
        assert_eq!(read_gninatypes(&path).unwrap(), atoms);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let err = parse_gninatypes(&[0u8; 20]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
