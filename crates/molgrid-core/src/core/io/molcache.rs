use super::gninatypes::{TypedAtom, read_records, write_records};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const MAGIC: &[u8; 8] = b"MGCACHE1";

#[derive(Debug, Error)]
pub enum MolcacheError {
    #[error("I/O error on molcache '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{0}' is not a molcache file (bad magic bytes)")]
    BadMagic(PathBuf),
    #[error("Molcache '{path}' contains a non UTF-8 entry name")]
    InvalidName { path: PathBuf },
}

/// An in-memory cache of pre-typed structures keyed by the file name they were typed
/// from.
///
/// The on-disk layout is the magic `MGCACHE1`, a little-endian `u32` entry count, and
/// per entry a `u16` name length, the UTF-8 name, a `u32` atom count and that many
/// sixteen-byte typed atom records.
#[derive(Debug, Default, Clone)]
pub struct MolCache {
    entries: HashMap<String, Vec<TypedAtom>>,
}

impl MolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, atoms: Vec<TypedAtom>) {
        self.entries.insert(name.into(), atoms);
    }

    pub fn get(&self, name: &str) -> Option<&[TypedAtom]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges all entries of `other` into this cache. Entries already present are
    /// replaced.
    pub fn extend(&mut self, other: MolCache) {
        self.entries.extend(other.entries);
    }

    /// Loads a cache file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MolcacheError> {
        let path = path.as_ref();
        let io_err = |source: io::Error| MolcacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = BufReader::new(File::open(path).map_err(io_err)?);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(io_err)?;
        if &magic != MAGIC {
            return Err(MolcacheError::BadMagic(path.to_path_buf()));
        }
        let count = read_u32(&mut reader).map_err(io_err)? as usize;

        let mut entries = HashMap::with_capacity(count);
        for _ in 0..count {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len).map_err(io_err)?;
            let mut name = vec![0u8; u16::from_le_bytes(len) as usize];
            reader.read_exact(&mut name).map_err(io_err)?;
            let name = String::from_utf8(name).map_err(|_| MolcacheError::InvalidName {
                path: path.to_path_buf(),
            })?;
            let natoms = read_u32(&mut reader).map_err(io_err)? as usize;
            let atoms = read_records(&mut reader, natoms).map_err(io_err)?;
            entries.insert(name, atoms);
        }

        info!("Loaded {} structures from molcache '{}'.", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Writes the cache to disk with entries sorted by name.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), MolcacheError> {
        let path = path.as_ref();
        let io_err = |source: io::Error| MolcacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        self.write_entries(&mut writer)
            .and_then(|()| writer.flush())
            .map_err(io_err)?;
        debug!("Wrote {} structures to molcache '{}'.", self.entries.len(), path.display());
        Ok(())
    }
}

impl MolCache {
    fn write_entries(&self, writer: &mut impl Write) -> io::Result<()> {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        writer.write_all(MAGIC)?;
        writer.write_all(&(names.len() as u32).to_le_bytes())?;
        for name in names {
            let atoms = &self.entries[name];
            let len = u16::try_from(name.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("entry name too long: {}", name))
            })?;
            writer.write_all(&len.to_le_bytes())?;
            writer.write_all(name.as_bytes())?;
            writer.write_all(&(atoms.len() as u32).to_le_bytes())?;
            write_records(writer, atoms)?;
        }
        Ok(())
    }
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use tempfile::tempdir;

    #[test]
    fn write_then_load_restores_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lig.molcache");
        let mut cache = MolCache::new();
        cache.insert("a/lig1.gninatypes", vec![TypedAtom::new(Point3::new(1.0, 2.0, 3.0), 4)]);
        cache.insert("a/lig2.gninatypes", vec![]);
        cache.write(&path).unwrap();

        let loaded = MolCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("a/lig1.gninatypes").unwrap()[0].type_index, 4);
        assert!(loaded.get("a/lig2.gninatypes").unwrap().is_empty());
        assert!(loaded.get("missing").is_none());
    }

    #[test]
    fn rejects_files_without_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.molcache");
        std::fs::write(&path, b"NOTACACHE").unwrap();
        assert!(matches!(MolCache::load(&path), Err(MolcacheError::BadMagic(_))));
    }
}
