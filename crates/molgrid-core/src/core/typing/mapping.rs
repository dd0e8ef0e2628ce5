//! Type mappers that collapse or subset the types of an underlying index typer.

use super::element::ElementIndexTyper;
use super::gnina::GninaIndexTyper;
use super::{AtomTyper, IndexTyper, TyperError};
use crate::core::models::structure::MolecularStructure;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Maps the type indices of one typer onto a new, usually smaller, set of types.
pub trait AtomIndexTypeMapper: Send + Sync {
    fn num_types(&self) -> usize;

    fn type_names(&self) -> Vec<String>;

    /// Returns the new type for `old`, or -1 when the old type is dropped.
    fn map_type(&self, old: i32) -> i32;

    /// The old type whose radius represents new type `new`.
    fn representative(&self, new: usize) -> Option<i32>;
}

/// A mapper defined by groups of old types, with an optional catch-all type for every
/// old type not listed.
#[derive(Debug, Clone)]
struct GroupMapper {
    groups: Vec<Vec<i32>>,
    names: Vec<String>,
    lookup: HashMap<i32, i32>,
    catch_all: Option<usize>,
    old_num_types: usize,
}

impl GroupMapper {
    fn new(
        groups: Vec<Vec<i32>>,
        old_names: &[String],
        catch_all: bool,
    ) -> Result<Self, TyperError> {
        let mut lookup = HashMap::new();
        let mut names = Vec::with_capacity(groups.len() + 1);
        for (new, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(TyperError::InvalidMapping(format!("group {} is empty", new)));
            }
            let mut parts = Vec::with_capacity(group.len());
            for &old in group {
                let name = usize::try_from(old)
                    .ok()
                    .and_then(|i| old_names.get(i))
                    .ok_or_else(|| {
                        TyperError::InvalidMapping(format!(
                            "type index {} is out of range for {} types",
                            old,
                            old_names.len()
                        ))
                    })?;
                if lookup.insert(old, new as i32).is_some() {
                    return Err(TyperError::InvalidMapping(format!(
                        "type '{}' appears in more than one group",
                        name
                    )));
                }
                parts.push(name.as_str());
            }
            names.push(parts.join("_"));
        }
        let catch_all = catch_all.then(|| {
            names.push("Other".to_string());
            names.len() - 1
        });
        Ok(Self {
            groups,
            names,
            lookup,
            catch_all,
            old_num_types: old_names.len(),
        })
    }

    fn map_type(&self, old: i32) -> i32 {
        if old < 0 {
            return -1;
        }
        match (self.lookup.get(&old), self.catch_all) {
            (Some(&new), _) => new,
            (None, Some(other)) => other as i32,
            (None, None) => -1,
        }
    }

    fn representative(&self, new: usize) -> Option<i32> {
        if Some(new) == self.catch_all {
            return (0..self.old_num_types as i32).find(|t| !self.lookup.contains_key(t));
        }
        self.groups.get(new).and_then(|g| g.first().copied())
    }
}

/// A mapper read from a text file.
///
/// Each non-empty line lists the names of old types that collapse into one new type,
/// separated by whitespace. The new type is named by joining the old names with `_`.
/// Old types that appear on no line are dropped.
#[derive(Debug, Clone)]
pub struct FileAtomMapper {
    inner: GroupMapper,
}

impl FileAtomMapper {
    pub fn from_reader(reader: impl BufRead, old_names: &[String]) -> Result<Self, TyperError> {
        let index: HashMap<&str, i32> = old_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i as i32))
            .collect();
        let mut groups = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| TyperError::Io {
                path: "<mapping>".into(),
                source: e,
            })?;
            let group = line
                .split_whitespace()
                .map(|name| {
                    index.get(name).copied().ok_or_else(|| TyperError::UnknownTypeName {
                        name: name.to_string(),
                        line: line_num + 1,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if !group.is_empty() {
                groups.push(group);
            }
        }
        Ok(Self {
            inner: GroupMapper::new(groups, old_names, false)?,
        })
    }

    pub fn from_text(content: &str, old_names: &[String]) -> Result<Self, TyperError> {
        Self::from_reader(content.as_bytes(), old_names)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, old_names: &[String]) -> Result<Self, TyperError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TyperError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mapper = Self::from_reader(BufReader::new(file), old_names)?;
        debug!(
            "Read type mapping with {} types from '{}'.",
            mapper.num_types(),
            path.display()
        );
        Ok(mapper)
    }
}

impl AtomIndexTypeMapper for FileAtomMapper {
    fn num_types(&self) -> usize {
        self.inner.names.len()
    }

    fn type_names(&self) -> Vec<String> {
        self.inner.names.clone()
    }

    fn map_type(&self, old: i32) -> i32 {
        self.inner.map_type(old)
    }

    fn representative(&self, new: usize) -> Option<i32> {
        self.inner.representative(new)
    }
}

/// A mapper that keeps a subset of old types, each alone or in groups.
#[derive(Debug, Clone)]
pub struct SubsetAtomMapper {
    inner: GroupMapper,
}

impl SubsetAtomMapper {
    /// Keeps each listed old type as its own new type, in the order given.
    pub fn new(subset: &[i32], catch_all: bool, old_names: &[String]) -> Result<Self, TyperError> {
        let groups = subset.iter().map(|&t| vec![t]).collect();
        Self::from_groups(groups, catch_all, old_names)
    }

    /// Collapses each group of old types into one new type. With `catch_all`, every
    /// old type outside the groups maps to a final extra type.
    pub fn from_groups(
        groups: Vec<Vec<i32>>,
        catch_all: bool,
        old_names: &[String],
    ) -> Result<Self, TyperError> {
        Ok(Self {
            inner: GroupMapper::new(groups, old_names, catch_all)?,
        })
    }
}

impl AtomIndexTypeMapper for SubsetAtomMapper {
    fn num_types(&self) -> usize {
        self.inner.names.len()
    }

    fn type_names(&self) -> Vec<String> {
        self.inner.names.clone()
    }

    fn map_type(&self, old: i32) -> i32 {
        self.inner.map_type(old)
    }

    fn representative(&self, new: usize) -> Option<i32> {
        self.inner.representative(new)
    }
}

/// An index typer whose types are those of `typer` passed through `mapper`.
///
/// Atom radii come from the underlying typer. The radius of a mapped type is the
/// radius of its first old type.
#[derive(Debug, Clone)]
pub struct MappedAtomIndexTyper<M, T> {
    mapper: M,
    typer: T,
}

impl<M: AtomIndexTypeMapper, T: IndexTyper> MappedAtomIndexTyper<M, T> {
    pub fn new(mapper: M, typer: T) -> Self {
        Self { mapper, typer }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn typer(&self) -> &T {
        &self.typer
    }
}

impl<M: AtomIndexTypeMapper, T: IndexTyper> AtomTyper for MappedAtomIndexTyper<M, T> {
    fn num_types(&self) -> usize {
        self.mapper.num_types()
    }

    fn type_names(&self) -> Vec<String> {
        self.mapper.type_names()
    }

    fn type_radii(&self) -> Vec<f32> {
        let old_radii = self.typer.type_radii();
        (0..self.mapper.num_types())
            .map(|new| {
                self.mapper
                    .representative(new)
                    .and_then(|old| usize::try_from(old).ok())
                    .and_then(|old| old_radii.get(old).copied())
                    .unwrap_or(0.0)
            })
            .collect()
    }
}

impl<M: AtomIndexTypeMapper, T: IndexTyper> IndexTyper for MappedAtomIndexTyper<M, T> {
    fn atom_type_index(&self, structure: &MolecularStructure, atom: usize) -> (i32, f32) {
        let (old, radius) = self.typer.atom_type_index(structure, atom);
        (self.mapper.map_type(old), radius)
    }

    fn int_type_index(&self, t: i32) -> Option<(i32, f32)> {
        self.typer
            .int_type_index(t)
            .map(|(old, radius)| (self.mapper.map_type(old), radius))
    }
}

pub type FileMappedGninaTyper = MappedAtomIndexTyper<FileAtomMapper, GninaIndexTyper>;
pub type FileMappedElementTyper = MappedAtomIndexTyper<FileAtomMapper, ElementIndexTyper>;
pub type SubsettedGninaTyper = MappedAtomIndexTyper<SubsetAtomMapper, GninaIndexTyper>;
pub type SubsettedElementTyper = MappedAtomIndexTyper<SubsetAtomMapper, ElementIndexTyper>;

impl FileMappedGninaTyper {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TyperError> {
        let typer = GninaIndexTyper::default();
        Ok(Self::new(FileAtomMapper::from_path(path, &typer.type_names())?, typer))
    }
}

impl FileMappedElementTyper {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TyperError> {
        let typer = ElementIndexTyper::default();
        Ok(Self::new(FileAtomMapper::from_path(path, &typer.type_names())?, typer))
    }
}

impl SubsettedElementTyper {
    /// Keeps the listed atomic numbers as separate types.
    pub fn with_elements(elements: &[i32], catch_all: bool) -> Result<Self, TyperError> {
        let typer = ElementIndexTyper::default();
        let mapper = SubsetAtomMapper::new(elements, catch_all, &typer.type_names())?;
        Ok(Self::new(mapper, typer))
    }
}

impl SubsettedGninaTyper {
    pub fn with_types(types: &[i32], catch_all: bool) -> Result<Self, TyperError> {
        let typer = GninaIndexTyper::default();
        let mapper = SubsetAtomMapper::new(types, catch_all, &typer.type_names())?;
        Ok(Self::new(mapper, typer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::typing::gnina::GninaType;

    fn gnina_names() -> Vec<String> {
        GninaIndexTyper::default().type_names()
    }

    #[test]
    fn file_mapper_collapses_names_and_drops_unlisted() {
        let mapping = "Nitrogen NitrogenXSAcceptor\n\n  Zinc  \nOxygen\n";
        let mapper = FileAtomMapper::from_text(mapping, &gnina_names()).unwrap();
        assert_eq!(
            mapper.type_names(),
            vec!["Nitrogen_NitrogenXSAcceptor", "Zinc", "Oxygen"]
        );
        assert_eq!(mapper.map_type(GninaType::NitrogenXSAcceptor.index()), 0);
        assert_eq!(mapper.map_type(GninaType::Zinc.index()), 1);
        assert_eq!(mapper.map_type(GninaType::Hydrogen.index()), -1);
        assert_eq!(mapper.map_type(-1), -1);
    }

    #[test]
    fn file_mapper_rejects_unknown_names() {
        let err = FileAtomMapper::from_text("Oxygen\nUnobtainium\n", &gnina_names()).unwrap_err();
        assert!(matches!(err, TyperError::UnknownTypeName { line: 2, .. }));
    }

    #[test]
    fn subset_mapper_with_catch_all() {
        let names: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let mapper = SubsetAtomMapper::from_groups(vec![vec![2], vec![0, 3]], true, &names).unwrap();
        assert_eq!(mapper.type_names(), vec!["C", "A_D", "Other"]);
        assert_eq!(mapper.map_type(3), 1);
        assert_eq!(mapper.map_type(1), 2);
        assert_eq!(mapper.representative(1), Some(0));
        assert_eq!(mapper.representative(2), Some(1));

        let strict = SubsetAtomMapper::new(&[1], false, &names).unwrap();
        assert_eq!(strict.map_type(0), -1);
        assert!(SubsetAtomMapper::new(&[7], false, &names).is_err());
        assert!(SubsetAtomMapper::from_groups(vec![vec![0], vec![0]], false, &names).is_err());
    }

    #[test]
    fn mapped_radius_is_first_old_type_radius() {
        let mapper = FileAtomMapper::from_text("Bromine Iodine\n", &gnina_names()).unwrap();
        let typer = MappedAtomIndexTyper::new(mapper, GninaIndexTyper::default());
        assert_eq!(typer.type_radii(), vec![2.0]);
        assert_eq!(typer.int_type_index(GninaType::Iodine.index()), Some((0, 2.2)));
    }

    #[test]
    fn subsetted_element_typer() {
        let typer = SubsettedElementTyper::with_elements(&[6, 8], true).unwrap();
        assert_eq!(typer.type_names(), vec!["C", "O", "Other"]);
        assert_eq!(typer.int_type_index(GninaType::Nitrogen.index()).map(|t| t.0), Some(2));
    }
}
