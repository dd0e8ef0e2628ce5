use super::config::ExampleProviderSettings;
use super::error::ProviderError;
use super::example::{Example, ExampleRef};
use crate::core::coords::CoordinateSet;
use crate::core::io::load_structure;
use crate::core::io::molcache::MolCache;
use crate::core::io::StructureSource;
use crate::core::typing::Typer;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Loads and types the structure files of an [`ExampleRef`].
///
/// File `i` is typed by typer `min(i, typers - 1)`, so a single typer covers every
/// file and a second typer covers every file after the first. Files are looked up in
/// the receptor molcache (first file) or ligand molcache (other files) before the
/// filesystem.
pub struct ExampleExtractor {
    typers: Vec<Typer>,
    data_root: PathBuf,
    cache_structs: bool,
    duplicate_first: bool,
    make_vector_types: bool,
    receptor_cache: Option<MolCache>,
    ligand_cache: Option<MolCache>,
    structs: HashMap<(usize, String), CoordinateSet>,
}

impl ExampleExtractor {
    pub fn new(settings: &ExampleProviderSettings, typers: Vec<Typer>) -> Result<Self, ProviderError> {
        if typers.is_empty() {
            return Err(ProviderError::Sampler("at least one typer is required".to_string()));
        }
        let receptor_cache = settings.recmolcache.as_ref().map(MolCache::load).transpose()?;
        let ligand_cache = settings.ligmolcache.as_ref().map(MolCache::load).transpose()?;
        Ok(Self {
            typers,
            data_root: settings.data_root.clone(),
            cache_structs: settings.cache_structs,
            duplicate_first: settings.duplicate_first,
            make_vector_types: settings.make_vector_types,
            receptor_cache,
            ligand_cache,
            structs: HashMap::new(),
        })
    }

    fn typer_slot(&self, file_index: usize) -> usize {
        file_index.min(self.typers.len() - 1)
    }

    /// Typer slots of the coordinate sets produced for an example with `num_files` files.
    fn set_slots(&self, num_files: usize) -> Vec<usize> {
        let slots: Vec<usize> = (0..num_files).map(|i| self.typer_slot(i)).collect();
        if self.duplicate_first && num_files > 1 {
            slots[1..].iter().flat_map(|&s| [slots[0], s]).collect()
        } else {
            slots
        }
    }

    pub fn num_types(&self, num_files: usize) -> usize {
        self.set_slots(num_files)
            .into_iter()
            .map(|s| self.typers[s].num_types())
            .sum()
    }

    pub fn type_names(&self, num_files: usize) -> Vec<String> {
        self.set_slots(num_files)
            .into_iter()
            .flat_map(|s| self.typers[s].type_names())
            .collect()
    }

    pub fn typers(&self) -> &[Typer] {
        &self.typers
    }

    pub fn cached_structures(&self) -> usize {
        self.structs.len()
    }

    pub fn clear_cache(&mut self) {
        self.structs.clear();
    }

    fn load_set(&mut self, file_index: usize, file: &str) -> Result<CoordinateSet, ProviderError> {
        let slot = self.typer_slot(file_index);
        let key = (slot, file.to_string());
        if let Some(set) = self.structs.get(&key) {
            return Ok(set.clone());
        }

        let typer = &self.typers[slot];
        let molcache = if file_index == 0 {
            self.receptor_cache.as_ref()
        } else {
            self.ligand_cache.as_ref()
        };
        let mut set = match molcache.and_then(|c| c.get(file)) {
            Some(atoms) => {
                trace!("Found '{}' in molcache.", file);
                let mut set = CoordinateSet::from_typed_atoms(atoms, typer)?;
                set.set_src(file);
                set
            }
            None => {
                let path = self.data_root.join(file);
                if !path.exists() {
                    return Err(ProviderError::MissingFile(path));
                }
                let source: StructureSource = load_structure(&path)
                    .map_err(|source| ProviderError::Structure { path: path.clone(), source })?;
                debug!("Loaded {} atoms from {}", source.len(), path.display());
                CoordinateSet::from_source(&source, typer, Some(file))?
            }
        };

        if self.make_vector_types {
            let radii = typer.type_radii();
            set.make_vector_types(false, Some(&radii))?;
        }
        if self.cache_structs {
            self.structs.insert(key, set.clone());
        }
        Ok(set)
    }

    /// Loads every file of `example` into coordinate sets.
    pub fn extract(&mut self, example: &ExampleRef) -> Result<Example, ProviderError> {
        let mut sets = Vec::with_capacity(example.files.len());
        for (i, file) in example.files.iter().enumerate() {
            sets.push(self.load_set(i, file)?);
        }
        if self.duplicate_first && sets.len() > 1 {
            let first = sets.remove(0);
            let mut paired = Vec::with_capacity(sets.len() * 2);
            for set in sets {
                paired.push(first.clone());
                paired.push(set);
            }
            sets = paired;
        }
        Ok(Example::new(sets, example.labels.clone(), example.group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::gninatypes::TypedAtom;
    use crate::core::typing::TyperName;
    use nalgebra::Point3;
    use std::fs;
    use tempfile::tempdir;

    const WATER: &str = "3\nwater\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n";

    fn example(files: &[&str]) -> ExampleRef {
        ExampleRef {
            labels: vec![1.0],
            group: None,
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn loads_files_relative_to_data_root_and_caches() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("w.xyz"), WATER).unwrap();
        let settings = ExampleProviderSettings::builder()
            .data_root(dir.path().to_path_buf())
            .build()
            .unwrap();
        let mut extractor = ExampleExtractor::new(&settings, vec![TyperName::Element.build().unwrap()]).unwrap();

        let ex = extractor.extract(&example(&["w.xyz", "w.xyz"])).unwrap();
        assert_eq!(ex.coord_sets.len(), 2);
        assert_eq!(ex.num_coordinates(), 6);
        assert_eq!(ex.coord_sets[0].src(), Some("w.xyz"));
        assert_eq!(ex.labels, vec![1.0]);
        assert_eq!(extractor.cached_structures(), 1);
        assert_eq!(extractor.num_types(2), 168);

        assert!(matches!(
            extractor.extract(&example(&["missing.xyz"])),
            Err(ProviderError::MissingFile(_))
        ));
    }

    #[test]
    fn duplicate_first_pairs_receptor_with_each_ligand() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("r.xyz"), WATER).unwrap();
        fs::write(dir.path().join("l.xyz"), "1\n\nC 1 1 1\n").unwrap();
        let settings = ExampleProviderSettings::builder()
            .data_root(dir.path().to_path_buf())
            .duplicate_first(true)
            .make_vector_types(true)
            .build()
            .unwrap();
        let typers = vec![
            TyperName::ElementSubset.build().unwrap(),
            TyperName::Element.build().unwrap(),
        ];
        let mut extractor = ExampleExtractor::new(&settings, typers).unwrap();
        let ex = extractor.extract(&example(&["r.xyz", "l.xyz", "l.xyz"])).unwrap();
        let sizes: Vec<usize> = ex.coord_sets.iter().map(CoordinateSet::size).collect();
        assert_eq!(sizes, vec![3, 1, 3, 1]);
        assert!(ex.has_vector_types());
        assert!(ex.coord_sets[0].has_type_indexed_radii());
        assert_eq!(extractor.num_types(3), 11 + 84 + 11 + 84);
        assert_eq!(extractor.type_names(3)[0], "H");
    }

    #[test]
    fn molcache_entries_take_precedence() {
        let dir = tempdir().unwrap();
        let mut cache = MolCache::new();
        cache.insert(
            "lig.gninatypes",
            vec![TypedAtom::new(Point3::new(1.0, 2.0, 3.0), 2)],
        );
        let cache_path = dir.path().join("lig.molcache");
        cache.write(&cache_path).unwrap();

        let settings = ExampleProviderSettings::builder()
            .data_root(dir.path().to_path_buf())
            .ligmolcache(cache_path)
            .build()
            .unwrap();
        fs::write(dir.path().join("rec.xyz"), WATER).unwrap();
        let mut extractor = ExampleExtractor::new(&settings, vec![TyperName::Gnina.build().unwrap()]).unwrap();
        let ex = extractor.extract(&example(&["rec.xyz", "lig.gninatypes"])).unwrap();
        assert_eq!(ex.coord_sets[1].type_indices(), Some(&[2][..]));
        assert_eq!(ex.coord_sets[1].coords()[0], Point3::new(1.0, 2.0, 3.0));
    }
}
