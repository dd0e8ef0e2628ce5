use super::{AtomTyper, IndexTyper, VectorTyper};
use crate::core::models::structure::MolecularStructure;
use std::fmt;

type IndexFn = dyn Fn(&MolecularStructure, usize) -> (i32, f32) + Send + Sync;
type VectorFn = dyn Fn(&MolecularStructure, usize, &mut [f32]) -> f32 + Send + Sync;

/// Types nothing: zero types, every atom ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndexTyper;

impl AtomTyper for NullIndexTyper {
    fn num_types(&self) -> usize {
        0
    }

    fn type_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn type_radii(&self) -> Vec<f32> {
        Vec::new()
    }
}

impl IndexTyper for NullIndexTyper {
    fn atom_type_index(&self, _structure: &MolecularStructure, _atom: usize) -> (i32, f32) {
        (-1, 0.0)
    }

    fn int_type_index(&self, _t: i32) -> Option<(i32, f32)> {
        Some((-1, 0.0))
    }
}

/// An index typer backed by a user closure returning `(type, radius)` for an atom.
///
/// The closure must return types below the number of declared type names, or a
/// negative type to ignore the atom.
pub struct CallbackIndexTyper {
    callback: Box<IndexFn>,
    names: Vec<String>,
    radii: Vec<f32>,
}

impl CallbackIndexTyper {
    pub fn new<F>(callback: F, names: Vec<String>) -> Self
    where
        F: Fn(&MolecularStructure, usize) -> (i32, f32) + Send + Sync + 'static,
    {
        let radii = vec![0.0; names.len()];
        Self {
            callback: Box::new(callback),
            names,
            radii,
        }
    }

    /// Declares per-type radii, used when grids are made with type-indexed radii.
    pub fn with_type_radii(mut self, radii: Vec<f32>) -> Self {
        self.radii = radii;
        self
    }
}

impl fmt::Debug for CallbackIndexTyper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackIndexTyper")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl AtomTyper for CallbackIndexTyper {
    fn num_types(&self) -> usize {
        self.names.len()
    }

    fn type_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn type_radii(&self) -> Vec<f32> {
        self.radii.clone()
    }
}

impl IndexTyper for CallbackIndexTyper {
    fn atom_type_index(&self, structure: &MolecularStructure, atom: usize) -> (i32, f32) {
        (self.callback)(structure, atom)
    }
}

/// A vector typer backed by a user closure that fills an atom's type vector and
/// returns its radius.
pub struct CallbackVectorTyper {
    callback: Box<VectorFn>,
    names: Vec<String>,
    radii: Vec<f32>,
}

impl CallbackVectorTyper {
    pub fn new<F>(callback: F, names: Vec<String>) -> Self
    where
        F: Fn(&MolecularStructure, usize, &mut [f32]) -> f32 + Send + Sync + 'static,
    {
        let radii = vec![0.0; names.len()];
        Self {
            callback: Box::new(callback),
            names,
            radii,
        }
    }

    pub fn with_type_radii(mut self, radii: Vec<f32>) -> Self {
        self.radii = radii;
        self
    }
}

impl fmt::Debug for CallbackVectorTyper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackVectorTyper")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl AtomTyper for CallbackVectorTyper {
    fn num_types(&self) -> usize {
        self.names.len()
    }

    fn type_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn type_radii(&self) -> Vec<f32> {
        self.radii.clone()
    }
}

impl VectorTyper for CallbackVectorTyper {
    fn atom_type_vector(&self, structure: &MolecularStructure, atom: usize, out: &mut [f32]) -> f32 {
        out.iter_mut().for_each(|v| *v = 0.0);
        (self.callback)(structure, atom, out)
    }
}
