//! Typed atomic coordinates, the input of grid generation.

use crate::core::io::StructureSource;
use crate::core::io::gninatypes::TypedAtom;
use crate::core::models::structure::MolecularStructure;
use crate::core::typing::{Typer, TyperError};
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use ndarray::{Array2, ArrayView2, s};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Length mismatch for {what}: expected {expected}, found {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Atom {atom} has type {atom_type}, which is not below the number of types ({max_type})")]
    TypeOutOfRange {
        atom: usize,
        atom_type: i32,
        max_type: usize,
    },
    #[error("Cannot combine coordinate sets with index types and vector types")]
    MixedTypeKinds,
    #[error("Vector type widths differ ({0} vs {1}) and types are not unique")]
    VectorWidthMismatch(usize, usize),
    #[error("Radii of the merged sets are neither all per atom nor all per type")]
    InconsistentRadii,
    #[error("Cannot copy a set of {from} atoms into a set of {to} atoms")]
    SizeMismatch { from: usize, to: usize },
}

/// Per-atom types: an index per atom or a weight vector per atom.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomTypes {
    /// One type index per atom. Negative indices mark atoms that are not gridded.
    Index(Vec<i32>),
    /// An `N x T` matrix of per-type weights.
    Vector(Array2<f32>),
}

/// Atomic coordinates together with their types and radii.
///
/// Radii are normally per atom. They may instead hold one radius per type, which is
/// what grid makers configured with type-indexed radii expect. The mode is recorded
/// with the radii and never inferred from their count.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSet {
    coords: Vec<Point3<f32>>,
    types: AtomTypes,
    radii: Vec<f32>,
    type_radii: bool,
    max_type: usize,
    src: Option<String>,
}

impl CoordinateSet {
    /// Creates a set with index types.
    ///
    /// `radii` must have one entry per atom or one entry per type. A length that fits
    /// both is taken as per atom; use [`set_type_radii`](Self::set_type_radii) for
    /// per-type radii in that case.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] on mismatched lengths or a type index at or above
    /// `max_type`.
    pub fn new_indexed(
        coords: Vec<Point3<f32>>,
        types: Vec<i32>,
        radii: Vec<f32>,
        max_type: usize,
    ) -> Result<Self, CoordinateError> {
        check_len("types", coords.len(), types.len())?;
        if radii.len() != coords.len() && radii.len() != max_type {
            return Err(CoordinateError::LengthMismatch {
                what: "radii",
                expected: coords.len(),
                actual: radii.len(),
            });
        }
        if let Some((atom, &atom_type)) = types
            .iter()
            .enumerate()
            .find(|(_, t)| **t >= 0 && **t as usize >= max_type)
        {
            return Err(CoordinateError::TypeOutOfRange {
                atom,
                atom_type,
                max_type,
            });
        }
        Ok(Self {
            type_radii: radii.len() != coords.len(),
            coords,
            types: AtomTypes::Index(types),
            radii,
            max_type,
            src: None,
        })
    }

    /// Creates a set with vector types; the number of types is the matrix width.
    pub fn new_vector(
        coords: Vec<Point3<f32>>,
        types: Array2<f32>,
        radii: Vec<f32>,
    ) -> Result<Self, CoordinateError> {
        check_len("type vector rows", coords.len(), types.nrows())?;
        let max_type = types.ncols();
        if radii.len() != coords.len() && radii.len() != max_type {
            return Err(CoordinateError::LengthMismatch {
                what: "radii",
                expected: coords.len(),
                actual: radii.len(),
            });
        }
        Ok(Self {
            type_radii: radii.len() != coords.len(),
            coords,
            types: AtomTypes::Vector(types),
            radii,
            max_type,
            src: None,
        })
    }

    /// An empty set with index types over `max_type` types.
    pub fn empty(max_type: usize) -> Self {
        Self {
            coords: Vec::new(),
            types: AtomTypes::Index(Vec::new()),
            radii: Vec::new(),
            type_radii: false,
            max_type,
            src: None,
        }
    }

    /// Types every atom of `structure`. Atoms the typer ignores (negative index, or
    /// non-positive radius for vector typers) are left out.
    pub fn from_structure(structure: &MolecularStructure, typer: &Typer) -> Self {
        let max_type = typer.num_types();
        let mut coords = Vec::with_capacity(structure.len());
        let mut radii = Vec::with_capacity(structure.len());
        let types = match typer {
            Typer::Index(t) => {
                let mut types = Vec::with_capacity(structure.len());
                for (i, atom) in structure.atoms().iter().enumerate() {
                    let (atom_type, radius) = t.atom_type_index(structure, i);
                    if atom_type < 0 || atom_type as usize >= max_type {
                        continue;
                    }
                    coords.push(atom.position.cast::<f32>());
                    types.push(atom_type);
                    radii.push(radius);
                }
                AtomTypes::Index(types)
            }
            Typer::Vector(t) => {
                let mut rows: Vec<f32> = Vec::with_capacity(structure.len() * max_type);
                let mut row = vec![0.0; max_type];
                for (i, atom) in structure.atoms().iter().enumerate() {
                    let radius = t.atom_type_vector(structure, i, &mut row);
                    if radius <= 0.0 {
                        continue;
                    }
                    coords.push(atom.position.cast::<f32>());
                    rows.extend_from_slice(&row);
                    radii.push(radius);
                }
                AtomTypes::Vector(vector_rows(rows, coords.len(), max_type))
            }
        };
        Self {
            coords,
            types,
            radii,
            type_radii: false,
            max_type,
            src: None,
        }
    }

    /// Converts pre-typed gnina atoms through `typer`.
    ///
    /// # Errors
    ///
    /// Returns [`TyperError::UnsupportedPretyped`] if the typer cannot interpret gnina
    /// type indices.
    pub fn from_typed_atoms(atoms: &[TypedAtom], typer: &Typer) -> Result<Self, TyperError> {
        let max_type = typer.num_types();
        let unsupported = || TyperError::UnsupportedPretyped(typer.type_names().join(","));
        let mut coords = Vec::with_capacity(atoms.len());
        let mut radii = Vec::with_capacity(atoms.len());
        let types = match typer {
            Typer::Index(t) => {
                let mut types = Vec::with_capacity(atoms.len());
                for atom in atoms {
                    let (atom_type, radius) =
                        t.int_type_index(atom.type_index).ok_or_else(unsupported)?;
                    if atom_type < 0 || atom_type as usize >= max_type {
                        continue;
                    }
                    coords.push(atom.position);
                    types.push(atom_type);
                    radii.push(radius);
                }
                AtomTypes::Index(types)
            }
            Typer::Vector(t) => {
                let mut rows = Vec::with_capacity(atoms.len() * max_type);
                let mut row = vec![0.0; max_type];
                for atom in atoms {
                    let radius = t
                        .int_type_vector(atom.type_index, &mut row)
                        .ok_or_else(unsupported)?;
                    if radius <= 0.0 {
                        continue;
                    }
                    coords.push(atom.position);
                    rows.extend_from_slice(&row);
                    radii.push(radius);
                }
                AtomTypes::Vector(vector_rows(rows, coords.len(), max_type))
            }
        };
        Ok(Self {
            coords,
            types,
            radii,
            type_radii: false,
            max_type,
            src: None,
        })
    }

    /// Types a loaded structure of either kind and records `src` as its source name.
    pub fn from_source(
        source: &StructureSource,
        typer: &Typer,
        src: Option<&str>,
    ) -> Result<Self, TyperError> {
        let mut set = match source {
            StructureSource::Atoms(structure) => Self::from_structure(structure, typer),
            StructureSource::Typed(atoms) => Self::from_typed_atoms(atoms, typer)?,
        };
        set.src = src.map(str::to_string);
        Ok(set)
    }

    pub fn size(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The number of types, which is also the number of grid channels.
    pub fn num_types(&self) -> usize {
        self.max_type
    }

    pub fn max_type(&self) -> usize {
        self.max_type
    }

    pub fn has_indexed_types(&self) -> bool {
        matches!(self.types, AtomTypes::Index(_))
    }

    pub fn has_vector_types(&self) -> bool {
        matches!(self.types, AtomTypes::Vector(_))
    }

    pub fn coords(&self) -> &[Point3<f32>] {
        &self.coords
    }

    pub fn coords_mut(&mut self) -> &mut [Point3<f32>] {
        &mut self.coords
    }

    pub fn types(&self) -> &AtomTypes {
        &self.types
    }

    pub fn type_indices(&self) -> Option<&[i32]> {
        match &self.types {
            AtomTypes::Index(t) => Some(t),
            AtomTypes::Vector(_) => None,
        }
    }

    pub fn type_vectors(&self) -> Option<ArrayView2<'_, f32>> {
        match &self.types {
            AtomTypes::Index(_) => None,
            AtomTypes::Vector(t) => Some(t.view()),
        }
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    /// Replaces per-atom radii with one radius per type.
    pub fn set_type_radii(&mut self, radii: Vec<f32>) -> Result<(), CoordinateError> {
        check_len("type radii", self.max_type, radii.len())?;
        self.radii = radii;
        self.type_radii = true;
        Ok(())
    }

    /// Whether radii are stored per type rather than per atom.
    pub fn has_type_indexed_radii(&self) -> bool {
        self.type_radii
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn set_src(&mut self, src: impl Into<String>) {
        self.src = Some(src.into());
    }

    /// The centroid of the coordinates, or the origin for an empty set.
    pub fn center(&self) -> Point3<f32> {
        if self.coords.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .coords
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.coords.len() as f32)
    }

    /// Per-type totals: atom counts for index types, column sums for vector types.
    pub fn sum_types(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.max_type];
        match &self.types {
            AtomTypes::Index(types) => {
                for &t in types {
                    if let Some(slot) = usize::try_from(t).ok().and_then(|t| sums.get_mut(t)) {
                        *slot += 1.0;
                    }
                }
            }
            AtomTypes::Vector(types) => {
                for (slot, column) in sums.iter_mut().zip(types.columns()) {
                    *slot = column.sum();
                }
            }
        }
        sums
    }

    pub fn translate(&mut self, offset: &Vector3<f32>) {
        for p in &mut self.coords {
            *p += offset;
        }
    }

    /// Converts index types into one-hot type vectors.
    ///
    /// With `include_dummy_type` an extra final column receives atoms with negative
    /// types; otherwise those atoms get an all-zero row. When `type_radii` is given,
    /// radii become per type (the dummy type gets radius zero). Sets that already have
    /// vector types are left unchanged.
    pub fn make_vector_types(
        &mut self,
        include_dummy_type: bool,
        type_radii: Option<&[f32]>,
    ) -> Result<(), CoordinateError> {
        let AtomTypes::Index(types) = &self.types else {
            return Ok(());
        };
        let width = self.max_type + usize::from(include_dummy_type);
        let mut vectors = Array2::zeros((types.len(), width));
        for (row, &t) in types.iter().enumerate() {
            if t >= 0 {
                vectors[[row, t as usize]] = 1.0;
            } else if include_dummy_type {
                vectors[[row, self.max_type]] = 1.0;
            }
        }
        if let Some(radii) = type_radii {
            check_len("type radii", self.max_type, radii.len())?;
            let mut radii = radii.to_vec();
            if include_dummy_type {
                radii.push(0.0);
            }
            self.radii = radii;
            self.type_radii = true;
        } else if self.type_radii && include_dummy_type {
            self.radii.push(0.0);
        }
        self.types = AtomTypes::Vector(vectors);
        self.max_type = width;
        Ok(())
    }

    /// Concatenates coordinate sets.
    ///
    /// With `unique_index_types` the types of each set are shifted past those of the
    /// previous sets (vector types are laid out block-diagonally), so channels of
    /// different sets never overlap. Otherwise the sets share one type space.
    ///
    /// # Errors
    ///
    /// Fails when index and vector types are mixed, when shared vector widths differ,
    /// or when the sets disagree on whether radii are per atom or per type.
    pub fn merge(sets: &[&CoordinateSet], unique_index_types: bool) -> Result<Self, CoordinateError> {
        let Some(first) = sets.first() else {
            return Ok(Self::empty(0));
        };
        if !sets.iter().map(|s| s.has_indexed_types()).all_equal() {
            return Err(CoordinateError::MixedTypeKinds);
        }
        let indexed = first.has_indexed_types();

        let total_atoms: usize = sets.iter().map(|s| s.size()).sum();
        let max_type = if unique_index_types {
            sets.iter().map(|s| s.max_type).sum()
        } else {
            if !indexed {
                if let Err(Some((a, b))) = sets.iter().map(|s| s.max_type).all_equal_value() {
                    return Err(CoordinateError::VectorWidthMismatch(a, b));
                }
            }
            sets.iter().map(|s| s.max_type).max().unwrap_or(0)
        };

        let coords: Vec<Point3<f32>> = sets.iter().flat_map(|s| s.coords.iter().copied()).collect();

        let type_radii = sets
            .iter()
            .map(|s| s.type_radii)
            .all_equal_value()
            .map_err(|_| CoordinateError::InconsistentRadii)?;
        let radii = if !type_radii || unique_index_types {
            sets.iter().flat_map(|s| s.radii.iter().copied()).collect()
        } else {
            let mut radii = first.radii.clone();
            radii.resize(max_type, 0.0);
            radii
        };

        let types = if indexed {
            let mut offset = 0i32;
            let mut merged = Vec::with_capacity(total_atoms);
            for set in sets {
                if let AtomTypes::Index(types) = &set.types {
                    merged.extend(types.iter().map(|&t| if t < 0 { t } else { t + offset }));
                }
                if unique_index_types {
                    offset += set.max_type as i32;
                }
            }
            AtomTypes::Index(merged)
        } else {
            let mut merged = Array2::zeros((total_atoms, max_type));
            let (mut row, mut col) = (0, 0);
            for set in sets {
                if let AtomTypes::Vector(types) = &set.types {
                    let (n, t) = types.dim();
                    merged.slice_mut(s![row..row + n, col..col + t]).assign(types);
                    row += n;
                    if unique_index_types {
                        col += t;
                    }
                }
            }
            AtomTypes::Vector(merged)
        };

        Ok(Self {
            coords,
            types,
            radii,
            type_radii,
            max_type,
            src: None,
        })
    }

    /// Copies this set into `other`, which must have the same number of atoms.
    pub fn copy_to(&self, other: &mut CoordinateSet) -> Result<(), CoordinateError> {
        if self.size() != other.size() {
            return Err(CoordinateError::SizeMismatch {
                from: self.size(),
                to: other.size(),
            });
        }
        other.clone_from(self);
        Ok(())
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), CoordinateError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CoordinateError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

fn vector_rows(rows: Vec<f32>, n: usize, width: usize) -> Array2<f32> {
    Array2::from_shape_vec((n, width), rows).unwrap_or_else(|_| Array2::zeros((n, width)))
}
