//! # Core Module
//!
//! This module provides the fundamental building blocks for gridding molecular
//! structures: the molecular data model, atom typing, coordinate sets, transforms and the
//! grid rasterizer itself.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Elements, atoms, bonds and structures
//! - **File I/O** ([`io`]) - Structure readers, pre-typed atom files and grid writers
//! - **Atom Typing** ([`typing`]) - Schemes assigning grid channels to atoms
//! - **Typed Coordinates** ([`coords`]) - Coordinates, types and radii ready for gridding
//! - **Rigid Motion** ([`transform`]) - Quaternions and rotation/translation transforms
//! - **Rasterization** ([`grid`]) - Density kernels, `GridMaker` and Cartesian grids
//!
//! ## Usage
//!
//! ```ignore
//! use molgrid::core::coords::CoordinateSet;
//! use molgrid::core::grid::maker::GridMaker;
//! use molgrid::core::io::load_structure;
//! use molgrid::core::typing::TyperName;
//!
//! let typer = TyperName::GninaLigand.build()?;
//! let source = load_structure("ligand.sdf")?;
//! let coords = CoordinateSet::from_source(&source, &typer, None)?;
//! let gmaker = GridMaker::default();
//! let mut grid = gmaker.make_grid(coords.num_types());
//! gmaker.forward(&coords.center(), &coords, grid.view_mut())?;
//! ```

pub mod coords;
pub mod grid;
pub mod io;
pub mod models;
pub mod transform;
pub mod typing;
pub(crate) mod utils;
