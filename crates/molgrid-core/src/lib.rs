//! # molgrid Core Library
//!
//! A library for turning molecular structures into dense voxel grids suitable for
//! convolutional machine learning models, with differentiable forward and backward passes.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture with a clear separation of concerns.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularStructure`,
//!   `CoordinateSet`), atom typing schemes, rigid-body transforms, structure I/O and the
//!   `GridMaker` rasterizer with its analytic backward pass.
//!
//! - **[`engine`]: The Data Pipeline.** The stateful layer that reads "types" files of
//!   labeled examples, loads and caches structures, and samples examples with shuffling,
//!   class balancing, stratification and grouping (`ExampleProvider`).
//!
//! - **[`workflows`]: The Public API.** High-level entry points that tie the `engine` and
//!   `core` together, such as gridding a single structure or streaming gridded batches.

pub mod core;
pub mod engine;
pub mod workflows;
