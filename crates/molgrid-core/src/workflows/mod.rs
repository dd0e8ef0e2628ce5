//! # Workflows Module
//!
//! High-level entry points that tie the `engine` and `core` layers together.
//!
//! ## Architecture
//!
//! - **Gridding Workflows** ([`gridify`]) - Gridding a single structure file into a
//!   Cartesian grid, and streaming augmented, gridded batches from an `ExampleProvider`.
//!
//! ## Key Capabilities
//!
//! - **End-to-end gridding** from a structure file to per-channel densities
//! - **Random augmentation** with seeded translations and rotations
//! - **Progress monitoring** through the engine's progress reporter

pub mod gridify;
