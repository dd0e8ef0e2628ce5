//! # Core Models Module
//!
//! Data structures representing molecular structures as read from disk, before any
//! typing or gridding takes place.
//!
//! ## Key Components
//!
//! - [`element`] - Chemical elements with symbols and covalent radii
//! - [`atom`] - Individual atoms with coordinates and file-provided annotations
//! - [`topology`] - Bonds and bond orders
//! - [`structure`] - Ordered atoms plus connectivity, with bond perception
//! - [`builder`] - Serial-number based construction used by file readers
//!
//! ## Usage
//!
//! ```ignore
//! use molgrid::core::models::{atom::Atom, element::Element, structure::MolecularStructure};
//!
//! let mut structure = MolecularStructure::new();
//! structure.add_atom(Atom::new("O", Element::O, Point3::new(0.0, 0.0, 0.0)));
//! structure.add_atom(Atom::new("H1", Element::H, Point3::new(0.96, 0.0, 0.0)));
//! structure.perceive_bonds();
//! ```

pub mod atom;
pub mod builder;
pub mod element;
pub mod structure;
pub mod topology;
