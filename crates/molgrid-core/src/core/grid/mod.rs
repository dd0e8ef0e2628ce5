//! Rasterization of typed coordinates onto regular grids.

pub mod cartesian;
pub mod density;
pub mod maker;

pub use cartesian::CartesianGrid;
pub use density::DensityKernel;
pub use maker::{AtomGradients, GridError, GridMaker, GridMakerBuilder};
