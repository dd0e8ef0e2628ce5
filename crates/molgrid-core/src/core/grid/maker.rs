use super::density::DensityKernel;
use crate::core::coords::{AtomTypes, CoordinateError, CoordinateSet};
use crate::core::transform::Transform;
use crate::engine::example::Example;
use nalgebra::{Point3, Vector3};
use ndarray::{Array2, Array4, Array5, ArrayView4, ArrayViewMut4, ArrayViewMut5, Axis};
use rand::Rng;
use thiserror::Error;
use tracing::{instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const DEFAULT_RESOLUTION: f32 = 0.5;
pub const DEFAULT_DIMENSION: f32 = 23.5;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("Invalid grid setting {name} = {value}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
    #[error("Grid shape mismatch: expected {expected:?}, found {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Expected {expected} radii ({kind}), found {actual}")]
    RadiiLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Radii are stored {actual} but the grid maker expects them {expected}")]
    RadiusMode {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Atom {atom} has type {atom_type} but the grid has {channels} channels")]
    TypeOutOfRange {
        atom: usize,
        atom_type: i32,
        channels: usize,
    },
    #[error("Output grid memory is not contiguous")]
    NonContiguous,
    #[error("Binary density has no gradient")]
    BinaryBackward,
    #[error("Example has no coordinate sets")]
    EmptyExample,
    #[error("Batch of {capacity} grids cannot hold {requested} examples")]
    BatchTooSmall { capacity: usize, requested: usize },
    #[error(transparent)]
    Coordinates(#[from] CoordinateError),
}

/// Gradients produced by a backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomGradients {
    /// Gradient of the loss with respect to each atom position.
    pub coords: Vec<Vector3<f32>>,
    /// Gradient with respect to each atom's type weights, for vector-typed sets.
    pub types: Option<Array2<f32>>,
}

/// One atom's contribution to one channel.
#[derive(Debug, Clone, Copy)]
struct Contributor {
    position: Point3<f32>,
    radius: f32,
    weight: f32,
}

/// Rasterizes typed coordinates into dense `channel x D x D x D` grids and propagates
/// gradients back to atoms.
///
/// A grid of edge length `dimension` sampled every `resolution` Angstroms has
/// `D = round(dimension / resolution) + 1` points per axis, centered on the requested
/// center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMaker {
    resolution: f32,
    dimension: f32,
    binary: bool,
    radius_scale: f32,
    gaussian_radius_multiple: f32,
    radii_type_indexed: bool,
    dim: usize,
    kernel: DensityKernel,
}

impl Default for GridMaker {
    fn default() -> Self {
        let dim = points_per_side(DEFAULT_RESOLUTION, DEFAULT_DIMENSION);
        Self {
            resolution: DEFAULT_RESOLUTION,
            dimension: DEFAULT_DIMENSION,
            binary: false,
            radius_scale: 1.0,
            gaussian_radius_multiple: 1.0,
            radii_type_indexed: false,
            dim,
            kernel: DensityKernel::new(false, 1.0, 1.0),
        }
    }
}

fn points_per_side(resolution: f32, dimension: f32) -> usize {
    (dimension / resolution).round() as usize + 1
}

fn check_shape(expected: &[usize], actual: &[usize]) -> Result<(), GridError> {
    if expected == actual {
        Ok(())
    } else {
        Err(GridError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}

impl GridMaker {
    /// Creates a grid maker, validating every setting.
    pub fn new(
        resolution: f32,
        dimension: f32,
        binary: bool,
        radius_scale: f32,
        gaussian_radius_multiple: f32,
    ) -> Result<Self, GridError> {
        GridMakerBuilder::new()
            .resolution(resolution)
            .dimension(dimension)
            .binary(binary)
            .radius_scale(radius_scale)
            .gaussian_radius_multiple(gaussian_radius_multiple)
            .build()
    }

    pub fn builder() -> GridMakerBuilder {
        GridMakerBuilder::new()
    }

    fn rebuild(self) -> Result<Self, GridError> {
        GridMakerBuilder::from(self).build()
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: f32) -> Result<(), GridError> {
        *self = Self { resolution, ..*self }.rebuild()?;
        Ok(())
    }

    pub fn dimension(&self) -> f32 {
        self.dimension
    }

    pub fn set_dimension(&mut self, dimension: f32) -> Result<(), GridError> {
        *self = Self { dimension, ..*self }.rebuild()?;
        Ok(())
    }

    pub fn binary(&self) -> bool {
        self.binary
    }

    pub fn set_binary(&mut self, binary: bool) {
        self.binary = binary;
        self.kernel = DensityKernel::new(binary, self.radius_scale, self.gaussian_radius_multiple);
    }

    pub fn radius_scale(&self) -> f32 {
        self.radius_scale
    }

    pub fn set_radius_scale(&mut self, radius_scale: f32) -> Result<(), GridError> {
        *self = Self { radius_scale, ..*self }.rebuild()?;
        Ok(())
    }

    pub fn gaussian_radius_multiple(&self) -> f32 {
        self.gaussian_radius_multiple
    }

    pub fn set_gaussian_radius_multiple(&mut self, grm: f32) -> Result<(), GridError> {
        *self = Self {
            gaussian_radius_multiple: grm,
            ..*self
        }
        .rebuild()?;
        Ok(())
    }

    pub fn radii_type_indexed(&self) -> bool {
        self.radii_type_indexed
    }

    pub fn set_radii_type_indexed(&mut self, radii_type_indexed: bool) {
        self.radii_type_indexed = radii_type_indexed;
    }

    pub fn kernel(&self) -> &DensityKernel {
        &self.kernel
    }

    /// Points per axis.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn grid_dimensions(&self, num_types: usize) -> [usize; 4] {
        [num_types, self.dim, self.dim, self.dim]
    }

    pub fn spatial_grid_dimensions(&self) -> [usize; 3] {
        [self.dim, self.dim, self.dim]
    }

    /// A zeroed grid with `num_types` channels.
    pub fn make_grid(&self, num_types: usize) -> Array4<f32> {
        Array4::zeros(self.grid_dimensions(num_types))
    }

    /// A zeroed batch of `batch_size` grids with `num_types` channels.
    pub fn make_batch(&self, batch_size: usize, num_types: usize) -> Array5<f32> {
        Array5::zeros([batch_size, num_types, self.dim, self.dim, self.dim])
    }

    /// The position of grid point `(0, 0, 0)` for a grid centered at `center`.
    pub fn grid_origin(&self, center: &Point3<f32>) -> Point3<f32> {
        center - Vector3::repeat(self.dimension / 2.0)
    }

    fn channel_contributors(&self, coords: &CoordinateSet) -> Result<Vec<Vec<Contributor>>, GridError> {
        let channels = coords.num_types();
        let radii = coords.radii();
        let n = coords.size();
        let (expected, kind) = if self.radii_type_indexed {
            (channels, "one per type")
        } else {
            (n, "one per atom")
        };
        if radii.len() != expected {
            return Err(GridError::RadiiLength {
                kind,
                expected,
                actual: radii.len(),
            });
        }
        if coords.has_type_indexed_radii() != self.radii_type_indexed {
            let mode = |per_type: bool| if per_type { "per type" } else { "per atom" };
            return Err(GridError::RadiusMode {
                expected: mode(self.radii_type_indexed),
                actual: mode(coords.has_type_indexed_radii()),
            });
        }

        let mut contributors: Vec<Vec<Contributor>> = vec![Vec::new(); channels];
        match coords.types() {
            AtomTypes::Index(types) => {
                for (atom, (&t, position)) in types.iter().zip(coords.coords()).enumerate() {
                    if t < 0 {
                        continue;
                    }
                    let channel = t as usize;
                    if channel >= channels {
                        return Err(GridError::TypeOutOfRange {
                            atom,
                            atom_type: t,
                            channels,
                        });
                    }
                    let radius = if self.radii_type_indexed { radii[channel] } else { radii[atom] };
                    contributors[channel].push(Contributor {
                        position: *position,
                        radius,
                        weight: 1.0,
                    });
                }
            }
            AtomTypes::Vector(types) => {
                for (atom, (row, position)) in types.outer_iter().zip(coords.coords()).enumerate() {
                    for (channel, &weight) in row.iter().enumerate() {
                        if weight == 0.0 {
                            continue;
                        }
                        let radius = if self.radii_type_indexed { radii[channel] } else { radii[atom] };
                        contributors[channel].push(Contributor {
                            position: *position,
                            radius,
                            weight,
                        });
                    }
                }
            }
        }
        Ok(contributors)
    }

    /// Calls `f(flat_index, distance)` for every grid point within `cutoff` of
    /// `position`, where `flat_index` indexes one channel in row-major order.
    fn for_each_point_near(
        &self,
        position: &Point3<f32>,
        cutoff: f32,
        origin: &Point3<f32>,
        mut f: impl FnMut(usize, f32, Vector3<f32>),
    ) {
        let n = self.dim;
        let res = self.resolution;
        let axis_range = |c: f32, o: f32| -> Option<(usize, usize)> {
            let lo = ((c - cutoff - o) / res).ceil();
            let hi = ((c + cutoff - o) / res).floor();
            if hi < 0.0 || lo > (n - 1) as f32 || hi < lo {
                return None;
            }
            Some((lo.max(0.0) as usize, (hi as usize).min(n - 1)))
        };
        let (Some((x0, x1)), Some((y0, y1)), Some((z0, z1))) = (
            axis_range(position.x, origin.x),
            axis_range(position.y, origin.y),
            axis_range(position.z, origin.z),
        ) else {
            return;
        };
        let cutoff2 = cutoff * cutoff;
        for i in x0..=x1 {
            let dx = position.x - (origin.x + i as f32 * res);
            for j in y0..=y1 {
                let dy = position.y - (origin.y + j as f32 * res);
                let dxy2 = dx * dx + dy * dy;
                if dxy2 > cutoff2 {
                    continue;
                }
                for k in z0..=z1 {
                    let dz = position.z - (origin.z + k as f32 * res);
                    let d2 = dxy2 + dz * dz;
                    if d2 > cutoff2 {
                        continue;
                    }
                    f((i * n + j) * n + k, d2.sqrt(), Vector3::new(dx, dy, dz));
                }
            }
        }
    }

    fn render_channel(&self, channel: &mut [f32], atoms: &[Contributor], origin: &Point3<f32>) {
        channel.fill(0.0);
        for atom in atoms {
            let cutoff = self.kernel.cutoff(atom.radius);
            self.for_each_point_near(&atom.position, cutoff, origin, |idx, d, _| {
                let value = self.kernel.density(d, atom.radius) * atom.weight;
                if self.binary {
                    channel[idx] = channel[idx].max(value);
                } else {
                    channel[idx] += value;
                }
            });
        }
    }

    /// Grids `coords` into `out`, centered at `center`. `out` is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if `out` does not have shape
    /// [`grid_dimensions`](Self::grid_dimensions) for the set's type count, if the radii
    /// do not match the radius mode, or if `out` is not contiguous.
    #[instrument(level = "trace", skip_all, fields(atoms = coords.size(), channels = coords.num_types()))]
    pub fn forward(
        &self,
        center: &Point3<f32>,
        coords: &CoordinateSet,
        mut out: ArrayViewMut4<'_, f32>,
    ) -> Result<(), GridError> {
        check_shape(&self.grid_dimensions(coords.num_types()), out.shape())?;
        let contributors = self.channel_contributors(coords)?;
        let origin = self.grid_origin(center);
        let chunk = self.dim * self.dim * self.dim;
        let data = out.as_slice_mut().ok_or(GridError::NonContiguous)?;

        #[cfg(not(feature = "parallel"))]
        let iterator = data.chunks_mut(chunk).zip(contributors.iter());

        #[cfg(feature = "parallel")]
        let iterator = data.par_chunks_mut(chunk).zip(contributors.par_iter());

        iterator.for_each(|(channel, atoms)| self.render_channel(channel, atoms, &origin));
        trace!("Rendered {} channels.", contributors.len());
        Ok(())
    }

    /// Grids an example: its coordinate sets are merged with distinct channels, moved
    /// by `transform`, and gridded around the transform's rotation center.
    pub fn forward_example(
        &self,
        example: &Example,
        transform: &Transform,
        out: ArrayViewMut4<'_, f32>,
    ) -> Result<(), GridError> {
        let mut merged = example.merge_coordinates(true)?;
        transform.forward_in_place(&mut merged, true);
        self.forward(&transform.grid_center(), &merged, out)
    }

    /// Grids an example under a random transform centered on its last coordinate set
    /// (conventionally the ligand) and returns the transform used.
    pub fn forward_example_random(
        &self,
        example: &Example,
        random_translation: f32,
        random_rotation: bool,
        rng: &mut impl Rng,
        out: ArrayViewMut4<'_, f32>,
    ) -> Result<Transform, GridError> {
        if !random_translation.is_finite() {
            return Err(GridError::InvalidSetting {
                name: "random_translation",
                value: random_translation,
                reason: "must be finite",
            });
        }
        let center = example
            .coord_sets
            .last()
            .ok_or(GridError::EmptyExample)?
            .center();
        let transform = Transform::random(center, random_translation, random_rotation, rng);
        self.forward_example(example, &transform, out)?;
        Ok(transform)
    }

    /// Grids a batch of examples into `out`, one random transform per example.
    ///
    /// `out` must have room for every example; extra batch slots are left untouched.
    pub fn forward_batch(
        &self,
        examples: &[Example],
        random_translation: f32,
        random_rotation: bool,
        rng: &mut impl Rng,
        mut out: ArrayViewMut5<'_, f32>,
    ) -> Result<Vec<Transform>, GridError> {
        let capacity = out.shape()[0];
        if examples.len() > capacity {
            return Err(GridError::BatchTooSmall {
                capacity,
                requested: examples.len(),
            });
        }
        let mut transforms = Vec::with_capacity(examples.len());
        for (example, slot) in examples.iter().zip(out.axis_iter_mut(Axis(0))) {
            transforms.push(self.forward_example_random(
                example,
                random_translation,
                random_rotation,
                rng,
                slot,
            )?);
        }
        Ok(transforms)
    }

    /// Computes atom gradients of `sum(diff * forward(center, coords))`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::BinaryBackward`] in binary mode, and shape errors as for
    /// [`forward`](Self::forward).
    #[instrument(level = "trace", skip_all, fields(atoms = coords.size()))]
    pub fn backward(
        &self,
        center: &Point3<f32>,
        coords: &CoordinateSet,
        diff: ArrayView4<'_, f32>,
    ) -> Result<AtomGradients, GridError> {
        if self.binary {
            return Err(GridError::BinaryBackward);
        }
        let channels = coords.num_types();
        check_shape(&self.grid_dimensions(channels), diff.shape())?;
        self.channel_contributors(coords)?;
        let diff = diff.as_standard_layout();
        let diff = diff.as_slice().ok_or(GridError::NonContiguous)?;
        let origin = self.grid_origin(center);
        let chunk = self.dim * self.dim * self.dim;

        let atom_gradient = |atom: usize| -> (Vector3<f32>, Vec<f32>) {
            let position = coords.coords()[atom];
            let mut grad = Vector3::zeros();
            let mut type_grad = Vec::new();
            match coords.types() {
                AtomTypes::Index(types) => {
                    let t = types[atom];
                    if t >= 0 {
                        let channel = t as usize;
                        let radius = self.atom_radius(coords, atom, channel);
                        let diff = &diff[channel * chunk..(channel + 1) * chunk];
                        grad = self.coordinate_gradient(&position, radius, 1.0, &origin, diff);
                    }
                }
                AtomTypes::Vector(types) => {
                    type_grad = vec![0.0; channels];
                    for (channel, slot) in type_grad.iter_mut().enumerate() {
                        let radius = self.atom_radius(coords, atom, channel);
                        let diff = &diff[channel * chunk..(channel + 1) * chunk];
                        let weight = types[[atom, channel]];
                        if weight != 0.0 {
                            grad += self.coordinate_gradient(&position, radius, weight, &origin, diff);
                        }
                        let cutoff = self.kernel.cutoff(radius);
                        self.for_each_point_near(&position, cutoff, &origin, |idx, d, _| {
                            *slot += self.kernel.density(d, radius) * diff[idx];
                        });
                    }
                }
            }
            (grad, type_grad)
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..coords.size();

        #[cfg(feature = "parallel")]
        let iterator = (0..coords.size()).into_par_iter();

        let per_atom: Vec<(Vector3<f32>, Vec<f32>)> = iterator.map(atom_gradient).collect();

        let types = coords.has_vector_types().then(|| {
            let mut types = Array2::zeros((coords.size(), channels));
            for (mut row, (_, tg)) in types.outer_iter_mut().zip(&per_atom) {
                for (dst, src) in row.iter_mut().zip(tg) {
                    *dst = *src;
                }
            }
            types
        });
        Ok(AtomGradients {
            coords: per_atom.into_iter().map(|(g, _)| g).collect(),
            types,
        })
    }

    fn atom_radius(&self, coords: &CoordinateSet, atom: usize, channel: usize) -> f32 {
        if self.radii_type_indexed {
            coords.radii()[channel]
        } else {
            coords.radii()[atom]
        }
    }

    fn coordinate_gradient(
        &self,
        position: &Point3<f32>,
        radius: f32,
        weight: f32,
        origin: &Point3<f32>,
        diff: &[f32],
    ) -> Vector3<f32> {
        let mut grad = Vector3::zeros();
        let cutoff = self.kernel.cutoff(radius);
        self.for_each_point_near(position, cutoff, origin, |idx, d, offset| {
            if d > 0.0 {
                let slope = self.kernel.derivative(d, radius);
                grad += offset * (weight * diff[idx] * slope / d);
            }
        });
        grad
    }

    /// Back-propagates an example gradient: gradients are computed in the transformed
    /// frame and rotated back into the frame of the input coordinates.
    pub fn backward_example(
        &self,
        example: &Example,
        transform: &Transform,
        diff: ArrayView4<'_, f32>,
    ) -> Result<AtomGradients, GridError> {
        let mut merged = example.merge_coordinates(true)?;
        transform.forward_in_place(&mut merged, true);
        let mut gradients = self.backward(&transform.grid_center(), &merged, diff)?;
        transform.backward_gradients(&mut gradients.coords);
        Ok(gradients)
    }

    /// Distributes grid relevance onto atoms.
    ///
    /// Each grid point's relevance `diff` is shared among atoms in proportion to
    /// their share of the total `density` at that point.
    pub fn backward_relevance(
        &self,
        center: &Point3<f32>,
        coords: &CoordinateSet,
        density: ArrayView4<'_, f32>,
        diff: ArrayView4<'_, f32>,
    ) -> Result<Vec<f32>, GridError> {
        let dims = self.grid_dimensions(coords.num_types());
        check_shape(&dims, density.shape())?;
        check_shape(&dims, diff.shape())?;
        self.channel_contributors(coords)?;
        let density = density.as_standard_layout();
        let density = density.as_slice().ok_or(GridError::NonContiguous)?;
        let diff = diff.as_standard_layout();
        let diff = diff.as_slice().ok_or(GridError::NonContiguous)?;
        let origin = self.grid_origin(center);
        let chunk = self.dim * self.dim * self.dim;

        let relevance = |atom: usize| -> f32 {
            let position = coords.coords()[atom];
            let channels: Vec<(usize, f32)> = match coords.types() {
                AtomTypes::Index(types) if types[atom] >= 0 => vec![(types[atom] as usize, 1.0)],
                AtomTypes::Index(_) => Vec::new(),
                AtomTypes::Vector(types) => types
                    .row(atom)
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| **w != 0.0)
                    .map(|(c, w)| (c, *w))
                    .collect(),
            };
            let mut total = 0.0;
            for (channel, weight) in channels {
                let radius = self.atom_radius(coords, atom, channel);
                let base = channel * chunk;
                self.for_each_point_near(&position, self.kernel.cutoff(radius), &origin, |idx, d, _| {
                    let rho = density[base + idx];
                    if rho > 0.0 {
                        total += weight * self.kernel.density(d, radius) / rho * diff[base + idx];
                    }
                });
            }
            total
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..coords.size();

        #[cfg(feature = "parallel")]
        let iterator = (0..coords.size()).into_par_iter();

        Ok(iterator.map(relevance).collect())
    }
}

/// Builder for [`GridMaker`]; unset fields take the defaults.
#[derive(Debug, Clone, Default)]
pub struct GridMakerBuilder {
    resolution: Option<f32>,
    dimension: Option<f32>,
    binary: Option<bool>,
    radius_scale: Option<f32>,
    gaussian_radius_multiple: Option<f32>,
    radii_type_indexed: Option<bool>,
}

impl From<GridMaker> for GridMakerBuilder {
    fn from(gm: GridMaker) -> Self {
        Self {
            resolution: Some(gm.resolution),
            dimension: Some(gm.dimension),
            binary: Some(gm.binary),
            radius_scale: Some(gm.radius_scale),
            gaussian_radius_multiple: Some(gm.gaussian_radius_multiple),
            radii_type_indexed: Some(gm.radii_type_indexed),
        }
    }
}

impl GridMakerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution(mut self, resolution: f32) -> Self {
        self.resolution = Some(resolution);
        self
    }
    pub fn dimension(mut self, dimension: f32) -> Self {
        self.dimension = Some(dimension);
        self
    }
    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = Some(binary);
        self
    }
    pub fn radius_scale(mut self, radius_scale: f32) -> Self {
        self.radius_scale = Some(radius_scale);
        self
    }
    pub fn gaussian_radius_multiple(mut self, grm: f32) -> Self {
        self.gaussian_radius_multiple = Some(grm);
        self
    }
    pub fn radii_type_indexed(mut self, radii_type_indexed: bool) -> Self {
        self.radii_type_indexed = Some(radii_type_indexed);
        self
    }

    pub fn build(self) -> Result<GridMaker, GridError> {
        let resolution = self.resolution.unwrap_or(DEFAULT_RESOLUTION);
        let dimension = self.dimension.unwrap_or(DEFAULT_DIMENSION);
        let binary = self.binary.unwrap_or(false);
        let radius_scale = self.radius_scale.unwrap_or(1.0);
        let grm = self.gaussian_radius_multiple.unwrap_or(1.0);

        let invalid = |name, value, reason| GridError::InvalidSetting {
            name,
            value,
            reason,
        };
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(invalid("resolution", resolution, "must be positive"));
        }
        if !(dimension.is_finite() && dimension >= 0.0) {
            return Err(invalid("dimension", dimension, "must not be negative"));
        }
        if !(radius_scale.is_finite() && radius_scale > 0.0) {
            return Err(invalid("radius_scale", radius_scale, "must be positive"));
        }
        if !grm.is_finite() || grm == 0.0 {
            return Err(invalid("gaussian_radius_multiple", grm, "must be non-zero"));
        }

        Ok(GridMaker {
            resolution,
            dimension,
            binary,
            radius_scale,
            gaussian_radius_multiple: grm,
            radii_type_indexed: self.radii_type_indexed.unwrap_or(false),
            dim: points_per_side(resolution, dimension),
            kernel: DensityKernel::new(binary, radius_scale, grm),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn single_atom(position: Point3<f32>, radius: f32) -> CoordinateSet {
        CoordinateSet::new_indexed(vec![position], vec![0], vec![radius], 1).unwrap()
    }

    fn small_maker() -> GridMaker {
        GridMaker::builder().resolution(0.5).dimension(4.0).build().unwrap()
    }

    #[test]
    fn default_geometry() {
        let gm = GridMaker::default();
        assert_eq!(gm.dim(), 48);
        assert_eq!(gm.grid_dimensions(3), [3, 48, 48, 48]);
        let origin = gm.grid_origin(&Point3::new(1.0, 2.0, 3.0));
        assert!((origin - Point3::new(-10.75, -9.75, -8.75)).norm() < 1e-5);
    }

    #[test]
    fn origin_uses_half_the_dimension_when_not_a_multiple_of_resolution() {
        let gm = GridMaker::builder().resolution(0.5).dimension(23.7).build().unwrap();
        assert_eq!(gm.dim(), 48);
        let origin = gm.grid_origin(&Point3::origin());
        assert!((origin.x + 11.85).abs() < 1e-5);

        let atom = single_atom(Point3::new(-11.85, -11.85, -11.85), 1.0);
        let mut grid = gm.make_grid(1);
        gm.forward(&Point3::origin(), &atom, grid.view_mut()).unwrap();
        assert!((grid[[0, 0, 0, 0]] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            GridMaker::builder().resolution(0.0).build(),
            Err(GridError::InvalidSetting { name: "resolution", .. })
        ));
        assert!(GridMaker::builder().gaussian_radius_multiple(0.0).build().is_err());
        let mut gm = GridMaker::default();
        assert!(gm.set_radius_scale(-1.0).is_err());
        assert_eq!(gm.radius_scale(), 1.0);
        gm.set_dimension(10.0).unwrap();
        assert_eq!(gm.dim(), 21);
    }

    #[test]
    fn centered_atom_gives_symmetric_grid_with_peak_at_center() {
        let gm = small_maker();
        let coords = single_atom(Point3::new(1.0, 1.0, 1.0), 1.5);
        let mut grid = gm.make_grid(1);
        gm.forward(&Point3::new(1.0, 1.0, 1.0), &coords, grid.view_mut()).unwrap();

        let n = gm.dim();
        let mid = n / 2;
        assert!((grid[[0, mid, mid, mid]] - 1.0).abs() < 1e-6);
        let max = grid.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(max, grid[[0, mid, mid, mid]]);
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let v = grid[[0, i, j, k]];
                    assert!((v - grid[[0, n - 1 - i, j, k]]).abs() < 1e-6);
                    assert!((v - grid[[0, k, i, j]]).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn overlapping_atoms_add_and_binary_saturates() {
        let center = Point3::origin();
        let coords = CoordinateSet::new_indexed(
            vec![Point3::origin(), Point3::origin()],
            vec![0, 0],
            vec![1.0, 1.0],
            1,
        )
        .unwrap();
        let gm = small_maker();
        let mut grid = gm.make_grid(1);
        gm.forward(&center, &coords, grid.view_mut()).unwrap();
        let mid = gm.dim() / 2;
        assert!((grid[[0, mid, mid, mid]] - 2.0).abs() < 1e-6);

        let mut binary = gm;
        binary.set_binary(true);
        binary.forward(&center, &coords, grid.view_mut()).unwrap();
        assert!(grid.iter().all(|&v| v == 0.0 || v == 1.0));
        assert_eq!(grid[[0, mid, mid, mid]], 1.0);
    }

    #[test]
    fn negative_types_are_skipped_and_shapes_checked() {
        let gm = small_maker();
        let coords =
            CoordinateSet::new_indexed(vec![Point3::origin()], vec![-1], vec![1.0], 2).unwrap();
        let mut grid = gm.make_grid(2);
        grid.fill(3.0);
        gm.forward(&Point3::origin(), &coords, grid.view_mut()).unwrap();
        assert!(grid.iter().all(|&v| v == 0.0));

        let mut wrong = gm.make_grid(3);
        assert!(matches!(
            gm.forward(&Point3::origin(), &coords, wrong.view_mut()),
            Err(GridError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn vector_types_weight_channels() {
        let gm = small_maker();
        let coords = CoordinateSet::new_vector(
            vec![Point3::origin()],
            array![[0.25, 0.0, 1.0]],
            vec![1.0],
        )
        .unwrap();
        let mut grid = gm.make_grid(3);
        gm.forward(&Point3::origin(), &coords, grid.view_mut()).unwrap();
        let mid = gm.dim() / 2;
        assert!((grid[[0, mid, mid, mid]] - 0.25).abs() < 1e-6);
        assert_eq!(grid.index_axis(Axis(0), 1).sum(), 0.0);
        assert!((grid[[2, mid, mid, mid]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn type_indexed_radii() {
        let gm = GridMaker::builder()
            .resolution(0.5)
            .dimension(4.0)
            .radii_type_indexed(true)
            .build()
            .unwrap();
        let mut coords = CoordinateSet::new_indexed(
            vec![Point3::origin(), Point3::new(0.5, 0.0, 0.0)],
            vec![0, 1],
            vec![1.0, 0.5],
            2,
        )
        .unwrap();
        let mut grid = gm.make_grid(2);
        assert_eq!(
            gm.forward(&Point3::origin(), &coords, grid.view_mut()),
            Err(GridError::RadiusMode {
                expected: "per type",
                actual: "per atom"
            })
        );

        coords.set_type_radii(vec![1.0, 0.5]).unwrap();
        gm.forward(&Point3::origin(), &coords, grid.view_mut()).unwrap();
        assert!(grid.index_axis(Axis(0), 0).sum() > grid.index_axis(Axis(0), 1).sum());

        let per_atom_radii = CoordinateSet::new_indexed(vec![Point3::origin()], vec![0], vec![1.0], 2).unwrap();
        let mut g = gm.make_grid(2);
        assert_eq!(
            gm.forward(&Point3::origin(), &per_atom_radii, g.view_mut()),
            Err(GridError::RadiiLength {
                kind: "one per type",
                expected: 2,
                actual: 1
            })
        );
    }

    fn weighted_sum(gm: &GridMaker, center: &Point3<f32>, coords: &CoordinateSet, diff: &Array4<f32>) -> f32 {
        let mut grid = gm.make_grid(coords.num_types());
        gm.forward(center, coords, grid.view_mut()).unwrap();
        (&grid * diff).sum()
    }

    #[test]
    fn backward_matches_finite_differences() {
        let gm = small_maker();
        let center = Point3::origin();
        let coords = CoordinateSet::new_indexed(
            vec![Point3::new(0.13, -0.21, 0.34), Point3::new(-0.4, 0.3, -0.1)],
            vec![0, 1],
            vec![1.2, 0.9],
            2,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let diff = Array4::from_shape_fn(gm.grid_dimensions(2), |_| rng.gen_range(-1.0..1.0));

        let grads = gm.backward(&center, &coords, diff.view()).unwrap();
        assert!(grads.types.is_none());
        let h = 1e-2;
        for atom in 0..2 {
            for axis in 0..3 {
                let mut plus = coords.clone();
                plus.coords_mut()[atom][axis] += h;
                let mut minus = coords.clone();
                minus.coords_mut()[atom][axis] -= h;
                let numeric = (weighted_sum(&gm, &center, &plus, &diff)
                    - weighted_sum(&gm, &center, &minus, &diff))
                    / (2.0 * h);
                let analytic = grads.coords[atom][axis];
                assert!(
                    (numeric - analytic).abs() < 0.05 * analytic.abs().max(1.0),
                    "atom {} axis {}: {} vs {}",
                    atom,
                    axis,
                    numeric,
                    analytic
                );
            }
        }
    }

    #[test]
    fn vector_backward_reports_type_gradients() {
        let gm = small_maker();
        let coords =
            CoordinateSet::new_vector(vec![Point3::new(0.1, 0.0, 0.0)], array![[1.0, 0.0]], vec![1.0])
                .unwrap();
        let mut diff = gm.make_grid(2);
        diff.index_axis_mut(Axis(0), 1).fill(1.0);
        let grads = gm.backward(&Point3::origin(), &coords, diff.view()).unwrap();
        let types = grads.types.unwrap();
        assert_eq!(types[[0, 0]], 0.0);

        let mut grid = gm.make_grid(2);
        let as_channel_one =
            CoordinateSet::new_vector(vec![Point3::new(0.1, 0.0, 0.0)], array![[0.0, 1.0]], vec![1.0])
                .unwrap();
        gm.forward(&Point3::origin(), &as_channel_one, grid.view_mut()).unwrap();
        assert!((types[[0, 1]] - grid.sum()).abs() < 1e-3);
    }

    #[test]
    fn binary_backward_is_rejected() {
        let mut gm = small_maker();
        gm.set_binary(true);
        let coords = single_atom(Point3::origin(), 1.0);
        let diff = gm.make_grid(1);
        assert_eq!(
            gm.backward(&Point3::origin(), &coords, diff.view()),
            Err(GridError::BinaryBackward)
        );
    }

    #[test]
    fn relevance_splits_by_density_share() {
        let gm = small_maker();
        let center = Point3::origin();
        let coords = CoordinateSet::new_indexed(
            vec![Point3::origin(), Point3::origin()],
            vec![0, 0],
            vec![1.0, 1.0],
            1,
        )
        .unwrap();
        let mut density = gm.make_grid(1);
        gm.forward(&center, &coords, density.view_mut()).unwrap();
        let diff = density.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let relevance = gm
            .backward_relevance(&center, &coords, density.view(), diff.view())
            .unwrap();
        let total: f32 = diff.sum();
        assert!((relevance[0] - relevance[1]).abs() < 1e-4);
        assert!((relevance[0] + relevance[1] - total).abs() < 1e-2 * total);
    }

    #[test]
    fn non_finite_random_translation_is_rejected() {
        let example = Example::new(vec![single_atom(Point3::origin(), 1.0)], vec![], None);
        let gm = small_maker();
        let mut rng = StdRng::seed_from_u64(1);
        let mut batch = gm.make_batch(1, 1);
        for bound in [f32::NAN, f32::INFINITY] {
            assert!(matches!(
                gm.forward_batch(std::slice::from_ref(&example), bound, true, &mut rng, batch.view_mut()),
                Err(GridError::InvalidSetting { name: "random_translation", .. })
            ));
        }
    }

    #[test]
    fn forward_example_centers_on_transform_and_batches() {
        let ligand = single_atom(Point3::new(10.0, 10.0, 10.0), 1.0);
        let receptor = single_atom(Point3::new(10.5, 10.0, 10.0), 1.0);
        let example = Example::new(vec![receptor, ligand], vec![1.0], None);
        let gm = small_maker();

        let mut grid = gm.make_grid(2);
        let transform = Transform::centered_at(Point3::new(10.0, 10.0, 10.0));
        gm.forward_example(&example, &transform, grid.view_mut()).unwrap();
        let mid = gm.dim() / 2;
        assert!((grid[[1, mid, mid, mid]] - 1.0).abs() < 1e-6);
        assert!(grid[[0, mid + 1, mid, mid]] > 0.99);

        let mut rng = StdRng::seed_from_u64(5);
        let mut batch = gm.make_batch(3, 2);
        let transforms = gm
            .forward_batch(&[example.clone(), example], 0.0, false, &mut rng, batch.view_mut())
            .unwrap();
        assert_eq!(transforms.len(), 2);
        assert_eq!(transforms[0].rotation_center(), Point3::new(10.0, 10.0, 10.0));
        assert!((batch[[0, 1, mid, mid, mid]] - 1.0).abs() < 1e-6);
        assert_eq!(batch.index_axis(Axis(0), 2).sum(), 0.0);
    }

    #[test]
    fn backward_example_rotates_gradients_back() {
        use crate::core::transform::Quaternion;
        let gm = small_maker();
        let ligand = single_atom(Point3::new(0.3, 0.0, 0.0), 1.0);
        let example = Example::new(vec![ligand], vec![], None);
        let diff = Array4::from_shape_fn(gm.grid_dimensions(1), |(_, i, _, _)| i as f32);

        let identity = gm
            .backward_example(&example, &Transform::centered_at(Point3::origin()), diff.view())
            .unwrap();
        let q = Quaternion::from_axis_angle(&Vector3::z(), std::f32::consts::FRAC_PI_2);
        let rotated = Transform::new(q, Point3::origin(), Vector3::zeros());
        let turned = gm.backward_example(&example, &rotated, diff.view()).unwrap();
        assert!(identity.coords[0].x.abs() > 0.1);
        assert!((turned.coords[0].norm() - identity.coords[0].norm()).abs() < 0.2 * identity.coords[0].norm());
    }
}
