use crate::core::io::dx::{read_dx_path, write_dx_grids};
use nalgebra::{Point3, Vector3};
use ndarray::{Array4, ArrayView3, Axis};
use std::io;
use std::path::{Path, PathBuf};

/// A multi-channel grid anchored in Cartesian space.
///
/// Channels share one lattice; point `(i, j, k)` of every channel sits at
/// `origin + (i, j, k) * resolution`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianGrid {
    values: Array4<f32>,
    center: Point3<f32>,
    origin: Point3<f32>,
    resolution: f32,
}

impl CartesianGrid {
    /// A grid of edge length `dimension` centered at `center`, so that its first point
    /// lies at `center - dimension / 2` on every axis.
    pub fn new(values: Array4<f32>, center: Point3<f32>, resolution: f32, dimension: f32) -> Self {
        Self {
            values,
            center,
            origin: center - Vector3::repeat(dimension / 2.0),
            resolution,
        }
    }

    /// A grid whose first point lies at `origin`; the center is the middle of the lattice.
    pub fn from_origin(values: Array4<f32>, origin: Point3<f32>, resolution: f32) -> Self {
        let s = values.shape();
        let half = |n: usize| n.saturating_sub(1) as f32 * resolution / 2.0;
        let center = origin + Vector3::new(half(s[1]), half(s[2]), half(s[3]));
        Self {
            values,
            center,
            origin,
            resolution,
        }
    }

    pub fn values(&self) -> &Array4<f32> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Array4<f32> {
        &mut self.values
    }

    pub fn into_values(self) -> Array4<f32> {
        self.values
    }

    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn num_channels(&self) -> usize {
        self.values.shape()[0]
    }

    pub fn channel(&self, channel: usize) -> ArrayView3<'_, f32> {
        self.values.index_axis(Axis(0), channel)
    }

    /// Position of grid point `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<f32> {
        self.origin
    }

    /// Fractional grid coordinates of a Cartesian point.
    pub fn cart_to_grid(&self, p: &Point3<f32>) -> Vector3<f32> {
        (p - self.origin()) / self.resolution
    }

    /// Cartesian position of grid point `(i, j, k)`.
    pub fn grid_to_cart(&self, i: usize, j: usize, k: usize) -> Point3<f32> {
        self.origin() + Vector3::new(i as f32, j as f32, k as f32) * self.resolution
    }

    /// Trilinearly interpolated value of `channel` at `p`, or 0 outside the grid.
    pub fn interpolate(&self, channel: usize, p: &Point3<f32>) -> f32 {
        if channel >= self.num_channels() {
            return 0.0;
        }
        let g = self.cart_to_grid(p);
        let s = self.values.shape();
        let dims = [s[1], s[2], s[3]];
        let mut lo = [0usize; 3];
        let mut frac = [0f32; 3];
        for axis in 0..3 {
            let x = g[axis];
            let max = dims[axis].saturating_sub(1) as f32;
            if !(0.0..=max).contains(&x) {
                return 0.0;
            }
            let base = x.floor().min((max - 1.0).max(0.0));
            lo[axis] = base as usize;
            frac[axis] = x - base;
        }
        let view = self.channel(channel);
        let at = |i: usize, j: usize, k: usize| {
            view.get([
                (lo[0] + i).min(dims[0] - 1),
                (lo[1] + j).min(dims[1] - 1),
                (lo[2] + k).min(dims[2] - 1),
            ])
            .copied()
            .unwrap_or(0.0)
        };
        let mut value = 0.0;
        for (i, wx) in [(0, 1.0 - frac[0]), (1, frac[0])] {
            for (j, wy) in [(0, 1.0 - frac[1]), (1, frac[1])] {
                for (k, wz) in [(0, 1.0 - frac[2]), (1, frac[2])] {
                    value += wx * wy * wz * at(i, j, k);
                }
            }
        }
        value
    }

    /// Writes each channel to `<prefix>_<name>.dx`.
    pub fn write_dx(&self, prefix: &str, names: &[String]) -> io::Result<Vec<PathBuf>> {
        write_dx_grids(prefix, names, self.values.view(), &self.origin, self.resolution)
    }

    /// Reads single-channel DX files and stacks them as channels of one grid.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files or when the files disagree on shape, origin or
    /// resolution. DX files do not record the grid dimension, so the center is taken
    /// as the middle of the lattice.
    pub fn read_dx<P: AsRef<Path>>(paths: &[P]) -> io::Result<Self> {
        let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);
        let mut grids = Vec::with_capacity(paths.len());
        for path in paths {
            grids.push(read_dx_path(path)?);
        }
        let Some(first) = grids.first() else {
            return Err(invalid("no DX files given".to_string()));
        };
        let (nx, ny, nz) = first.values.dim();
        let origin = first.origin;
        let resolution = first.resolution;
        let mut values = Array4::zeros([grids.len(), nx, ny, nz]);
        for (c, grid) in grids.iter().enumerate() {
            if grid.values.dim() != (nx, ny, nz)
                || (grid.resolution - resolution).abs() > 1e-4
                || (grid.origin - origin).norm() > 1e-3
            {
                return Err(invalid(format!(
                    "DX channel {} does not share the lattice of the first channel",
                    c
                )));
            }
            values.index_axis_mut(Axis(0), c).assign(&grid.values);
        }
        Ok(Self::from_origin(values, origin, resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn ramp() -> CartesianGrid {
        let values = Array4::from_shape_fn([1, 5, 5, 5], |(_, i, j, k)| i as f32 + 2.0 * j as f32 + k as f32 * 0.5);
        CartesianGrid::new(values, Point3::new(1.0, 1.0, 1.0), 0.5, 2.0)
    }

    #[test]
    fn origin_and_coordinate_conversion() {
        let grid = ramp();
        assert_eq!(grid.origin(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(grid.grid_to_cart(2, 2, 2), Point3::new(1.0, 1.0, 1.0));
        let g = grid.cart_to_grid(&Point3::new(0.25, 1.0, 2.0));
        assert!(approx_eq(g.x, 0.5) && approx_eq(g.y, 2.0) && approx_eq(g.z, 4.0));
    }

    #[test]
    fn origin_sits_half_a_dimension_below_the_center() {
        let values = Array4::zeros([1, 48, 48, 48]);
        let grid = CartesianGrid::new(values, Point3::origin(), 0.5, 23.7);
        assert!((grid.origin() - Point3::new(-11.85, -11.85, -11.85)).norm() < 1e-5);
        assert!((grid.grid_to_cart(1, 0, 0).x + 11.35).abs() < 1e-5);

        let dir = tempdir().unwrap();
        let prefix = dir.path().join("odd");
        let written = grid.write_dx(prefix.to_str().unwrap(), &["X".to_string()]).unwrap();
        let back = CartesianGrid::read_dx(&written).unwrap();
        assert!((back.origin() - grid.origin()).norm() < 1e-4);
    }

    #[test]
    fn interpolation_is_exact_for_linear_fields() {
        let grid = ramp();
        let v = grid.interpolate(0, &Point3::new(0.3, 0.7, 1.1));
        let expected = 0.3 / 0.5 + 2.0 * 0.7 / 0.5 + 0.5 * 1.1 / 0.5;
        assert!(approx_eq(v, expected));
        assert!(approx_eq(grid.interpolate(0, &Point3::new(2.0, 2.0, 2.0)), 4.0 + 8.0 + 2.0));
        assert_eq!(grid.interpolate(0, &Point3::new(-0.1, 0.0, 0.0)), 0.0);
        assert_eq!(grid.interpolate(3, &Point3::new(1.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn dx_files_round_trip_as_channels() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("ramp");
        let grid = ramp();
        let written = grid
            .write_dx(prefix.to_str().unwrap(), &["Carbon".to_string()])
            .unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("ramp_Carbon.dx"));

        let back = CartesianGrid::read_dx(&written).unwrap();
        assert_eq!(back.num_channels(), 1);
        assert!(approx_eq(back.resolution(), 0.5));
        assert!((back.center() - grid.center()).norm() < 1e-4);
        assert!((back.origin() - grid.origin()).norm() < 1e-4);
        for (a, b) in back.values().iter().zip(grid.values()) {
            assert!(approx_eq(*a, *b));
        }
    }
}
