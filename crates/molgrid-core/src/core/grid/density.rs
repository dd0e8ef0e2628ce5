//! The per-atom density kernel.
//!
//! For an atom of radius `r` the kernel works with the scaled radius
//! `ar = r * radius_scale` and the Gaussian radius multiple `g`. Density is
//! `exp(-2 d² / ar²)` out to `g·ar`, then a quadratic in `q = d / ar` that meets the
//! Gaussian with matching value and slope and falls to zero with zero slope at
//! `frm·ar`, where `frm = (1 + 2g²) / (2g)`. A negative `g` keeps the pure Gaussian and
//! truncates it at `|g|·ar`. In binary mode density is 1 inside `ar` and 0 outside.

/// Precomputed density kernel parameters shared by every atom of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityKernel {
    binary: bool,
    radius_scale: f32,
    grm: f32,
    frm: f32,
    a: f32,
    b: f32,
    c: f32,
}

impl DensityKernel {
    /// `grm` must be non-zero and `radius_scale` positive; callers validate both.
    pub fn new(binary: bool, radius_scale: f32, grm: f32) -> Self {
        let g = grm.abs();
        let g2 = g * g;
        let e = (-2.0 * g2).exp();
        let (frm, a, b, c) = if grm > 0.0 {
            (
                (1.0 + 2.0 * g2) / (2.0 * g),
                4.0 * e * g2,
                -4.0 * e * g * (1.0 + 2.0 * g2),
                e * (1.0 + 2.0 * g2) * (1.0 + 2.0 * g2),
            )
        } else {
            (g, 0.0, 0.0, 0.0)
        };
        Self {
            binary,
            radius_scale,
            grm,
            frm,
            a,
            b,
            c,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// The final radius multiple beyond which density is zero.
    pub fn final_radius_multiple(&self) -> f32 {
        if self.binary { 1.0 } else { self.frm }
    }

    /// The largest distance from an atom of radius `radius` with non-zero density.
    pub fn cutoff(&self, radius: f32) -> f32 {
        radius * self.radius_scale * self.final_radius_multiple()
    }

    fn in_gaussian(&self, d: f32, ar: f32) -> bool {
        if self.grm > 0.0 {
            d <= self.grm * ar
        } else {
            d < -self.grm * ar
        }
    }

    /// Density at distance `d` from an atom of radius `radius`.
    pub fn density(&self, d: f32, radius: f32) -> f32 {
        let ar = radius * self.radius_scale;
        if ar <= 0.0 {
            return 0.0;
        }
        if self.binary {
            return if d < ar { 1.0 } else { 0.0 };
        }
        if self.in_gaussian(d, ar) {
            (-2.0 * d * d / (ar * ar)).exp()
        } else if self.grm > 0.0 && d < self.frm * ar {
            let q = d / ar;
            self.a * q * q + self.b * q + self.c
        } else {
            0.0
        }
    }

    /// Derivative of [`density`](Self::density) with respect to distance. Binary
    /// density has no useful derivative and reports zero.
    pub fn derivative(&self, d: f32, radius: f32) -> f32 {
        let ar = radius * self.radius_scale;
        if ar <= 0.0 || self.binary {
            return 0.0;
        }
        if self.in_gaussian(d, ar) {
            -4.0 * d / (ar * ar) * (-2.0 * d * d / (ar * ar)).exp()
        } else if self.grm > 0.0 && d < self.frm * ar {
            let q = d / ar;
            (2.0 * self.a * q + self.b) / ar
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn unit_at_center_and_zero_at_final_radius() {
        let k = DensityKernel::new(false, 1.0, 1.0);
        assert_eq!(k.density(0.0, 1.5), 1.0);
        assert!(approx_eq(k.final_radius_multiple(), 1.5, 1e-6));
        assert!(approx_eq(k.density(1.5 * 1.5 - 1e-4, 1.5), 0.0, 1e-6));
        assert_eq!(k.density(1.5 * 1.5, 1.5), 0.0);
        assert_eq!(k.density(10.0, 1.5), 0.0);
    }

    #[test]
    fn continuous_at_gaussian_boundary() {
        for grm in [0.5f32, 1.0, 1.5] {
            let k = DensityKernel::new(false, 1.0, grm);
            let r = 2.0;
            let edge = grm * r;
            let inside = k.density(edge - 1e-4, r);
            let outside = k.density(edge + 1e-4, r);
            assert!(approx_eq(inside, outside, 1e-3), "grm {}: {} vs {}", grm, inside, outside);
            let slope_in = k.derivative(edge - 1e-4, r);
            let slope_out = k.derivative(edge + 1e-4, r);
            assert!(approx_eq(slope_in, slope_out, 1e-3));
        }
    }

    #[test]
    fn derivative_matches_finite_differences() {
        let k = DensityKernel::new(false, 1.2, 1.0);
        let r = 1.8;
        let h = 1e-3;
        for i in 1..30 {
            let d = i as f32 * 0.1;
            let numeric = (k.density(d + h, r) - k.density(d - h, r)) / (2.0 * h);
            assert!(
                approx_eq(numeric, k.derivative(d, r), 2e-3),
                "d={}: {} vs {}",
                d,
                numeric,
                k.derivative(d, r)
            );
        }
    }

    #[test]
    fn negative_multiple_truncates_pure_gaussian() {
        let k = DensityKernel::new(false, 1.0, -1.0);
        assert!(approx_eq(k.cutoff(2.0), 2.0, 1e-6));
        assert!(approx_eq(k.density(1.0, 2.0), (-0.5f32).exp(), 1e-6));
        assert_eq!(k.density(2.0, 2.0), 0.0);
        assert_eq!(k.density(2.5, 2.0), 0.0);
    }

    #[test]
    fn binary_density_is_occupancy() {
        let k = DensityKernel::new(true, 0.5, 1.0);
        assert_eq!(k.density(0.49, 1.0), 1.0);
        assert_eq!(k.density(0.5, 1.0), 0.0);
        assert_eq!(k.cutoff(1.0), 0.5);
        assert_eq!(k.derivative(0.1, 1.0), 0.0);
    }
}
