use nalgebra::{Matrix3, Point3, Vector3};
use rand::Rng;
use std::f32::consts::TAU;
use std::ops::Mul;

/// A quaternion `a + b·i + c·j + d·k` used for rotations.
///
/// Unlike most geometry libraries, [`norm`](Quaternion::norm) is the Cayley norm: the
/// squared magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// A unit quaternion rotating by `angle` radians about `axis`.
    pub fn from_axis_angle(axis: &Vector3<f32>, angle: f32) -> Self {
        let axis = axis.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::x);
        let (sin, cos) = (angle / 2.0).sin_cos();
        Self::new(cos, axis.x * sin, axis.y * sin, axis.z * sin)
    }

    /// Draws a rotation uniformly over SO(3) (Shoemake's method).
    pub fn random(rng: &mut impl Rng) -> Self {
        let u1: f32 = rng.gen_range(0.0..1.0);
        let u2: f32 = rng.gen_range(0.0..1.0);
        let u3: f32 = rng.gen_range(0.0..1.0);
        let (s1, s2) = ((1.0 - u1).sqrt(), u1.sqrt());
        Self::new(
            s1 * (TAU * u2).sin(),
            s1 * (TAU * u2).cos(),
            s2 * (TAU * u3).sin(),
            s2 * (TAU * u3).cos(),
        )
    }

    pub fn real(&self) -> f32 {
        self.a
    }

    /// All four components, real part first.
    pub fn components(&self) -> [f32; 4] {
        [self.a, self.b, self.c, self.d]
    }

    pub fn conj(&self) -> Self {
        Self::new(self.a, -self.b, -self.c, -self.d)
    }

    /// The squared magnitude.
    pub fn norm(&self) -> f32 {
        self.a * self.a + self.b * self.b + self.c * self.c + self.d * self.d
    }

    /// The multiplicative inverse, `conj / norm`. The zero quaternion has none and
    /// yields itself.
    pub fn inverse(&self) -> Self {
        let n = self.norm();
        if n == 0.0 {
            return *self;
        }
        let c = self.conj();
        Self::new(c.a / n, c.b / n, c.c / n, c.d / n)
    }

    /// Rotates the vector `(x, y, z)` by `q v q⁻¹`.
    pub fn rotate(&self, x: f32, y: f32, z: f32) -> Vector3<f32> {
        let v = Quaternion::new(0.0, x, y, z);
        let r = *self * v * self.inverse();
        Vector3::new(r.b, r.c, r.d)
    }

    /// Rotates `(x, y, z)` about `center`, then translates: `R(p - c) + c + t`.
    pub fn transform(
        &self,
        x: f32,
        y: f32,
        z: f32,
        center: &Point3<f32>,
        translate: &Vector3<f32>,
    ) -> Point3<f32> {
        let r = self.rotate(x - center.x, y - center.y, z - center.z);
        center + r + translate
    }

    /// The rotation matrix of the normalized quaternion.
    pub fn rotation_matrix(&self) -> Matrix3<f32> {
        let n = self.norm();
        if n == 0.0 {
            return Matrix3::identity();
        }
        let s = 2.0 / n;
        let (a, b, c, d) = (self.a, self.b, self.c, self.d);
        Matrix3::new(
            1.0 - s * (c * c + d * d),
            s * (b * c - a * d),
            s * (b * d + a * c),
            s * (b * c + a * d),
            1.0 - s * (b * b + d * d),
            s * (c * d - a * b),
            s * (b * d - a * c),
            s * (c * d + a * b),
            1.0 - s * (b * b + c * c),
        )
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, r: Quaternion) -> Quaternion {
        Quaternion::new(
            self.a * r.a - self.b * r.b - self.c * r.c - self.d * r.d,
            self.a * r.b + self.b * r.a + self.c * r.d - self.d * r.c,
            self.a * r.c - self.b * r.d + self.c * r.a + self.d * r.b,
            self.a * r.d + self.b * r.c - self.c * r.b + self.d * r.a,
        )
    }
}
