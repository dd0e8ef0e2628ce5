use super::quaternion::Quaternion;
use crate::core::coords::CoordinateSet;
use nalgebra::{Point3, Vector3};
use rand::Rng;

/// A rigid transformation: rotation about a center followed by a translation.
///
/// Applied to a point `p` the forward transform gives `R(p - c) + c + t`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    q: Quaternion,
    center: Point3<f32>,
    translate: Vector3<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(q: Quaternion, center: Point3<f32>, translate: Vector3<f32>) -> Self {
        Self {
            q,
            center,
            translate,
        }
    }

    /// An identity rotation about `center`, so that grids are centered there.
    pub fn centered_at(center: Point3<f32>) -> Self {
        Self::new(Quaternion::identity(), center, Vector3::zeros())
    }

    /// A random augmentation transform about `center`.
    ///
    /// Each translation component is uniform in `[-random_translate, random_translate]`;
    /// a non-finite bound disables translation. With `random_rotation` the rotation is uniform over all orientations, otherwise
    /// it is the identity.
    pub fn random(
        center: Point3<f32>,
        random_translate: f32,
        random_rotation: bool,
        rng: &mut impl Rng,
    ) -> Self {
        let t = if random_translate.is_finite() {
            random_translate.abs()
        } else {
            0.0
        };
        let translate = Vector3::new(
            rng.gen_range(-t..=t),
            rng.gen_range(-t..=t),
            rng.gen_range(-t..=t),
        );
        let q = if random_rotation {
            Quaternion::random(rng)
        } else {
            Quaternion::identity()
        };
        Self::new(q, center, translate)
    }

    pub fn quaternion(&self) -> &Quaternion {
        &self.q
    }

    pub fn set_quaternion(&mut self, q: Quaternion) {
        self.q = q;
    }

    pub fn rotation_center(&self) -> Point3<f32> {
        self.center
    }

    pub fn set_rotation_center(&mut self, center: Point3<f32>) {
        self.center = center;
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.translate
    }

    pub fn set_translation(&mut self, translate: Vector3<f32>) {
        self.translate = translate;
    }

    /// The point that should sit at the grid center after this transform.
    pub fn grid_center(&self) -> Point3<f32> {
        self.center
    }

    pub fn apply(&self, p: &Point3<f32>, dotranslate: bool) -> Point3<f32> {
        let r = self.q.rotation_matrix();
        let moved = self.center + r * (p - self.center);
        if dotranslate { moved + self.translate } else { moved }
    }

    /// Transforms `input` into `output`, which must have the same length.
    pub fn forward(&self, input: &[Point3<f32>], output: &mut [Point3<f32>], dotranslate: bool) {
        debug_assert_eq!(input.len(), output.len());
        let r = self.q.rotation_matrix();
        let shift = if dotranslate { self.translate } else { Vector3::zeros() };
        for (dst, src) in output.iter_mut().zip(input) {
            *dst = self.center + r * (src - self.center) + shift;
        }
    }

    /// Transforms the coordinates of a set in place.
    pub fn forward_in_place(&self, set: &mut CoordinateSet, dotranslate: bool) {
        let r = self.q.rotation_matrix();
        let shift = if dotranslate { self.translate } else { Vector3::zeros() };
        for p in set.coords_mut() {
            *p = self.center + r * (*p - self.center) + shift;
        }
    }

    /// Returns a transformed copy of a set.
    pub fn forward_set(&self, set: &CoordinateSet, dotranslate: bool) -> CoordinateSet {
        let mut out = set.clone();
        self.forward_in_place(&mut out, dotranslate);
        out
    }

    /// Applies the exact inverse of [`forward`](Self::forward).
    pub fn backward(&self, input: &[Point3<f32>], output: &mut [Point3<f32>], dotranslate: bool) {
        debug_assert_eq!(input.len(), output.len());
        let r_inv = self.q.rotation_matrix().transpose();
        let shift = if dotranslate { self.translate } else { Vector3::zeros() };
        for (dst, src) in output.iter_mut().zip(input) {
            *dst = self.center + r_inv * (src - shift - self.center);
        }
    }

    pub fn backward_in_place(&self, set: &mut CoordinateSet, dotranslate: bool) {
        let r_inv = self.q.rotation_matrix().transpose();
        let shift = if dotranslate { self.translate } else { Vector3::zeros() };
        for p in set.coords_mut() {
            *p = self.center + r_inv * (*p - shift - self.center);
        }
    }

    /// Rotates gradient vectors from the transformed frame back into the input frame.
    /// Translation does not affect gradients.
    pub fn backward_gradients(&self, gradients: &mut [Vector3<f32>]) {
        let r_inv = self.q.rotation_matrix().transpose();
        for g in gradients {
            *g = r_inv * *g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn points() -> Vec<Point3<f32>> {
        vec![
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(-4.0, 0.5, 2.0),
            Point3::new(0.0, -1.0, 7.5),
        ]
    }

    #[test]
    fn forward_then_backward_restores_coordinates() {
        let mut rng = StdRng::seed_from_u64(42);
        let t = Transform::random(Point3::new(1.0, 1.0, 1.0), 2.0, true, &mut rng);
        let input = points();
        let mut moved = vec![Point3::origin(); 3];
        let mut back = vec![Point3::origin(); 3];
        t.forward(&input, &mut moved, true);
        t.backward(&moved, &mut back, true);
        for (a, b) in input.iter().zip(&back) {
            assert!((a - b).norm() < 1e-4);
        }
    }

    #[test]
    fn random_transforms_preserve_distances() {
        let mut rng = StdRng::seed_from_u64(3);
        let input = points();
        for _ in 0..10 {
            let t = Transform::random(Point3::origin(), 4.0, true, &mut rng);
            let translation = t.translation();
            assert!(translation.iter().all(|c| c.abs() <= 4.0));
            let mut out = vec![Point3::origin(); 3];
            t.forward(&input, &mut out, true);
            let before = (input[0] - input[2]).norm();
            let after = (out[0] - out[2]).norm();
            assert!((before - after).abs() < 1e-4);
        }
    }

    #[test]
    fn without_rotation_only_translates() {
        let mut rng = StdRng::seed_from_u64(9);
        let t = Transform::random(Point3::origin(), 1.0, false, &mut rng);
        assert_eq!(*t.quaternion(), Quaternion::identity());
        let p = t.apply(&Point3::new(1.0, 1.0, 1.0), true);
        assert!((p - (Point3::new(1.0, 1.0, 1.0) + t.translation())).norm() < 1e-6);
        assert_eq!(t.apply(&Point3::new(1.0, 1.0, 1.0), false), Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn non_finite_translation_bound_yields_no_translation() {
        let mut rng = StdRng::seed_from_u64(5);
        for bound in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let t = Transform::random(Point3::new(1.0, 2.0, 3.0), bound, true, &mut rng);
            assert_eq!(t.translation(), Vector3::zeros());
            assert_eq!(t.rotation_center(), Point3::new(1.0, 2.0, 3.0));
        }
    }

    #[test]
    fn backward_gradients_undo_rotation() {
        let q = Quaternion::from_axis_angle(&Vector3::z(), std::f32::consts::FRAC_PI_2);
        let t = Transform::new(q, Point3::new(5.0, 5.0, 5.0), Vector3::new(1.0, 0.0, 0.0));
        let mut grads = vec![Vector3::new(0.0, 1.0, 0.0)];
        t.backward_gradients(&mut grads);
        assert!((grads[0] - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-5);
    }
}
