//! Rigid transform with uniform scale.
//!
//! Authored node transforms decompose into rotation, translation, and a
//! single scalar scale. Non-uniform scale is rejected at the decode
//! boundary (see [`crate::gltf`]); this type never represents it.

use std::ops::Mul;

use crate::math::{UnitQuat, Vec3};

/// Rotation, translation, and uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Rotation as a unit quaternion.
    pub rotation: UnitQuat,
    /// Translation in parent space.
    pub translation: Vec3,
    /// Uniform scale factor.
    pub scale: f32,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuat::identity(),
            translation: Vec3::zeros(),
            scale: 1.0,
        }
    }

    /// Create from parts.
    pub fn new(rotation: UnitQuat, translation: Vec3, scale: f32) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    /// Transform a point: scale, rotate, then translate.
    pub fn apply_point(&self, p: &Vec3) -> Vec3 {
        self.rotation * (p * self.scale) + self.translation
    }

    /// Transform a direction: scale and rotate, no translation.
    ///
    /// Matches multiplying the affine matrix with a w=0 vector; the result
    /// is not renormalized.
    pub fn apply_vector(&self, v: &Vec3) -> Vec3 {
        self.rotation * (v * self.scale)
    }

    /// Affine inverse.
    pub fn inverse_affine(&self) -> Self {
        let scale = 1.0 / self.scale;
        let rotation = self.rotation.inverse();
        let translation = -(rotation * self.translation) * scale;
        Self {
            rotation,
            translation,
            scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Composition: `(a * b).apply_point(p) == a.apply_point(&b.apply_point(p))`.
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            rotation: self.rotation * rhs.rotation,
            translation: self.apply_point(&rhs.translation),
            scale: self.scale * rhs.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::nalgebra;
    use std::f32::consts::FRAC_PI_2;

    fn rot_y_90() -> UnitQuat {
        UnitQuat::from_axis_angle(&nalgebra::Vector3::y_axis(), FRAC_PI_2)
    }

    #[test]
    fn identity_leaves_points_alone() {
        let t = Transform::identity();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!((t.apply_point(&p) - p).norm() < 1e-6);
        assert!((t.apply_vector(&p) - p).norm() < 1e-6);
    }

    #[test]
    fn apply_point_order() {
        // scale then rotate then translate
        let t = Transform::new(rot_y_90(), Vec3::new(0.0, 0.0, 10.0), 2.0);
        let p = Vec3::new(1.0, 0.0, 0.0);
        let q = t.apply_point(&p);
        // (2,0,0) rotated 90° about Y → (0,0,-2), plus translation
        assert!((q - Vec3::new(0.0, 0.0, 8.0)).norm() < 1e-5);
    }

    #[test]
    fn vector_ignores_translation() {
        let t = Transform::new(UnitQuat::identity(), Vec3::new(5.0, 5.0, 5.0), 1.0);
        let v = Vec3::new(0.0, 1.0, 0.0);
        assert!((t.apply_vector(&v) - v).norm() < 1e-6);
    }

    #[test]
    fn compose_matches_sequential_application() {
        let a = Transform::new(rot_y_90(), Vec3::new(1.0, 2.0, 3.0), 2.0);
        let b = Transform::new(
            UnitQuat::from_axis_angle(&nalgebra::Vector3::x_axis(), 0.3),
            Vec3::new(-1.0, 0.5, 0.0),
            0.5,
        );
        let p = Vec3::new(0.7, -0.2, 1.1);
        let combined = (a * b).apply_point(&p);
        let sequential = a.apply_point(&b.apply_point(&p));
        assert!((combined - sequential).norm() < 1e-4);
    }

    #[test]
    fn inverse_roundtrip() {
        let t = Transform::new(rot_y_90(), Vec3::new(4.0, -2.0, 1.0), 3.0);
        let inv = t.inverse_affine();
        let p = Vec3::new(0.3, 0.8, -0.5);
        assert!((inv.apply_point(&t.apply_point(&p)) - p).norm() < 1e-4);
        assert!((t.apply_point(&inv.apply_point(&p)) - p).norm() < 1e-4);
    }
}
