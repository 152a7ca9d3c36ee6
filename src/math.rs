//! Math type aliases and TRS helper functions.
//!
//! All rendering math is f32. Types are thin aliases over `nalgebra` so
//! callers do not need to spell out the scalar parameter.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
pub type Quat = nalgebra::Quaternion<f32>;

/// Unit quaternion (f32) representing a rotation.
pub type UnitQuat = nalgebra::UnitQuaternion<f32>;

/// Create a quaternion from x, y, z, w components.
pub fn quat_from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Quat {
    nalgebra::Quaternion::new(w, x, y, z)
}

/// Create a rotation from a `[x, y, z, w]` array, renormalizing if needed.
pub fn rotation_from_array(a: [f32; 4]) -> UnitQuat {
    UnitQuat::from_quaternion(quat_from_xyzw(a[0], a[1], a[2], a[3]))
}

/// Build a 4x4 TRS matrix from scale, rotation, and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: UnitQuat,
    translation: Vec3,
) -> Mat4 {
    let m = rotation.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Decompose an affine 4x4 matrix into (scale, rotation, translation).
///
/// Scale is recovered from column norms; the rotation from the
/// scale-normalized upper 3x3. Mirrored (negative-determinant) matrices
/// are not handled.
pub fn decompose_trs(m: &Mat4) -> (Vec3, UnitQuat, Vec3) {
    let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let col0 = Vec3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
    let col1 = Vec3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
    let col2 = Vec3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);
    let scale = Vec3::new(col0.norm(), col1.norm(), col2.norm());
    let rot_mat =
        nalgebra::Matrix3::from_columns(&[col0 / scale.x, col1 / scale.y, col2 / scale.z]);
    let rotation = UnitQuat::from_rotation_matrix(&nalgebra::Rotation3::from_matrix_unchecked(
        rot_mat,
    ));
    (scale, rotation, translation)
}
