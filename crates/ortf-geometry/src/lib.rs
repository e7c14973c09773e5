//! `ortf-geometry` – rigid-body pose primitives for body offsets.
//!
//! A registration may carry a static offset that places a simulated body's
//! local frame inside its externally tracked frame.  Callers usually hold that
//! offset as a 4x4 homogeneous matrix; the plugin wants a translation plus a
//! unit quaternion in (w, x, y, z) order.  This crate converts between the two.
//!
//! # Example
//!
//! ```rust
//! use ortf_geometry::{Transform3D, Vec3};
//!
//! // 180° about Z, shifted by (1, 2, 3).
//! let m = [
//!     [-1.0, 0.0, 0.0, 1.0],
//!     [0.0, -1.0, 0.0, 2.0],
//!     [0.0, 0.0, 1.0, 3.0],
//!     [0.0, 0.0, 0.0, 1.0],
//! ];
//! let t = Transform3D::from_homogeneous(&m);
//! assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
//! assert!((t.rotation.z.abs() - 1.0).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

/// Row-major 4x4 homogeneous transform.
pub type Matrix4 = [[f64; 4]; 4];

/// Row-major 3x3 rotation matrix.
pub type Matrix3 = [[f64; 3]; 3];

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
///
/// `q` and `-q` describe the same rotation; nothing here canonicalises the
/// sign, so compare rotations with [`Quaternion::same_rotation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scale to unit length.  `None` when the norm is zero or not finite,
    /// since no rotation can be recovered from such a quaternion.
    pub fn normalized(self) -> Option<Self> {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return None;
        }
        Some(Self::new(self.w / n, self.x / n, self.y / n, self.z / n))
    }

    /// Rotate a vector by this (unit) quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w (u × v) + 2 u × (u × v), with u the vector part.
        let (ux, uy, uz) = (self.x, self.y, self.z);
        let cx = uy * v.z - uz * v.y;
        let cy = uz * v.x - ux * v.z;
        let cz = ux * v.y - uy * v.x;
        Vec3::new(
            v.x + 2.0 * (self.w * cx + uy * cz - uz * cy),
            v.y + 2.0 * (self.w * cy + uz * cx - ux * cz),
            v.z + 2.0 * (self.w * cz + ux * cy - uy * cx),
        )
    }

    /// Convert a rotation matrix to a unit quaternion (Shepperd's method).
    ///
    /// Branches on the trace, falling back to the largest diagonal element so
    /// the divisor never approaches zero.  A matrix holding NaN or infinite
    /// entries yields a non-finite quaternion; check [`Quaternion::is_finite`].
    pub fn from_rotation_matrix(m: &Matrix3) -> Self {
        let trace = m[0][0] + m[1][1] + m[2][2];
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m[2][1] - m[1][2]) / s,
                (m[0][2] - m[2][0]) / s,
                (m[1][0] - m[0][1]) / s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt() * 2.0;
            Self::new(
                (m[2][1] - m[1][2]) / s,
                0.25 * s,
                (m[0][1] + m[1][0]) / s,
                (m[0][2] + m[2][0]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt() * 2.0;
            Self::new(
                (m[0][2] - m[2][0]) / s,
                (m[0][1] + m[1][0]) / s,
                0.25 * s,
                (m[1][2] + m[2][1]) / s,
            )
        } else {
            let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt() * 2.0;
            Self::new(
                (m[1][0] - m[0][1]) / s,
                (m[0][2] + m[2][0]) / s,
                (m[1][2] + m[2][1]) / s,
                0.25 * s,
            )
        };
        q.normalized().unwrap_or(q)
    }

    /// Expand to a row-major rotation matrix.
    pub fn to_rotation_matrix(self) -> Matrix3 {
        let Self { w, x, y, z } = self;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - w * z),
                2.0 * (x * z + w * y),
            ],
            [
                2.0 * (x * y + w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - w * x),
            ],
            [
                2.0 * (x * z - w * y),
                2.0 * (y * z + w * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }

    /// `true` when both quaternions describe the same rotation within `tol`,
    /// accepting either sign.
    pub fn same_rotation(self, other: Self, tol: f64) -> bool {
        let dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        (dot.abs() - 1.0).abs() <= tol
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body 3-D transform: rotation followed by translation.
///
/// As a registration offset it is the pose of the simulated body's frame
/// expressed in the tracked frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Split a homogeneous matrix into translation (last column) and rotation
    /// (upper-left 3x3 block).  The bottom row is ignored.
    pub fn from_homogeneous(m: &Matrix4) -> Self {
        let rot = [
            [m[0][0], m[0][1], m[0][2]],
            [m[1][0], m[1][1], m[1][2]],
            [m[2][0], m[2][1], m[2][2]],
        ];
        Self::new(
            Vec3::new(m[0][3], m[1][3], m[2][3]),
            Quaternion::from_rotation_matrix(&rot),
        )
    }

    pub fn to_homogeneous(self) -> Matrix4 {
        let r = self.rotation.to_rotation_matrix();
        let t = self.translation;
        [
            [r[0][0], r[0][1], r[0][2], t.x],
            [r[1][0], r[1][1], r[1][2], t.y],
            [r[2][0], r[2][1], r[2][2], t.z],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI};

    const IDENTITY4: Matrix4 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    fn rot_z(angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
    }

    fn rot_x(angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
    }

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a.x - b.x).abs() < 1e-9, "x: {} vs {}", a.x, b.x);
        assert!((a.y - b.y).abs() < 1e-9, "y: {} vs {}", a.y, b.y);
        assert!((a.z - b.z).abs() < 1e-9, "z: {} vs {}", a.z, b.z);
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn identity_matrix_gives_exact_identity_quaternion() {
        let t = Transform3D::from_homogeneous(&IDENTITY4);
        assert_eq!(t.rotation, Quaternion::identity());
        assert_eq!(t.translation, Vec3::zero());
    }

    #[test]
    fn half_turn_about_z() {
        let q = Quaternion::from_rotation_matrix(&rot_z(PI));
        assert!(q.w.abs() < 1e-12, "w={}", q.w);
        assert!(q.x.abs() < 1e-12);
        assert!(q.y.abs() < 1e-12);
        assert!((q.z.abs() - 1.0).abs() < 1e-12, "z={}", q.z);
        assert!(q.same_rotation(Quaternion::new(0.0, 0.0, 0.0, -1.0), 1e-12));
    }

    #[test]
    fn quarter_turn_about_z_rotates_x_to_y() {
        let q = Quaternion::from_rotation_matrix(&rot_z(FRAC_PI_2));
        assert!(q.same_rotation(Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2), 1e-12));
        assert_vec_close(q.rotate(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn half_turn_about_x_takes_largest_diagonal_branch() {
        let q = Quaternion::from_rotation_matrix(&rot_x(PI));
        assert!((q.x.abs() - 1.0).abs() < 1e-12);
        assert_vec_close(q.rotate(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn matrix_roundtrip_preserves_rotation() {
        let q = Quaternion::new(0.5, 0.5, -0.5, 0.5);
        let back = Quaternion::from_rotation_matrix(&q.to_rotation_matrix());
        assert!(back.same_rotation(q, 1e-12));
        assert!((back.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_quaternions_do_not_normalize() {
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized().is_none());
        assert!(Quaternion::new(f64::NAN, 0.0, 0.0, 0.0).normalized().is_none());
        assert!(Quaternion::new(f64::INFINITY, 0.0, 0.0, 0.0).normalized().is_none());
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0).normalized().unwrap();
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn nan_matrix_entry_is_not_masked() {
        let mut m = rot_z(0.3);
        m[0][1] = f64::NAN;
        assert!(!Quaternion::from_rotation_matrix(&m).is_finite());
    }

    // ── Transform3D ─────────────────────────────────────────────────────────

    #[test]
    fn from_homogeneous_reads_last_column() {
        let mut m = IDENTITY4;
        m[0][3] = 1.0;
        m[1][3] = 2.0;
        m[2][3] = 3.0;
        let t = Transform3D::from_homogeneous(&m);
        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn homogeneous_roundtrip_preserves_pose() {
        let t = Transform3D::new(
            Vec3::new(0.1, -0.2, 0.3),
            Quaternion::from_rotation_matrix(&rot_x(0.7)),
        );
        let back = Transform3D::from_homogeneous(&t.to_homogeneous());
        assert_eq!(back.translation, t.translation);
        assert!(back.rotation.same_rotation(t.rotation, 1e-12));
    }

    #[test]
    fn non_finite_translation_is_detected() {
        let t = Transform3D::new(Vec3::new(f64::NAN, 0.0, 0.0), Quaternion::identity());
        assert!(!t.is_finite());
        assert!(Transform3D::identity().is_finite());
    }

    #[test]
    fn transform_serializes_as_nested_fields() {
        let t = Transform3D::identity();
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"translation\""));
        let back: Transform3D = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
