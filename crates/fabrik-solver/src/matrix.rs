//! A minimal 3x3 rotation matrix, used only to build the change-of-basis
//! frames that local-hinge constraints need.

use crate::vector::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 3x3 matrix stored as three column basis vectors.
///
/// This is intentionally not a general-purpose linear algebra type — it
/// exists to carry the orthonormal frame built by
/// [`Mat3::create_rotation_matrix`] and to multiply direction vectors into
/// that frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mat3 {
    /// X basis column.
    pub x_basis: Vec3,
    /// Y basis column.
    pub y_basis: Vec3,
    /// Z basis column.
    pub z_basis: Vec3,
}

impl Mat3 {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        x_basis: Vec3::X,
        y_basis: Vec3::Y,
        z_basis: Vec3::Z,
    };

    /// Build a matrix from three column basis vectors.
    #[must_use]
    pub const fn from_columns(x_basis: Vec3, y_basis: Vec3, z_basis: Vec3) -> Self {
        Self { x_basis, y_basis, z_basis }
    }

    /// Build an orthonormal right-handed frame whose Z basis equals
    /// `reference_dir` (normalised).
    ///
    /// World-up `(0, 1, 0)` is used to derive the X basis via a cross
    /// product; when `reference_dir` is itself near-parallel to world-up
    /// (`|reference_dir.y| > 0.9999`, the singular case where that cross
    /// product degenerates) world-X is used directly as the X basis
    /// instead.
    #[must_use]
    pub fn create_rotation_matrix(reference_dir: Vec3) -> Self {
        let z = reference_dir.normalise();
        let x = if reference_dir.y.abs() > 0.9999 {
            Vec3::X
        } else {
            Vec3::Y.cross_product(z).normalise()
        };
        let y = z.cross_product(x).normalise();
        Self::from_columns(x, y, z)
    }

    /// Multiply this matrix by a column vector.
    #[must_use]
    pub fn mul_vec3(self, v: Vec3) -> Vec3 {
        self.x_basis * v.x + self.y_basis * v.y + self.z_basis * v.z
    }
}
