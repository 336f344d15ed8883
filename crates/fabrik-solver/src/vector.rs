//! 3-D vector algebra used throughout the solver.
//!
//! All angles entering or leaving this module are in degrees; radians only
//! ever appear inside trigonometric calls. All floating point values are
//! `f64` — the solver's correctness goals (bone length preservation to
//! within 1e-3 relative, sub-degree constraint clamping) need more headroom
//! than `f32` comfortably gives across a long chain of passes.

use fabrik_core::{Error, Result};
use std::ops::{Add, Div, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The default equality tolerance used throughout the solver.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// A 3-D vector of 64-bit floats.
///
/// Cheap to clone — every solver operation that conceptually "returns a new
/// vector" takes `self` by value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    /// Unit X vector.
    pub const X: Self = Self { x: 1.0, y: 0.0, z: 0.0 };
    /// Unit Y vector.
    pub const Y: Self = Self { x: 0.0, y: 1.0, z: 0.0 };
    /// Unit Z vector.
    pub const Z: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        self + other
    }

    /// Component-wise difference.
    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        self - other
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn times(self, scalar: f64) -> Self {
        self * scalar
    }

    /// Divide by a scalar.
    #[must_use]
    pub fn divided_by(self, scalar: f64) -> Self {
        self / scalar
    }

    /// Negate all components.
    #[must_use]
    pub fn negate(self) -> Self {
        -self
    }

    /// Length (magnitude) of the vector.
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Squared length, avoiding the `sqrt`.
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Normalise this vector to unit length.
    ///
    /// On a zero vector the contract is to return the vector unchanged
    /// (see the design notes on `normalise` of a zero vector) — callers
    /// that may feed in near-coincident points must re-check the result's
    /// length rather than assume it is `1.0`.
    #[must_use]
    pub fn normalise(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            self
        } else {
            self / len
        }
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(a: Self, b: Self) -> f64 {
        (a - b).length()
    }

    /// Approximate equality within `tolerance` on each axis independently.
    #[must_use]
    pub fn approx_equals(a: Self, b: Self, tolerance: f64) -> bool {
        (a.x - b.x).abs() <= tolerance
            && (a.y - b.y).abs() <= tolerance
            && (a.z - b.z).abs() <= tolerance
    }

    /// Raw (un-normalised) scalar product of two vectors.
    #[must_use]
    pub fn scalar_product(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Dot product of the *normalised* forms of `self` and `other`.
    ///
    /// This is the form used by [`angle_between_rad`] and the constraint
    /// clamps: it is the cosine of the angle between the two directions,
    /// regardless of either vector's original length.
    #[must_use]
    pub fn dot_product(self, other: Self) -> f64 {
        self.normalise().scalar_product(other.normalise())
    }

    /// Right-handed cross product. Not normalised.
    #[must_use]
    pub fn cross_product(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Unsigned angle between two directions, in `[0, pi]` radians.
    ///
    /// Inputs need not be normalised or non-antiparallel: the cosine is
    /// clamped to `[-1, 1]` before `acos` so floating point drift near
    /// parallel/antiparallel inputs never produces `NaN`.
    #[must_use]
    pub fn angle_between_rad(a: Self, b: Self) -> f64 {
        let cos_angle = a.dot_product(b).clamp(-1.0, 1.0);
        cos_angle.acos()
    }

    /// Unsigned angle between two directions, in `[0, 180]` degrees.
    #[must_use]
    pub fn angle_between_deg(a: Self, b: Self) -> f64 {
        Self::angle_between_rad(a, b).to_degrees()
    }

    /// Signed angle (in degrees, `(-180, 180]`) from `reference` to `other`
    /// about `normal`.
    #[must_use]
    pub fn signed_angle_deg(reference: Self, other: Self, normal: Self) -> f64 {
        let unsigned = Self::angle_between_deg(reference, other);
        let sign = Self::cross_product(reference, other).scalar_product(normal);
        if sign < 0.0 {
            -unsigned
        } else {
            unsigned
        }
    }

    /// Project `v` onto the plane whose normal is `n`, returning a unit
    /// vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `n` is the zero vector.
    pub fn project_onto_plane(v: Self, n: Self) -> Result<Self> {
        if n.length() == 0.0 {
            return Err(Error::InvalidArgument(
                "cannot project onto a plane with a zero normal".to_string(),
            ));
        }
        let n_hat = n.normalise();
        let v_hat = v.normalise();
        let projected = v_hat - n_hat * v_hat.scalar_product(n_hat);
        Ok(projected.normalise())
    }

    /// Rotate `v` about `axis` by `angle_rad` radians, using Rodrigues'
    /// rotation formula.
    ///
    /// `axis` need not be pre-normalised but must be non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `axis` is the zero vector.
    pub fn rotate_about_axis(v: Self, angle_rad: f64, axis: Self) -> Result<Self> {
        if axis.length() == 0.0 {
            return Err(Error::InvalidArgument(
                "cannot rotate about a zero axis".to_string(),
            ));
        }
        let k = axis.normalise();
        let cos_a = angle_rad.cos();
        let sin_a = angle_rad.sin();

        let term1 = v * cos_a;
        let term2 = k.cross_product(v) * sin_a;
        let term3 = k * (k.scalar_product(v) * (1.0 - cos_a));

        Ok(term1 + term2 + term3)
    }

    /// Quickly generate a vector perpendicular to `self` (assumed unit or
    /// near-unit length; the result is always normalised regardless).
    ///
    /// Used to auto-generate hinge reference axes: picks whichever of the
    /// two candidate perpendiculars avoids the numerically unstable case of
    /// `self` pointing (near-)parallel to the one it would otherwise use.
    #[must_use]
    pub fn gen_perpendicular_quick(self) -> Self {
        if self.y.abs() < 0.99 {
            Self::new(-self.z, 0.0, self.x).normalise()
        } else {
            Self::new(0.0, self.z, -self.y).normalise()
        }
    }

    /// Clamp `v_to_limit` to within `limit_deg` of `v_baseline`.
    ///
    /// If the angle between the two already satisfies the limit,
    /// `v_to_limit` is returned normalised unchanged. Otherwise `v_baseline`
    /// is rotated by exactly `limit_deg` toward `v_to_limit`, about their
    /// cross-product axis.
    #[must_use]
    pub fn angle_limited_unit_vector(v_to_limit: Self, v_baseline: Self, limit_deg: f64) -> Self {
        let candidate = v_to_limit.normalise();
        let baseline = v_baseline.normalise();
        let angle_deg = Self::angle_between_deg(baseline, candidate);

        if angle_deg <= limit_deg {
            return candidate;
        }

        let axis = baseline.cross_product(candidate);
        if axis.length() == 0.0 {
            // baseline and candidate are parallel/antiparallel: any
            // perpendicular axis works as a hinge for the rotation.
            let fallback_axis = baseline.gen_perpendicular_quick();
            return Self::rotate_about_axis(baseline, limit_deg.to_radians(), fallback_axis)
                .unwrap_or(baseline);
        }

        Self::rotate_about_axis(baseline, limit_deg.to_radians(), axis).unwrap_or(baseline)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_and_normalise() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        assert!((v.length() - 5.0).abs() < f64::EPSILON);
        let n = v.normalise();
        assert!((n.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalise_zero_vector_is_unchanged() {
        assert_eq!(Vec3::ZERO.normalise(), Vec3::ZERO);
    }

    #[test]
    fn cross_product_right_handed() {
        let z = Vec3::X.cross_product(Vec3::Y);
        assert!(Vec3::approx_equals(z, Vec3::Z, 1e-9));
    }

    #[test]
    fn angle_between_handles_antiparallel_without_nan() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(-1.0, 0.0, 0.0);
        let angle = Vec3::angle_between_rad(a, b);
        assert!(!angle.is_nan());
        assert!((angle - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn signed_angle_sign_flips_with_direction() {
        let reference = Vec3::X;
        let normal = Vec3::Z;
        let ccw = Vec3::new(0.0, 1.0, 0.0);
        let cw = Vec3::new(0.0, -1.0, 0.0);
        assert!(Vec3::signed_angle_deg(reference, ccw, normal) > 0.0);
        assert!(Vec3::signed_angle_deg(reference, cw, normal) < 0.0);
    }

    #[test]
    fn project_onto_plane_removes_normal_component() {
        let v = Vec3::new(1.0, 1.0, 0.0);
        let projected = Vec3::project_onto_plane(v, Vec3::Y).unwrap();
        assert!(projected.y.abs() < 1e-9);
    }

    #[test]
    fn project_onto_plane_rejects_zero_normal() {
        assert!(Vec3::project_onto_plane(Vec3::X, Vec3::ZERO).is_err());
    }

    #[test]
    fn rotate_about_axis_quarter_turn() {
        let rotated = Vec3::rotate_about_axis(Vec3::X, std::f64::consts::FRAC_PI_2, Vec3::Z)
            .unwrap();
        assert!(Vec3::approx_equals(rotated, Vec3::Y, 1e-9));
    }

    #[test]
    fn rotate_about_axis_rejects_zero_axis() {
        assert!(Vec3::rotate_about_axis(Vec3::X, 1.0, Vec3::ZERO).is_err());
    }

    #[test]
    fn gen_perpendicular_quick_is_orthogonal() {
        for v in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 1.0, 1.0)] {
            let u = v.normalise();
            let perp = u.gen_perpendicular_quick();
            assert!(u.scalar_product(perp).abs() < 1e-9);
            assert!((perp.length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn angle_limited_unit_vector_passes_through_when_within_limit() {
        let baseline = Vec3::X;
        let candidate = Vec3::new(1.0, 0.05, 0.0);
        let limited = Vec3::angle_limited_unit_vector(candidate, baseline, 45.0);
        assert!(Vec3::approx_equals(limited, candidate.normalise(), 1e-9));
    }

    #[test]
    fn angle_limited_unit_vector_clamps_when_exceeding_limit() {
        let baseline = Vec3::X;
        let candidate = Vec3::Y;
        let limited = Vec3::angle_limited_unit_vector(candidate, baseline, 30.0);
        let angle = Vec3::angle_between_deg(baseline, limited);
        assert!((angle - 30.0).abs() < 1e-6);
    }
}
