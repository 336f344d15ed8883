//! A single joint's angular constraint: a ball rotor, or a hinge (global or
//! local) with a rotation axis, a reference axis, and clockwise/
//! anti-clockwise angular limits.

use crate::vector::Vec3;
use fabrik_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const AXIS_PERPENDICULARITY_TOLERANCE: f64 = 0.01;

/// The angular constraint owned by a single [`crate::bone::Bone`].
///
/// `axis` and `reference_axis` on the hinge variants are always stored
/// normalised; constructing or mutating a hinge re-validates that they stay
/// perpendicular to within [`AXIS_PERPENDICULARITY_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Joint {
    /// A cone-shaped angular limit around a reference direction.
    Ball {
        /// Maximum angle from the reference direction, in degrees, `[0, 180]`.
        max_angle_deg: f64,
    },
    /// A hinge whose axes are expressed in world space.
    GlobalHinge {
        /// Rotation axis (unit length).
        axis: Vec3,
        /// Reference axis used to measure the signed angle (unit length,
        /// perpendicular to `axis`).
        reference_axis: Vec3,
        /// Clockwise angular limit, in degrees, `[0, 180]`.
        clockwise_deg: f64,
        /// Anti-clockwise angular limit, in degrees, `[0, 180]`.
        anticlockwise_deg: f64,
    },
    /// A hinge whose axes are expressed relative to the previous bone's
    /// direction (or, for a connected chain's basebone, the host bone's
    /// direction).
    LocalHinge {
        /// Rotation axis (unit length), in the local frame.
        axis: Vec3,
        /// Reference axis (unit length, perpendicular to `axis`), in the
        /// local frame.
        reference_axis: Vec3,
        /// Clockwise angular limit, in degrees, `[0, 180]`.
        clockwise_deg: f64,
        /// Anti-clockwise angular limit, in degrees, `[0, 180]`.
        anticlockwise_deg: f64,
    },
}

impl Default for Joint {
    /// An unconstrained ball joint (180 degree cone).
    fn default() -> Self {
        Self::Ball { max_angle_deg: 180.0 }
    }
}

impl Joint {
    /// Construct a ball (rotor) joint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `max_angle_deg` is outside
    /// `[0, 180]`.
    pub fn ball(max_angle_deg: f64) -> Result<Self> {
        validate_angle(max_angle_deg)?;
        Ok(Self::Ball { max_angle_deg })
    }

    /// Construct a hinge whose axes are expressed in world space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either axis is zero, the
    /// angles are outside `[0, 180]`, or the axes are not perpendicular to
    /// within tolerance.
    pub fn global_hinge(
        axis: Vec3,
        reference_axis: Vec3,
        clockwise_deg: f64,
        anticlockwise_deg: f64,
    ) -> Result<Self> {
        let (axis, reference_axis) = validate_hinge_axes(axis, reference_axis)?;
        validate_angle(clockwise_deg)?;
        validate_angle(anticlockwise_deg)?;
        Ok(Self::GlobalHinge { axis, reference_axis, clockwise_deg, anticlockwise_deg })
    }

    /// Construct a hinge whose axes are expressed relative to the previous
    /// bone's direction.
    ///
    /// # Errors
    ///
    /// Same as [`Joint::global_hinge`].
    pub fn local_hinge(
        axis: Vec3,
        reference_axis: Vec3,
        clockwise_deg: f64,
        anticlockwise_deg: f64,
    ) -> Result<Self> {
        let (axis, reference_axis) = validate_hinge_axes(axis, reference_axis)?;
        validate_angle(clockwise_deg)?;
        validate_angle(anticlockwise_deg)?;
        Ok(Self::LocalHinge { axis, reference_axis, clockwise_deg, anticlockwise_deg })
    }

    /// Is this a ball joint?
    #[must_use]
    pub const fn is_ball(&self) -> bool {
        matches!(self, Self::Ball { .. })
    }

    /// Is this a hinge joint (global or local)?
    #[must_use]
    pub const fn is_hinge(&self) -> bool {
        matches!(self, Self::GlobalHinge { .. } | Self::LocalHinge { .. })
    }

    /// Is this hinge unconstrained in rotation (both limits effectively
    /// 180 degrees, i.e. free to spin within its plane)?
    #[must_use]
    pub fn is_hinge_freely_rotating(&self) -> bool {
        match self {
            Self::GlobalHinge { clockwise_deg, anticlockwise_deg, .. }
            | Self::LocalHinge { clockwise_deg, anticlockwise_deg, .. } => {
                *clockwise_deg >= 179.999 && *anticlockwise_deg >= 179.999
            }
            Self::Ball { .. } => false,
        }
    }

    /// The ball joint's cone half-angle, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a hinge joint.
    pub fn max_angle_deg(&self) -> Result<f64> {
        match self {
            Self::Ball { max_angle_deg } => Ok(*max_angle_deg),
            _ => Err(wrong_kind("max_angle_deg is only defined for ball joints")),
        }
    }

    /// Set the ball joint's cone half-angle, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a hinge joint, or
    /// [`Error::InvalidArgument`] if `deg` is outside `[0, 180]`.
    pub fn set_max_angle_deg(&mut self, deg: f64) -> Result<()> {
        validate_angle(deg)?;
        match self {
            Self::Ball { max_angle_deg } => {
                *max_angle_deg = deg;
                Ok(())
            }
            _ => Err(wrong_kind("max_angle_deg is only defined for ball joints")),
        }
    }

    /// The hinge's rotation axis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a ball joint.
    pub fn axis(&self) -> Result<Vec3> {
        match self {
            Self::GlobalHinge { axis, .. } | Self::LocalHinge { axis, .. } => Ok(*axis),
            Self::Ball { .. } => Err(wrong_kind("axis is only defined for hinge joints")),
        }
    }

    /// The hinge's reference axis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a ball joint.
    pub fn reference_axis(&self) -> Result<Vec3> {
        match self {
            Self::GlobalHinge { reference_axis, .. } | Self::LocalHinge { reference_axis, .. } => {
                Ok(*reference_axis)
            }
            Self::Ball { .. } => Err(wrong_kind("reference_axis is only defined for hinge joints")),
        }
    }

    /// The hinge's clockwise and anti-clockwise limits, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a ball joint.
    pub fn hinge_limits_deg(&self) -> Result<(f64, f64)> {
        match self {
            Self::GlobalHinge { clockwise_deg, anticlockwise_deg, .. }
            | Self::LocalHinge { clockwise_deg, anticlockwise_deg, .. } => {
                Ok((*clockwise_deg, *anticlockwise_deg))
            }
            Self::Ball { .. } => Err(wrong_kind("hinge limits are only defined for hinge joints")),
        }
    }

    /// Set the hinge's clockwise and anti-clockwise limits, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a ball joint, or
    /// [`Error::InvalidArgument`] if either angle is outside `[0, 180]`.
    pub fn set_hinge_limits_deg(&mut self, clockwise_deg: f64, anticlockwise_deg: f64) -> Result<()> {
        validate_angle(clockwise_deg)?;
        validate_angle(anticlockwise_deg)?;
        match self {
            Self::GlobalHinge { clockwise_deg: cw, anticlockwise_deg: acw, .. }
            | Self::LocalHinge { clockwise_deg: cw, anticlockwise_deg: acw, .. } => {
                *cw = clockwise_deg;
                *acw = anticlockwise_deg;
                Ok(())
            }
            Self::Ball { .. } => Err(wrong_kind("hinge limits are only defined for hinge joints")),
        }
    }

    /// Set the hinge's axis and reference axis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if this is a ball joint, or
    /// [`Error::InvalidArgument`] if the axes are zero or not perpendicular.
    pub fn set_hinge_axes(&mut self, axis: Vec3, reference_axis: Vec3) -> Result<()> {
        let (axis, reference_axis) = validate_hinge_axes(axis, reference_axis)?;
        match self {
            Self::GlobalHinge { axis: a, reference_axis: r, .. }
            | Self::LocalHinge { axis: a, reference_axis: r, .. } => {
                *a = axis;
                *r = reference_axis;
                Ok(())
            }
            Self::Ball { .. } => Err(wrong_kind("axes are only defined for hinge joints")),
        }
    }
}

fn wrong_kind(message: &str) -> Error {
    Error::PreconditionFailed(message.to_string())
}

fn validate_angle(deg: f64) -> Result<()> {
    if !(0.0..=180.0).contains(&deg) {
        return Err(Error::InvalidArgument(format!(
            "constraint angle {deg} degrees is outside [0, 180]"
        )));
    }
    Ok(())
}

fn validate_hinge_axes(axis: Vec3, reference_axis: Vec3) -> Result<(Vec3, Vec3)> {
    if axis.length() == 0.0 {
        return Err(Error::InvalidArgument("hinge axis must be non-zero".to_string()));
    }
    if reference_axis.length() == 0.0 {
        return Err(Error::InvalidArgument(
            "hinge reference axis must be non-zero".to_string(),
        ));
    }
    let axis = axis.normalise();
    let reference_axis = reference_axis.normalise();
    if axis.scalar_product(reference_axis).abs() > AXIS_PERPENDICULARITY_TOLERANCE {
        return Err(Error::InvalidArgument(
            "hinge axis and reference axis must be perpendicular".to_string(),
        ));
    }
    Ok((axis, reference_axis))
}
