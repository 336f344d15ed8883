//! A single rigid link in a [`crate::chain::Chain`]: a start point, an end
//! point, a frozen length, and the joint constraining its direction.

use crate::joint::Joint;
use crate::vector::Vec3;
use fabrik_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which endpoint of a [`Bone`] a connected chain attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionPoint {
    /// Attach at the host bone's start.
    Start,
    /// Attach at the host bone's end.
    End,
}

/// A rigid link between two points.
///
/// `length` is fixed at construction time from the initial `start`/`end`
/// separation: every solver pass moves `start` and `end` but never stretches
/// or shrinks the bone. [`Bone::live_length`] recomputes the current
/// endpoint separation so callers can assert it stayed within tolerance of
/// `length`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bone {
    start: Vec3,
    end: Vec3,
    length: f64,
    joint: Joint,
}

impl Bone {
    /// Construct a bone from its endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Degenerate`] if `start` and `end` coincide (a
    /// zero-length bone has no direction to constrain).
    pub fn new(start: Vec3, end: Vec3) -> Result<Self> {
        let length = Vec3::distance(start, end);
        if length == 0.0 {
            return Err(Error::Degenerate(
                "bone start and end points coincide".to_string(),
            ));
        }
        Ok(Self {
            start,
            end,
            length,
            joint: Joint::default(),
        })
    }

    /// Construct a bone from a start point, a direction, and a length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Degenerate`] if `direction` is the zero vector or
    /// `length` is not strictly positive.
    pub fn from_direction(start: Vec3, direction: Vec3, length: f64) -> Result<Self> {
        if direction.length() == 0.0 {
            return Err(Error::Degenerate(
                "bone direction must be non-zero".to_string(),
            ));
        }
        if length <= 0.0 {
            return Err(Error::Degenerate(
                "bone length must be strictly positive".to_string(),
            ));
        }
        let end = start + direction.normalise() * length;
        Ok(Self {
            start,
            end,
            length,
            joint: Joint::default(),
        })
    }

    /// Attach a joint to this bone, replacing its default unconstrained
    /// ball joint.
    #[must_use]
    pub fn with_joint(mut self, joint: Joint) -> Self {
        self.joint = joint;
        self
    }

    /// The bone's start point.
    #[must_use]
    pub fn start(&self) -> Vec3 {
        self.start
    }

    /// The bone's end point.
    #[must_use]
    pub fn end(&self) -> Vec3 {
        self.end
    }

    /// Move the start point without touching `end` or `length`. Used by the
    /// solver passes; callers outside the solver should not normally need
    /// this.
    pub fn set_start(&mut self, start: Vec3) {
        self.start = start;
    }

    /// Move the end point without touching `start` or `length`.
    pub fn set_end(&mut self, end: Vec3) {
        self.end = end;
    }

    /// The bone's fixed length, set once at construction.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The current endpoint separation. Should stay within
    /// [`crate::vector::DEFAULT_TOLERANCE`] of [`Bone::length`] after every
    /// solver pass; a larger drift indicates a bug in the pass that moved
    /// this bone's endpoints independently.
    #[must_use]
    pub fn live_length(&self) -> f64 {
        Vec3::distance(self.start, self.end)
    }

    /// The unit direction from `start` to `end`.
    ///
    /// Returns [`Vec3::ZERO`] if the endpoints currently coincide (this can
    /// only happen transiently mid-solve on a bug; a bone's length is
    /// otherwise frozen at construction and never zero).
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalise()
    }

    /// This bone's joint.
    #[must_use]
    pub fn joint(&self) -> &Joint {
        &self.joint
    }

    /// Mutable access to this bone's joint, for in-place limit updates.
    pub fn joint_mut(&mut self) -> &mut Joint {
        &mut self.joint
    }

    /// Replace this bone's joint outright.
    pub fn set_joint(&mut self, joint: Joint) {
        self.joint = joint;
    }
}
