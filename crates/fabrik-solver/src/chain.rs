//! An ordered chain of bones, solved end-to-end by the forward-and-backward
//! reaching algorithm.

use crate::bone::{Bone, ConnectionPoint};
use crate::joint::Joint;
use crate::matrix::Mat3;
use crate::vector::{Vec3, DEFAULT_TOLERANCE};
use fabrik_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default success threshold for [`Chain::solve_for_target`].
pub const DEFAULT_SOLVE_DISTANCE_THRESHOLD: f64 = 1.0;
/// Default upper bound on FABRIK passes per solve.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
/// Default stall threshold on per-pass distance improvement.
pub const DEFAULT_MIN_ITERATION_CHANGE: f64 = 0.01;

const FREELY_ROTATING_THRESHOLD_DEG: f64 = 179.999;

/// The chain-level constraint applied to the basebone in addition to its
/// own [`Joint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BaseboneConstraintType {
    /// No extra constraint beyond the basebone's own joint.
    #[default]
    None,
    /// Constrain the basebone's direction within its own `max_angle_deg` of
    /// a world-space reference direction.
    GlobalRotor,
    /// Constrain the basebone's direction within its own `max_angle_deg` of
    /// a direction expressed relative to a connected chain's host bone.
    LocalRotor,
    /// Constrain the basebone to a hinge plane and angular range expressed
    /// in world space.
    GlobalHinge,
    /// Constrain the basebone to a hinge plane and angular range expressed
    /// relative to a connected chain's host bone.
    LocalHinge,
}

/// An ordered sequence of bones solved together by FABRIK.
///
/// The basebone (`bones[0]`) carries both its own [`Joint`] and, optionally,
/// an additional chain-level [`BaseboneConstraintType`] applied only during
/// the backward pass. A chain may be free-standing (`fixed_base_pos` is
/// authored directly) or the dependent half of a [`crate::structure::Structure`]
/// connection, in which case its base position and any `Local*` constraint
/// vectors are recomputed by the structure before every solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chain {
    name: String,
    bones: Vec<Bone>,
    base_constraint: BaseboneConstraintType,
    base_constraint_uv: Vec3,
    base_rel_constraint_uv: Vec3,
    base_rel_ref_constraint_uv: Vec3,
    fixed_base_pos: Vec3,
    fixed_base: bool,
    solve_distance_threshold: f64,
    max_iterations: u32,
    min_iteration_change: f64,
    last_target: Option<Vec3>,
    last_base: Option<Vec3>,
    current_solve_distance: f64,
    chain_length: f64,
    connected_chain_idx: Option<usize>,
    connected_bone_idx: Option<usize>,
    connected_point: Option<ConnectionPoint>,
    use_embedded_target: bool,
    embedded_target: Vec3,
}

impl Chain {
    /// Construct an empty chain with default solve policy: threshold `1.0`,
    /// `20` max iterations, `0.01` stall change, fixed base, no basebone
    /// constraint.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
            base_constraint: BaseboneConstraintType::None,
            base_constraint_uv: Vec3::ZERO,
            base_rel_constraint_uv: Vec3::ZERO,
            base_rel_ref_constraint_uv: Vec3::ZERO,
            fixed_base_pos: Vec3::ZERO,
            fixed_base: true,
            solve_distance_threshold: DEFAULT_SOLVE_DISTANCE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_iteration_change: DEFAULT_MIN_ITERATION_CHANGE,
            last_target: None,
            last_base: None,
            current_solve_distance: 0.0,
            chain_length: 0.0,
            connected_chain_idx: None,
            connected_bone_idx: None,
            connected_point: None,
            use_embedded_target: false,
            embedded_target: Vec3::ZERO,
        }
    }

    // ---- construction / editing ----------------------------------------

    /// Append a fully-formed bone. If the chain is non-empty the bone is
    /// re-anchored so its start sits at the current tip, preserving its own
    /// direction and length. The first bone appended becomes the basebone
    /// and seeds `base_constraint_uv` / `fixed_base_pos` from its initial
    /// direction and start point.
    pub fn add_bone(&mut self, bone: Bone) {
        let length = bone.length();
        if self.bones.is_empty() {
            self.base_constraint_uv = bone.direction();
            self.base_rel_constraint_uv = bone.direction();
            if let Joint::LocalHinge { reference_axis, .. } | Joint::GlobalHinge { reference_axis, .. } =
                bone.joint()
            {
                self.base_rel_ref_constraint_uv = *reference_axis;
            }
            self.fixed_base_pos = bone.start();
            self.bones.push(bone);
        } else {
            let tip = self.bones[self.bones.len() - 1].end();
            let direction = bone.direction();
            let mut re_anchored = bone;
            re_anchored.set_start(tip);
            re_anchored.set_end(tip + direction * length);
            self.bones.push(re_anchored);
        }
        self.chain_length += length;
    }

    /// Append a new bone running `direction` for `length` from the current
    /// tip, carrying `joint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if the chain is empty (there is
    /// no tip to extend from — use [`Chain::add_bone`] for the first bone).
    /// Propagates [`Error::Degenerate`] from [`Bone::from_direction`].
    pub fn add_consecutive_bone(&mut self, direction: Vec3, length: f64, joint: Joint) -> Result<()> {
        let tip = self
            .bones
            .last()
            .ok_or_else(|| {
                Error::PreconditionFailed(
                    "cannot add a consecutive bone to an empty chain".to_string(),
                )
            })?
            .end();
        let bone = Bone::from_direction(tip, direction, length)?.with_joint(joint);
        self.chain_length += bone.length();
        self.bones.push(bone);
        Ok(())
    }

    /// Remove the bone at `index`, updating `chain_length`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `index` is out of range.
    pub fn remove_bone(&mut self, index: usize) -> Result<()> {
        if index >= self.bones.len() {
            return Err(Error::NotFound(format!("bone index {index} out of range")));
        }
        let removed = self.bones.remove(index);
        self.chain_length -= removed.length();
        Ok(())
    }

    // ---- policy surface --------------------------------------------------

    /// Set the success threshold for early exit from a solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `threshold` is negative.
    pub fn set_solve_distance_threshold(&mut self, threshold: f64) -> Result<()> {
        if threshold < 0.0 {
            return Err(Error::InvalidArgument(
                "solve_distance_threshold must be non-negative".to_string(),
            ));
        }
        self.solve_distance_threshold = threshold;
        Ok(())
    }

    /// Set the upper bound on FABRIK passes per solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `max_iterations` is zero.
    pub fn set_max_iterations(&mut self, max_iterations: u32) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::InvalidArgument(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    /// Set the stall criterion on per-pass distance improvement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `min_change` is negative.
    pub fn set_min_iteration_change(&mut self, min_change: f64) -> Result<()> {
        if min_change < 0.0 {
            return Err(Error::InvalidArgument(
                "min_iteration_change must be non-negative".to_string(),
            ));
        }
        self.min_iteration_change = min_change;
        Ok(())
    }

    /// Pin or release the basebone's start position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateConflict`] when releasing (`false`) a chain
    /// that is connected to a host, or one whose basebone constraint is
    /// `GlobalRotor`/`GlobalHinge`.
    pub fn set_fixed_base(&mut self, fixed_base: bool) -> Result<()> {
        if !fixed_base {
            if self.connected_chain_idx.is_some() {
                return Err(Error::StateConflict(
                    "cannot release the base of a chain connected to a host".to_string(),
                ));
            }
            if matches!(
                self.base_constraint,
                BaseboneConstraintType::GlobalRotor | BaseboneConstraintType::GlobalHinge
            ) {
                return Err(Error::StateConflict(
                    "cannot release the base while a global basebone constraint is active"
                        .to_string(),
                ));
            }
        }
        self.fixed_base = fixed_base;
        Ok(())
    }

    /// Set the pinned base position used when `fixed_base` is true and the
    /// chain is not connected to a host.
    pub fn set_fixed_base_position(&mut self, position: Vec3) {
        self.fixed_base_pos = position;
    }

    /// Set the chain-level basebone constraint kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateConflict`] if switching to `GlobalRotor` or
    /// `GlobalHinge` while the base is not fixed.
    pub fn set_basebone_constraint_type(&mut self, constraint_type: BaseboneConstraintType) -> Result<()> {
        let requires_fixed_base = matches!(
            constraint_type,
            BaseboneConstraintType::GlobalRotor | BaseboneConstraintType::GlobalHinge
        );
        if requires_fixed_base && !self.fixed_base {
            return Err(Error::StateConflict(
                "global basebone constraints require a fixed base".to_string(),
            ));
        }
        self.base_constraint = constraint_type;
        Ok(())
    }

    /// Set the world-space reference direction used by `GlobalRotor`/
    /// `LocalRotor` and as the un-rotated frame for `GlobalHinge`'s
    /// singularity handling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `uv` is the zero vector.
    pub fn set_basebone_constraint_uv(&mut self, uv: Vec3) -> Result<()> {
        if uv.length() == 0.0 {
            return Err(Error::InvalidArgument(
                "basebone constraint direction must be non-zero".to_string(),
            ));
        }
        self.base_constraint_uv = uv.normalise();
        Ok(())
    }

    /// Enable or disable use of the chain's stored embedded target in place
    /// of the argument to [`Chain::solve_for_target`].
    pub fn set_use_embedded_target(&mut self, use_embedded_target: bool) {
        self.use_embedded_target = use_embedded_target;
    }

    /// Set the stored embedded target.
    pub fn set_embedded_target(&mut self, target: Vec3) {
        self.embedded_target = target;
    }

    // ---- solving ----------------------------------------------------------

    /// Solve this chain's bone positions so the effector approaches
    /// `target`, running at most `max_iterations` forward/backward pass
    /// pairs. Returns the best (smallest) effector-to-target distance
    /// achieved. If `target` and the current base position both match the
    /// previous call's within [`DEFAULT_TOLERANCE`], the cached distance is
    /// returned without doing any work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if the chain has no bones.
    /// Propagates joint-kind and geometry errors raised mid-pass (these
    /// indicate a misconfigured chain — a correctly constructed one never
    /// triggers them).
    pub fn solve_for_target(&mut self, target: Vec3) -> Result<f64> {
        if self.bones.is_empty() {
            return Err(Error::PreconditionFailed(
                "cannot solve a chain with no bones".to_string(),
            ));
        }

        let base = self.bones[0].start();
        if let (Some(last_target), Some(last_base)) = (self.last_target, self.last_base) {
            if Vec3::approx_equals(target, last_target, DEFAULT_TOLERANCE)
                && Vec3::approx_equals(base, last_base, DEFAULT_TOLERANCE)
            {
                tracing::trace!(chain = %self.name, "solve skipped: target and base unchanged");
                return Ok(self.current_solve_distance);
            }
        }

        tracing::debug!(chain = %self.name, bones = self.bones.len(), "solve started");

        let mut best_distance = f64::INFINITY;
        let mut best_config = self.bones.clone();
        let mut last_pass_distance = f64::INFINITY;
        let mut iterations_run = 0;

        for _ in 0..self.max_iterations {
            self.forward_pass(target)?;
            self.backward_pass()?;
            iterations_run += 1;

            let effector = self.bones[self.bones.len() - 1].end();
            let distance = Vec3::distance(effector, target);
            tracing::trace!(chain = %self.name, iteration = iterations_run, distance, "pass complete");

            if distance < best_distance {
                best_distance = distance;
                best_config = self.bones.clone();
            }

            if distance <= self.solve_distance_threshold {
                tracing::debug!(chain = %self.name, iterations_run, distance, "solve succeeded");
                break;
            }

            if (distance - last_pass_distance).abs() < self.min_iteration_change {
                tracing::debug!(chain = %self.name, iterations_run, distance, "solve stalled");
                break;
            }

            last_pass_distance = distance;
        }

        if iterations_run == self.max_iterations && best_distance > self.solve_distance_threshold {
            tracing::warn!(
                chain = %self.name,
                max_iterations = self.max_iterations,
                best_distance,
                "solve reached iteration cap without meeting threshold"
            );
        }

        self.bones = best_config;
        self.last_target = Some(target);
        self.last_base = Some(self.bones[0].start());
        self.current_solve_distance = best_distance;

        Ok(best_distance)
    }

    /// Solve using the stored embedded target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if `use_embedded_target` is
    /// false, or as per [`Chain::solve_for_target`].
    pub fn solve_using_embedded_target(&mut self) -> Result<f64> {
        if !self.use_embedded_target {
            return Err(Error::PreconditionFailed(
                "chain is not configured to use an embedded target".to_string(),
            ));
        }
        self.solve_for_target(self.embedded_target)
    }

    fn local_hinge_relative_axis(&self, i: usize, axis: Vec3) -> Vec3 {
        if i > 0 {
            let m = Mat3::create_rotation_matrix(self.bones[i - 1].direction());
            m.mul_vec3(axis).normalise()
        } else {
            self.base_rel_constraint_uv
        }
    }

    fn forward_pass(&mut self, target: Vec3) -> Result<()> {
        let n = self.bones.len();
        let tip_index = n - 1;
        self.bones[tip_index].set_end(target);

        for i in (0..n).rev() {
            let length = self.bones[i].length();
            let joint = *self.bones[i].joint();

            let mut u = if i == tip_index {
                (self.bones[i].start() - self.bones[i].end()).normalise()
            } else {
                let outer = -self.bones[i + 1].direction();
                let base = -self.bones[i].direction();
                match joint {
                    Joint::Ball { max_angle_deg } => {
                        if Vec3::angle_between_deg(outer, base) > max_angle_deg {
                            Vec3::angle_limited_unit_vector(base, outer, max_angle_deg)
                        } else {
                            base
                        }
                    }
                    _ => base,
                }
            };

            u = match joint {
                Joint::Ball { .. } => u,
                Joint::GlobalHinge { axis, .. } => Vec3::project_onto_plane(u, axis)?,
                Joint::LocalHinge { axis, .. } => {
                    let relative_axis = self.local_hinge_relative_axis(i, axis);
                    Vec3::project_onto_plane(u, relative_axis)?
                }
            };

            let new_start = self.bones[i].end() + u * length;
            self.bones[i].set_start(new_start);
            if i > 0 {
                self.bones[i - 1].set_end(new_start);
            }
        }
        Ok(())
    }

    fn backward_pass(&mut self) -> Result<()> {
        let n = self.bones.len();

        let base_length = self.bones[0].length();
        let new_base_start = if self.fixed_base {
            self.fixed_base_pos
        } else {
            self.bones[0].end() - self.bones[0].direction() * base_length
        };
        self.bones[0].set_start(new_base_start);

        let base_joint = *self.bones[0].joint();
        let base_direction = self.bones[0].direction();
        let constrained = match self.base_constraint {
            BaseboneConstraintType::None => base_direction,
            BaseboneConstraintType::GlobalRotor => {
                let max_angle = base_joint.max_angle_deg()?;
                Vec3::angle_limited_unit_vector(base_direction, self.base_constraint_uv, max_angle)
            }
            BaseboneConstraintType::LocalRotor => {
                let max_angle = base_joint.max_angle_deg()?;
                Vec3::angle_limited_unit_vector(base_direction, self.base_rel_constraint_uv, max_angle)
            }
            BaseboneConstraintType::GlobalHinge => {
                let axis = base_joint.axis()?;
                let reference_axis = base_joint.reference_axis()?;
                let (cw, acw) = base_joint.hinge_limits_deg()?;
                clamp_hinge(base_direction, axis, reference_axis, cw, acw)?
            }
            BaseboneConstraintType::LocalHinge => {
                let (cw, acw) = base_joint.hinge_limits_deg()?;
                clamp_hinge(
                    base_direction,
                    self.base_rel_constraint_uv,
                    self.base_rel_ref_constraint_uv,
                    cw,
                    acw,
                )?
            }
        };
        let new_base_end = self.bones[0].start() + constrained * base_length;
        self.bones[0].set_end(new_base_end);
        if n > 1 {
            self.bones[1].set_start(new_base_end);
        }

        for i in 1..n {
            let length = self.bones[i].length();
            let joint = *self.bones[i].joint();
            let u_prev = self.bones[i - 1].direction();
            let u = self.bones[i].direction();

            let constrained = match joint {
                Joint::Ball { max_angle_deg } => {
                    if Vec3::angle_between_deg(u_prev, u) > max_angle_deg {
                        Vec3::angle_limited_unit_vector(u, u_prev, max_angle_deg)
                    } else {
                        u
                    }
                }
                Joint::GlobalHinge { axis, reference_axis, clockwise_deg, anticlockwise_deg } => {
                    clamp_hinge(u, axis, reference_axis, clockwise_deg, anticlockwise_deg)?
                }
                Joint::LocalHinge { axis, reference_axis, clockwise_deg, anticlockwise_deg } => {
                    let m = Mat3::create_rotation_matrix(u_prev);
                    let rel_axis = m.mul_vec3(axis).normalise();
                    let rel_ref = m.mul_vec3(reference_axis).normalise();
                    clamp_hinge(u, rel_axis, rel_ref, clockwise_deg, anticlockwise_deg)?
                }
            };

            let new_end = self.bones[i].start() + constrained * length;
            self.bones[i].set_end(new_end);
            if i + 1 < n {
                self.bones[i + 1].set_start(new_end);
            }
        }
        Ok(())
    }

    // ---- observation --------------------------------------------------

    /// This chain's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All bones, in order from base to tip.
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// The bone at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `index` is out of range.
    pub fn bone(&self, index: usize) -> Result<&Bone> {
        self.bones
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("bone index {index} out of range")))
    }

    /// Number of bones in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether the chain has no bones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Sum of all bone lengths.
    #[must_use]
    pub fn chain_length(&self) -> f64 {
        self.chain_length
    }

    /// The tip position of the last bone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if the chain has no bones.
    pub fn effector_position(&self) -> Result<Vec3> {
        self.bones
            .last()
            .map(Bone::end)
            .ok_or_else(|| Error::PreconditionFailed("empty chain has no effector".to_string()))
    }

    /// The best effector-to-target distance from the most recent solve.
    #[must_use]
    pub fn current_solve_distance(&self) -> f64 {
        self.current_solve_distance
    }

    /// Whether the basebone's start is currently pinned.
    #[must_use]
    pub fn is_fixed_base(&self) -> bool {
        self.fixed_base
    }

    /// The position the basebone's start is pinned to, when not connected.
    #[must_use]
    pub fn fixed_base_position(&self) -> Vec3 {
        self.fixed_base_pos
    }

    /// The chain-level basebone constraint kind.
    #[must_use]
    pub fn base_constraint_type(&self) -> BaseboneConstraintType {
        self.base_constraint
    }

    /// The basebone's configured constraint direction: the world-space
    /// reference for `GlobalRotor`/`LocalRotor`, or the un-rotated frame used
    /// by `GlobalHinge`'s singularity handling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if `base_constraint_type()` is
    /// `BaseboneConstraintType::None` — there is no constraint direction to
    /// read when no basebone constraint is configured.
    pub fn basebone_constraint_uv(&self) -> Result<Vec3> {
        if self.base_constraint == BaseboneConstraintType::None {
            return Err(Error::PreconditionFailed(
                "basebone constraint UV is undefined when base_constraint is None".to_string(),
            ));
        }
        Ok(self.base_constraint_uv)
    }

    /// `(host_chain_index, host_bone_index)` if this chain is connected to
    /// another chain's bone.
    #[must_use]
    pub fn connection(&self) -> Option<(usize, usize)> {
        match (self.connected_chain_idx, self.connected_bone_idx) {
            (Some(chain_idx), Some(bone_idx)) => Some((chain_idx, bone_idx)),
            _ => None,
        }
    }

    /// Which endpoint of the host bone this chain's base attaches to, if
    /// connected.
    #[must_use]
    pub fn connection_point(&self) -> Option<ConnectionPoint> {
        self.connected_point
    }

    // ---- structure-internal hooks --------------------------------------

    pub(crate) fn set_connection(
        &mut self,
        host_chain_idx: usize,
        host_bone_idx: usize,
        connection_point: ConnectionPoint,
    ) {
        self.connected_chain_idx = Some(host_chain_idx);
        self.connected_bone_idx = Some(host_bone_idx);
        self.connected_point = Some(connection_point);
    }

    pub(crate) fn set_base_position(&mut self, position: Vec3) {
        self.fixed_base_pos = position;
        if let Some(basebone) = self.bones.first_mut() {
            basebone.set_start(position);
        }
    }

    pub(crate) fn set_base_rel_constraint_uv(&mut self, uv: Vec3) {
        self.base_rel_constraint_uv = uv;
    }

    pub(crate) fn set_base_rel_ref_constraint_uv(&mut self, uv: Vec3) {
        self.base_rel_ref_constraint_uv = uv;
    }

    pub(crate) fn basebone_joint(&self) -> Option<Joint> {
        self.bones.first().map(Bone::joint).copied()
    }

    pub(crate) fn base_constraint_uv(&self) -> Vec3 {
        self.base_constraint_uv
    }

    pub(crate) fn translate(&mut self, offset: Vec3) {
        for bone in &mut self.bones {
            bone.set_start(bone.start() + offset);
            bone.set_end(bone.end() + offset);
        }
        self.fixed_base_pos = self.fixed_base_pos + offset;
    }

    pub(crate) fn use_embedded_target(&self) -> bool {
        self.use_embedded_target
    }

    pub(crate) fn embedded_target(&self) -> Vec3 {
        self.embedded_target
    }
}

fn clamp_hinge(
    direction: Vec3,
    axis: Vec3,
    reference_axis: Vec3,
    clockwise_deg: f64,
    anticlockwise_deg: f64,
) -> Result<Vec3> {
    let projected = Vec3::project_onto_plane(direction, axis)?;
    if clockwise_deg >= FREELY_ROTATING_THRESHOLD_DEG && anticlockwise_deg >= FREELY_ROTATING_THRESHOLD_DEG {
        return Ok(projected);
    }
    let signed = Vec3::signed_angle_deg(reference_axis, projected, axis);
    let clamped = signed.clamp(-clockwise_deg, anticlockwise_deg);
    Vec3::rotate_about_axis(reference_axis, clamped.to_radians(), axis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconstrained_chain(name: &str, base: Vec3, direction: Vec3, bone_count: usize) -> Chain {
        let mut chain = Chain::new(name);
        let unit_length = 1.0;
        chain.add_bone(Bone::from_direction(base, direction, unit_length).unwrap());
        for _ in 1..bone_count {
            chain
                .add_consecutive_bone(direction, unit_length, Joint::default())
                .unwrap();
        }
        chain
    }

    #[test]
    fn reachable_target_aligns_colinear() {
        let mut chain = unconstrained_chain("arm", Vec3::ZERO, Vec3::Y, 3);
        let distance = chain.solve_for_target(Vec3::new(3.0, 0.0, 0.0)).unwrap();
        assert!(distance < 0.001);
        assert!(Vec3::approx_equals(chain.bones()[0].start(), Vec3::ZERO, 1e-6));
        for window in chain.bones().windows(2) {
            let angle = Vec3::angle_between_deg(window[0].direction(), window[1].direction());
            assert!(angle < 1e-3);
        }
    }

    #[test]
    fn unreachable_target_stretches_colinear() {
        let mut chain = unconstrained_chain("arm", Vec3::ZERO, Vec3::Y, 3);
        let distance = chain.solve_for_target(Vec3::new(0.0, 10.0, 0.0)).unwrap();
        assert!((distance - 7.0).abs() < 0.01);
        let effector = chain.effector_position().unwrap();
        assert!(Vec3::approx_equals(effector, Vec3::new(0.0, 3.0, 0.0), 1e-3));
    }

    #[test]
    fn ball_constraint_bounds_adjacent_angles() {
        let mut chain = Chain::new("arm");
        chain.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::X, 1.0).unwrap());
        for _ in 0..2 {
            chain
                .add_consecutive_bone(Vec3::X, 1.0, Joint::ball(45.0).unwrap())
                .unwrap();
        }
        chain.set_max_iterations(200).unwrap();
        chain.solve_for_target(Vec3::new(2.0, 2.0, 0.0)).unwrap();
        for window in chain.bones().windows(2) {
            let angle = Vec3::angle_between_deg(window[0].direction(), window[1].direction());
            assert!(angle <= 45.5);
        }
    }

    #[test]
    fn global_hinge_stays_in_plane_and_range() {
        let mut chain = Chain::new("arm");
        chain.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::X, 1.0).unwrap());
        chain
            .add_consecutive_bone(
                Vec3::X,
                1.0,
                Joint::global_hinge(Vec3::Y, Vec3::X, 90.0, 90.0).unwrap(),
            )
            .unwrap();

        for target in [Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0)] {
            chain.solve_for_target(target).unwrap();
            let direction = chain.bones()[1].direction();
            assert!(direction.scalar_product(Vec3::Y).abs() < 1e-3);
            let signed = Vec3::signed_angle_deg(Vec3::X, direction, Vec3::Y);
            assert!((-90.0..=90.0).contains(&signed));
        }
    }

    #[test]
    fn fully_locked_joint_stalls_within_iteration_cap() {
        let mut chain = Chain::new("arm");
        chain.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::X, 1.0).unwrap());
        chain
            .add_consecutive_bone(Vec3::X, 1.0, Joint::ball(0.0).unwrap())
            .unwrap();

        let distance = chain.solve_for_target(Vec3::new(10.0, 10.0, 10.0)).unwrap();
        let base = chain.bones()[0].start();
        let expected = Vec3::distance(base, Vec3::new(10.0, 10.0, 10.0)) - chain.chain_length();
        assert!((distance - expected).abs() < 1e-3);
        for window in chain.bones().windows(2) {
            let angle = Vec3::angle_between_deg(window[0].direction(), window[1].direction());
            assert!(angle < 1e-3);
        }
    }

    #[test]
    fn solve_is_idempotent_on_repeated_identical_target() {
        let mut chain = unconstrained_chain("arm", Vec3::ZERO, Vec3::Y, 3);
        let target = Vec3::new(2.0, 1.0, 0.0);
        let first = chain.solve_for_target(target).unwrap();
        let snapshot = chain.bones().to_vec();
        let second = chain.solve_for_target(target).unwrap();
        assert_eq!(first, second);
        assert_eq!(chain.bones(), snapshot.as_slice());
    }

    #[test]
    fn add_consecutive_bone_on_empty_chain_fails() {
        let mut chain = Chain::new("arm");
        let result = chain.add_consecutive_bone(Vec3::X, 1.0, Joint::default());
        assert!(matches!(result, Err(Error::PreconditionFailed(_))));
    }

    #[test]
    fn solving_empty_chain_fails() {
        let mut chain = Chain::new("arm");
        assert!(matches!(
            chain.solve_for_target(Vec3::X),
            Err(Error::PreconditionFailed(_))
        ));
    }

    #[test]
    fn set_fixed_base_false_on_connected_chain_fails() {
        let mut chain = unconstrained_chain("dependent", Vec3::ZERO, Vec3::X, 1);
        chain.set_connection(0, 0, ConnectionPoint::End);
        assert!(matches!(chain.set_fixed_base(false), Err(Error::StateConflict(_))));
    }

    #[test]
    fn set_fixed_base_false_with_global_rotor_fails() {
        let mut chain = unconstrained_chain("arm", Vec3::ZERO, Vec3::X, 1);
        chain.bones[0].set_joint(Joint::ball(30.0).unwrap());
        chain
            .set_basebone_constraint_type(BaseboneConstraintType::GlobalRotor)
            .unwrap();
        assert!(matches!(chain.set_fixed_base(false), Err(Error::StateConflict(_))));
    }

    #[test]
    fn basebone_constraint_uv_requires_non_none_constraint() {
        let mut chain = unconstrained_chain("arm", Vec3::ZERO, Vec3::X, 1);
        assert!(matches!(
            chain.basebone_constraint_uv(),
            Err(Error::PreconditionFailed(_))
        ));
        chain.bones[0].set_joint(Joint::ball(30.0).unwrap());
        chain
            .set_basebone_constraint_type(BaseboneConstraintType::GlobalRotor)
            .unwrap();
        assert!(chain.basebone_constraint_uv().is_ok());
    }

    #[test]
    fn max_iterations_rejects_zero() {
        let mut chain = Chain::new("arm");
        assert!(matches!(
            chain.set_max_iterations(0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn chain_round_trips_through_json() {
        let mut chain = unconstrained_chain("arm", Vec3::ZERO, Vec3::Y, 3);
        chain.solve_for_target(Vec3::new(2.0, 1.0, 0.0)).unwrap();

        let json = serde_json::to_string(&chain).unwrap();
        let restored: Chain = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.name(), chain.name());
        assert_eq!(restored.bones(), chain.bones());
        assert_eq!(restored.current_solve_distance(), chain.current_solve_distance());
    }
}
