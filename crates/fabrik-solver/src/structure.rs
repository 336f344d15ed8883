//! A named collection of chains, with support for connecting a dependent
//! chain's base to a point on another chain's bone.

use std::collections::HashMap;

use crate::bone::ConnectionPoint;
use crate::chain::{BaseboneConstraintType, Chain};
use crate::matrix::Mat3;
use crate::vector::Vec3;
use fabrik_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A collection of named chains, solved together in insertion order.
///
/// A chain may be connected to another chain's bone: its base position and,
/// for `LocalRotor`/`LocalHinge` basebone constraints, its relative
/// constraint vectors are recomputed from the host bone's current direction
/// immediately before each solve. Chains are processed strictly in
/// insertion order, so a host must be added before any chain that connects
/// to it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Structure {
    name: String,
    chains: Vec<Chain>,
    name_index: HashMap<String, usize>,
}

impl Structure {
    /// Construct an empty, named structure.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chains: Vec::new(),
            name_index: HashMap::new(),
        }
    }

    /// This structure's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the structure has no chains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// All chains, in insertion order.
    #[must_use]
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// The chain named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no chain carries that name.
    pub fn chain_by_name(&self, name: &str) -> Result<&Chain> {
        self.name_index
            .get(name)
            .map(|&i| &self.chains[i])
            .ok_or_else(|| Error::NotFound(format!("no chain named '{name}'")))
    }

    /// The chain at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `index` is out of range.
    pub fn chain(&self, index: usize) -> Result<&Chain> {
        self.chains
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("chain index {index} out of range")))
    }

    /// Append a free-standing chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a chain with the same name
    /// already exists.
    pub fn add_chain(&mut self, chain: Chain) -> Result<()> {
        self.register(chain)
    }

    /// Remove the chain at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `index` is out of range, or
    /// [`Error::StateConflict`] if another chain is connected to it.
    pub fn remove_chain(&mut self, index: usize) -> Result<()> {
        if index >= self.chains.len() {
            return Err(Error::NotFound(format!("chain index {index} out of range")));
        }
        if self
            .chains
            .iter()
            .any(|c| c.connection().is_some_and(|(host, _)| host == index))
        {
            return Err(Error::StateConflict(
                "cannot remove a chain that other chains are connected to".to_string(),
            ));
        }

        let removed = self.chains.remove(index);
        self.name_index.remove(removed.name());
        for chain in &mut self.chains {
            if let Some((host_idx, bone_idx)) = chain.connection() {
                if host_idx > index {
                    let connection_point = chain.connection_point().unwrap_or(ConnectionPoint::End);
                    chain.set_connection(host_idx - 1, bone_idx, connection_point);
                }
            }
        }
        self.name_index = Self::rebuild_index(&self.chains);
        Ok(())
    }

    /// Connect a clone of `new_chain` to the structure, with its base
    /// translated onto `host_chain_idx`'s bone `host_bone_idx` at
    /// `connection_point`.
    ///
    /// The clone's `fixed_base` is forced to `true` and its
    /// `(connected_chain_idx, connected_bone_idx)` is set so future solves
    /// recompute its base position and any `Local*` constraint vectors from
    /// the host bone. Mutating the clone afterward never affects
    /// `new_chain`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if either index is out of range, or
    /// [`Error::InvalidArgument`] if a chain with `new_chain`'s name already
    /// exists.
    pub fn connect_chain(
        &mut self,
        new_chain: &Chain,
        host_chain_idx: usize,
        host_bone_idx: usize,
        connection_point: ConnectionPoint,
    ) -> Result<()> {
        let host_chain = self
            .chains
            .get(host_chain_idx)
            .ok_or_else(|| Error::NotFound(format!("chain index {host_chain_idx} out of range")))?;
        let host_bone = host_chain.bone(host_bone_idx)?;
        let attach_point = match connection_point {
            ConnectionPoint::Start => host_bone.start(),
            ConnectionPoint::End => host_bone.end(),
        };

        let mut dependent = new_chain.clone();
        dependent.set_fixed_base(true)?;
        dependent.set_connection(host_chain_idx, host_bone_idx, connection_point);
        if !dependent.is_empty() {
            let offset = attach_point - dependent.bones()[0].start();
            dependent.translate(offset);
        }

        self.register(dependent)
    }

    /// Apply `target` to every chain, in insertion order, running each
    /// connected chain's pre-solve recomputation first.
    ///
    /// # Errors
    ///
    /// Propagates any error from an individual chain's solve.
    pub fn solve_for_target(&mut self, target: Vec3) -> Result<()> {
        tracing::debug!(structure = %self.name, chains = self.chains.len(), "structure solve started");
        for i in 0..self.chains.len() {
            self.prepare_and_solve(i, Some(target))?;
        }
        Ok(())
    }

    /// Apply per-chain targets from `targets` (keyed by chain name). Chains
    /// whose name is absent from `targets` are left untouched for this
    /// call, though hosts still contribute their current (possibly stale)
    /// bone directions to any dependent that is solved.
    ///
    /// # Errors
    ///
    /// Propagates any error from an individual chain's solve.
    pub fn solve_for_targets(&mut self, targets: &HashMap<String, Vec3>) -> Result<()> {
        tracing::debug!(
            structure = %self.name,
            chains = self.chains.len(),
            targets = targets.len(),
            "structure solve started"
        );
        for i in 0..self.chains.len() {
            let name = self.chains[i].name().to_string();
            let Some(&target) = targets.get(&name) else {
                continue;
            };
            self.prepare_and_solve(i, Some(target))?;
        }
        Ok(())
    }

    fn prepare_and_solve(&mut self, index: usize, target: Option<Vec3>) -> Result<f64> {
        if let Some((host_chain_idx, host_bone_idx)) = self.chains[index].connection() {
            let host_bone = self.chains[host_chain_idx].bone(host_bone_idx)?;
            let connection_point = self.chains[index]
                .connection_point()
                .unwrap_or(ConnectionPoint::End);
            let attach_point = match connection_point {
                ConnectionPoint::Start => host_bone.start(),
                ConnectionPoint::End => host_bone.end(),
            };
            let host_direction = host_bone.direction();

            tracing::trace!(
                host_chain_idx,
                host_bone_idx,
                dependent = self.chains[index].name(),
                "recomputing dependent base from host bone"
            );
            self.chains[index].set_base_position(attach_point);

            let base_constraint = self.chains[index].base_constraint_type();
            if matches!(
                base_constraint,
                BaseboneConstraintType::LocalRotor | BaseboneConstraintType::LocalHinge
            ) {
                let m = Mat3::create_rotation_matrix(host_direction);
                let base_uv = self.chains[index].base_constraint_uv();
                self.chains[index].set_base_rel_constraint_uv(m.mul_vec3(base_uv).normalise());

                if base_constraint == BaseboneConstraintType::LocalHinge {
                    if let Some(joint) = self.chains[index].basebone_joint() {
                        if let Ok(reference_axis) = joint.reference_axis() {
                            self.chains[index]
                                .set_base_rel_ref_constraint_uv(m.mul_vec3(reference_axis).normalise());
                        }
                    }
                }
            }
        }

        let chain = &mut self.chains[index];
        if chain.use_embedded_target() {
            chain.solve_using_embedded_target()
        } else {
            let target = target.unwrap_or_else(|| chain.embedded_target());
            chain.solve_for_target(target)
        }
    }

    fn register(&mut self, chain: Chain) -> Result<()> {
        if self.name_index.contains_key(chain.name()) {
            return Err(Error::InvalidArgument(format!(
                "a chain named '{}' already exists",
                chain.name()
            )));
        }
        self.name_index.insert(chain.name().to_string(), self.chains.len());
        self.chains.push(chain);
        Ok(())
    }

    fn rebuild_index(chains: &[Chain]) -> HashMap<String, usize> {
        chains
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_string(), i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::Bone;
    use crate::joint::Joint;

    fn vertical_chain(name: &str) -> Chain {
        let mut chain = Chain::new(name);
        chain.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::Y, 1.0).unwrap());
        for _ in 0..2 {
            chain
                .add_consecutive_bone(Vec3::Y, 1.0, Joint::default())
                .unwrap();
        }
        chain
    }

    #[test]
    fn local_rotor_dependent_follows_host_frame() {
        let mut structure = Structure::new("skeleton");
        structure.add_chain(vertical_chain("A")).unwrap();

        let mut dependent = Chain::new("B");
        dependent.add_bone(
            Bone::from_direction(Vec3::ZERO, Vec3::X, 1.0)
                .unwrap()
                .with_joint(Joint::ball(30.0).unwrap()),
        );
        dependent
            .set_basebone_constraint_type(BaseboneConstraintType::LocalRotor)
            .unwrap();

        structure
            .connect_chain(&dependent, 0, 1, ConnectionPoint::End)
            .unwrap();

        let mut targets = HashMap::new();
        targets.insert("A".to_string(), Vec3::new(0.0, 3.0, 0.0));
        targets.insert("B".to_string(), Vec3::new(5.0, 5.0, 0.0));
        structure.solve_for_targets(&targets).unwrap();

        let host_end = structure.chain(0).unwrap().bones()[1].end();
        let dependent_chain = structure.chain(1).unwrap();
        assert!(Vec3::approx_equals(dependent_chain.bones()[0].start(), host_end, 1e-6));

        let host_direction = structure.chain(0).unwrap().bones()[1].direction();
        let m = Mat3::create_rotation_matrix(host_direction);
        let expected_axis = m.mul_vec3(Vec3::X).normalise();
        let angle = Vec3::angle_between_deg(dependent_chain.bones()[0].direction(), expected_axis);
        assert!(angle <= 30.5);
    }

    #[test]
    fn dependent_base_tracks_host_start_endpoint_not_end() {
        // A connection made at ConnectionPoint::Start must keep reading the
        // host bone's start every solve, even as the host bone moves -
        // not silently fall back to the host bone's end.
        let mut structure = Structure::new("skeleton");
        structure.add_chain(vertical_chain("A")).unwrap();
        structure
            .connect_chain(&vertical_chain("B"), 0, 1, ConnectionPoint::Start)
            .unwrap();

        structure.solve_for_target(Vec3::new(0.0, 5.0, 1.0)).unwrap();

        let host_bone_start = structure.chain(0).unwrap().bones()[1].start();
        let host_bone_end = structure.chain(0).unwrap().bones()[1].end();
        let dependent_base = structure.chain_by_name("B").unwrap().bones()[0].start();

        assert!(Vec3::approx_equals(dependent_base, host_bone_start, 1e-6));
        assert!(Vec3::distance(dependent_base, host_bone_end) > 1e-3);
    }

    #[test]
    fn add_chain_rejects_duplicate_name() {
        let mut structure = Structure::new("skeleton");
        structure.add_chain(vertical_chain("A")).unwrap();
        let result = structure.add_chain(vertical_chain("A"));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn connect_chain_does_not_alias_source() {
        let mut structure = Structure::new("skeleton");
        structure.add_chain(vertical_chain("A")).unwrap();
        let source = vertical_chain("B");
        structure
            .connect_chain(&source, 0, 0, ConnectionPoint::Start)
            .unwrap();

        let cloned = structure.chain_by_name("B").unwrap();
        assert_ne!(cloned.bones()[0].start(), source.bones()[0].start().plus(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(source.bones()[0].start(), Vec3::ZERO);
    }

    #[test]
    fn remove_chain_rejects_when_dependents_exist() {
        let mut structure = Structure::new("skeleton");
        structure.add_chain(vertical_chain("A")).unwrap();
        structure
            .connect_chain(&vertical_chain("B"), 0, 0, ConnectionPoint::Start)
            .unwrap();
        assert!(matches!(
            structure.remove_chain(0),
            Err(Error::StateConflict(_))
        ));
    }

    #[test]
    fn chain_by_name_missing_is_not_found() {
        let structure = Structure::new("skeleton");
        assert!(matches!(
            structure.chain_by_name("ghost"),
            Err(Error::NotFound(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn structure_round_trips_through_json_with_working_name_index() {
        let mut structure = Structure::new("skeleton");
        structure.add_chain(vertical_chain("A")).unwrap();
        structure
            .connect_chain(&vertical_chain("B"), 0, 0, ConnectionPoint::Start)
            .unwrap();

        let json = serde_json::to_string(&structure).unwrap();
        let restored: Structure = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), structure.len());
        assert!(restored.chain_by_name("B").is_ok());
    }
}
