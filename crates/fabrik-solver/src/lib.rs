//! # Fabrik Solver
//!
//! The FABRIK (Forward And Backward Reaching Inverse Kinematics) core: a
//! deterministic, pure-numerical solver over bones, joints, chains, and
//! structures.
//!
//! - [`vector`] / [`matrix`] — 3-vector and 3x3 rotation matrix algebra.
//! - [`joint`] — a single joint's angular constraint: ball rotor, global
//!   hinge, or local hinge.
//! - [`bone`] — a rigid link owning one joint.
//! - [`chain`] — an ordered sequence of bones, solved by the forward and
//!   backward passes.
//! - [`structure`] — a named collection of chains with inter-chain
//!   connections.
//!
//! A typical consumer only needs the flat re-exports below:
//!
//! ```
//! use fabrik_solver::{Bone, Chain, Joint, Vec3};
//!
//! let mut chain = Chain::new("arm");
//! chain.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::Y, 1.0).unwrap());
//! chain
//!     .add_consecutive_bone(Vec3::Y, 1.0, Joint::default())
//!     .unwrap();
//! let distance = chain.solve_for_target(Vec3::new(1.0, 1.0, 0.0)).unwrap();
//! assert!(distance.is_finite());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bone;
pub mod chain;
pub mod joint;
pub mod matrix;
pub mod structure;
pub mod vector;

pub use bone::{Bone, ConnectionPoint};
pub use chain::{BaseboneConstraintType, Chain};
pub use joint::Joint;
pub use matrix::Mat3;
pub use structure::Structure;
pub use vector::Vec3;
