//! Error types for the Fabrik IK solver.

use thiserror::Error;

/// Main error type for Fabrik operations.
///
/// Every fallible entry point in `fabrik-solver` returns one of these
/// variants; the solve routine itself never produces one (see
/// `Error::propagation` notes on each call site) — numerical degeneracies
/// encountered mid-solve are corrected by the next pass instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A caller-supplied value is out of range or otherwise malformed:
    /// a zero direction vector, a zero axis, a negative length, a
    /// constraint angle outside `[0, 180]`, or non-perpendicular hinge axes.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was attempted whose precondition does not hold: adding
    /// a consecutive bone to an empty chain, reading a hinge accessor on a
    /// ball joint, or requesting a basebone constraint UV when the
    /// constraint type is `None`.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A requested state change conflicts with existing configuration:
    /// clearing `fixed_base` on a connected chain, or on a chain whose
    /// basebone constraint is a global rotor or global hinge.
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// A lookup by name or index found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A bone was constructed with coincident (or otherwise zero-length)
    /// endpoints.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
