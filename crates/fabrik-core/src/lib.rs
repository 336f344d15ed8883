//! # Fabrik Core
//!
//! Ambient plumbing shared by the Fabrik IK solver:
//!
//! - Error types and a `Result` alias ([`error`])
//! - Tracing/logging setup ([`logging`])
//!
//! This crate carries no IK-specific logic; see `fabrik-solver` for the
//! bone/joint/chain/structure data model and the FABRIK algorithm itself.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::LogLevel;

/// Fabrik crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize ambient logging for binaries and tests that want console
/// output. Library consumers embedding the solver in a larger application
/// may install their own `tracing` subscriber instead and skip this call.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if a global subscriber is already
/// installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init()
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;

    tracing::info!("fabrik-core v{VERSION} initialized");
    Ok(())
}
