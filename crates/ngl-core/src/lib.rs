//! # ngl-core
//!
//! Kinematic building blocks shared by the ngl-resum crates:
//! - [`FourVector`]: Lorentz vectors with rapidity/ΔR helpers
//! - [`Dipole`]: validated pairs of color-connected legs
//! - [`OutsideRegion`]: the veto-region capability the shower is generic over
//! - [`Error`]/[`Result`]: the workspace error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dipole;
pub mod error;
pub mod traits;
pub mod vector;

pub use dipole::Dipole;
pub use error::{Error, Result};
pub use traits::OutsideRegion;
pub use vector::{FourVector, RAPIDITY_LIMIT, wrap_phi};

/// Workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
