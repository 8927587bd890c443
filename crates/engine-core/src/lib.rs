//! Core MNA matrix assembly and linear algebra for the Spicier engine.
//!
//! This crate has no notion of time-stepping or device behavior; it is the
//! sparse matrix contract (`spec.md` §4.4) that the iteration controller and
//! every device `Load` stamp build on.

pub mod error;
pub mod linear;
pub mod mna;

pub use error::{Error, Result};
pub use mna::{MatrixHandle, Mna};
