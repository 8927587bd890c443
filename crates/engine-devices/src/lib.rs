//! Reference device models exercising the `engine-solver` `Load` contract:
//! resistor, capacitor, inductor, independent sources, and a diode.
//!
//! Not a full device library — netlist parsing, subcircuits, and MOSFET/
//! BSIM are out of scope here; these devices exist to drive the engine's
//! own test suite with real collaborators.

pub mod diode;
pub mod error;
pub mod passive;
pub mod reactive;
pub mod sources;
pub mod waveforms;

pub use diode::Diode;
pub use error::{Error, Result};
pub use passive::Resistor;
pub use reactive::{Capacitor, Inductor};
pub use sources::{CurrentSource, VoltageSource};
pub use waveforms::Waveform;
