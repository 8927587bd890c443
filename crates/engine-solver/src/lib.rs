//! Variable-order Gear/BDF and trapezoidal transient integration on top of
//! `engine-core`'s MNA assembly and linear solves.

pub mod behavior;
pub mod breakpoints;
pub mod coefficients;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod history;
pub mod method;
pub mod result;
pub mod truncatable;

pub use behavior::{Load, SetupContext, StampState};
pub use config::{ConvergenceCriteria, SpiceConfiguration, TimeConfiguration};
pub use controller::{ControllerOutcome, IterationController};
pub use driver::Simulation;
pub use error::{Error, Result};
pub use method::{Gear, IntegrationMethod, MethodContext, MethodKind, Trapezoidal};
pub use result::{SimulationResult, TimePoint};
pub use truncatable::{DerivativeHandle, TruncatableState};
