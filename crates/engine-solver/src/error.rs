//! Error kinds for the integrator (`spec.md` §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Newton-Raphson iteration did not converge within `maxIter` passes.
    #[error("Newton iteration failed to converge at t={time:.6e}s (last residual {residual:.3e})")]
    NonConvergence { time: f64, residual: f64 },

    /// The local-truncation-error controller wants a step below `MinStep`.
    #[error("timestep fell below MinStep ({min_step:.3e}s) at t={time:.6e}s")]
    TimestepTooSmall { time: f64, min_step: f64 },

    /// A caller-provided configuration is internally inconsistent.
    #[error("misconfigured simulation: {0}")]
    Misconfigured(String),

    /// Propagated from `engine_core`: `NodeMismatch` or a singular matrix.
    #[error(transparent)]
    Core(#[from] engine_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
