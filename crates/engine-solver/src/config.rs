//! Engine configuration structs (`spec.md` §6), mirroring the teacher's
//! `AdaptiveTransientParams::default()` / `for_tstop()` pattern.

/// Caller-specified time-domain bounds for one transient run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConfiguration {
    pub init_time: f64,
    pub final_time: f64,
    pub min_step: f64,
    pub max_step: f64,
}

impl TimeConfiguration {
    /// A `max_step` of `tstop / 50` and `min_step` of `max_step * 1e-9`,
    /// the same ratio the teacher's `AdaptiveTransientParams::for_tstop`
    /// derives its defaults from.
    pub fn for_tstop(tstop: f64) -> Self {
        let max_step = tstop / 50.0;
        Self {
            init_time: 0.0,
            final_time: tstop,
            min_step: max_step * 1e-9,
            max_step,
        }
    }
}

/// Tolerances and iteration limits driving integration-order adaptation and
/// Newton convergence (`spec.md` §6 defaults).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiceConfiguration {
    /// Local-truncation-error tolerance factor ("TrTol" in SPICE usage).
    pub tr_tol: f64,
    pub rel_tol: f64,
    pub abs_tol: f64,
    /// Step-size growth cap per accepted point.
    pub expansion: f64,
    pub max_iter: usize,
    /// Ceiling on integration order; Gear allows 1..=max_order, Trapezoidal
    /// is pinned at 2 regardless of this value.
    pub max_order: usize,
}

impl Default for SpiceConfiguration {
    fn default() -> Self {
        Self {
            tr_tol: 7.0,
            rel_tol: 1e-3,
            abs_tol: 1e-6,
            expansion: 2.0,
            max_iter: 100,
            max_order: 2,
        }
    }
}

/// Bundles the Newton convergence inputs the iteration controller needs,
/// grounded in the teacher CLI's `ConvergenceCriteria::default()` usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub max_iter: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            rel_tol: 1e-3,
            abs_tol: 1e-6,
            max_iter: 100,
        }
    }
}

impl From<SpiceConfiguration> for ConvergenceCriteria {
    fn from(cfg: SpiceConfiguration) -> Self {
        Self {
            rel_tol: cfg.rel_tol,
            abs_tol: cfg.abs_tol,
            max_iter: cfg.max_iter,
        }
    }
}
