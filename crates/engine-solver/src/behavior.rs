//! The behavior/binding contract between the engine and device models
//! (`spec.md` §4.6, component 7).
//!
//! There is no ambient factory registry (Design Notes §9): a `Simulation`
//! is built by handing it an explicit `Vec<Box<dyn Load>>` up front.

use engine_core::mna::Mna;
use nalgebra::DVector;

use crate::breakpoints::BreakpointSet;
use crate::coefficients::IntegrationCoefficients;
use crate::history::HistoryRing;
use crate::method::MethodKind;
use crate::truncatable::{DerivativeHandle, TruncatableState};

/// Context handed to devices once, during `Setup`.
pub struct SetupContext<'a> {
    history: &'a mut HistoryRing,
    tracked_handles: &'a mut Vec<DerivativeHandle>,
    breakpoints: &'a mut BreakpointSet,
    final_time: f64,
}

impl<'a> SetupContext<'a> {
    pub fn new(
        history: &'a mut HistoryRing,
        tracked_handles: &'a mut Vec<DerivativeHandle>,
        breakpoints: &'a mut BreakpointSet,
        final_time: f64,
    ) -> Self {
        Self { history, tracked_handles, breakpoints, final_time }
    }

    /// `CreateDerivative(track)`: allocate a fresh tracked quantity and, if
    /// `track`, register it with the LTE poll set used by `Evaluate`.
    pub fn create_derivative(&mut self, track: bool) -> DerivativeHandle {
        let idx = self.history.push_tracked_column();
        let handle = DerivativeHandle(idx);
        if track {
            self.tracked_handles.push(handle);
        }
        handle
    }

    /// `SetBreakpoint` (`spec.md` §6): register a time the integrator must
    /// land on exactly, e.g. a source's waveform discontinuity.
    pub fn insert_breakpoint(&mut self, time: f64) {
        self.breakpoints.insert(time);
    }

    /// The run's final time, for devices that need to bound how far ahead
    /// (e.g. `Waveform::edges`) to register breakpoints.
    pub fn final_time(&self) -> f64 {
        self.final_time
    }
}

/// Per-iteration state handed to every device's `Load` call: the time point
/// being solved, the current Newton iterate, and access to the integration
/// method's history for any `TruncatableState` the device owns.
pub struct StampState<'a> {
    pub time: f64,
    pub delta: f64,
    pub order: usize,
    pub solution: &'a DVector<f64>,
    pub num_nodes: usize,
    pub num_branches: usize,
    pub coefficients: IntegrationCoefficients,
    pub method_kind: MethodKind,
    history: &'a mut HistoryRing,
}

impl<'a> StampState<'a> {
    /// Construct a `StampState` directly. Used by the iteration controller
    /// each Newton pass, and available to device crates for unit tests that
    /// need to call `Load::load` without running a full simulation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        time: f64,
        delta: f64,
        order: usize,
        solution: &'a DVector<f64>,
        num_nodes: usize,
        num_branches: usize,
        coefficients: IntegrationCoefficients,
        method_kind: MethodKind,
        history: &'a mut HistoryRing,
    ) -> Self {
        Self { time, delta, order, solution, num_nodes, num_branches, coefficients, method_kind, history }
    }

    /// Compute `(g_eq, i_eq)` for the tracked quantity at `handle`, using
    /// whichever `Integrate` formula matches the active method.
    pub fn integrate(&mut self, handle: DerivativeHandle) -> (f64, f64) {
        let method_kind = self.method_kind;
        let coeffs = &self.coefficients;
        let mut state = TruncatableState { handle, ring: self.history };
        match method_kind {
            MethodKind::Gear => state.integrate_gear(coeffs),
            MethodKind::Trapezoidal => state.integrate_trapezoidal(),
        }
    }

    /// Record the present value of a device's tracked quantity.
    pub fn set_tracked_value(&mut self, handle: DerivativeHandle, value: f64) {
        TruncatableState { handle, ring: self.history }.set_value(value);
    }

    /// Borrow the tracked quantity at `handle`, for `Integrate`/`Truncate`.
    pub fn truncatable(&mut self, handle: DerivativeHandle) -> TruncatableState<'_> {
        TruncatableState { handle, ring: self.history }
    }

    /// DC operating point: `delta == 0.0`, so `TruncatableState::Integrate`
    /// is meaningless (no history to difference against). Devices check
    /// this instead of special-casing DC analysis themselves.
    pub fn is_dc(&self) -> bool {
        self.delta == 0.0
    }
}

/// A device's contribution to the circuit: stamps its `Load` into the MNA
/// system and optionally owns dynamic (history-tracking) state.
pub trait Load {
    /// Register node/branch expectations and create any `TruncatableState`
    /// this device needs. Called once before the first `Load`.
    fn setup(&mut self, _ctx: &mut SetupContext) -> engine_core::Result<()> {
        Ok(())
    }

    /// Stamp this device's contribution for the current Newton iteration.
    fn load(&self, state: &mut StampState, mna: &mut Mna);

    /// Release any resources acquired during `setup` (rarely needed; most
    /// devices only allocate `TruncatableState` slots, which the engine's
    /// history ring owns and frees with the simulation itself).
    fn unsetup(&mut self) {}
}
