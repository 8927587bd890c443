//! Integration methods: Gear/BDF and Trapezoidal (`spec.md` §4.1).
//!
//! Both implementations share `Coefficients`, `HistoryRing`, and
//! `BreakpointSet`; `MethodContext` holds the mechanics that are identical
//! between them (`Probe`/`Accept`/`Continue`/`NonConvergence`/breakpoint
//! snapping) and delegates only coefficient computation and order
//! adaptation to the `IntegrationMethod` implementation.

use nalgebra::DVector;

use crate::behavior::SetupContext;
use crate::breakpoints::BreakpointSet;
use crate::coefficients::IntegrationCoefficients;
use crate::config::{SpiceConfiguration, TimeConfiguration};
use crate::history::HistoryRing;
use crate::truncatable::{DerivativeHandle, TruncatableState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Gear,
    Trapezoidal,
}

/// Shared trait both integration methods implement (`spec.md` §4.1).
pub trait IntegrationMethod: std::fmt::Debug + Send + Sync {
    fn kind(&self) -> MethodKind;
    fn default_order(&self) -> usize;
    /// Whether `Evaluate` may raise order above its current value.
    fn adapts_order(&self) -> bool;
    /// `IntegrationCoefficients` for the given order and time history.
    /// Unused by `Trapezoidal`, whose devices call
    /// `TruncatableState::integrate_trapezoidal` directly.
    fn coefficients(&self, order: usize, times: &[f64]) -> IntegrationCoefficients;
}

/// Variable-order (1..=6) Backward Differentiation Formula.
#[derive(Debug, Default)]
pub struct Gear;

impl IntegrationMethod for Gear {
    fn kind(&self) -> MethodKind {
        MethodKind::Gear
    }
    fn default_order(&self) -> usize {
        2
    }
    fn adapts_order(&self) -> bool {
        true
    }
    fn coefficients(&self, order: usize, times: &[f64]) -> IntegrationCoefficients {
        IntegrationCoefficients::gear(order, times)
    }
}

/// Fixed order-2, A-stable trapezoidal rule.
#[derive(Debug, Default)]
pub struct Trapezoidal;

impl IntegrationMethod for Trapezoidal {
    fn kind(&self) -> MethodKind {
        MethodKind::Trapezoidal
    }
    fn default_order(&self) -> usize {
        2
    }
    fn adapts_order(&self) -> bool {
        false
    }
    fn coefficients(&self, _order: usize, _times: &[f64]) -> IntegrationCoefficients {
        IntegrationCoefficients { order: 2, a: Vec::new() }
    }
}

/// The mutable state an `IntegrationMethod` drives: history, breakpoints,
/// current order, and the LTE poll set.
pub struct MethodContext {
    pub history: HistoryRing,
    pub breakpoints: BreakpointSet,
    pub order: usize,
    pub max_order: usize,
    pub break_pending: bool,
    /// The step size in effect the last time we snapped exactly onto a
    /// breakpoint (`savedDelta`, `spec.md` §4.1); used to bound how far past
    /// that landing the very next step is allowed to reach.
    saved_delta: f64,
    final_time: f64,
    tracked_handles: Vec<DerivativeHandle>,
    method: Box<dyn IntegrationMethod>,
}

impl MethodContext {
    pub fn new(
        method: Box<dyn IntegrationMethod>,
        time_config: TimeConfiguration,
        spice_config: SpiceConfiguration,
        unknowns: usize,
    ) -> Self {
        let max_order = spice_config.max_order.clamp(1, 6);
        Self {
            history: HistoryRing::new(max_order, unknowns),
            breakpoints: BreakpointSet::new(time_config.init_time, time_config.final_time),
            order: 1,
            max_order,
            break_pending: true,
            saved_delta: time_config.max_step,
            final_time: time_config.final_time,
            tracked_handles: Vec::new(),
            method,
        }
    }

    pub fn kind(&self) -> MethodKind {
        self.method.kind()
    }

    /// Context for the one-time `Setup` pass over every device.
    pub fn setup_context(&mut self) -> SetupContext<'_> {
        SetupContext::new(&mut self.history, &mut self.tracked_handles, &mut self.breakpoints, self.final_time)
    }

    pub fn create_derivative(&mut self, track: bool) -> DerivativeHandle {
        let idx = self.history.push_tracked_column();
        let handle = DerivativeHandle(idx);
        if track {
            self.tracked_handles.push(handle);
        }
        handle
    }

    /// `Initialize(sim)`: seed history with the DC operating point, reset
    /// order to 1, and arm the breakpoint-pending flag.
    pub fn initialize(&mut self, solution: &DVector<f64>, init_time: f64) {
        self.history.initialize(init_time, solution);
        self.order = 1;
        self.break_pending = true;
    }

    fn usable_order(&self) -> usize {
        self.order.min(self.history.len() - 2)
    }

    /// `Probe(sim, δ)`: advance `state(0).time`, predict its solution via
    /// polynomial extrapolation, and return the integration coefficients
    /// for the step about to be attempted.
    pub fn probe(&mut self, delta: f64) -> IntegrationCoefficients {
        let prev_time = self.history.state(1).time;
        self.history.current_mut().time = prev_time + delta;
        self.history.current_mut().delta = delta;

        let pred_order = self.usable_order().max(1);
        let times: Vec<f64> = (0..=pred_order).map(|i| self.history.state(i).time).collect();
        let weights = IntegrationCoefficients::predictor_weights(pred_order, &times);
        let unknowns = self.history.unknowns();
        let mut predicted = DVector::zeros(unknowns);
        for (i, w) in weights.iter().enumerate() {
            predicted += &self.history.state(i + 1).solution * *w;
        }
        self.history.current_mut().solution = predicted;

        let coeff_order = self.usable_order();
        let times: Vec<f64> = (0..=coeff_order).map(|i| self.history.state(i).time).collect();
        self.method.coefficients(coeff_order, &times)
    }

    fn poll_truncation(&mut self, order: usize, spice: &SpiceConfiguration) -> f64 {
        if self.tracked_handles.is_empty() {
            return self.history.current().delta * spice.expansion;
        }
        let handles = self.tracked_handles.clone();
        let mut min_delta = f64::INFINITY;
        for h in handles {
            let d = TruncatableState { handle: h, ring: &mut self.history }.truncate(order, spice.tr_tol, spice.rel_tol, spice.abs_tol);
            min_delta = min_delta.min(d);
        }
        min_delta
    }

    /// `Evaluate(sim) -> (accept, δ_next)`: poll every `TruncatableState`,
    /// decide acceptance, and (for Gear) try raising order when doing so
    /// buys at least a 5% larger next step.
    pub fn evaluate(&mut self, spice: &SpiceConfiguration, time_cfg: &TimeConfiguration) -> (bool, f64) {
        let current_delta = self.history.current().delta;

        // The very first point has no history to truncate against.
        if self.history.state(1).time == self.history.state(2).time {
            return (true, (current_delta * spice.expansion).min(time_cfg.max_step));
        }

        let order = self.usable_order();
        let min_delta = self.poll_truncation(order, spice);

        if min_delta < current_delta {
            let shrink = (min_delta / current_delta).max(0.1);
            return (false, (current_delta * shrink).max(time_cfg.min_step));
        }

        let mut best_delta = min_delta.min(current_delta * spice.expansion);

        if self.method.adapts_order() && self.order < self.max_order && self.history.len() > self.order + 2 {
            let raised_order = self.order + 1;
            let raised_delta = self.poll_truncation(raised_order, spice);
            if raised_delta > best_delta * 1.05 {
                self.order = raised_order;
                best_delta = raised_delta.min(current_delta * spice.expansion);
            }
        }

        (true, best_delta.min(time_cfg.max_step))
    }

    /// `Accept(sim)`: shift history and drop any breakpoints now behind us.
    pub fn accept(&mut self) {
        self.history.shift();
        let accepted_time = self.history.state(1).time;
        self.breakpoints.clear_through(accepted_time);
        self.break_pending = false;
    }

    /// `NonConvergence(sim) -> δ_next`: retreat to order 1 and an eighth of
    /// the failed step.
    pub fn non_convergence(&mut self) -> f64 {
        self.order = 1;
        self.history.current().delta / 8.0
    }

    /// `Continue(sim, &δ)` (`spec.md` §4.1 "Breakpoint snapping"). Let
    /// `b = breakpoints.first`, `t = state[1].time`:
    /// - If `t == b` or `b - t <= MinStep`: force `order = 1`; shrink `δ` to
    ///   `min(δ, 0.1 * min(savedDelta, gap to the next breakpoint after b))`;
    ///   if `t == 0`, additionally `δ ← δ / 10` (SPICE first-step rule);
    ///   floor `δ` at `2 * MinStep`.
    /// - Else if `t + δ >= b`: remember `δ` as `savedDelta`, snap `δ` to
    ///   land exactly on `b`.
    pub fn continue_step(&mut self, delta: &mut f64, time_cfg: &TimeConfiguration) {
        *delta = delta.clamp(time_cfg.min_step, time_cfg.max_step);
        let t = self.history.state(1).time;

        if let Some(b) = self.breakpoints.peek_first() {
            if t == b || b - t <= time_cfg.min_step {
                self.order = 1;
                let gap = self.breakpoints.second().map_or(f64::INFINITY, |next| (next - b).abs());
                *delta = delta.min(0.1 * self.saved_delta.min(gap));
                if t == 0.0 {
                    *delta /= 10.0;
                }
                *delta = delta.max(2.0 * time_cfg.min_step).min(time_cfg.max_step);
                self.break_pending = true;
            } else if t + *delta >= b {
                self.saved_delta = *delta;
                *delta = b - t;
                self.break_pending = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_starts_at_order_one_and_can_raise() {
        let ctx = MethodContext::new(
            Box::new(Gear),
            TimeConfiguration::for_tstop(1.0),
            SpiceConfiguration { max_order: 4, ..SpiceConfiguration::default() },
            1,
        );
        assert_eq!(ctx.order, 1);
        assert_eq!(ctx.max_order, 4);
    }

    #[test]
    fn trapezoidal_never_adapts_order() {
        let method = Trapezoidal;
        assert!(!method.adapts_order());
    }

    #[test]
    fn continue_step_forces_tiny_first_step_at_t_zero() {
        // init_time is always a breakpoint, so at the very start of a run
        // t == b == 0.0 holds and the SPICE first-step rule applies.
        let mut ctx = MethodContext::new(
            Box::new(Gear),
            TimeConfiguration::for_tstop(10.0),
            SpiceConfiguration::default(),
            1,
        );
        ctx.initialize(&DVector::zeros(1), 0.0);
        let time_cfg = TimeConfiguration { init_time: 0.0, final_time: 10.0, min_step: 1e-6, max_step: 5.0 };
        let mut delta = 3.0;
        ctx.continue_step(&mut delta, &time_cfg);
        // saved_delta defaults to the constructor's max_step (10.0/50 = 0.2);
        // gap to the next breakpoint (final_time) is 10.0, so the binding
        // term is 0.1 * 0.2 = 0.02, then /10 for t == 0 => 0.002.
        assert!((delta - 0.002).abs() < 1e-9, "delta = {delta}");
        assert_eq!(ctx.order, 1);
    }

    #[test]
    fn continue_step_snaps_onto_upcoming_breakpoint() {
        let mut ctx = MethodContext::new(
            Box::new(Gear),
            TimeConfiguration::for_tstop(10.0),
            SpiceConfiguration::default(),
            1,
        );
        ctx.initialize(&DVector::zeros(1), 0.0);
        ctx.breakpoints.insert(1.0);
        // Simulate having already advanced past the initial breakpoint.
        ctx.history.state_mut(1).time = 0.5;
        ctx.breakpoints.clear_through(0.5);

        let time_cfg = TimeConfiguration { init_time: 0.0, final_time: 10.0, min_step: 1e-6, max_step: 5.0 };
        let mut delta = 3.0;
        ctx.continue_step(&mut delta, &time_cfg);
        assert!((delta - 0.5).abs() < 1e-9);
    }
}
