//! The `TruncatableState` contract (`spec.md` §3, §4.2).
//!
//! The data actually lives in the engine-owned [`HistoryRing`]; devices
//! hold only an integer [`DerivativeHandle`]. This is the "arena + index"
//! shape Design Notes §9 calls for in place of a device-owned object with a
//! back-reference into the engine — it sidesteps the ownership cycle
//! entirely rather than breaking it with `Weak`.

use crate::coefficients::{divided_difference, IntegrationCoefficients};
use crate::history::HistoryRing;

/// Opaque handle to one tracked dynamic quantity's column in the history
/// ring, returned by `CreateDerivative`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeHandle(pub(crate) usize);

/// A borrowed view onto one tracked quantity, used by devices during `Load`
/// to read history and compute the resistive-equivalent `(g_eq, i_eq)`
/// companion pair.
pub struct TruncatableState<'a> {
    pub(crate) handle: DerivativeHandle,
    pub(crate) ring: &'a mut HistoryRing,
}

impl<'a> TruncatableState<'a> {
    /// Record the device's present value of its tracked quantity (call
    /// once per Newton iteration, before `integrate_*`).
    pub fn set_value(&mut self, value: f64) {
        self.ring.current_mut().tracked[self.handle.0].value = value;
    }

    pub fn value_at(&self, slots_back: usize) -> f64 {
        self.ring.state(slots_back).tracked[self.handle.0].value
    }

    fn deriv_at(&self, slots_back: usize) -> f64 {
        self.ring.state(slots_back).tracked[self.handle.0].deriv
    }

    fn store_deriv(&mut self, deriv: f64) {
        self.ring.current_mut().tracked[self.handle.0].deriv = deriv;
    }

    /// `Integrate(coefficients)` for Gear/BDF: `g_eq` is the coefficient of
    /// the still-unknown `state(0)` value, `i_eq` folds in the known
    /// history. `ẏ(t0) ≈ g_eq * y(t0) + i_eq`.
    pub fn integrate_gear(&mut self, coeffs: &IntegrationCoefficients) -> (f64, f64) {
        let delta = self.ring.current().delta;
        if delta == 0.0 {
            // DC operating point: no history to differentiate against.
            // A capacitor sees g_eq=0 (open); an inductor's branch
            // equation collapses to v_pos == v_neg (short).
            self.store_deriv(0.0);
            return (0.0, 0.0);
        }
        let g_eq = coeffs.a[0] / delta;
        let mut i_eq = 0.0;
        for i in 1..=coeffs.order {
            i_eq += coeffs.a[i] * self.value_at(i);
        }
        i_eq /= delta;
        let deriv = g_eq * self.value_at(0) + i_eq;
        self.store_deriv(deriv);
        (g_eq, i_eq)
    }

    /// `Integrate` for the Trapezoidal method: Hermite form using the
    /// previous value and its stored derivative,
    /// `ẏ(t0) = (2/δ)(y0 - y1) - ẏ(t1)`.
    pub fn integrate_trapezoidal(&mut self) -> (f64, f64) {
        let delta = self.ring.current().delta;
        if delta == 0.0 {
            self.store_deriv(0.0);
            return (0.0, 0.0);
        }
        let v1 = self.value_at(1);
        let d1 = self.deriv_at(1);
        let g_eq = 2.0 / delta;
        let i_eq = -g_eq * v1 - d1;
        let deriv = g_eq * self.value_at(0) + i_eq;
        self.store_deriv(deriv);
        (g_eq, i_eq)
    }

    /// `Truncate() -> δ_max`: the largest next step size consistent with
    /// `spec.md`'s SPICE-style LTE bound,
    /// `δ_max = (TrTol · ε / |Δ^(k+1) y|)^(1/(k+1))`.
    ///
    /// Returns `f64::INFINITY` when the divided difference underflows to
    /// zero (nothing to truncate against, e.g. a quantity that hasn't
    /// moved yet).
    pub fn truncate(&self, order: usize, tr_tol: f64, rel_tol: f64, abs_tol: f64) -> f64 {
        let n = order + 2;
        let mut values = Vec::with_capacity(n);
        let mut times = Vec::with_capacity(n);
        for i in 0..n {
            values.push(self.value_at(i));
            times.push(self.ring.state(i).time);
        }
        let dd = divided_difference(&values, &times).abs();
        if dd <= f64::EPSILON {
            return f64::INFINITY;
        }
        let y0 = self.value_at(0);
        let d0 = self.deriv_at(0);
        let eps = rel_tol * y0.abs().max(d0.abs()) + abs_tol;
        let exponent = 1.0 / (order as f64 + 1.0);
        (tr_tol * eps / dd).powf(exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn ring_with_column(max_order: usize) -> (HistoryRing, DerivativeHandle) {
        let mut ring = HistoryRing::new(max_order, 0);
        ring.initialize(0.0, &DVector::zeros(0));
        let idx = ring.push_tracked_column();
        (ring, DerivativeHandle(idx))
    }

    #[test]
    fn backward_euler_integrate_matches_finite_difference() {
        let (mut ring, handle) = ring_with_column(1);
        // Seed history: v was 1.0 one step (h=0.5) ago.
        ring.state_mut(1).tracked[handle.0].value = 1.0;
        ring.current_mut().delta = 0.5;
        ring.current_mut().time = 0.5;
        ring.state_mut(1).time = 0.0;

        let mut state = TruncatableState { handle, ring: &mut ring };
        state.set_value(2.0);
        let coeffs = IntegrationCoefficients::gear(1, &[0.5, 0.0]);
        let (g_eq, i_eq) = state.integrate_gear(&coeffs);

        // dv/dt ~ (2.0 - 1.0) / 0.5 = 2.0
        let deriv = g_eq * 2.0 + i_eq;
        assert!((deriv - 2.0).abs() < 1e-9);
    }

    #[test]
    fn truncate_returns_infinity_for_unchanging_quantity() {
        let (mut ring, handle) = ring_with_column(2);
        for i in 0..ring.len() {
            ring.state_mut(i).tracked[handle.0].value = 3.0;
            ring.state_mut(i).time = -(i as f64);
        }
        let state = TruncatableState { handle, ring: &mut ring };
        let delta_max = state.truncate(2, 7.0, 1e-3, 1e-6);
        assert_eq!(delta_max, f64::INFINITY);
    }
}
