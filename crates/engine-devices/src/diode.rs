//! Shockley diode: `I(V) = Is * (exp(V / (n * Vt)) - 1)`, linearized around
//! the current Newton guess into a conductance + current-source companion
//! pair, the same resistive-equivalent shape `mna.rs`'s stamps already
//! assume for every other nonlinear or dynamic device.

use engine_core::mna::Mna;
use engine_solver::{Load, StampState};

const THERMAL_VOLTAGE: f64 = 0.02585; // k*T/q at ~300K
const MAX_EXPONENT: f64 = 80.0; // clamps exp() well below f64::MAX

#[derive(Debug, Clone)]
pub struct Diode {
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub saturation_current: f64,
    pub emission_coefficient: f64,
}

impl Diode {
    pub fn new(pos: Option<usize>, neg: Option<usize>) -> Self {
        Self { pos, neg, saturation_current: 1e-14, emission_coefficient: 1.0 }
    }

    pub fn with_params(pos: Option<usize>, neg: Option<usize>, saturation_current: f64, emission_coefficient: f64) -> Self {
        Self { pos, neg, saturation_current, emission_coefficient }
    }

    fn vt(&self) -> f64 {
        self.emission_coefficient * THERMAL_VOLTAGE
    }

    /// `(g_eq, i_eq)` such that `i(v) ≈ g_eq * v + i_eq` at `v_guess`.
    fn companion(&self, v_guess: f64) -> (f64, f64) {
        let vt = self.vt();
        let exponent = (v_guess / vt).min(MAX_EXPONENT);
        let exp_term = exponent.exp();
        let i = self.saturation_current * (exp_term - 1.0);
        let g_eq = self.saturation_current * exp_term / vt;
        let i_eq = i - g_eq * v_guess;
        (g_eq, i_eq)
    }
}

impl Load for Diode {
    fn load(&self, state: &mut StampState, mna: &mut Mna) {
        let vp = self.pos.map(|i| state.solution[i]).unwrap_or(0.0);
        let vn = self.neg.map(|i| state.solution[i]).unwrap_or(0.0);
        let (g_eq, i_eq) = self.companion(vp - vn);
        mna.stamp_conductance(self.pos, self.neg, g_eq);
        mna.stamp_current_source(self.pos, self.neg, i_eq);
    }
}
