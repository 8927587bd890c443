//! Capacitor and inductor companion models.
//!
//! Both devices hand their tracked quantity to `StampState::integrate`,
//! which dispatches to whichever method (Gear or Trapezoidal) is driving
//! the run, and returns the `(g_eq, i_eq)` resistive-equivalent pair. The
//! `delta == 0.0` DC guard inside `TruncatableState` means neither device
//! needs to special-case the operating-point solve itself: a capacitor's
//! `g_eq` comes back `0.0` (open), an inductor's branch `coeff` comes back
//! `0.0` (short).

use engine_core::mna::Mna;
use engine_solver::behavior::SetupContext;
use engine_solver::{DerivativeHandle, Load, StampState};

fn voltage(solution: &nalgebra::DVector<f64>, node: Option<usize>) -> f64 {
    node.map(|i| solution[i]).unwrap_or(0.0)
}

/// A linear capacitor between `pos` and `neg`; tracks its own terminal
/// voltage as the history-ring quantity.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub capacitance: f64,
    handle: Option<DerivativeHandle>,
}

impl Capacitor {
    pub fn new(pos: Option<usize>, neg: Option<usize>, capacitance: f64) -> Self {
        Self { pos, neg, capacitance, handle: None }
    }
}

impl Load for Capacitor {
    fn setup(&mut self, ctx: &mut SetupContext) -> engine_core::Result<()> {
        self.handle = Some(ctx.create_derivative(true));
        Ok(())
    }

    fn load(&self, state: &mut StampState, mna: &mut Mna) {
        let handle = self.handle.expect("Capacitor::setup must run before load");
        let v = voltage(state.solution, self.pos) - voltage(state.solution, self.neg);
        state.set_tracked_value(handle, v);
        let (g_eq, i_eq) = state.integrate(handle);
        mna.stamp_conductance(self.pos, self.neg, self.capacitance * g_eq);
        mna.stamp_current_source(self.pos, self.neg, self.capacitance * i_eq);
    }
}

/// A linear inductor between `pos` and `neg`, modeled with an explicit MNA
/// branch-current unknown (rather than admittance elimination) so its
/// tracked quantity — branch current — shares the same `TruncatableState`
/// contract a capacitor's tracked voltage does.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub inductance: f64,
    pub branch_idx: usize,
    handle: Option<DerivativeHandle>,
}

impl Inductor {
    pub fn new(pos: Option<usize>, neg: Option<usize>, inductance: f64, branch_idx: usize) -> Self {
        Self { pos, neg, inductance, branch_idx, handle: None }
    }
}

impl Load for Inductor {
    fn setup(&mut self, ctx: &mut SetupContext) -> engine_core::Result<()> {
        self.handle = Some(ctx.create_derivative(true));
        Ok(())
    }

    fn load(&self, state: &mut StampState, mna: &mut Mna) {
        let handle = self.handle.expect("Inductor::setup must run before load");
        let branch_current = state.solution[state.num_nodes + self.branch_idx];
        state.set_tracked_value(handle, branch_current);
        let (g_eq, i_eq) = state.integrate(handle);
        mna.stamp_branch(self.pos, self.neg, self.branch_idx, self.inductance * g_eq, self.inductance * i_eq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_solver::breakpoints::BreakpointSet;
    use engine_solver::coefficients::IntegrationCoefficients;
    use engine_solver::history::HistoryRing;
    use engine_solver::method::MethodKind;
    use nalgebra::DVector;

    #[test]
    fn capacitor_is_open_at_dc() {
        let mut cap = Capacitor::new(Some(0), None, 1e-6);
        let mut history = HistoryRing::new(2, 1);
        history.initialize(0.0, &DVector::zeros(1));
        let mut breakpoints = BreakpointSet::new(0.0, 1.0);
        {
            let mut ctx = SetupContext::new(&mut history, &mut Vec::new(), &mut breakpoints, 1.0);
            cap.setup(&mut ctx).unwrap();
        }

        let solution = DVector::from_vec(vec![5.0]);
        let coeffs = IntegrationCoefficients { order: 0, a: Vec::new() };
        history.current_mut().delta = 0.0;
        let mut state = StampState::new(0.0, 0.0, 1, &solution, 1, 0, coeffs, MethodKind::Gear, &mut history);
        let mut mna = Mna::new(1, 0);
        cap.load(&mut state, &mut mna);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 0)], 0.0);
    }

    #[test]
    fn inductor_is_short_at_dc() {
        let mut ind = Inductor::new(Some(0), Some(1), 1e-3, 0);
        let mut history = HistoryRing::new(2, 3);
        history.initialize(0.0, &DVector::zeros(3));
        let mut breakpoints = BreakpointSet::new(0.0, 1.0);
        {
            let mut ctx = SetupContext::new(&mut history, &mut Vec::new(), &mut breakpoints, 1.0);
            ind.setup(&mut ctx).unwrap();
        }

        let solution = DVector::from_vec(vec![3.0, 1.0, 0.25]);
        let coeffs = IntegrationCoefficients { order: 0, a: Vec::new() };
        history.current_mut().delta = 0.0;
        let mut state = StampState::new(0.0, 0.0, 1, &solution, 2, 1, coeffs, MethodKind::Gear, &mut history);
        let mut mna = Mna::new(2, 1);
        ind.load(&mut state, &mut mna);
        // Branch equation collapses to v(pos) - v(neg) = 0 when coeff == 0.
        let m = mna.to_dense_matrix();
        assert_eq!(m[(2, 2)], 0.0);
        assert_eq!(mna.rhs()[2], 0.0);
    }
}
