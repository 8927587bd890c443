//! Newton-Raphson iteration controller (`spec.md` §4.3):
//! PREDICT -> STAMP -> SOLVE -> TEST -> CONVERGED | ITERATE | DIVERGED.

use engine_core::linear::{solve_dense, solve_sparse, SPARSE_THRESHOLD};
use engine_core::mna::Mna;
use log::{debug, trace};
use nalgebra::DVector;

use crate::behavior::{Load, StampState};
use crate::coefficients::IntegrationCoefficients;
use crate::config::ConvergenceCriteria;
use crate::error::Result;
use crate::history::HistoryRing;
use crate::method::MethodKind;

#[derive(Debug)]
pub enum ControllerOutcome {
    Converged { iterations: usize, solution: DVector<f64> },
    Diverged { residual: f64 },
}

/// Drives one full Newton-Raphson solve at a fixed time point.
pub struct IterationController<'a> {
    pub devices: &'a mut [Box<dyn Load>],
    pub criteria: ConvergenceCriteria,
}

impl<'a> IterationController<'a> {
    /// Run Newton iteration to convergence or exhaustion of `max_iter`.
    ///
    /// `time`/`delta`/`order` describe the point being solved; `history`
    /// backs any `TruncatableState` a device reads during `Load`.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        time: f64,
        delta: f64,
        order: usize,
        num_nodes: usize,
        num_branches: usize,
        coefficients: &IntegrationCoefficients,
        method_kind: MethodKind,
        history: &mut HistoryRing,
        initial_guess: DVector<f64>,
    ) -> Result<ControllerOutcome> {
        let mut solution = initial_guess;
        let size = num_nodes + num_branches;

        for iter in 0..self.criteria.max_iter {
            let mut mna = Mna::new(num_nodes, num_branches);
            {
                let mut state = StampState::new(
                    time,
                    delta,
                    order,
                    &solution,
                    num_nodes,
                    num_branches,
                    coefficients.clone(),
                    method_kind,
                    history,
                );
                for device in self.devices.iter() {
                    device.load(&mut state, &mut mna);
                }
            }

            let solved = if size >= SPARSE_THRESHOLD {
                solve_sparse(size, mna.triplets(), mna.rhs())
            } else {
                solve_dense(&mna.to_dense_matrix(), mna.rhs())
            };

            let next = match solved {
                Ok(x) => x,
                Err(_) => {
                    let residual = mna.residual(&solution);
                    debug!("Newton solve hit a singular matrix at t={time:.6e}s");
                    return Ok(ControllerOutcome::Diverged { residual });
                }
            };

            let converged = Self::converged(&solution, &next, self.criteria.rel_tol, self.criteria.abs_tol);
            trace!("Newton iter {iter}: converged={converged}");
            solution = next;

            if converged {
                return Ok(ControllerOutcome::Converged { iterations: iter + 1, solution });
            }
        }

        let mut mna = Mna::new(num_nodes, num_branches);
        {
            let mut state = StampState::new(
                time,
                delta,
                order,
                &solution,
                num_nodes,
                num_branches,
                coefficients.clone(),
                method_kind,
                history,
            );
            for device in self.devices.iter() {
                device.load(&mut state, &mut mna);
            }
        }
        let residual = mna.residual(&solution);
        Ok(ControllerOutcome::Diverged { residual })
    }

    fn converged(prev: &DVector<f64>, next: &DVector<f64>, rel_tol: f64, abs_tol: f64) -> bool {
        prev.iter().zip(next.iter()).all(|(p, n)| (n - p).abs() <= rel_tol * p.abs().max(n.abs()) + abs_tol)
    }
}
