//! The `Simulation` driver: `Idle -> DcOperatingPoint -> TransientEntry ->
//! TimeLoop -> Done` (`spec.md` §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use engine_core::mna::Mna;
use log::info;
use nalgebra::DVector;

use crate::behavior::{Load, StampState};
use crate::coefficients::IntegrationCoefficients;
use crate::config::{ConvergenceCriteria, SpiceConfiguration, TimeConfiguration};
use crate::controller::{ControllerOutcome, IterationController};
use crate::error::{Error, Result};
use crate::method::MethodContext;
use crate::result::{SimulationResult, TimePoint};

/// A fully wired circuit ready to run: its devices, the time/tolerance
/// configuration, and the integration method driving it.
///
/// There is no ambient device registry; devices are handed in explicitly
/// and `setup` is called on each exactly once before the DC operating
/// point is solved.
pub struct Simulation {
    devices: Vec<Box<dyn Load>>,
    method_ctx: MethodContext,
    time_cfg: TimeConfiguration,
    spice_cfg: SpiceConfiguration,
    convergence: ConvergenceCriteria,
    num_nodes: usize,
    num_branches: usize,
    stop_requested: Arc<AtomicBool>,
}

impl Simulation {
    /// Fatal at setup (`spec.md` §7, `Misconfigured`) if the time bounds or
    /// tolerances are internally inconsistent.
    pub fn new(
        devices: Vec<Box<dyn Load>>,
        method: Box<dyn crate::method::IntegrationMethod>,
        time_cfg: TimeConfiguration,
        spice_cfg: SpiceConfiguration,
        num_nodes: usize,
        num_branches: usize,
    ) -> Result<Self> {
        if time_cfg.final_time <= time_cfg.init_time {
            return Err(Error::Misconfigured(format!(
                "final_time ({}) must be greater than init_time ({})",
                time_cfg.final_time, time_cfg.init_time
            )));
        }
        if time_cfg.min_step <= 0.0 || time_cfg.max_step <= 0.0 || time_cfg.min_step > time_cfg.max_step {
            return Err(Error::Misconfigured(format!(
                "min_step ({}) and max_step ({}) must be positive with min_step <= max_step",
                time_cfg.min_step, time_cfg.max_step
            )));
        }
        if spice_cfg.rel_tol < 0.0 || spice_cfg.abs_tol < 0.0 {
            return Err(Error::Misconfigured("rel_tol and abs_tol must be non-negative".to_string()));
        }
        if spice_cfg.max_order == 0 {
            return Err(Error::Misconfigured("max_order must be at least 1".to_string()));
        }

        let unknowns = num_nodes + num_branches;
        let method_ctx = MethodContext::new(method, time_cfg, spice_cfg, unknowns);
        Ok(Self {
            devices,
            method_ctx,
            time_cfg,
            spice_cfg,
            convergence: ConvergenceCriteria::from(spice_cfg),
            num_nodes,
            num_branches,
            stop_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A clone of the cooperative cancellation flag; the caller can set
    /// this from another thread to stop the run at the next checkpoint.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_requested)
    }

    /// Register an additional time the integrator must land on exactly
    /// (e.g. a waveform edge), beyond `init_time`/`final_time`.
    pub fn insert_breakpoint(&mut self, time: f64) {
        self.method_ctx.breakpoints.insert(time);
    }

    fn stopped(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// Run `setup` on every device once, solve the DC operating point
    /// (`delta == 0.0`, relying on the zero-delta guard in
    /// `TruncatableState::integrate_*`), seed transient history from it,
    /// then step through `[init_time, final_time]`.
    pub fn run(self) -> Result<SimulationResult> {
        self.run_from(None)
    }

    /// Skip the DC operating-point solve and seed transient history
    /// directly from `initial_conditions` (SPICE `.IC`/`UIC`), grounded in
    /// the teacher CLI's `uic` branch in `analysis/transient.rs`.
    pub fn run_with_initial_conditions(self, initial_conditions: DVector<f64>) -> Result<SimulationResult> {
        self.run_from(Some(initial_conditions))
    }

    fn run_from(mut self, initial_conditions: Option<DVector<f64>>) -> Result<SimulationResult> {
        {
            let mut ctx = self.method_ctx.setup_context();
            for device in self.devices.iter_mut() {
                device.setup(&mut ctx)?;
            }
        }

        let dc_solution = match initial_conditions {
            Some(ic) => ic,
            None => self.solve_dc()?,
        };
        self.method_ctx.initialize(&dc_solution, self.time_cfg.init_time);
        self.seed_tracked_history();

        let mut result = SimulationResult {
            points: vec![TimePoint { time: self.time_cfg.init_time, solution: dc_solution, order: 1 }],
            num_nodes: self.num_nodes,
            total_steps: 0,
            rejected_steps: 0,
            min_step_used: f64::INFINITY,
            max_step_used: 0.0,
        };

        let mut delta = self.time_cfg.max_step.min(
            (self.time_cfg.final_time - self.time_cfg.init_time).max(self.time_cfg.min_step),
        );
        self.method_ctx.continue_step(&mut delta, &self.time_cfg);

        while self.method_ctx.history.state(1).time < self.time_cfg.final_time && !self.stopped() {
            let (accepted_time, delta_next) = self.step(&mut delta, &mut result)?;
            if accepted_time >= self.time_cfg.final_time {
                break;
            }
            delta = delta_next;
        }

        info!(
            "simulation finished at t={:.6e}s after {} steps ({} rejected)",
            self.method_ctx.history.state(1).time,
            result.total_steps,
            result.rejected_steps
        );
        Ok(result)
    }

    /// After `Initialize` seeds `state(0).solution` with the DC/initial-
    /// condition solution, every history slot's tracked *values* are still
    /// the `default()` (zero) `HistoryRing::initialize` left them at. Run
    /// one `Load` pass at that solution (`delta == 0.0`, so no companion
    /// model is engaged) to populate `state(0)`'s tracked entries from it,
    /// then broadcast those into every other slot — otherwise a
    /// capacitor/inductor's companion model would see its initial
    /// voltage/current as having been zero all along on the first
    /// transient step.
    fn seed_tracked_history(&mut self) {
        let solution = self.method_ctx.history.current().solution.clone();
        let coefficients = IntegrationCoefficients { order: 0, a: Vec::new() };
        let method_kind = self.method_ctx.kind();
        let mut mna = Mna::new(self.num_nodes, self.num_branches);
        {
            let mut state = StampState::new(
                self.time_cfg.init_time,
                0.0,
                1,
                &solution,
                self.num_nodes,
                self.num_branches,
                coefficients,
                method_kind,
                &mut self.method_ctx.history,
            );
            for device in self.devices.iter() {
                device.load(&mut state, &mut mna);
            }
        }
        self.method_ctx.history.broadcast_tracked_values();
    }

    fn solve_dc(&mut self) -> Result<DVector<f64>> {
        let unknowns = self.num_nodes + self.num_branches;
        // `delta == 0.0` short-circuits every `TruncatableState::integrate_*`
        // before these coefficients are ever read; the placeholder order/`a`
        // values are never consulted.
        let coefficients = IntegrationCoefficients { order: 0, a: Vec::new() };
        let method_kind = self.method_ctx.kind();
        self.method_ctx.history.current_mut().time = self.time_cfg.init_time;
        self.method_ctx.history.current_mut().delta = 0.0;

        let mut controller = IterationController { devices: &mut self.devices, criteria: self.convergence };
        let outcome = controller.run(
            self.time_cfg.init_time,
            0.0,
            1,
            self.num_nodes,
            self.num_branches,
            &coefficients,
            method_kind,
            &mut self.method_ctx.history,
            DVector::zeros(unknowns),
        )?;

        match outcome {
            ControllerOutcome::Converged { solution, .. } => Ok(solution),
            ControllerOutcome::Diverged { residual } => {
                Err(Error::NonConvergence { time: self.time_cfg.init_time, residual })
            }
        }
    }

    /// Attempt one accepted timepoint, retrying on rejection or
    /// non-convergence until either it succeeds or `delta` collapses below
    /// `MinStep`. Returns the accepted time and the delta to try next.
    fn step(&mut self, delta: &mut f64, result: &mut SimulationResult) -> Result<(f64, f64)> {
        loop {
            if self.stopped() {
                return Ok((self.method_ctx.history.state(1).time, *delta));
            }

            let remaining = self.time_cfg.final_time - self.method_ctx.history.state(1).time;
            *delta = delta.min(remaining.max(self.time_cfg.min_step));
            self.method_ctx.continue_step(delta, &self.time_cfg);

            let coefficients = self.method_ctx.probe(*delta);
            let method_kind = self.method_ctx.kind();
            let order = self.method_ctx.order;
            let guess = self.method_ctx.history.current().solution.clone();

            let mut controller = IterationController { devices: &mut self.devices, criteria: self.convergence };
            let outcome = controller.run(
                self.method_ctx.history.current().time,
                *delta,
                order,
                self.num_nodes,
                self.num_branches,
                &coefficients,
                method_kind,
                &mut self.method_ctx.history,
                guess,
            )?;

            match outcome {
                ControllerOutcome::Diverged { residual } => {
                    let next_delta = self.method_ctx.non_convergence();
                    if next_delta < self.time_cfg.min_step {
                        let time = self.method_ctx.history.current().time;
                        return Err(Error::NonConvergence { time, residual });
                    }
                    result.rejected_steps += 1;
                    *delta = next_delta;
                    continue;
                }
                ControllerOutcome::Converged { solution, .. } => {
                    self.method_ctx.history.current_mut().solution = solution.clone();
                    let (accept, delta_next) = self.method_ctx.evaluate(&self.spice_cfg, &self.time_cfg);

                    if !accept {
                        result.rejected_steps += 1;
                        if delta_next < self.time_cfg.min_step {
                            let time = self.method_ctx.history.current().time;
                            return Err(Error::TimestepTooSmall { time, min_step: self.time_cfg.min_step });
                        }
                        *delta = delta_next;
                        continue;
                    }

                    let accepted_time = self.method_ctx.history.current().time;
                    self.method_ctx.accept();
                    result.points.push(TimePoint { time: accepted_time, solution, order });
                    result.total_steps += 1;
                    result.min_step_used = result.min_step_used.min(*delta);
                    result.max_step_used = result.max_step_used.max(*delta);
                    return Ok((accepted_time, delta_next));
                }
            }
        }
    }
}
