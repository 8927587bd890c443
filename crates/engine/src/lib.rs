//! `spicier-engine`: the public face of the Spicier transient simulation
//! engine. Re-exports the MNA assembly layer (`engine-core`), the Gear/
//! trapezoidal integrator and `Simulation` driver (`engine-solver`), and the
//! reference device set (`engine-devices`) a caller wires together to build
//! and run a circuit.

pub use engine_core::{mna, Error as CoreError, Result as CoreResult};
pub use engine_core::mna::{MatrixHandle, Mna};

pub use engine_solver::{
    behavior, breakpoints, coefficients, config, controller, history, method, result, truncatable,
    ConvergenceCriteria, DerivativeHandle, Error as SolverError, Gear, IntegrationMethod, Load,
    MethodContext, MethodKind, Result as SolverResult, SetupContext, Simulation, SimulationResult,
    SpiceConfiguration, StampState, TimeConfiguration, TimePoint, Trapezoidal, TruncatableState,
};

pub use engine_devices::{Capacitor, CurrentSource, Diode, Inductor, Resistor, VoltageSource, Waveform};

#[cfg(test)]
mod tests {
    use super::*;

    /// End-to-end smoke test: a Norton source (1mA into 1kΩ) charging a
    /// 1µF capacitor should settle near `I * R = 1V` after several time
    /// constants, exercising `Simulation::run` across crate boundaries
    /// (not just in-crate unit tests).
    #[test]
    fn rc_charging_settles_toward_norton_voltage() {
        let r = 1_000.0;
        let c = 1e-6;
        let i = 1e-3;
        let tau = r * c;
        let devices: Vec<Box<dyn Load>> = vec![
            Box::new(Resistor::new(Some(0), None, r)),
            Box::new(Capacitor::new(Some(0), None, c)),
            Box::new(CurrentSource::dc(None, Some(0), i)),
        ];
        let sim = Simulation::new(
            devices,
            Box::new(Gear),
            TimeConfiguration::for_tstop(8.0 * tau),
            SpiceConfiguration::default(),
            1,
            0,
        )
        .expect("configuration should be valid");
        let result = sim.run().expect("simulation should converge");
        let final_voltage = result.points.last().unwrap().solution[0];
        assert!((final_voltage - i * r).abs() < 1e-3, "final_voltage = {final_voltage}");
    }
}
