//! Concrete scenarios from the engine's testable-properties list, each
//! exercising `Simulation::run` with the reference device set.

use engine_devices::{Capacitor, Diode, Inductor, Resistor, VoltageSource, Waveform};
use engine_solver::config::{SpiceConfiguration, TimeConfiguration};
use engine_solver::method::{Gear, Trapezoidal};
use engine_solver::{Load, Simulation};
use nalgebra::DVector;

/// Scenario 1: RC discharge. R=1kΩ, C=1µF, v(n,0)=1V, no sources.
/// `v(n, t) = exp(-t/RC)` within `5 * RelTol`.
#[test]
fn rc_discharge_matches_exponential() {
    let r = 1_000.0;
    let c = 1e-6;
    let tau = r * c;
    let devices: Vec<Box<dyn Load>> = vec![Box::new(Resistor::new(Some(0), None, r)), Box::new(Capacitor::new(Some(0), None, c))];
    let spice_cfg = SpiceConfiguration::default();
    let sim = Simulation::new(devices, Box::new(Gear), TimeConfiguration::for_tstop(5.0 * tau), spice_cfg, 1, 0)
        .expect("configuration should be valid");

    let result = sim
        .run_with_initial_conditions(DVector::from_vec(vec![1.0]))
        .expect("RC discharge should converge");

    let mut prev_steps = 0;
    for point in &result.points {
        let expected = (-point.time / tau).exp();
        let actual = point.solution[0];
        assert!(
            (actual - expected).abs() < 5.0 * spice_cfg.rel_tol + spice_cfg.abs_tol,
            "t={}: expected {expected}, got {actual}",
            point.time
        );
        assert!(prev_steps <= result.total_steps);
        prev_steps = result.total_steps;
    }
}

/// Scenario 2: sine source into a resistor. Current through R equals
/// V/R at every accepted point, and the endpoints are hit exactly.
#[test]
fn sine_source_current_matches_ohms_law_and_hits_endpoints() {
    let r = 1_000.0;
    let devices: Vec<Box<dyn Load>> =
        vec![Box::new(Resistor::new(Some(0), None, r)), Box::new(VoltageSource::new(Some(0), None, 0, Waveform::sine(0.0, 1.0, 1000.0)))];
    let time_cfg = TimeConfiguration { init_time: 0.0, final_time: 2e-3, min_step: 1e-12, max_step: 10e-6 };
    let sim = Simulation::new(devices, Box::new(Gear), time_cfg, SpiceConfiguration::default(), 1, 1)
        .expect("configuration should be valid");

    let result = sim.run().expect("sine-driven resistor should converge");

    for point in &result.points {
        let v = point.solution[0];
        let i_through_r = v / r;
        let i_branch = point.solution[1];
        assert!((i_through_r + i_branch).abs() < 1e-6, "KCL mismatch at t={}", point.time);
    }
    assert!((result.points.first().unwrap().time - 0.0).abs() < 1e-15);
    assert!((result.points.last().unwrap().time - 2e-3).abs() < 1e-9);
}

/// Scenario 3: a pulse edge at `t = 1ms` must be landed on exactly, with
/// order reset to 1 on the accepted step right after.
#[test]
fn pulse_edge_is_hit_exactly_and_resets_order() {
    let r = 1_000.0;
    let c = 1e-6;
    let edge = 1e-3;
    let devices: Vec<Box<dyn Load>> = vec![
        Box::new(Resistor::new(Some(0), None, r)),
        Box::new(Capacitor::new(Some(0), None, c)),
        Box::new(VoltageSource::new(Some(0), None, 0, Waveform::pulse(0.0, 5.0, edge, 1e-9, 1e-9, 10e-3, 0.0))),
    ];
    let spice_cfg = SpiceConfiguration { max_order: 4, ..SpiceConfiguration::default() };
    let mut sim = Simulation::new(devices, Box::new(Gear), TimeConfiguration::for_tstop(2e-3), spice_cfg, 1, 1)
        .expect("configuration should be valid");
    sim.insert_breakpoint(edge);

    let result = sim.run().expect("pulse-driven RC should converge");

    let hit = result.points.iter().any(|p| (p.time - edge).abs() < 1e-12);
    assert!(hit, "no accepted point landed exactly on the pulse edge");

    let edge_idx = result.points.iter().position(|p| (p.time - edge).abs() < 1e-12).unwrap();
    if let Some(after_edge) = result.points.get(edge_idx + 1) {
        assert_eq!(after_edge.order, 1, "order should reset to 1 on the step after the edge");
    }
}

/// Scenario 4: a diode turn-on with a 1V step source and 1kΩ resistor.
/// Order rises to at least 2 within 5 accepted steps after the edge.
#[test]
fn diode_turn_on_raises_order_within_five_steps() {
    let devices: Vec<Box<dyn Load>> = vec![
        Box::new(Resistor::new(Some(0), Some(1), 1_000.0)),
        Box::new(Diode::new(Some(1), None)),
        Box::new(VoltageSource::dc(Some(0), None, 0, 1.0)),
    ];
    let spice_cfg = SpiceConfiguration { max_order: 4, ..SpiceConfiguration::default() };
    let sim = Simulation::new(devices, Box::new(Gear), TimeConfiguration::for_tstop(1e-3), spice_cfg, 2, 1)
        .expect("configuration should be valid");

    let result = sim.run().expect("diode circuit should converge within maxIter");

    let raised = result.points.iter().take(6).any(|p| p.order >= 2);
    assert!(raised, "order never rose to >= 2 within the first few accepted steps");
}

/// Scenario 6: an ideal LC oscillator. Energy drift stays below 1% over
/// many periods for both Gear and Trapezoidal.
#[test]
fn lc_oscillator_energy_drift_is_bounded() {
    let l = 1e-3;
    let c = 1e-9;
    let period = 2.0 * std::f64::consts::PI * (l * c).sqrt();
    let n_periods = 1000.0;

    for method in [Box::new(Gear) as Box<dyn engine_solver::IntegrationMethod>, Box::new(Trapezoidal)] {
        let devices: Vec<Box<dyn Load>> =
            vec![Box::new(Inductor::new(Some(0), None, l, 0)), Box::new(Capacitor::new(Some(0), None, c))];
        let time_cfg = TimeConfiguration { init_time: 0.0, final_time: n_periods * period, min_step: period * 1e-9, max_step: period / 20.0 };
        let sim = Simulation::new(devices, method, time_cfg, SpiceConfiguration::default(), 1, 1)
            .expect("configuration should be valid");

        let q0 = 1e-9;
        let mut ic = DVector::zeros(2);
        ic[0] = q0 / c;
        let result = sim.run_with_initial_conditions(ic).expect("LC oscillator should converge");

        let energy = |p: &engine_solver::TimePoint| {
            let v = p.solution[0];
            let i = p.solution[1];
            0.5 * c * v * v + 0.5 * l * i * i
        };
        let e0 = energy(&result.points[0]);
        let e_final = energy(result.points.last().unwrap());
        let drift = ((e_final - e0) / e0).abs();
        assert!(drift <= 0.01, "energy drift {drift} exceeds 1%");
    }
}
