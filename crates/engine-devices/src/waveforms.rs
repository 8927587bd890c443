//! Time-domain waveforms for independent sources (SPICE PULSE/SIN).

/// A source's value as a function of simulation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Dc(f64),
    /// `PULSE(v1 v2 td tr tf pw per)`. `per == 0.0` means one-shot (no
    /// repeat after the first period).
    Pulse { v1: f64, v2: f64, td: f64, tr: f64, tf: f64, pw: f64, per: f64 },
    /// `SIN(vo va freq td theta phase)`.
    Sine { vo: f64, va: f64, freq: f64, td: f64, theta: f64, phase: f64 },
}

impl Waveform {
    pub fn dc(value: f64) -> Self {
        Waveform::Dc(value)
    }

    pub fn pulse(v1: f64, v2: f64, td: f64, tr: f64, tf: f64, pw: f64, per: f64) -> Self {
        Waveform::Pulse { v1, v2, td, tr, tf, pw, per }
    }

    pub fn sine(vo: f64, va: f64, freq: f64) -> Self {
        Waveform::Sine { vo, va, freq, td: 0.0, theta: 0.0, phase: 0.0 }
    }

    pub fn sine_full(vo: f64, va: f64, freq: f64, td: f64, theta: f64, phase: f64) -> Self {
        Waveform::Sine { vo, va, freq, td, theta, phase }
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        match *self {
            Waveform::Dc(v) => v,
            Waveform::Pulse { v1, v2, td, tr, tf, pw, per } => {
                let t = if per > 0.0 && t > td + per { td + (t - td) % per } else { t };
                if t < td {
                    v1
                } else if t < td + tr {
                    v1 + (v2 - v1) * (t - td) / tr.max(f64::MIN_POSITIVE)
                } else if t < td + tr + pw {
                    v2
                } else if t < td + tr + pw + tf {
                    v2 + (v1 - v2) * (t - td - tr - pw) / tf.max(f64::MIN_POSITIVE)
                } else {
                    v1
                }
            }
            Waveform::Sine { vo, va, freq, td, theta, phase } => {
                if t < td {
                    vo + va * (phase.to_radians()).sin()
                } else {
                    let damp = if theta > 0.0 { (-(t - td) * theta).exp() } else { 1.0 };
                    let angle = std::f64::consts::TAU * freq * (t - td) + phase.to_radians();
                    vo + va * damp * angle.sin()
                }
            }
        }
    }

    /// Times within `(0, until]` where this waveform's derivative is
    /// discontinuous, so the integrator can register them as breakpoints
    /// and land on them exactly instead of stepping through the corner.
    pub fn edges(&self, until: f64) -> Vec<f64> {
        match *self {
            Waveform::Dc(_) | Waveform::Sine { .. } => Vec::new(),
            Waveform::Pulse { td, tr, tf, pw, per, .. } => {
                let mut edges = Vec::new();
                let base = [td, td + tr, td + tr + pw, td + tr + pw + tf];
                if per <= 0.0 {
                    edges.extend(base.iter().copied().filter(|&t| t > 0.0 && t <= until));
                    return edges;
                }
                let mut cycle_start = 0.0;
                while cycle_start <= until {
                    for &offset in &base {
                        let t = cycle_start + offset;
                        if t > 0.0 && t <= until {
                            edges.push(t);
                        }
                    }
                    cycle_start += per;
                }
                edges
            }
        }
    }
}
