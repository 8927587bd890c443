//! Linear resistive elements.

use engine_core::mna::Mna;
use engine_solver::{Load, StampState};

/// A linear resistor between `pos` and `neg` (either may be `None` for
/// ground).
#[derive(Debug, Clone)]
pub struct Resistor {
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub resistance: f64,
}

impl Resistor {
    pub fn new(pos: Option<usize>, neg: Option<usize>, resistance: f64) -> Self {
        Self { pos, neg, resistance }
    }
}

impl Load for Resistor {
    fn load(&self, _state: &mut StampState, mna: &mut Mna) {
        mna.stamp_conductance(self.pos, self.neg, 1.0 / self.resistance);
    }
}
