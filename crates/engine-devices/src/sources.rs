//! Independent sources.

use engine_core::mna::Mna;
use engine_solver::{Load, SetupContext, StampState};

use crate::waveforms::Waveform;

/// An independent voltage source driven by a time-domain [`Waveform`].
/// Requires one MNA branch-current unknown, same as the teacher's
/// independent-voltage-source stamp.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub branch_idx: usize,
    pub waveform: Waveform,
}

impl VoltageSource {
    pub fn new(pos: Option<usize>, neg: Option<usize>, branch_idx: usize, waveform: Waveform) -> Self {
        Self { pos, neg, branch_idx, waveform }
    }

    pub fn dc(pos: Option<usize>, neg: Option<usize>, branch_idx: usize, value: f64) -> Self {
        Self::new(pos, neg, branch_idx, Waveform::dc(value))
    }
}

impl Load for VoltageSource {
    /// `SetBreakpoint` (`spec.md` §6): land exactly on every waveform
    /// discontinuity instead of stepping through it.
    fn setup(&mut self, ctx: &mut SetupContext) -> engine_core::Result<()> {
        for edge in self.waveform.edges(ctx.final_time()) {
            ctx.insert_breakpoint(edge);
        }
        Ok(())
    }

    fn load(&self, state: &mut StampState, mna: &mut Mna) {
        let value = self.waveform.evaluate(state.time);
        mna.stamp_voltage_source(self.pos, self.neg, self.branch_idx, value);
    }
}

/// An independent current source driven by a time-domain [`Waveform`],
/// injected from `pos` to `neg`. Needs no auxiliary unknown.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub waveform: Waveform,
}

impl CurrentSource {
    pub fn new(pos: Option<usize>, neg: Option<usize>, waveform: Waveform) -> Self {
        Self { pos, neg, waveform }
    }

    pub fn dc(pos: Option<usize>, neg: Option<usize>, value: f64) -> Self {
        Self::new(pos, neg, Waveform::dc(value))
    }
}

impl Load for CurrentSource {
    fn setup(&mut self, ctx: &mut SetupContext) -> engine_core::Result<()> {
        for edge in self.waveform.edges(ctx.final_time()) {
            ctx.insert_breakpoint(edge);
        }
        Ok(())
    }

    fn load(&self, state: &mut StampState, mna: &mut Mna) {
        let value = self.waveform.evaluate(state.time);
        mna.stamp_current_source(self.pos, self.neg, value);
    }
}
