//! The integration-state history ring (`spec.md` §3).

use nalgebra::DVector;

/// One tracked dynamic quantity's value at a point in history, together
/// with the derivative estimate `Integrate` produced there.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackedEntry {
    pub value: f64,
    pub deriv: f64,
}

/// One snapshot in the history ring: the accepted (or tentatively probed)
/// solution vector at a point in time, plus every tracked quantity's value
/// and derivative estimate at that point.
#[derive(Debug, Clone)]
pub struct IntegrationState {
    pub time: f64,
    pub delta: f64,
    pub solution: DVector<f64>,
    pub tracked: Vec<TrackedEntry>,
}

impl IntegrationState {
    fn new(unknowns: usize, num_tracked: usize) -> Self {
        Self {
            time: 0.0,
            delta: 0.0,
            solution: DVector::zeros(unknowns),
            tracked: vec![TrackedEntry::default(); num_tracked],
        }
    }
}

/// Fixed-capacity ring of `IntegrationState` snapshots, `MaxOrder + 2` deep.
///
/// `state(0)` is the point currently being solved for (the most recent
/// `Probe`); `state(i)` for `i > 0` is `i` accepted points back in time.
/// `shift` rotates the ring in O(1) by moving a cursor rather than copying.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: Vec<IntegrationState>,
    cursor: usize,
    unknowns: usize,
}

impl HistoryRing {
    pub fn new(max_order: usize, unknowns: usize) -> Self {
        let len = max_order + 2;
        let slots = (0..len).map(|_| IntegrationState::new(unknowns, 0)).collect();
        Self { slots, cursor: 0, unknowns }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn num_tracked(&self) -> usize {
        self.slots[self.cursor].tracked.len()
    }

    fn index(&self, i: usize) -> usize {
        (self.cursor + i) % self.slots.len()
    }

    pub fn state(&self, i: usize) -> &IntegrationState {
        &self.slots[self.index(i)]
    }

    pub fn state_mut(&mut self, i: usize) -> &mut IntegrationState {
        let idx = self.index(i);
        &mut self.slots[idx]
    }

    pub fn current(&self) -> &IntegrationState {
        self.state(0)
    }

    pub fn current_mut(&mut self) -> &mut IntegrationState {
        self.state_mut(0)
    }

    /// Register a new tracked dynamic quantity, extending every slot's
    /// `tracked` row by one entry. Returns the new column index.
    pub fn push_tracked_column(&mut self) -> usize {
        let idx = self.slots[0].tracked.len();
        for slot in self.slots.iter_mut() {
            slot.tracked.push(TrackedEntry::default());
        }
        idx
    }

    /// Rotate the ring: the just-probed `state(0)` becomes `state(1)`, and
    /// so on; the slot that falls off the back is recycled as the new
    /// `state(0)`, ready for the next `Probe` to overwrite.
    pub fn shift(&mut self) {
        self.cursor = (self.cursor + self.slots.len() - 1) % self.slots.len();
    }

    /// Reset all history to the given initial solution at `t = init_time`,
    /// with every past delta set to zero (`Initialize`, `spec.md` §4.1).
    pub fn initialize(&mut self, init_time: f64, solution: &DVector<f64>) {
        for i in 0..self.slots.len() {
            let slot = self.state_mut(i);
            slot.time = init_time;
            slot.delta = 0.0;
            slot.solution = solution.clone();
            for entry in slot.tracked.iter_mut() {
                *entry = TrackedEntry::default();
            }
        }
    }

    pub fn unknowns(&self) -> usize {
        self.unknowns
    }

    /// Copy `state(0)`'s tracked *values* (not derivatives) into every slot.
    ///
    /// Used once, right after seeding the DC/initial-condition solution: a
    /// `Load` pass at that solution populates only `state(0)`'s tracked
    /// entries, but a capacitor/inductor's companion model reads history
    /// slots `state(1)`, `state(2)`, … on the very first transient step.
    /// Without this, those slots would still hold the `default()` (zero)
    /// value `initialize` left them at, and the device would see its
    /// initial voltage/current as having been zero all along.
    pub fn broadcast_tracked_values(&mut self) {
        let values: Vec<f64> = self.slots[self.index(0)].tracked.iter().map(|t| t.value).collect();
        for slot in self.slots.iter_mut() {
            for (entry, v) in slot.tracked.iter_mut().zip(values.iter()) {
                entry.value = *v;
            }
        }
    }
}
