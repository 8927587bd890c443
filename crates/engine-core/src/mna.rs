//! Modified Nodal Analysis matrix assembly — the sparse matrix contract
//! devices and the iteration controller share.

use nalgebra::{DMatrix, DVector};

/// A stable handle to one `(row, col)` entry of an [`Mna`] system.
///
/// Handles stay valid for the lifetime of the system: assembly is
/// triplet-based, so returning a handle never invalidates ones already
/// given out. A device may fetch its handles once during `Setup` and reuse
/// them for every `Load` call in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixHandle {
    pub row: usize,
    pub col: usize,
}

/// One linearization of the circuit's Modified Nodal Analysis system.
///
/// Node 0 (ground) is eliminated before this type ever sees a node: every
/// node argument is `Option<usize>`, with `None` meaning ground. Unknowns
/// `[0, num_nodes)` are node voltages; `[num_nodes, num_nodes+num_branches)`
/// are auxiliary branch currents for voltage-defined elements (independent
/// voltage sources, inductors modeled with an explicit branch unknown).
#[derive(Debug, Clone)]
pub struct Mna {
    num_nodes: usize,
    num_branches: usize,
    pub(crate) triplets: Vec<(usize, usize, f64)>,
    rhs: DVector<f64>,
}

impl Mna {
    pub fn new(num_nodes: usize, num_branches: usize) -> Self {
        let size = num_nodes + num_branches;
        Self {
            num_nodes,
            num_branches,
            triplets: Vec::new(),
            rhs: DVector::zeros(size),
        }
    }

    pub fn size(&self) -> usize {
        self.num_nodes + self.num_branches
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    pub fn triplets(&self) -> &[(usize, usize, f64)] {
        &self.triplets
    }

    /// Clear the matrix and RHS for a fresh stamp pass, keeping allocation.
    pub fn clear(&mut self) {
        self.triplets.clear();
        self.rhs.fill(0.0);
    }

    fn add(&mut self, row: Option<usize>, col: Option<usize>, value: f64) {
        if let (Some(r), Some(c)) = (row, col) {
            self.triplets.push((r, c, value));
        }
    }

    /// Return a handle for repeated stamping at `(row, col)`. Ground
    /// (`None`) participants collapse to a no-op when the handle is used.
    pub fn get_element(&self, row: Option<usize>, col: Option<usize>) -> Option<MatrixHandle> {
        match (row, col) {
            (Some(row), Some(col)) => Some(MatrixHandle { row, col }),
            _ => None,
        }
    }

    pub fn add_at(&mut self, handle: Option<MatrixHandle>, value: f64) {
        if let Some(h) = handle {
            self.triplets.push((h.row, h.col, value));
        }
    }

    /// Stamp a conductance `g` between two nodes (either may be ground).
    pub fn stamp_conductance(&mut self, pos: Option<usize>, neg: Option<usize>, g: f64) {
        self.add(pos, pos, g);
        self.add(neg, neg, g);
        self.add(pos, neg, -g);
        self.add(neg, pos, -g);
    }

    /// Stamp an independent current source of magnitude `i` flowing from
    /// `from` to `to` (contributes `+i` at `to`, `-i` at `from`).
    pub fn stamp_current_source(&mut self, from: Option<usize>, to: Option<usize>, i: f64) {
        if let Some(t) = to {
            self.rhs[t] += i;
        }
        if let Some(f) = from {
            self.rhs[f] -= i;
        }
    }

    /// Stamp a voltage-defined branch whose equation is
    /// `v(pos) - v(neg) - coeff * i(branch) = rhs_value`, with branch
    /// current flowing from `pos` to `neg` through the node KCL rows. A
    /// pure independent voltage source uses `coeff = 0.0`; a companion
    /// inductor uses `coeff = L * g_eq`.
    pub fn stamp_branch(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        branch_idx: usize,
        coeff: f64,
        rhs_value: f64,
    ) {
        let row = self.num_nodes + branch_idx;
        if let Some(p) = pos {
            self.triplets.push((row, p, 1.0));
            self.triplets.push((p, row, 1.0));
        }
        if let Some(n) = neg {
            self.triplets.push((row, n, -1.0));
            self.triplets.push((n, row, -1.0));
        }
        if coeff != 0.0 {
            self.triplets.push((row, row, -coeff));
        }
        self.rhs[row] += rhs_value;
    }

    /// Stamp an independent voltage source `v(pos) - v(neg) = value`.
    pub fn stamp_voltage_source(&mut self, pos: Option<usize>, neg: Option<usize>, branch_idx: usize, value: f64) {
        self.stamp_branch(pos, neg, branch_idx, 0.0, value);
    }

    pub fn to_dense_matrix(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.size(), self.size());
        for &(r, c, v) in &self.triplets {
            m[(r, c)] += v;
        }
        m
    }

    /// Infinity-norm residual `||Ax - b||` for diagnosing non-convergence.
    pub fn residual(&self, x: &DVector<f64>) -> f64 {
        let a = self.to_dense_matrix();
        let r = a * x - &self.rhs;
        r.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}
