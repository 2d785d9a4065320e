// LP relaxation of a binary program, solved by a bounded-variable dual
// simplex on a dense tableau.
//
// Row `r` becomes `a.x + s_r = b` with `s_r >= 0` for `<=`, `s_r <= 0` for
// `>=` and `s_r = 0` for `==`. Rows are scaled so their largest structural
// coefficient is 1. The starting basis is all slacks with every structural at
// the bound its objective prefers. That basis is dual feasible, and fixing a
// variable never breaks dual feasibility, so a copy of a solved relaxation
// re-optimizes after new fixings with dual pivots alone.

use super::{BinaryProgram, Sense};

const PRIMAL_TOL: f64 = 1e-9;
const PIVOT_TOL: f64 = 1e-9;
const RATIO_TIE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Basic(usize),
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LpOutcome {
    Optimal,
    Infeasible,
    /// Pivot budget ran out; the current point proves nothing.
    IterationLimit,
}

/// Maximize `c.x` over `0 <= x <= 1` and the program's rows, in minimization
/// form internally (`reduced` holds reduced costs of `-c`).
#[derive(Debug, Clone)]
pub(crate) struct Relaxation {
    rows: usize,
    structurals: usize,
    cols: usize,
    /// `B^-1 [A | I]`, row-major.
    tableau: Vec<f64>,
    basis: Vec<usize>,
    status: Vec<Status>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// Values of the basic variables, by row.
    beta: Vec<f64>,
    reduced: Vec<f64>,
}

impl Relaxation {
    pub(crate) fn new(program: &BinaryProgram) -> Self {
        let n = program.num_vars();
        let m = program.constraints.len();
        let cols = n + m;

        let mut tableau = vec![0.0; m * cols];
        let mut beta = vec![0.0; m];
        let mut lower = vec![0.0; cols];
        let mut upper = vec![1.0; cols];
        let mut status = vec![Status::Lower; cols];
        let mut reduced = vec![0.0; cols];

        for (j, &c) in program.objective.iter().enumerate() {
            reduced[j] = -c;
            if c > 0.0 {
                status[j] = Status::Upper;
            }
        }

        for (r, constraint) in program.constraints.iter().enumerate() {
            let row = &mut tableau[r * cols..(r + 1) * cols];
            for &(j, a) in &constraint.terms {
                row[j] += a;
            }
            let largest = row[..n].iter().fold(0.0_f64, |acc, a| acc.max(a.abs()));
            let scale = if largest > 0.0 { largest } else { 1.0 };
            for a in &mut row[..n] {
                *a /= scale;
            }
            row[n + r] = 1.0;

            let at_start: f64 = (0..n)
                .filter(|&j| status[j] == Status::Upper)
                .map(|j| row[j])
                .sum();
            beta[r] = constraint.rhs / scale - at_start;

            let (lo, hi) = match constraint.sense {
                Sense::Le => (0.0, f64::INFINITY),
                Sense::Ge => (f64::NEG_INFINITY, 0.0),
                Sense::Eq => (0.0, 0.0),
            };
            lower[n + r] = lo;
            upper[n + r] = hi;
            status[n + r] = Status::Basic(r);
        }

        Self {
            rows: m,
            structurals: n,
            cols,
            tableau,
            basis: (n..cols).collect(),
            status,
            lower,
            upper,
            beta,
            reduced,
        }
    }

    pub(crate) fn is_fixed(&self, j: usize) -> bool {
        self.lower[j] == self.upper[j]
    }

    /// The bound a nonbasic variable sits at, `None` when basic.
    pub(crate) fn nonbasic_value(&self, j: usize) -> Option<f64> {
        match self.status[j] {
            Status::Basic(_) => None,
            Status::Lower => Some(self.lower[j]),
            Status::Upper => Some(self.upper[j]),
        }
    }

    /// Minimization-form reduced cost: how much the maximized objective
    /// drops per unit a nonbasic variable moves off its bound.
    pub(crate) fn reduced_cost(&self, j: usize) -> f64 {
        self.reduced[j]
    }

    fn value(&self, j: usize) -> f64 {
        match self.status[j] {
            Status::Basic(r) => self.beta[r],
            Status::Lower => self.lower[j],
            Status::Upper => self.upper[j],
        }
    }

    /// Structural values, clamped into their bounds.
    pub(crate) fn values(&self) -> Vec<f64> {
        (0..self.structurals)
            .map(|j| self.value(j).clamp(self.lower[j], self.upper[j]))
            .collect()
    }

    pub(crate) fn objective(&self, objective: &[f64]) -> f64 {
        self.values().iter().zip(objective).map(|(x, c)| x * c).sum()
    }

    /// Fix variable `j` to `value` for this relaxation and its copies.
    pub(crate) fn fix(&mut self, j: usize, value: f64) {
        let previous = self.nonbasic_value(j);
        self.lower[j] = value;
        self.upper[j] = value;
        if let Some(old) = previous {
            self.status[j] = Status::Lower;
            let step = value - old;
            if step != 0.0 {
                for r in 0..self.rows {
                    self.beta[r] -= self.tableau[r * self.cols + j] * step;
                }
            }
        }
    }

    /// Dual simplex until the basis is primal feasible or shown infeasible.
    pub(crate) fn solve(&mut self) -> LpOutcome {
        let budget = 50 * (self.rows + self.cols) + 100;
        for _ in 0..budget {
            let Some((r, to_lower)) = self.leaving_row() else {
                return LpOutcome::Optimal;
            };
            let Some(q) = self.entering_column(r, to_lower) else {
                return LpOutcome::Infeasible;
            };
            self.pivot(r, q, to_lower);
        }
        LpOutcome::IterationLimit
    }

    /// Most infeasible basic variable, and whether it sits below its lower bound.
    fn leaving_row(&self) -> Option<(usize, bool)> {
        let mut found = None;
        let mut worst = PRIMAL_TOL;
        for r in 0..self.rows {
            let j = self.basis[r];
            let v = self.beta[r];
            let (gap, to_lower) = if v < self.lower[j] {
                (self.lower[j] - v, true)
            } else if v > self.upper[j] {
                (v - self.upper[j], false)
            } else {
                continue;
            };
            if gap > worst {
                worst = gap;
                found = Some((r, to_lower));
            }
        }
        found
    }

    /// Dual ratio test over nonbasic, unfixed columns of row `r`.
    fn entering_column(&self, r: usize, to_lower: bool) -> Option<usize> {
        let row = &self.tableau[r * self.cols..(r + 1) * self.cols];
        let mut best: Option<(usize, f64, f64)> = None;
        for (j, &a) in row.iter().enumerate() {
            let at_upper = match self.status[j] {
                Status::Basic(_) => continue,
                Status::Lower => false,
                Status::Upper => true,
            };
            if self.is_fixed(j) || a.abs() <= PIVOT_TOL {
                continue;
            }
            // The leaving variable must move toward its violated bound.
            let eligible = if to_lower {
                (a < 0.0) != at_upper
            } else {
                (a > 0.0) != at_upper
            };
            if !eligible {
                continue;
            }
            let ratio = (self.reduced[j] / a).abs();
            let better = match best {
                None => true,
                Some((_, r0, a0)) => {
                    ratio < r0 - RATIO_TIE || (ratio <= r0 + RATIO_TIE && a.abs() > a0)
                }
            };
            if better {
                best = Some((j, ratio, a.abs()));
            }
        }
        best.map(|(j, _, _)| j)
    }

    fn pivot(&mut self, r: usize, q: usize, to_lower: bool) {
        let cols = self.cols;
        let leaving = self.basis[r];
        let target = if to_lower {
            self.lower[leaving]
        } else {
            self.upper[leaving]
        };
        let alpha = self.tableau[r * cols + q];
        let step = (self.beta[r] - target) / alpha;
        let entering_value = self.value(q) + step;

        for i in 0..self.rows {
            self.beta[i] -= self.tableau[i * cols + q] * step;
        }
        self.beta[r] = entering_value;

        for a in &mut self.tableau[r * cols..(r + 1) * cols] {
            *a /= alpha;
        }
        let pivot_row = self.tableau[r * cols..(r + 1) * cols].to_vec();
        for i in 0..self.rows {
            if i == r {
                continue;
            }
            let factor = self.tableau[i * cols + q];
            if factor == 0.0 {
                continue;
            }
            let row = &mut self.tableau[i * cols..(i + 1) * cols];
            for (a, p) in row.iter_mut().zip(&pivot_row) {
                *a -= factor * p;
            }
            row[q] = 0.0;
        }

        let dq = self.reduced[q];
        if dq != 0.0 {
            for (d, p) in self.reduced.iter_mut().zip(&pivot_row) {
                *d -= dq * p;
            }
        }
        self.reduced[q] = 0.0;

        self.status[leaving] = if to_lower { Status::Lower } else { Status::Upper };
        self.status[q] = Status::Basic(r);
        self.basis[r] = q;
    }
}
