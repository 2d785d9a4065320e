// Binary integer programming: model types and the solver seam.
//
// The roster optimizer only builds a `BinaryProgram`; any backend that
// implements `MipSolver` can solve it.

pub mod branch_bound;
mod simplex;

pub use branch_bound::BranchAndBound;

use std::time::Duration;
use thiserror::Error;

/// A solver value within this distance of 1.0 counts as "selected".
pub const SELECTION_TOLERANCE: f64 = 0.01;

/// Absolute slack allowed when a candidate is checked against the original
/// rows. It sits far below one unit of any integral row such as salary.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `sum <= rhs`
    Le,
    /// `sum >= rhs`
    Ge,
    /// `sum == rhs`
    Eq,
}

/// `sum(coef * x[var]) <sense> rhs`. Terms are sparse (var index, coefficient).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(name: impl Into<String>, terms: Vec<(usize, f64)>, sense: Sense, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            sense,
            rhs,
        }
    }

    /// Left-hand side for a 0/1 (or fractional) assignment.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, a)| a * values[i]).sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let lhs = self.activity(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tol,
            Sense::Ge => lhs >= self.rhs - tol,
            Sense::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// Maximize `objective . x` over `x` in {0, 1}^n subject to linear constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryProgram {
    pub objective: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
}

impl BinaryProgram {
    pub fn new(objective: Vec<f64>) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Reject out-of-range variable indices and non-finite numbers.
    pub fn validate(&self) -> Result<(), SolveError> {
        if let Some(i) = self.objective.iter().position(|c| !c.is_finite()) {
            return Err(SolveError::Malformed(format!(
                "objective coefficient for variable {i} is not finite"
            )));
        }
        for c in &self.constraints {
            if !c.rhs.is_finite() {
                return Err(SolveError::Malformed(format!(
                    "constraint `{}` has a non-finite right-hand side",
                    c.name
                )));
            }
            for &(i, a) in &c.terms {
                if i >= self.num_vars() {
                    return Err(SolveError::Malformed(format!(
                        "constraint `{}` references variable {i} of {}",
                        c.name,
                        self.num_vars()
                    )));
                }
                if !a.is_finite() {
                    return Err(SolveError::Malformed(format!(
                        "constraint `{}` has a non-finite coefficient",
                        c.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Names of the constraints `values` violates.
    pub fn violations(&self, values: &[f64], tol: f64) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values, tol))
            .map(|c| c.name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A solution returned by a backend. Values may carry floating-point slack.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl Assignment {
    pub fn is_selected(&self, var: usize) -> bool {
        self.values
            .get(var)
            .is_some_and(|v| (v - 1.0).abs() <= SELECTION_TOLERANCE)
    }

    pub fn selected(&self) -> Vec<usize> {
        (0..self.values.len()).filter(|&i| self.is_selected(i)).collect()
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("model is infeasible: no assignment satisfies every constraint")]
    Infeasible,

    #[error("search stopped after {nodes} nodes without proving optimality")]
    NodeLimit { nodes: u64 },

    #[error("search exceeded its time limit ({elapsed:?}) without proving optimality")]
    TimeLimit { elapsed: Duration },

    #[error("malformed model: {0}")]
    Malformed(String),
}

/// A backend able to solve pure binary programs to optimality.
pub trait MipSolver {
    fn solve(&self, program: &BinaryProgram) -> Result<Assignment, SolveError>;
}
