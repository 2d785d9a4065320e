// Exact LP-based branch-and-bound for pure binary programs.
//
// Each node solves the LP relaxation under the node's fixings and is pruned
// when that bound cannot beat the incumbent. Children start from a copy of
// the parent's final tableau and re-optimize with a few dual pivots. Once an
// incumbent exists, any nonbasic variable whose reduced cost alone closes the
// gap is fixed for the rest of the subtree. The search branches on the most
// fractional variable and tries the nearer integer first.
//
// Candidates are checked against the original, unscaled rows with an
// absolute tolerance, so a salary row never admits even one unit over its cap.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::simplex::{LpOutcome, Relaxation};
use super::{Assignment, BinaryProgram, MipSolver, SolveError, FEASIBILITY_TOLERANCE};

const INTEGRALITY_TOL: f64 = 1e-6;

/// Default exact backend. Limits are optional; hitting one is an error.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    pub node_limit: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

impl MipSolver for BranchAndBound {
    fn solve(&self, program: &BinaryProgram) -> Result<Assignment, SolveError> {
        program.validate()?;
        let mut search = Search::new(program, self);
        search.explore(Relaxation::new(program))?;

        let nodes = search.nodes;
        match search.best {
            Some((objective, values)) => {
                info!(
                    "branch-and-bound solved {} variables in {} nodes (objective {:.4})",
                    program.num_vars(),
                    nodes,
                    objective
                );
                Ok(Assignment { values, objective })
            }
            None => {
                debug!("branch-and-bound exhausted {} nodes without a feasible point", nodes);
                Err(SolveError::Infeasible)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

struct Search<'a> {
    program: &'a BinaryProgram,
    best: Option<(f64, Vec<f64>)>,
    nodes: u64,
    started: Instant,
    node_limit: Option<u64>,
    time_limit: Option<Duration>,
}

fn objective_tol(reference: f64) -> f64 {
    1e-9 * (1.0 + reference.abs())
}

impl<'a> Search<'a> {
    fn new(program: &'a BinaryProgram, limits: &BranchAndBound) -> Self {
        Self {
            program,
            best: None,
            nodes: 0,
            started: Instant::now(),
            node_limit: limits.node_limit,
            time_limit: limits.time_limit,
        }
    }

    fn count_node(&mut self) -> Result<(), SolveError> {
        self.nodes += 1;
        if let Some(limit) = self.node_limit {
            if self.nodes > limit {
                return Err(SolveError::NodeLimit { nodes: limit });
            }
        }
        if let Some(limit) = self.time_limit {
            let elapsed = self.started.elapsed();
            if elapsed > limit {
                return Err(SolveError::TimeLimit { elapsed });
            }
        }
        Ok(())
    }

    fn improves(&self, value: f64) -> bool {
        match &self.best {
            None => true,
            Some((best, _)) => value > *best + objective_tol(*best),
        }
    }

    fn explore(&mut self, mut lp: Relaxation) -> Result<(), SolveError> {
        self.count_node()?;

        let outcome = lp.solve();
        match outcome {
            LpOutcome::Infeasible => return Ok(()),
            LpOutcome::Optimal => {
                let bound = lp.objective(&self.program.objective);
                if !self.improves(bound) {
                    return Ok(());
                }
                if let Some((best, _)) = &self.best {
                    let cutoff = *best + objective_tol(*best);
                    self.fix_by_reduced_cost(&mut lp, bound, cutoff);
                }
            }
            LpOutcome::IterationLimit => {
                debug!("LP relaxation ran out of pivots at node {}; branching unbounded", self.nodes);
            }
        }

        let values = lp.values();
        let var = match most_fractional(&lp, &values) {
            Some(var) => var,
            None => {
                let rounded: Vec<f64> = values.iter().map(|v| v.round()).collect();
                if self
                    .program
                    .violations(&rounded, FEASIBILITY_TOLERANCE)
                    .is_empty()
                {
                    self.record(rounded);
                    if outcome == LpOutcome::Optimal {
                        return Ok(());
                    }
                }
                // Rounding drifted off a row, or the bound is unproven.
                match (0..values.len()).find(|&j| !lp.is_fixed(j)) {
                    Some(var) => var,
                    None => return Ok(()),
                }
            }
        };

        let (near, far) = if values[var] >= 0.5 { (1.0, 0.0) } else { (0.0, 1.0) };
        let mut other = lp.clone();
        lp.fix(var, near);
        self.explore(lp)?;
        other.fix(var, far);
        self.explore(other)
    }

    fn record(&mut self, values: Vec<f64>) {
        let objective: f64 = self
            .program
            .objective
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();
        if self.improves(objective) {
            debug!("new incumbent {:.4} at node {}", objective, self.nodes);
            self.best = Some((objective, values));
        }
    }

    /// Moving a nonbasic variable off its bound costs at least its reduced
    /// cost, so one whose cost drops the bound to the cutoff stays put.
    fn fix_by_reduced_cost(&self, lp: &mut Relaxation, bound: f64, cutoff: f64) {
        for j in 0..self.program.num_vars() {
            if lp.is_fixed(j) {
                continue;
            }
            let Some(at) = lp.nonbasic_value(j) else {
                continue;
            };
            if bound - lp.reduced_cost(j).abs() <= cutoff {
                lp.fix(j, at);
            }
        }
    }
}

fn most_fractional(lp: &Relaxation, values: &[f64]) -> Option<usize> {
    let mut found = None;
    let mut widest = INTEGRALITY_TOL;
    for (j, &v) in values.iter().enumerate() {
        if lp.is_fixed(j) {
            continue;
        }
        let gap = (v - v.floor()).min(v.ceil() - v);
        if gap > widest {
            widest = gap;
            found = Some(j);
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{LinearConstraint, Sense};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// Tiny deterministic generator so the brute-force comparison is repeatable.
    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    fn brute_force(p: &BinaryProgram) -> Option<f64> {
        let n = p.num_vars();
        let mut best: Option<f64> = None;
        for mask in 0u32..(1u32 << n) {
            let values: Vec<f64> = (0..n).map(|i| ((mask >> i) & 1) as f64).collect();
            if !p.violations(&values, 1e-9).is_empty() {
                continue;
            }
            let obj: f64 = p.objective.iter().zip(&values).map(|(c, x)| c * x).sum();
            if best.map_or(true, |b| obj > b) {
                best = Some(obj);
            }
        }
        best
    }

    fn knapsack() -> BinaryProgram {
        // values 10, 13, 7, 8; weights 5, 7, 3, 4; capacity 10
        let mut p = BinaryProgram::new(vec![10.0, 13.0, 7.0, 8.0]);
        p.add_constraint(LinearConstraint::new(
            "cap",
            vec![(0, 5.0), (1, 7.0), (2, 3.0), (3, 4.0)],
            Sense::Le,
            10.0,
        ));
        p
    }

    #[test]
    fn solves_small_knapsack() {
        let a = BranchAndBound::new().solve(&knapsack()).unwrap();
        // Best: items 1 + 2 (weight 10, value 20).
        assert!(approx_eq(a.objective, 20.0, 1e-9));
        assert_eq!(a.selected(), vec![1, 2]);
    }

    #[test]
    fn equality_with_negative_objective_is_forced() {
        let mut p = BinaryProgram::new(vec![-1.0, -3.0, -2.0]);
        p.add_constraint(LinearConstraint::new(
            "size",
            vec![(0, 1.0), (1, 1.0), (2, 1.0)],
            Sense::Eq,
            2.0,
        ));
        let a = BranchAndBound::new().solve(&p).unwrap();
        assert!(approx_eq(a.objective, -3.0, 1e-9));
        assert_eq!(a.selected(), vec![0, 2]);
    }

    #[test]
    fn infeasible_model_is_reported() {
        let mut p = BinaryProgram::new(vec![1.0, 1.0]);
        p.add_constraint(LinearConstraint::new("size", vec![(0, 1.0), (1, 1.0)], Sense::Eq, 3.0));
        assert!(matches!(
            BranchAndBound::new().solve(&p),
            Err(SolveError::Infeasible)
        ));
    }

    #[test]
    fn empty_program_is_trivially_feasible() {
        let a = BranchAndBound::new().solve(&BinaryProgram::default()).unwrap();
        assert!(a.values.is_empty());
        assert_eq!(a.objective, 0.0);
    }

    #[test]
    fn node_limit_is_an_error() {
        // The knapsack relaxation is fractional (21.0), so the root must branch.
        let solver = BranchAndBound::new().with_node_limit(1);
        assert!(matches!(
            solver.solve(&knapsack()),
            Err(SolveError::NodeLimit { nodes: 1 })
        ));
    }

    #[test]
    fn pair_one_unit_over_the_cap_is_skipped() {
        // Items 0 + 1 cost 120_000_001 against a 120_000_000 cap.
        let mut p = BinaryProgram::new(vec![5.0, 6.0, 4.0]);
        p.add_constraint(LinearConstraint::new(
            "salary",
            vec![(0, 60_000_000.0), (1, 60_000_001.0), (2, 59_999_999.0)],
            Sense::Le,
            120_000_000.0,
        ));
        p.add_constraint(LinearConstraint::new(
            "size",
            vec![(0, 1.0), (1, 1.0), (2, 1.0)],
            Sense::Eq,
            2.0,
        ));
        let a = BranchAndBound::new().solve(&p).unwrap();
        // 1 + 2 lands exactly on the cap and beats 0 + 2.
        assert_eq!(a.selected(), vec![1, 2]);
        assert!(approx_eq(a.objective, 10.0, 1e-9));
        assert_eq!(p.constraints[0].activity(&a.values), 120_000_000.0);
    }

    #[test]
    fn cap_plus_one_forces_the_cheaper_swap() {
        let mut p = BinaryProgram::new(vec![10.0, 10.0, 9.0]);
        p.add_constraint(LinearConstraint::new(
            "salary",
            vec![(0, 10_000_000.0), (1, 10_000_001.0), (2, 10_000_000.0)],
            Sense::Le,
            20_000_000.0,
        ));
        p.add_constraint(LinearConstraint::new(
            "size",
            vec![(0, 1.0), (1, 1.0), (2, 1.0)],
            Sense::Eq,
            2.0,
        ));
        let a = BranchAndBound::new().solve(&p).unwrap();
        assert_eq!(a.selected(), vec![0, 2]);
        assert!(approx_eq(a.objective, 19.0, 1e-9));
    }

    fn random_program(rng: &mut Lcg, case: usize, weight_scale: f64) -> BinaryProgram {
        let n = 6 + case % 8;
        let objective: Vec<f64> = (0..n).map(|_| rng.next_f64() * 10.0 - 3.0).collect();
        let mut p = BinaryProgram::new(objective);

        let weights: Vec<(usize, f64)> = (0..n)
            .map(|i| (i, ((rng.next_f64() * 20.0).round() + 1.0) * weight_scale))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        p.add_constraint(LinearConstraint::new("cap", weights, Sense::Le, (total * 0.4).round()));

        let k = (2 + case % 3) as f64;
        p.add_constraint(LinearConstraint::new(
            "size",
            (0..n).map(|i| (i, 1.0)).collect(),
            Sense::Eq,
            k,
        ));
        let group: Vec<(usize, f64)> = (0..n).filter(|i| i % 2 == 0).map(|i| (i, 1.0)).collect();
        p.add_constraint(LinearConstraint::new("evens_min", group.clone(), Sense::Ge, 1.0));
        p.add_constraint(LinearConstraint::new("evens_max", group, Sense::Le, 2.0));
        p
    }

    #[test]
    fn matches_brute_force_on_random_programs() {
        let mut rng = Lcg(42);
        // Unit weights, then salary-sized weights that are not round millions.
        for weight_scale in [1.0, 1_000_003.0] {
            for case in 0..40 {
                let p = random_program(&mut rng, case, weight_scale);
                let expected = brute_force(&p);
                match (BranchAndBound::new().solve(&p), expected) {
                    (Ok(a), Some(best)) => {
                        assert!(
                            approx_eq(a.objective, best, 1e-6),
                            "case {case} x{weight_scale}: got {} expected {best}",
                            a.objective
                        );
                        assert!(p.violations(&a.values, 0.0).is_empty(), "case {case}");
                    }
                    (Err(SolveError::Infeasible), None) => {}
                    (got, want) => {
                        panic!("case {case} x{weight_scale}: solver {got:?}, brute force {want:?}")
                    }
                }
            }
        }
    }

    #[test]
    fn hundreds_of_variables_solve_within_the_node_limit() {
        let mut rng = Lcg(7);
        let n = 400;
        let objective: Vec<f64> = (0..n).map(|_| rng.next_f64() * 8.0 - 3.0).collect();
        let salaries: Vec<(usize, f64)> = objective
            .iter()
            .enumerate()
            .map(|(j, v)| (j, ((1.0 + 4.0 * (v + 3.0) + rng.next_f64() * 6.0) * 1e6).round()))
            .collect();
        let mut p = BinaryProgram::new(objective);
        p.add_constraint(LinearConstraint::new("salary", salaries, Sense::Le, 140_000_000.0));
        p.add_constraint(LinearConstraint::new(
            "size",
            (0..n).map(|j| (j, 1.0)).collect(),
            Sense::Eq,
            12.0,
        ));
        let group: Vec<(usize, f64)> = (0..n).filter(|j| j % 5 == 0).map(|j| (j, 1.0)).collect();
        p.add_constraint(LinearConstraint::new("group_min", group, Sense::Ge, 3.0));

        let a = BranchAndBound::new()
            .with_node_limit(200_000)
            .with_time_limit(Duration::from_secs(60))
            .solve(&p)
            .unwrap();
        assert_eq!(a.selected().len(), 12);
        assert!(p.violations(&a.values, 0.0).is_empty());
    }
}
