// Salary-capped roster selection as a binary integer program.
//
// One 0/1 variable per player. Maximize total relative value subject to the
// salary cap, an exact roster size and a min/max count of eligible players
// per position. Multi-position players count toward every position they are
// eligible at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::player::{PlayerRecord, Position};
use crate::scoring::rank;
use crate::solver::{BinaryProgram, LinearConstraint, MipSolver, Sense, SolveError};

pub const DEFAULT_ROSTER_SIZE: usize = 12;
pub const DEFAULT_SALARY_CAP: u64 = 140_000_000;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Inclusive bounds on how many selected players are eligible at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRule {
    pub min: usize,
    pub max: usize,
}

impl PositionRule {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRules {
    pub roster_size: usize,
    pub salary_cap: u64,
    pub positions: BTreeMap<Position, PositionRule>,
}

impl Default for RosterRules {
    fn default() -> Self {
        let positions = Position::ALL
            .into_iter()
            .map(|pos| {
                let min = if pos == Position::C { 3 } else { 2 };
                (pos, PositionRule::new(min, 6))
            })
            .collect();
        Self {
            roster_size: DEFAULT_ROSTER_SIZE,
            salary_cap: DEFAULT_SALARY_CAP,
            positions,
        }
    }
}

impl RosterRules {
    /// Every position needs a rule with `min <= max`; the roster must be
    /// non-empty.
    pub fn validate(&self) -> Result<(), RosterError> {
        if self.roster_size == 0 {
            return Err(RosterError::Configuration(
                "roster size must be greater than 0".into(),
            ));
        }
        for pos in Position::ALL {
            let Some(rule) = self.positions.get(&pos) else {
                return Err(RosterError::Configuration(format!(
                    "no count rule configured for position {pos}"
                )));
            };
            if rule.min > rule.max {
                return Err(RosterError::Configuration(format!(
                    "position {pos}: min ({}) is greater than max ({})",
                    rule.min, rule.max
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("invalid roster rules: {0}")]
    Configuration(String),

    /// No roster satisfies every constraint. Never an empty or partial roster.
    #[error("infeasible roster model: {reason}")]
    Infeasible { reason: String },

    #[error("invalid player input: {0}")]
    InvalidInput(String),

    #[error("solver failed: {0}")]
    Solver(#[from] SolveError),

    #[error("solver returned a roster that breaks the rules: {0}")]
    InvalidSelection(String),
}

/// The chosen roster, best players first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSelection {
    pub players: Vec<PlayerRecord>,
    pub total_salary: u64,
    pub total_value: f64,
    /// Selected players eligible at each position.
    pub position_counts: BTreeMap<Position, usize>,
}

impl RosterSelection {
    pub fn new(players: Vec<PlayerRecord>) -> Self {
        let players = rank(players);
        let total_salary = players.iter().map(|p| p.salary).sum();
        let total_value = players.iter().map(|p| p.relative_value).sum();
        let position_counts = Position::ALL
            .into_iter()
            .map(|pos| (pos, players.iter().filter(|p| p.is_eligible(pos)).count()))
            .collect();
        Self {
            players,
            total_salary,
            total_value,
            position_counts,
        }
    }

    /// Verify size, cap and position counts against `rules`.
    pub fn check(&self, rules: &RosterRules) -> Result<(), RosterError> {
        if self.players.len() != rules.roster_size {
            return Err(RosterError::InvalidSelection(format!(
                "{} players selected, roster size is {}",
                self.players.len(),
                rules.roster_size
            )));
        }
        if self.total_salary > rules.salary_cap {
            return Err(RosterError::InvalidSelection(format!(
                "total salary {} exceeds cap {}",
                self.total_salary, rules.salary_cap
            )));
        }
        for (pos, rule) in &rules.positions {
            let count = self.position_counts.get(pos).copied().unwrap_or(0);
            if count < rule.min || count > rule.max {
                return Err(RosterError::InvalidSelection(format!(
                    "{count} players at {pos}, allowed {}..={}",
                    rule.min, rule.max
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Model construction
// ---------------------------------------------------------------------------

/// Build the binary program for `players` under `rules`. Variable `i` is
/// player `i`.
pub fn build_program(players: &[PlayerRecord], rules: &RosterRules) -> BinaryProgram {
    let mut program = BinaryProgram::new(players.iter().map(|p| p.relative_value).collect());

    program.add_constraint(LinearConstraint::new(
        "salary_cap",
        players
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.salary as f64))
            .collect(),
        Sense::Le,
        rules.salary_cap as f64,
    ));
    program.add_constraint(LinearConstraint::new(
        "roster_size",
        (0..players.len()).map(|i| (i, 1.0)).collect(),
        Sense::Eq,
        rules.roster_size as f64,
    ));

    for (pos, rule) in &rules.positions {
        let eligible: Vec<(usize, f64)> = players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_eligible(*pos))
            .map(|(i, _)| (i, 1.0))
            .collect();
        if rule.min > 0 {
            program.add_constraint(LinearConstraint::new(
                format!("min_{pos}"),
                eligible.clone(),
                Sense::Ge,
                rule.min as f64,
            ));
        }
        if rule.max < rules.roster_size {
            program.add_constraint(LinearConstraint::new(
                format!("max_{pos}"),
                eligible,
                Sense::Le,
                rule.max as f64,
            ));
        }
    }
    program
}

/// Cheap necessary conditions. Returns a reason when one obviously fails.
pub fn diagnose_infeasibility(players: &[PlayerRecord], rules: &RosterRules) -> Option<String> {
    if players.len() < rules.roster_size {
        return Some(format!(
            "only {} players available for a roster of {}",
            players.len(),
            rules.roster_size
        ));
    }

    for (pos, rule) in &rules.positions {
        let eligible = players.iter().filter(|p| p.is_eligible(*pos)).count();
        if eligible < rule.min {
            return Some(format!(
                "only {eligible} players eligible at {pos}, at least {} required",
                rule.min
            ));
        }
        if rule.min > rules.roster_size {
            return Some(format!(
                "position {pos} requires {} players but the roster holds {}",
                rule.min, rules.roster_size
            ));
        }
    }

    // Every player fills at least one position slot.
    let max_slots: usize = rules.positions.values().map(|r| r.max).sum();
    if max_slots < rules.roster_size {
        return Some(format!(
            "position maximums admit at most {max_slots} players, roster needs {}",
            rules.roster_size
        ));
    }

    let mut salaries: Vec<u64> = players.iter().map(|p| p.salary).collect();
    salaries.sort_unstable();
    let cheapest: u64 = salaries.iter().take(rules.roster_size).sum();
    if cheapest > rules.salary_cap {
        return Some(format!(
            "the {} cheapest players cost {cheapest}, above the salary cap of {}",
            rules.roster_size, rules.salary_cap
        ));
    }
    None
}

fn validate_players(players: &[PlayerRecord]) -> Result<(), RosterError> {
    for p in players {
        if !p.relative_value.is_finite() {
            return Err(RosterError::InvalidInput(format!(
                "player `{}` has a non-finite relative value",
                p.name
            )));
        }
        if p.positions.is_empty() {
            return Err(RosterError::InvalidInput(format!(
                "player `{}` is not eligible at any position",
                p.name
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Top-level entry point
// ---------------------------------------------------------------------------

/// Choose the roster with maximum total relative value.
///
/// When several rosters tie on value, which one is returned depends on the
/// backend; no canonical tie-break is applied.
pub fn select_roster(
    players: &[PlayerRecord],
    rules: &RosterRules,
    solver: &dyn MipSolver,
) -> Result<RosterSelection, RosterError> {
    rules.validate()?;
    validate_players(players)?;

    if let Some(reason) = diagnose_infeasibility(players, rules) {
        warn!("Roster model rejected before solving: {}", reason);
        return Err(RosterError::Infeasible { reason });
    }

    let program = build_program(players, rules);
    debug!(
        "Solving roster model: {} players, {} constraints",
        program.num_vars(),
        program.constraints.len()
    );

    let assignment = match solver.solve(&program) {
        Ok(assignment) => assignment,
        Err(SolveError::Infeasible) => {
            return Err(RosterError::Infeasible {
                reason: "no combination of players meets the salary cap, roster size and position limits together".into(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    if assignment.values.len() != players.len() {
        return Err(RosterError::InvalidSelection(format!(
            "solver returned {} values for {} players",
            assignment.values.len(),
            players.len()
        )));
    }

    let chosen = assignment
        .selected()
        .into_iter()
        .map(|i| players[i].clone())
        .collect();
    let selection = RosterSelection::new(chosen);
    selection.check(rules)?;

    info!(
        "Selected {} players: salary {} of {}, total value {:.3}",
        selection.players.len(),
        selection.total_salary,
        rules.salary_cap,
        selection.total_value
    );
    Ok(selection)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
