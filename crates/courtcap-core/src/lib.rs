// Player evaluation and salary-capped roster selection.

pub mod aggregate;
pub mod analysis;
pub mod error;
pub mod optimizer;
pub mod player;
pub mod projection;
pub mod scoring;
pub mod solver;
pub mod stats;
pub mod zscore;

pub use aggregate::{AggregationMode, AggregationOptions, DateRange};
pub use error::EvalError;
pub use optimizer::{PositionRule, RosterError, RosterRules, RosterSelection};
pub use player::{PlayerRecord, Position, RawGameLog, Status};
pub use scoring::WeightVector;
pub use solver::{BranchAndBound, MipSolver};
pub use stats::{Stat, StatKind};

use tracing::info;

/// Aggregate, normalize and score raw rows. The result is ranked by
/// relative value, best first.
pub fn evaluate_players(
    raw: &[RawGameLog],
    weights: &WeightVector,
    options: &AggregationOptions,
) -> Result<Vec<PlayerRecord>, EvalError> {
    let aggregated = aggregate::aggregate(raw, options)?;
    let normalized = zscore::normalize_players(aggregated)?;
    let ranked = scoring::rank(scoring::score(normalized, weights));
    info!("Evaluated {} players", ranked.len());
    Ok(ranked)
}

/// Pick the best roster from already scored players.
pub fn pick_roster(
    scored: &[PlayerRecord],
    rules: &RosterRules,
    solver: &dyn MipSolver,
) -> Result<RosterSelection, RosterError> {
    optimizer::select_roster(scored, rules, solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn season_row(name: &str, pos: Position, salary: u64, seed: f64) -> RawGameLog {
        let mut stats = BTreeMap::new();
        stats.insert(Stat::FieldGoals, 300.0 + seed * 7.0);
        stats.insert(Stat::FieldGoalAttempts, 700.0 + seed * 5.0);
        stats.insert(Stat::FreeThrows, 100.0 + seed * 3.0);
        stats.insert(Stat::FreeThrowAttempts, 140.0 + seed * 3.5);
        stats.insert(Stat::ThreePointers, 50.0 + (seed * 13.0) % 40.0);
        stats.insert(Stat::Points, 800.0 + seed * 31.0);
        stats.insert(Stat::Rebounds, 200.0 + (seed * 17.0) % 150.0);
        stats.insert(Stat::Assists, 150.0 + (seed * 23.0) % 120.0);
        stats.insert(Stat::Steals, 40.0 + (seed * 3.0) % 20.0);
        stats.insert(Stat::Blocks, 20.0 + (seed * 5.0) % 30.0);
        stats.insert(Stat::Turnovers, 90.0 + (seed * 7.0) % 25.0);
        stats.insert(Stat::Minutes, 1800.0);
        RawGameLog {
            player_name: name.into(),
            team: "TST".into(),
            positions: [pos].into_iter().collect(),
            status: None,
            salary: Some(salary),
            game_date: None,
            fantasy_team: None,
            manager: None,
            stats,
        }
    }

    #[test]
    fn evaluate_then_pick_end_to_end() {
        let mut raw = Vec::new();
        for (i, pos) in Position::ALL.into_iter().cycle().take(20).enumerate() {
            let seed = i as f64;
            raw.push(season_row(&format!("P{i:02}"), pos, 4_000_000 + i as u64 * 500_000, seed));
        }
        let scored = evaluate_players(&raw, &WeightVector::standard(), &AggregationOptions::default()).unwrap();
        assert_eq!(scored.len(), 20);
        assert!(scored
            .windows(2)
            .all(|w| w[0].relative_value >= w[1].relative_value));
        assert!(scored.iter().all(|p| p.stats.get(&Stat::FieldGoals).is_none()));

        let selection = pick_roster(&scored, &RosterRules::default(), &BranchAndBound::new()).unwrap();
        assert_eq!(selection.players.len(), 12);
        assert!(selection.total_salary <= 140_000_000);
    }
}
