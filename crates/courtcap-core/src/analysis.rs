// Views over scored players: manager rosters, free agents, value per salary
// dollar and per-manager category standings.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::player::PlayerRecord;
use crate::scoring::{rank, WeightVector};
use crate::stats::Stat;

/// Rostered players grouped by manager, each group ranked by value.
/// Free agents are left out.
pub fn by_manager(players: &[PlayerRecord]) -> BTreeMap<String, Vec<PlayerRecord>> {
    let mut groups: BTreeMap<String, Vec<PlayerRecord>> = BTreeMap::new();
    for p in players {
        if let Some(manager) = &p.manager {
            groups.entry(manager.clone()).or_default().push(p.clone());
        }
    }
    groups.into_iter().map(|(m, list)| (m, rank(list))).collect()
}

/// Players on no fantasy roster, ranked by value.
pub fn free_agents(players: &[PlayerRecord]) -> Vec<PlayerRecord> {
    rank(players.iter().filter(|p| p.is_free_agent()).cloned().collect())
}

/// Relative value per million of salary. `None` for unsalaried players.
pub fn value_per_million(player: &PlayerRecord) -> Option<f64> {
    if player.salary == 0 {
        return None;
    }
    Some(player.relative_value / (player.salary as f64 / 1_000_000.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRank {
    pub name: String,
    pub team: String,
    pub salary: u64,
    pub relative_value: f64,
    pub value_per_million: f64,
}

/// The `limit` players with the highest value per million. Unsalaried
/// players are skipped.
pub fn best_values(players: &[PlayerRecord], limit: usize) -> Vec<ValueRank> {
    let mut ranked: Vec<ValueRank> = players
        .iter()
        .filter_map(|p| {
            value_per_million(p).map(|vpm| ValueRank {
                name: p.name.clone(),
                team: p.team.clone(),
                salary: p.salary,
                relative_value: p.relative_value,
                value_per_million: vpm,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.value_per_million
            .total_cmp(&a.value_per_million)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

// ---------------------------------------------------------------------------
// Category standings
// ---------------------------------------------------------------------------

/// One manager's summed z-scores per weighted stat, and their rank in each
/// category (1 = best).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub manager: String,
    pub totals: BTreeMap<Stat, f64>,
    pub ranks: BTreeMap<Stat, usize>,
    /// Weighted sum of `totals`.
    pub score: f64,
}

/// Per-manager category totals over every stat with a non-zero weight.
/// For negatively weighted stats the lowest total ranks first. Sorted by
/// weighted score, best first.
pub fn category_totals(players: &[PlayerRecord], weights: &WeightVector) -> Vec<CategoryTotals> {
    let stats = weights.weighted_stats();
    let mut rows: Vec<CategoryTotals> = by_manager(players)
        .into_iter()
        .map(|(manager, roster)| {
            let totals: BTreeMap<Stat, f64> = stats
                .iter()
                .map(|&stat| (stat, roster.iter().map(|p| p.stat(stat)).sum()))
                .collect();
            let score = totals.iter().map(|(s, t)| weights.get(*s) * t).sum();
            CategoryTotals {
                manager,
                totals,
                ranks: BTreeMap::new(),
                score,
            }
        })
        .collect();

    for &stat in &stats {
        let sign = weights.get(stat).signum();
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            let ta = rows[a].totals[&stat] * sign;
            let tb = rows[b].totals[&stat] * sign;
            tb.total_cmp(&ta)
        });
        for (place, idx) in order.into_iter().enumerate() {
            rows[idx].ranks.insert(stat, place + 1);
        }
    }

    rows.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.manager.cmp(&b.manager)));
    rows
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueSummary {
    pub count: usize,
    pub max: f64,
    pub median: f64,
}

/// Max and median relative value. `None` for an empty slice.
pub fn value_summary(players: &[PlayerRecord]) -> Option<ValueSummary> {
    if players.is_empty() {
        return None;
    }
    let mut values: Vec<f64> = players.iter().map(|p| p.relative_value).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    Some(ValueSummary {
        count: n,
        max: values[n - 1],
        median,
    })
}
