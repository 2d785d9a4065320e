// Z-score normalization of aggregated player stats.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::EvalError;
use crate::player::PlayerRecord;
use crate::stats::Stat;

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation for a single stat across the player population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Compute mean and standard deviation for a slice of values.
///
/// Returns `PoolStats { mean: 0.0, stdev: 0.0 }` for an empty slice.
/// Uses the population standard deviation (N denominator), since the pool
/// is every player in the run rather than a sample.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Compute a z-score given a value and pool stats.
///
/// Returns 0.0 when the standard deviation is approximately zero: a stat
/// every player shares carries no information, and must not feed NaN or
/// infinity into the weighted sum.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> f64 {
    if stats.stdev < STDEV_EPSILON {
        return 0.0;
    }
    (value - stats.mean) / stats.stdev
}

// ---------------------------------------------------------------------------
// Distribution over all scored stats
// ---------------------------------------------------------------------------

/// Per-stat population mean and standard deviation for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatDistribution {
    pub stats: BTreeMap<Stat, PoolStats>,
}

impl StatDistribution {
    pub fn get(&self, stat: Stat) -> Option<&PoolStats> {
        self.stats.get(&stat)
    }

    /// Stats whose values are identical for every player.
    pub fn degenerate(&self) -> Vec<Stat> {
        self.stats
            .iter()
            .filter(|(_, s)| s.stdev < STDEV_EPSILON)
            .map(|(stat, _)| *stat)
            .collect()
    }
}

/// Collect every scored stat present on the population and compute its pool
/// stats. Every player must carry every such stat.
pub fn distributions(players: &[PlayerRecord]) -> Result<StatDistribution, EvalError> {
    let mut columns: BTreeMap<Stat, Vec<f64>> = BTreeMap::new();
    let Some(first) = players.first() else {
        return Ok(StatDistribution::default());
    };
    let scored: Vec<Stat> = first.stats.keys().copied().filter(Stat::is_scored).collect();

    for player in players {
        for &stat in &scored {
            let Some(&value) = player.stats.get(&stat) else {
                return Err(EvalError::integrity(
                    &player.name,
                    format!("stat `{stat}` is missing but present on other players"),
                ));
            };
            if !value.is_finite() {
                return Err(EvalError::integrity(
                    &player.name,
                    format!("stat `{stat}` is not finite ({value})"),
                ));
            }
            columns.entry(stat).or_default().push(value);
        }
        if let Some(extra) = player
            .stats
            .keys()
            .find(|s| s.is_scored() && !scored.contains(*s))
        {
            return Err(EvalError::integrity(
                &player.name,
                format!("stat `{extra}` is present but missing on other players"),
            ));
        }
    }

    let stats = columns
        .into_iter()
        .map(|(stat, values)| (stat, compute_pool_stats(&values)))
        .collect();
    Ok(StatDistribution { stats })
}

/// Replace every scored stat with its z-score against `dist`.
///
/// Volume stats and salary are left untouched. A stat missing from `dist`
/// is left as is.
pub fn normalize(players: Vec<PlayerRecord>, dist: &StatDistribution) -> Vec<PlayerRecord> {
    for stat in dist.degenerate() {
        debug!("Stat `{}` has zero variance; z-scores set to 0.0", stat);
    }
    players
        .into_iter()
        .map(|mut player| {
            for (stat, value) in player.stats.iter_mut() {
                if !stat.is_scored() {
                    continue;
                }
                if let Some(pool) = dist.get(*stat) {
                    *value = compute_zscore(*value, pool);
                }
            }
            player
        })
        .collect()
}

/// Compute the distribution and normalize in one step.
pub fn normalize_players(players: Vec<PlayerRecord>) -> Result<Vec<PlayerRecord>, EvalError> {
    let dist = distributions(&players)?;
    Ok(normalize(players, &dist))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
