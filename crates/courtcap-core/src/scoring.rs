// Weighted relative-value scoring over normalized stats.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::player::PlayerRecord;
use crate::stats::Stat;

/// Signed weight per stat. Stats without an entry weigh 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightVector {
    weights: BTreeMap<Stat, f64>,
}

impl WeightVector {
    /// Empty vector: every stat is inert.
    pub fn new() -> Self {
        Self::default()
    }

    /// 1.0 for every scored stat except turnovers (-1.0) and minutes (0.0).
    pub fn standard() -> Self {
        let mut w = Self::new();
        for stat in Stat::ALL.into_iter().filter(Stat::is_scored) {
            let value = match stat {
                Stat::Turnovers => -1.0,
                Stat::Minutes => 0.0,
                _ => 1.0,
            };
            w = w.with(stat, value);
        }
        w
    }

    pub fn with(mut self, stat: Stat, weight: f64) -> Self {
        self.weights.insert(stat, weight);
        self
    }

    /// Build from a name-keyed table such as the `[weights]` section of a
    /// config file. Returns the vector plus the names that matched no scored
    /// stat; those are ignored and contribute nothing.
    pub fn from_names<'a, I>(table: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        let mut w = Self::new();
        let mut unknown = Vec::new();
        for (name, &weight) in table {
            match Stat::from_name(name) {
                Some(stat) if stat.is_scored() => w = w.with(stat, weight),
                _ => {
                    warn!("ignoring weight for unknown or unscored stat `{}`", name);
                    unknown.push(name.clone());
                }
            }
        }
        (w, unknown)
    }

    pub fn get(&self, stat: Stat) -> f64 {
        self.weights.get(&stat).copied().unwrap_or(0.0)
    }

    /// Stats with a non-zero weight.
    pub fn weighted_stats(&self) -> Vec<Stat> {
        self.weights
            .iter()
            .filter(|(_, w)| **w != 0.0)
            .map(|(s, _)| *s)
            .collect()
    }
}

/// Weighted sum of a player's scored z-scores.
pub fn relative_value(player: &PlayerRecord, weights: &WeightVector) -> f64 {
    player
        .stats
        .iter()
        .filter(|(stat, _)| stat.is_scored())
        .map(|(stat, z)| weights.get(*stat) * z)
        .sum()
}

/// Fill in `relative_value` for every player.
pub fn score(players: Vec<PlayerRecord>, weights: &WeightVector) -> Vec<PlayerRecord> {
    players
        .into_iter()
        .map(|mut p| {
            p.relative_value = relative_value(&p, weights);
            p
        })
        .collect()
}

/// Sort descending by relative value, ties broken by name.
pub fn rank(mut players: Vec<PlayerRecord>) -> Vec<PlayerRecord> {
    players.sort_by(|a, b| {
        b.relative_value
            .partial_cmp(&a.relative_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    players
}
