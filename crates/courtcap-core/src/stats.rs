// Statistic vocabulary shared by every pipeline stage.
//
// Each statistic carries a kind tag. Stages branch on the tag rather than on
// string membership: the aggregator consumes `Volume` stats, the normalizer
// and scorer only ever see `Counting` and `Percentage` stats. Player metadata
// and salary are plain struct fields on `PlayerRecord`, so they are outside
// this vocabulary entirely.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a statistic is treated by the evaluation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    /// Made/attempted shooting counts. Folded into percentage impacts by the
    /// aggregator and discarded afterwards.
    Volume,
    /// Summed or averaged box-score counts, normalized as z-scores.
    Counting,
    /// Volume-adjusted shooting impacts derived by the aggregator.
    Percentage,
}

/// Every statistic the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    FieldGoals,
    FieldGoalAttempts,
    FreeThrows,
    FreeThrowAttempts,
    ThreePointers,
    Points,
    Rebounds,
    Assists,
    Steals,
    Blocks,
    Turnovers,
    Minutes,
    #[serde(rename = "field_goal_percentage")]
    FieldGoalImpact,
    #[serde(rename = "free_throw_percentage")]
    FreeThrowImpact,
}

impl Stat {
    pub const ALL: [Stat; 14] = [
        Stat::FieldGoals,
        Stat::FieldGoalAttempts,
        Stat::FreeThrows,
        Stat::FreeThrowAttempts,
        Stat::ThreePointers,
        Stat::Points,
        Stat::Rebounds,
        Stat::Assists,
        Stat::Steals,
        Stat::Blocks,
        Stat::Turnovers,
        Stat::Minutes,
        Stat::FieldGoalImpact,
        Stat::FreeThrowImpact,
    ];

    /// Stats read from raw game logs (everything except derived impacts).
    pub const RAW: [Stat; 12] = [
        Stat::FieldGoals,
        Stat::FieldGoalAttempts,
        Stat::FreeThrows,
        Stat::FreeThrowAttempts,
        Stat::ThreePointers,
        Stat::Points,
        Stat::Rebounds,
        Stat::Assists,
        Stat::Steals,
        Stat::Blocks,
        Stat::Turnovers,
        Stat::Minutes,
    ];

    pub fn kind(&self) -> StatKind {
        match self {
            Stat::FieldGoals
            | Stat::FieldGoalAttempts
            | Stat::FreeThrows
            | Stat::FreeThrowAttempts => StatKind::Volume,
            Stat::ThreePointers
            | Stat::Points
            | Stat::Rebounds
            | Stat::Assists
            | Stat::Steals
            | Stat::Blocks
            | Stat::Turnovers
            | Stat::Minutes => StatKind::Counting,
            Stat::FieldGoalImpact | Stat::FreeThrowImpact => StatKind::Percentage,
        }
    }

    /// Whether this stat is normalized and eligible for weighting.
    pub fn is_scored(&self) -> bool {
        matches!(self.kind(), StatKind::Counting | StatKind::Percentage)
    }

    /// Canonical snake_case name, as used in config files and CSV headers.
    pub fn name(&self) -> &'static str {
        match self {
            Stat::FieldGoals => "field_goals",
            Stat::FieldGoalAttempts => "field_goal_attempts",
            Stat::FreeThrows => "free_throws",
            Stat::FreeThrowAttempts => "free_throw_attempts",
            Stat::ThreePointers => "three_pointers",
            Stat::Points => "points",
            Stat::Rebounds => "rebounds",
            Stat::Assists => "assists",
            Stat::Steals => "steals",
            Stat::Blocks => "blocks",
            Stat::Turnovers => "turnovers",
            Stat::Minutes => "minutes",
            Stat::FieldGoalImpact => "field_goal_percentage",
            Stat::FreeThrowImpact => "free_throw_percentage",
        }
    }

    /// Parse a stat from its canonical name. Case-insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Stat::ALL.iter().copied().find(|stat| stat.name() == lower)
    }

    /// Short column label for tabular output.
    pub fn abbrev(&self) -> &'static str {
        match self {
            Stat::FieldGoals => "FGM",
            Stat::FieldGoalAttempts => "FGA",
            Stat::FreeThrows => "FTM",
            Stat::FreeThrowAttempts => "FTA",
            Stat::ThreePointers => "3PM",
            Stat::Points => "PTS",
            Stat::Rebounds => "REB",
            Stat::Assists => "AST",
            Stat::Steals => "STL",
            Stat::Blocks => "BLK",
            Stat::Turnovers => "TO",
            Stat::Minutes => "MIN",
            Stat::FieldGoalImpact => "FG%",
            Stat::FreeThrowImpact => "FT%",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shooting percentage from made/attempted counts. Zero attempts gives 0.0.
pub fn raw_percentage(made: f64, attempts: f64) -> f64 {
    if attempts <= 0.0 {
        return 0.0;
    }
    made / attempts
}
