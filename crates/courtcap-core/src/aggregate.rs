// Stat aggregation with volume-adjusted shooting impacts.
//
// Raw per-game (or per-season) rows are grouped into one record per player,
// summed or averaged, and the made/attempted shooting counts are folded into
// two impact scores measured against the league's per-team shooting volume.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

use crate::error::EvalError;
use crate::player::{PlayerRecord, Position, RawGameLog, Status};
use crate::stats::{raw_percentage, Stat, StatKind};

/// Number of teams the league-wide shooting averages are spread over.
pub const DEFAULT_LEAGUE_TEAMS: u32 = 30;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How counting stats are combined across a player's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Season totals.
    #[default]
    #[serde(alias = "totals")]
    Sum,
    /// Per-game rates.
    #[serde(alias = "averages")]
    Average,
}

/// Inclusive range of game dates to aggregate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOptions {
    pub mode: AggregationMode,
    pub date_range: Option<DateRange>,
    /// Team count used to turn league totals into per-team averages.
    pub league_teams: u32,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            mode: AggregationMode::Sum,
            date_range: None,
            league_teams: DEFAULT_LEAGUE_TEAMS,
        }
    }
}

// ---------------------------------------------------------------------------
// League averages
// ---------------------------------------------------------------------------

/// Per-team shooting volume across the whole player population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeagueAverages {
    pub field_goals: f64,
    pub field_goal_attempts: f64,
    pub field_goal_pct: f64,
    pub free_throws: f64,
    pub free_throw_attempts: f64,
    pub free_throw_pct: f64,
}

/// Compute per-team shooting averages from aggregated players that still
/// carry their volume stats.
///
/// Fails when league attempts or makes are zero for a category, since the
/// impact formula would divide by zero.
pub fn league_averages(
    players: &[PlayerRecord],
    league_teams: u32,
) -> Result<LeagueAverages, EvalError> {
    if league_teams == 0 {
        return Err(EvalError::Configuration(
            "league team count must be greater than 0".into(),
        ));
    }
    let teams = league_teams as f64;
    let total = |stat: Stat| players.iter().map(|p| p.stat(stat)).sum::<f64>() / teams;

    let field_goals = total(Stat::FieldGoals);
    let field_goal_attempts = total(Stat::FieldGoalAttempts);
    let free_throws = total(Stat::FreeThrows);
    let free_throw_attempts = total(Stat::FreeThrowAttempts);

    let field_goal_pct = checked_league_pct("field goal", field_goals, field_goal_attempts)?;
    let free_throw_pct = checked_league_pct("free throw", free_throws, free_throw_attempts)?;

    Ok(LeagueAverages {
        field_goals,
        field_goal_attempts,
        field_goal_pct,
        free_throws,
        free_throw_attempts,
        free_throw_pct,
    })
}

fn checked_league_pct(category: &'static str, made: f64, attempts: f64) -> Result<f64, EvalError> {
    if attempts <= 0.0 {
        return Err(EvalError::LeagueVolume {
            category,
            detail: "average attempts per team is zero".into(),
        });
    }
    let pct = raw_percentage(made, attempts);
    if pct <= 0.0 {
        return Err(EvalError::LeagueVolume {
            category,
            detail: "league percentage is zero, percent change is undefined".into(),
        });
    }
    Ok(pct)
}

// ---------------------------------------------------------------------------
// Impact formula
// ---------------------------------------------------------------------------

/// Percent change of the league percentage after blending a player's makes
/// and attempts into the per-team averages.
///
/// `adjusted = (made + avg_made) / (attempts + avg_attempts)`,
/// `impact = (adjusted - league_pct) / |league_pct|`.
pub fn percentage_impact(
    made: f64,
    attempts: f64,
    avg_made: f64,
    avg_attempts: f64,
    league_pct: f64,
) -> f64 {
    let adjusted = (made + avg_made) / (attempts + avg_attempts);
    (adjusted - league_pct) / league_pct.abs()
}

/// Replace each player's volume stats with FG and FT impact scores.
pub fn apply_percentage_impacts(
    players: Vec<PlayerRecord>,
    averages: &LeagueAverages,
) -> Vec<PlayerRecord> {
    players
        .into_iter()
        .map(|mut player| {
            let fg = percentage_impact(
                player.stat(Stat::FieldGoals),
                player.stat(Stat::FieldGoalAttempts),
                averages.field_goals,
                averages.field_goal_attempts,
                averages.field_goal_pct,
            );
            let ft = percentage_impact(
                player.stat(Stat::FreeThrows),
                player.stat(Stat::FreeThrowAttempts),
                averages.free_throws,
                averages.free_throw_attempts,
                averages.free_throw_pct,
            );
            player.stats.retain(|stat, _| stat.kind() != StatKind::Volume);
            player.stats.insert(Stat::FieldGoalImpact, fg);
            player.stats.insert(Stat::FreeThrowImpact, ft);
            player
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Row validation and grouping
// ---------------------------------------------------------------------------

/// Minutes are informational; a row without them counts as zero minutes.
fn is_optional(stat: Stat) -> bool {
    stat == Stat::Minutes
}

fn validate_row(row: &RawGameLog) -> Result<(), EvalError> {
    let name = row.player_name.as_str();
    if name.trim().is_empty() {
        return Err(EvalError::integrity(name, "player name is empty"));
    }
    if row.positions.is_empty() {
        return Err(EvalError::integrity(name, "position eligibility is empty"));
    }
    for stat in Stat::RAW {
        match row.stats.get(&stat) {
            None if is_optional(stat) => {}
            None => {
                return Err(EvalError::integrity(
                    name,
                    format!("required stat `{stat}` is missing"),
                ))
            }
            Some(v) if !v.is_finite() || *v < 0.0 => {
                return Err(EvalError::integrity(
                    name,
                    format!("stat `{stat}` has invalid value {v}"),
                ))
            }
            Some(_) => {}
        }
    }
    for (made, attempts) in [
        (Stat::FieldGoals, Stat::FieldGoalAttempts),
        (Stat::FreeThrows, Stat::FreeThrowAttempts),
    ] {
        let m = row.stats[&made];
        let a = row.stats[&attempts];
        if a < m {
            return Err(EvalError::integrity(
                name,
                format!("`{attempts}` ({a}) is below `{made}` ({m})"),
            ));
        }
    }
    Ok(())
}

/// Everything that identifies a player's aggregated row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    name: String,
    team: String,
    positions: BTreeSet<Position>,
    status: Option<Status>,
    salary: u64,
    fantasy_team: Option<String>,
    manager: Option<String>,
}

impl GroupKey {
    fn of(row: &RawGameLog) -> Self {
        Self {
            name: row.player_name.trim().to_string(),
            team: row.team.trim().to_string(),
            positions: row.positions.clone(),
            status: row.status.clone(),
            salary: row.salary.unwrap_or(0),
            fantasy_team: row.fantasy_team.clone(),
            manager: row.manager.clone(),
        }
    }
}

fn in_range(row: &RawGameLog, range: Option<&DateRange>) -> Result<bool, EvalError> {
    let Some(range) = range else {
        return Ok(true);
    };
    match row.game_date {
        Some(date) => Ok(range.contains(date)),
        None => Err(EvalError::integrity(
            &row.player_name,
            "row has no game date but a date range was requested",
        )),
    }
}

/// Group, validate and combine raw rows. Volume stats are kept.
pub fn combine_rows(
    raw: &[RawGameLog],
    options: &AggregationOptions,
) -> Result<Vec<PlayerRecord>, EvalError> {
    let mut groups: BTreeMap<GroupKey, (u32, BTreeMap<Stat, f64>)> = BTreeMap::new();

    for row in raw {
        if !in_range(row, options.date_range.as_ref())? {
            continue;
        }
        validate_row(row)?;
        let (games, totals) = groups.entry(GroupKey::of(row)).or_default();
        *games += 1;
        for stat in Stat::RAW {
            *totals.entry(stat).or_insert(0.0) += row.stats.get(&stat).copied().unwrap_or(0.0);
        }
    }

    let mut seen: HashMap<&str, &GroupKey> = HashMap::new();
    for key in groups.keys() {
        if let Some(prev) = seen.insert(key.name.as_str(), key) {
            return Err(EvalError::integrity(
                &key.name,
                format!(
                    "player appears under conflicting identities (team {} vs {}, salary {} vs {})",
                    prev.team, key.team, prev.salary, key.salary
                ),
            ));
        }
    }

    let players = groups
        .into_iter()
        .map(|(key, (games, mut totals))| {
            if options.mode == AggregationMode::Average {
                for value in totals.values_mut() {
                    *value /= games as f64;
                }
            }
            PlayerRecord {
                name: key.name,
                team: key.team,
                positions: key.positions,
                status: key.status,
                salary: key.salary,
                fantasy_team: key.fantasy_team,
                manager: key.manager,
                games,
                stats: totals,
                relative_value: 0.0,
                projections: None,
            }
        })
        .collect();
    Ok(players)
}

// ---------------------------------------------------------------------------
// Top-level entry point
// ---------------------------------------------------------------------------

/// Aggregate raw rows into one record per player with FG/FT impacts in place
/// of the shooting volume stats.
///
/// Steps:
/// 1. Filter rows by date range and validate them.
/// 2. Group by player identity; sum or average counting stats.
/// 3. Compute per-team league shooting averages.
/// 4. Replace made/attempted counts with percentage impacts.
pub fn aggregate(
    raw: &[RawGameLog],
    options: &AggregationOptions,
) -> Result<Vec<PlayerRecord>, EvalError> {
    let combined = combine_rows(raw, options)?;
    if combined.is_empty() {
        info!("No game logs matched; nothing to aggregate");
        return Ok(combined);
    }

    let averages = league_averages(&combined, options.league_teams)?;
    debug!(
        "League averages per team: FG {:.2}/{:.2} ({:.4}), FT {:.2}/{:.2} ({:.4})",
        averages.field_goals,
        averages.field_goal_attempts,
        averages.field_goal_pct,
        averages.free_throws,
        averages.free_throw_attempts,
        averages.free_throw_pct
    );

    let players = apply_percentage_impacts(combined, &averages);
    info!(
        "Aggregated {} raw rows into {} players ({:?} mode)",
        raw.len(),
        players.len(),
        options.mode
    );
    Ok(players)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
