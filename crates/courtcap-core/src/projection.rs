// Baseline stat projections for upcoming games.
//
// A `Projector` turns one stat's per-game history into a total for a number
// of upcoming games. No statistical model lives here; the baselines only
// extrapolate rates.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::player::{PlayerRecord, RawGameLog, Status};
use crate::stats::{raw_percentage, Stat};

pub trait Projector {
    /// Projected total over `games` games from a date-ordered history.
    fn project(&self, history: &[f64], games: u32) -> f64;
}

/// Season per-game mean times games.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanRate;

impl Projector for MeanRate {
    fn project(&self, history: &[f64], games: u32) -> f64 {
        if history.is_empty() {
            return 0.0;
        }
        history.iter().sum::<f64>() / history.len() as f64 * games as f64
    }
}

/// Per-game mean over the last `window` games times games. A window of 0
/// uses the whole history.
#[derive(Debug, Clone, Copy)]
pub struct RecentForm {
    pub window: usize,
}

impl Projector for RecentForm {
    fn project(&self, history: &[f64], games: u32) -> f64 {
        let start = if self.window == 0 {
            0
        } else {
            history.len().saturating_sub(self.window)
        };
        MeanRate.project(&history[start..], games)
    }
}

fn by_date<'a>(logs: impl IntoIterator<Item = &'a RawGameLog>) -> Vec<&'a RawGameLog> {
    let mut rows: Vec<&RawGameLog> = logs.into_iter().collect();
    rows.sort_by_key(|r| r.game_date);
    rows
}

fn project_rows(rows: &[&RawGameLog], games: u32, projector: &dyn Projector) -> BTreeMap<Stat, f64> {
    Stat::RAW
        .into_iter()
        .map(|stat| {
            let history: Vec<f64> = rows
                .iter()
                .map(|r| r.stats.get(&stat).copied().unwrap_or(0.0))
                .collect();
            (stat, projector.project(&history, games).max(0.0))
        })
        .collect()
}

/// Project every raw stat of one player's game logs over `games` games.
/// Negative projections clamp to 0.
pub fn project_player(
    logs: &[RawGameLog],
    games: u32,
    projector: &dyn Projector,
) -> BTreeMap<Stat, f64> {
    project_rows(&by_date(logs), games, projector)
}

fn group_by_player(logs: &[RawGameLog]) -> BTreeMap<&str, Vec<&RawGameLog>> {
    let mut groups: BTreeMap<&str, Vec<&RawGameLog>> = BTreeMap::new();
    for row in logs {
        groups.entry(row.player_name.trim()).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(name, rows)| (name, by_date(rows)))
        .collect()
}

/// Fill `projections` on each player from their game logs, using the game
/// count of their NBA team (0 when the team is not listed).
pub fn attach_projections(
    players: Vec<PlayerRecord>,
    logs: &[RawGameLog],
    games_by_team: &BTreeMap<String, u32>,
    projector: &dyn Projector,
) -> Vec<PlayerRecord> {
    let groups = group_by_player(logs);
    players
        .into_iter()
        .map(|mut p| {
            if let Some(rows) = groups.get(p.name.as_str()) {
                let games = games_by_team.get(&p.team).copied().unwrap_or(0);
                p.projections = Some(project_rows(rows, games, projector));
            }
            p
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Matchups
// ---------------------------------------------------------------------------

/// Projected totals for one fantasy team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamProjection {
    pub fantasy_team: String,
    pub players: Vec<String>,
    pub games: u32,
    pub totals: BTreeMap<Stat, f64>,
    pub field_goal_pct: f64,
    pub free_throw_pct: f64,
}

/// Project each fantasy team's totals for the upcoming period.
///
/// Players whose most recent row is marked injured are left out, as are
/// players on no fantasy team. FG% and FT% come from projected totals.
pub fn project_matchup(
    logs: &[RawGameLog],
    games_by_team: &BTreeMap<String, u32>,
    projector: &dyn Projector,
) -> Vec<TeamProjection> {
    let mut teams: BTreeMap<String, TeamProjection> = BTreeMap::new();

    for (name, rows) in group_by_player(logs) {
        let Some(latest) = rows.last() else {
            continue;
        };
        if latest.status == Some(Status::Injured) {
            debug!("Skipping injured player {} in matchup projection", name);
            continue;
        }
        let Some(fantasy_team) = latest.fantasy_team.clone() else {
            continue;
        };
        let games = games_by_team.get(latest.team.trim()).copied().unwrap_or(0);
        let projected = project_rows(&rows, games, projector);

        let entry = teams
            .entry(fantasy_team.clone())
            .or_insert_with(|| TeamProjection {
                fantasy_team,
                players: Vec::new(),
                games: 0,
                totals: BTreeMap::new(),
                field_goal_pct: 0.0,
                free_throw_pct: 0.0,
            });
        entry.players.push(name.to_string());
        entry.games += games;
        for (stat, value) in projected {
            *entry.totals.entry(stat).or_insert(0.0) += value;
        }
    }

    teams
        .into_values()
        .map(|mut t| {
            let total = |s: Stat| t.totals.get(&s).copied().unwrap_or(0.0);
            t.field_goal_pct = raw_percentage(total(Stat::FieldGoals), total(Stat::FieldGoalAttempts));
            t.free_throw_pct = raw_percentage(total(Stat::FreeThrows), total(Stat::FreeThrowAttempts));
            t
        })
        .collect()
}
