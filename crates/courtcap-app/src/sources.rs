// CSV sources: per-game box scores joined with player info (positions,
// status, salary, fantasy roster).
//
// Game log rows carry a date, a player and the twelve raw stats. Player info
// rows carry everything else. The two are joined on the sanitized player name.

use chrono::NaiveDate;
use courtcap_core::player::{parse_positions, Position, RawGameLog, Status};
use courtcap_core::stats::Stat;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::config::DataPaths;
use crate::names::sanitize_player_name;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path}, record {record}: {message}")]
    Parse {
        path: String,
        record: usize,
        message: String,
    },

    #[error("game logs reference player `{name}` who has no player info row")]
    UnknownPlayer { name: String },

    #[error("player info lists `{name}` more than once")]
    DuplicatePlayer { name: String },
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything known about a player apart from box scores.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub name: String,
    pub team: String,
    pub positions: BTreeSet<Position>,
    pub status: Option<Status>,
    /// `None` when the source has no salary; treated as 0 downstream.
    pub salary: Option<u64>,
    pub fantasy_team: Option<String>,
    pub manager: Option<String>,
}

/// One box score line before the player-info join.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxScore {
    pub player_name: String,
    pub team: String,
    pub game_date: Option<NaiveDate>,
    pub stats: BTreeMap<Stat, f64>,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Game log CSV row. Stat columns are optional so a missing value becomes a
/// missing stat, which the aggregator reports. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct RawBoxScore {
    #[serde(default)]
    date: String,
    player: String,
    #[serde(default)]
    team: String,
    #[serde(default, alias = "fgm")]
    fg: Option<f64>,
    #[serde(default)]
    fga: Option<f64>,
    #[serde(default, alias = "ftm")]
    ft: Option<f64>,
    #[serde(default)]
    fta: Option<f64>,
    #[serde(default, alias = "3pm", alias = "fg3")]
    three_pm: Option<f64>,
    #[serde(default)]
    pts: Option<f64>,
    #[serde(default, alias = "trb")]
    reb: Option<f64>,
    #[serde(default)]
    ast: Option<f64>,
    #[serde(default)]
    stl: Option<f64>,
    #[serde(default)]
    blk: Option<f64>,
    #[serde(default)]
    tov: Option<f64>,
    #[serde(default, alias = "mp")]
    min: Option<f64>,
}

impl RawBoxScore {
    fn stat_columns(&self) -> [(Stat, Option<f64>); 12] {
        [
            (Stat::FieldGoals, self.fg),
            (Stat::FieldGoalAttempts, self.fga),
            (Stat::FreeThrows, self.ft),
            (Stat::FreeThrowAttempts, self.fta),
            (Stat::ThreePointers, self.three_pm),
            (Stat::Points, self.pts),
            (Stat::Rebounds, self.reb),
            (Stat::Assists, self.ast),
            (Stat::Steals, self.stl),
            (Stat::Blocks, self.blk),
            (Stat::Turnovers, self.tov),
            (Stat::Minutes, self.min),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct RawPlayerInfo {
    player: String,
    #[serde(default)]
    team: String,
    positions: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    salary: Option<u64>,
    #[serde(default)]
    fantasy_team: Option<String>,
    #[serde(default)]
    manager: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScheduleRow {
    team: String,
    games: u32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

/// Parse a game log CSV. `label` names the source in errors.
pub fn load_box_scores_from_reader<R: Read>(
    rdr: R,
    label: &str,
) -> Result<Vec<BoxScore>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<RawBoxScore>().enumerate() {
        let raw = result.map_err(|e| SourceError::Csv {
            path: label.to_string(),
            source: e,
        })?;
        let game_date = if raw.date.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").map_err(|e| SourceError::Parse {
                    path: label.to_string(),
                    record: i + 1,
                    message: format!("invalid date `{}`: {e}", raw.date),
                })?,
            )
        };
        let stats = raw
            .stat_columns()
            .into_iter()
            .filter_map(|(stat, v)| v.map(|v| (stat, v)))
            .collect();
        rows.push(BoxScore {
            player_name: raw.player.clone(),
            team: raw.team.clone(),
            game_date,
            stats,
        });
    }
    Ok(rows)
}

/// Parse a player info CSV. Positions accept `PG,SG` or `PG/SG`.
pub fn load_player_info_from_reader<R: Read>(
    rdr: R,
    label: &str,
) -> Result<Vec<PlayerInfo>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut players = Vec::new();
    for (i, result) in reader.deserialize::<RawPlayerInfo>().enumerate() {
        let raw = result.map_err(|e| SourceError::Csv {
            path: label.to_string(),
            source: e,
        })?;
        let positions = parse_positions(&raw.positions).map_err(|code| SourceError::Parse {
            path: label.to_string(),
            record: i + 1,
            message: format!("unknown position code `{code}` for {}", raw.player),
        })?;
        if raw.salary.is_none() {
            warn!("no salary for {}; using 0", raw.player);
        }
        players.push(PlayerInfo {
            name: raw.player,
            team: raw.team,
            positions,
            status: Status::parse(&raw.status),
            salary: raw.salary,
            fantasy_team: non_empty(raw.fantasy_team),
            manager: non_empty(raw.manager),
        });
    }
    Ok(players)
}

/// Parse a `team,games` CSV of upcoming games per NBA team.
pub fn load_schedule_from_reader<R: Read>(
    rdr: R,
    label: &str,
) -> Result<BTreeMap<String, u32>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut games = BTreeMap::new();
    for result in reader.deserialize::<RawScheduleRow>() {
        let raw = result.map_err(|e| SourceError::Csv {
            path: label.to_string(),
            source: e,
        })?;
        games.insert(raw.team, raw.games);
    }
    Ok(games)
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Attach player info to every box score. The player's listed team wins over
/// the box score team so a traded player keeps one identity.
pub fn join(info: &[PlayerInfo], box_scores: Vec<BoxScore>) -> Result<Vec<RawGameLog>, SourceError> {
    let mut by_name: HashMap<String, &PlayerInfo> = HashMap::new();
    for p in info {
        if by_name.insert(sanitize_player_name(&p.name), p).is_some() {
            return Err(SourceError::DuplicatePlayer {
                name: p.name.clone(),
            });
        }
    }

    box_scores
        .into_iter()
        .map(|b| {
            let key = sanitize_player_name(&b.player_name);
            let Some(p) = by_name.get(&key) else {
                return Err(SourceError::UnknownPlayer {
                    name: b.player_name,
                });
            };
            let team = if p.team.is_empty() { b.team } else { p.team.clone() };
            Ok(RawGameLog {
                player_name: p.name.clone(),
                team,
                positions: p.positions.clone(),
                status: p.status.clone(),
                salary: p.salary,
                game_date: b.game_date,
                fantasy_team: p.fantasy_team.clone(),
                manager: p.manager.clone(),
                stats: b.stats,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// File-based entry points
// ---------------------------------------------------------------------------

fn open(path: &str) -> Result<File, SourceError> {
    File::open(Path::new(path)).map_err(|e| SourceError::Io {
        path: path.to_string(),
        source: e,
    })
}

/// Load and join the game log and player info CSVs named in the config.
pub fn load_raw(paths: &DataPaths) -> Result<Vec<RawGameLog>, SourceError> {
    let info = load_player_info_from_reader(open(&paths.player_info)?, &paths.player_info)?;
    let box_scores = load_box_scores_from_reader(open(&paths.game_logs)?, &paths.game_logs)?;
    let raw = join(&info, box_scores)?;
    info!(
        "Loaded {} game log rows for {} players",
        raw.len(),
        info.len()
    );
    Ok(raw)
}

/// Load the schedule CSV if one is configured.
pub fn load_schedule(paths: &DataPaths) -> Result<Option<BTreeMap<String, u32>>, SourceError> {
    match &paths.schedule {
        Some(path) if Path::new(path).exists() => {
            Ok(Some(load_schedule_from_reader(open(path)?, path)?))
        }
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
