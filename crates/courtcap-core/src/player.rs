// Player identity, eligibility, and the record carried through the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::stats::Stat;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Basketball positions used for roster eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::PG,
        Position::SG,
        Position::SF,
        Position::PF,
        Position::C,
    ];

    /// Parse a single position code into a Position enum.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PG" => Some(Position::PG),
            "SG" => Some(Position::SG),
            "SF" => Some(Position::SF),
            "PF" => Some(Position::PF),
            "C" => Some(Position::C),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::PG => "PG",
            Position::SG => "SG",
            Position::SF => "SF",
            Position::PF => "PF",
            Position::C => "C",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Expand an eligibility code into the concrete positions it represents.
///
/// Combo codes expand ("G" -> PG+SG, "F" -> SF+PF). Meta slots such as
/// "UTIL", "BN" and "IL" carry no eligibility and expand to nothing.
/// Returns `None` for codes that are not recognized at all.
pub fn positions_from_code(code: &str) -> Option<Vec<Position>> {
    let upper = code.trim().to_uppercase();
    match upper.as_str() {
        "G" => Some(vec![Position::PG, Position::SG]),
        "F" => Some(vec![Position::SF, Position::PF]),
        "UTIL" | "BN" | "BE" | "IL" | "IL+" | "NA" => Some(Vec::new()),
        other => Position::from_str_pos(other).map(|p| vec![p]),
    }
}

/// Parse a delimited eligibility list such as `"PG,SG"` or `"SF/PF"`.
///
/// Returns the offending code on failure.
pub fn parse_positions(list: &str) -> Result<BTreeSet<Position>, String> {
    let mut out = BTreeSet::new();
    for code in list.split(|c: char| c == ',' || c == '/').map(str::trim).filter(|c| !c.is_empty()) {
        match positions_from_code(code) {
            Some(expanded) => out.extend(expanded),
            None => return Err(code.to_string()),
        }
    }
    Ok(out)
}

/// Render a position set the way it is written in source files.
pub fn format_positions(positions: &BTreeSet<Position>) -> String {
    positions
        .iter()
        .map(|p| p.display_str())
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Injury / availability designation. A healthy player has no status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Injured,
    Out,
    GameTimeDecision,
    DayToDay,
    NotActive,
    Suspended,
    Other(String),
}

impl Status {
    /// Parse a status code. Empty input means healthy (`None`).
    pub fn parse(code: &str) -> Option<Self> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.to_uppercase().as_str() {
            "INJ" => Status::Injured,
            "O" => Status::Out,
            "GTD" => Status::GameTimeDecision,
            "DTD" => Status::DayToDay,
            "NA" => Status::NotActive,
            "SUSP" => Status::Suspended,
            _ => Status::Other(trimmed.to_string()),
        })
    }

    pub fn code(&self) -> &str {
        match self {
            Status::Injured => "INJ",
            Status::Out => "O",
            Status::GameTimeDecision => "GTD",
            Status::DayToDay => "DTD",
            Status::NotActive => "NA",
            Status::Suspended => "SUSP",
            Status::Other(code) => code,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One raw statistics row for one player: a single game, or a pre-summed
/// season line when `game_date` is `None`.
///
/// A stat absent from `stats` is a missing field; the aggregator rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGameLog {
    pub player_name: String,
    pub team: String,
    pub positions: BTreeSet<Position>,
    pub status: Option<Status>,
    /// Salary in whole currency units. Missing salary is treated as 0.
    pub salary: Option<u64>,
    pub game_date: Option<NaiveDate>,
    pub fantasy_team: Option<String>,
    pub manager: Option<String>,
    pub stats: BTreeMap<Stat, f64>,
}

/// A player carried through the evaluation pipeline.
///
/// `stats` holds aggregated values after aggregation and z-scores after
/// normalization. `relative_value` stays 0.0 until the scorer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub team: String,
    pub positions: BTreeSet<Position>,
    pub status: Option<Status>,
    pub salary: u64,
    pub fantasy_team: Option<String>,
    pub manager: Option<String>,
    /// Number of raw rows folded into this record.
    pub games: u32,
    pub stats: BTreeMap<Stat, f64>,
    pub relative_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projections: Option<BTreeMap<Stat, f64>>,
}

impl PlayerRecord {
    /// Value of a stat, or 0.0 when the stat is absent.
    pub fn stat(&self, stat: Stat) -> f64 {
        self.stats.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn is_eligible(&self, position: Position) -> bool {
        self.positions.contains(&position)
    }

    /// Whether the player is not on any fantasy roster.
    pub fn is_free_agent(&self) -> bool {
        self.manager.is_none() && self.fantasy_team.is_none()
    }
}
