// SQLite store for players and their game logs.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use courtcap_core::aggregate::DateRange;
use courtcap_core::player::{format_positions, parse_positions, RawGameLog, Status};
use courtcap_core::stats::Stat;
use rusqlite::{params, Connection, Transaction};
use std::collections::BTreeMap;

/// Format used for `game_logs.game_date`. Season rows store `''`.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed store of player metadata and per-game stat lines.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                name         TEXT NOT NULL UNIQUE,
                team         TEXT NOT NULL,
                positions    TEXT NOT NULL,
                status       TEXT,
                salary       INTEGER,
                fantasy_team TEXT,
                manager      TEXT
            );

            CREATE TABLE IF NOT EXISTS game_logs (
                player_id INTEGER NOT NULL REFERENCES players(id),
                game_date TEXT NOT NULL DEFAULT '',
                stat_name TEXT NOT NULL,
                value     REAL NOT NULL,
                PRIMARY KEY (player_id, game_date, stat_name)
            );

            CREATE INDEX IF NOT EXISTS idx_game_logs_date ON game_logs(game_date);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self { conn })
    }

    /// Insert a player or refresh their metadata if the name already exists.
    /// Returns the player's row id.
    fn upsert_player(tx: &Transaction<'_>, row: &RawGameLog) -> Result<i64> {
        let id: i64 = tx
            .query_row(
                "INSERT INTO players (name, team, positions, status, salary, fantasy_team, manager)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(name) DO UPDATE SET
                    team         = excluded.team,
                    positions    = excluded.positions,
                    status       = excluded.status,
                    salary       = excluded.salary,
                    fantasy_team = excluded.fantasy_team,
                    manager      = excluded.manager
                 RETURNING id",
                params![
                    row.player_name,
                    row.team,
                    format_positions(&row.positions),
                    row.status.as_ref().map(|s| s.code().to_string()),
                    row.salary.map(|s| s as i64),
                    row.fantasy_team,
                    row.manager,
                ],
                |r| r.get(0),
            )
            .with_context(|| format!("failed to upsert player {}", row.player_name))?;
        Ok(id)
    }

    /// Import game log rows in a single transaction. Re-importing a
    /// (player, date, stat) replaces the stored value. Returns the number of
    /// rows imported.
    pub fn import_game_logs(&mut self, rows: &[RawGameLog]) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .context("failed to begin import transaction")?;

        for row in rows {
            let player_id = Self::upsert_player(&tx, row)?;
            let date = row
                .game_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default();
            for (stat, value) in &row.stats {
                tx.execute(
                    "INSERT OR REPLACE INTO game_logs (player_id, game_date, stat_name, value)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![player_id, date, stat.name(), value],
                )
                .context("failed to insert game log stat")?;
            }
        }

        tx.commit().context("failed to commit game log import")?;
        Ok(rows.len())
    }

    /// Load raw rows, optionally limited to a date range. Undated season rows
    /// are always returned so the aggregator can reject them under a range.
    pub fn load_game_logs(&self, range: Option<&DateRange>) -> Result<Vec<RawGameLog>> {
        let (start, end) = match range {
            Some(r) => (
                r.start.format(DATE_FORMAT).to_string(),
                r.end.format(DATE_FORMAT).to_string(),
            ),
            None => (String::new(), "9999-12-31".to_string()),
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.name, p.team, p.positions, p.status, p.salary, p.fantasy_team,
                        p.manager, g.game_date, g.stat_name, g.value
                 FROM game_logs g JOIN players p ON p.id = g.player_id
                 WHERE g.game_date = '' OR g.game_date BETWEEN ?1 AND ?2
                 ORDER BY p.name, g.game_date",
            )
            .context("failed to prepare load_game_logs query")?;

        struct Line {
            name: String,
            team: String,
            positions: String,
            status: Option<String>,
            salary: Option<i64>,
            fantasy_team: Option<String>,
            manager: Option<String>,
            game_date: String,
            stat_name: String,
            value: f64,
        }

        let lines = stmt
            .query_map(params![start, end], |row| {
                Ok(Line {
                    name: row.get(0)?,
                    team: row.get(1)?,
                    positions: row.get(2)?,
                    status: row.get(3)?,
                    salary: row.get(4)?,
                    fantasy_team: row.get(5)?,
                    manager: row.get(6)?,
                    game_date: row.get(7)?,
                    stat_name: row.get(8)?,
                    value: row.get(9)?,
                })
            })
            .context("failed to query game logs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game log rows")?;

        // Lines arrive sorted by (name, date); fold consecutive lines into rows.
        let mut out: Vec<RawGameLog> = Vec::new();
        let mut current_key: Option<(String, String)> = None;
        for line in lines {
            let stat = Stat::from_name(&line.stat_name)
                .ok_or_else(|| anyhow!("unknown stat `{}` in game_logs", line.stat_name))?;
            let key = (line.name.clone(), line.game_date.clone());
            if current_key.as_ref() != Some(&key) {
                let positions = parse_positions(&line.positions).map_err(|code| {
                    anyhow!("stored position `{code}` for {} is invalid", line.name)
                })?;
                let game_date = if line.game_date.is_empty() {
                    None
                } else {
                    Some(
                        NaiveDate::parse_from_str(&line.game_date, DATE_FORMAT)
                            .with_context(|| format!("invalid stored date {}", line.game_date))?,
                    )
                };
                out.push(RawGameLog {
                    player_name: line.name,
                    team: line.team,
                    positions,
                    status: line.status.as_deref().and_then(Status::parse),
                    salary: line.salary.map(|s| s as u64),
                    game_date,
                    fantasy_team: line.fantasy_team,
                    manager: line.manager,
                    stats: BTreeMap::new(),
                });
                current_key = Some(key);
            }
            if let Some(last) = out.last_mut() {
                last.stats.insert(stat, line.value);
            }
        }
        Ok(out)
    }

    pub fn player_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
