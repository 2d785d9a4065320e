// Plain-text tables and JSON output for the CLI.

use anyhow::{Context, Result};
use courtcap_core::analysis::{CategoryTotals, ValueRank, ValueSummary};
use courtcap_core::optimizer::RosterSelection;
use courtcap_core::player::{format_positions, PlayerRecord};
use courtcap_core::projection::TeamProjection;
use courtcap_core::stats::Stat;
use serde::Serialize;
use std::fmt::Write;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

fn millions(salary: u64) -> String {
    format!("{:.2}M", salary as f64 / 1_000_000.0)
}

fn status_code(p: &PlayerRecord) -> &str {
    p.status.as_ref().map(|s| s.code()).unwrap_or("")
}

/// Ranked players, best first.
pub fn players_table(players: &[PlayerRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<26} {:<4} {:<10} {:<5} {:>9} {:>8}",
        "#", "Player", "Team", "Pos", "Stat", "Salary", "Value"
    );
    for (i, p) in players.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<26} {:<4} {:<10} {:<5} {:>9} {:>8.3}",
            i + 1,
            p.name,
            p.team,
            format_positions(&p.positions),
            status_code(p),
            millions(p.salary),
            p.relative_value
        );
    }
    out
}

pub fn roster_table(selection: &RosterSelection, salary_cap: u64) -> String {
    let mut out = players_table(&selection.players);
    let _ = writeln!(
        out,
        "\nSalary {} of {} ({} left), total value {:.3}",
        millions(selection.total_salary),
        millions(salary_cap),
        millions(salary_cap.saturating_sub(selection.total_salary)),
        selection.total_value
    );
    let counts: Vec<String> = selection
        .position_counts
        .iter()
        .map(|(pos, n)| format!("{pos} {n}"))
        .collect();
    let _ = writeln!(out, "Eligible by position: {}", counts.join(", "));
    out
}

pub fn value_table(values: &[ValueRank]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<26} {:<4} {:>9} {:>8} {:>9}",
        "Player", "Team", "Salary", "Value", "Value/$M"
    );
    for v in values {
        let _ = writeln!(
            out,
            "{:<26} {:<4} {:>9} {:>8.3} {:>9.3}",
            v.name,
            v.team,
            millions(v.salary),
            v.relative_value,
            v.value_per_million
        );
    }
    out
}

pub fn summary_line(summary: Option<&ValueSummary>) -> String {
    match summary {
        Some(s) => format!(
            "{} players, max value {:.3}, median value {:.3}\n",
            s.count, s.max, s.median
        ),
        None => "no players\n".to_string(),
    }
}

pub fn category_table(rows: &[CategoryTotals]) -> String {
    let mut out = String::new();
    let stats: Vec<Stat> = rows
        .first()
        .map(|r| r.totals.keys().copied().collect())
        .unwrap_or_default();
    let _ = write!(out, "{:<16}", "Manager");
    for s in &stats {
        let _ = write!(out, " {:>10}", s.abbrev());
    }
    let _ = writeln!(out, " {:>8}", "Score");
    for r in rows {
        let _ = write!(out, "{:<16}", r.manager);
        for s in &stats {
            let total = r.totals.get(s).copied().unwrap_or(0.0);
            let rank = r.ranks.get(s).copied().unwrap_or(0);
            let _ = write!(out, " {:>6.2} ({rank:>1})", total);
        }
        let _ = writeln!(out, " {:>8.3}", r.score);
    }
    out
}

pub fn matchup_table(teams: &[TeamProjection]) -> String {
    let counting = [
        Stat::ThreePointers,
        Stat::Points,
        Stat::Rebounds,
        Stat::Assists,
        Stat::Steals,
        Stat::Blocks,
        Stat::Turnovers,
    ];
    let mut out = String::new();
    let _ = write!(out, "{:<18} {:>5} {:>6} {:>6}", "Team", "Games", "FG%", "FT%");
    for s in counting {
        let _ = write!(out, " {:>7}", s.abbrev());
    }
    let _ = writeln!(out);
    for t in teams {
        let _ = write!(
            out,
            "{:<18} {:>5} {:>6.3} {:>6.3}",
            t.fantasy_team, t.games, t.field_goal_pct, t.free_throw_pct
        );
        for s in counting {
            let _ = write!(out, " {:>7.1}", t.totals.get(&s).copied().unwrap_or(0.0));
        }
        let _ = writeln!(out);
    }
    out
}
