// Integration tests for the courtcap app.
//
// These drive the CSV sources, the SQLite store, the evaluation pipeline,
// roster selection and the command handlers together through the library
// crate's public API.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use courtcap_app::cli::Cli;
use courtcap_app::commands;
use courtcap_app::config::{Config, DataPaths, EvaluationConfig, LeagueConfig, SolverConfig, StrategyConfig};
use courtcap_app::db::Database;
use courtcap_app::sources;
use courtcap_core::optimizer::RosterRules;
use courtcap_core::projection::{self, MeanRate};
use courtcap_core::{
    evaluate_players, pick_roster, AggregationMode, AggregationOptions, BranchAndBound, DateRange,
    Position, RosterError, Stat, Status, WeightVector,
};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn fixture(name: &str) -> String {
    format!("{FIXTURES}/{name}")
}

fn data_paths() -> DataPaths {
    DataPaths {
        game_logs: fixture("game_logs.csv"),
        player_info: fixture("players.csv"),
        schedule: Some(fixture("schedule.csv")),
    }
}

fn weights_table() -> BTreeMap<String, f64> {
    [
        ("field_goal_percentage", 1.0),
        ("free_throw_percentage", 1.0),
        ("three_pointers", 1.0),
        ("points", 1.0),
        ("rebounds", 1.0),
        ("assists", 1.0),
        ("steals", 1.0),
        ("blocks", 1.0),
        ("turnovers", -1.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Config pointing at the fixtures, with a per-test database file.
fn test_config(db_name: &str) -> Config {
    let db_path = std::env::temp_dir().join(format!("courtcap_it_{db_name}.db"));
    let _ = std::fs::remove_file(&db_path);
    Config {
        league: LeagueConfig {
            name: "Fixture League".into(),
            num_teams: 8,
            roster_size: 12,
            salary_cap: 140_000_000,
            positions: RosterRules::default().positions,
        },
        strategy: StrategyConfig {
            weights: weights_table(),
            evaluation: EvaluationConfig::default(),
            solver: SolverConfig {
                node_limit: Some(5_000_000),
                time_limit_secs: Some(60.0),
            },
        },
        db_path: db_path.to_string_lossy().into_owned(),
        data_paths: data_paths(),
    }
}

fn options(mode: AggregationMode) -> AggregationOptions {
    AggregationOptions {
        mode,
        date_range: None,
        league_teams: 8,
    }
}

fn date(day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn run(config: &Config, args: &[&str]) -> String {
    let cli = Cli::parse_from(std::iter::once("courtcap").chain(args.iter().copied()));
    commands::run(&cli, config).unwrap_or_else(|e| panic!("{args:?} failed: {e:#}"))
}

// ===========================================================================
// Sources and evaluation
// ===========================================================================

#[test]
fn fixtures_load_and_join() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    assert_eq!(raw.len(), 60);

    let devin: Vec<_> = raw.iter().filter(|r| r.player_name == "Devin Dawson").collect();
    assert_eq!(devin.len(), 3);
    assert!(devin[0].positions.contains(&Position::PG));
    assert!(devin[0].positions.contains(&Position::SG));

    let irwin = raw.iter().find(|r| r.player_name == "Indy Irwin").unwrap();
    assert!(irwin.positions.contains(&Position::PF));
    assert!(irwin.positions.contains(&Position::C));

    let grant = raw.iter().find(|r| r.player_name == "Gray Grant").unwrap();
    assert_eq!(grant.status, Some(Status::Injured));

    let tate = raw.iter().find(|r| r.player_name == "Taylor Tate").unwrap();
    assert_eq!(tate.salary, None);
}

#[test]
fn evaluation_ranks_every_player() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let (weights, unknown) = WeightVector::from_names(&weights_table());
    assert!(unknown.is_empty());

    let scored = evaluate_players(&raw, &weights, &options(AggregationMode::Sum)).unwrap();
    assert_eq!(scored.len(), 20);
    assert!(scored.iter().all(|p| p.games == 3));
    assert!(scored
        .windows(2)
        .all(|w| w[0].relative_value >= w[1].relative_value));

    // z-scores over the pool are centered.
    let mean_points: f64 = scored.iter().map(|p| p.stat(Stat::Points)).sum::<f64>() / 20.0;
    assert!(approx_eq(mean_points, 0.0, 1e-9));

    // Relative value is the weighted z-score sum.
    let top = &scored[0];
    let expected: f64 = weights
        .weighted_stats()
        .into_iter()
        .map(|s| weights.get(s) * top.stat(s))
        .sum();
    assert!(approx_eq(top.relative_value, expected, 1e-9));
}

#[test]
fn average_mode_matches_sum_when_games_are_equal() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let (weights, _) = WeightVector::from_names(&weights_table());
    let sum = evaluate_players(&raw, &weights, &options(AggregationMode::Sum)).unwrap();
    let avg = evaluate_players(&raw, &weights, &options(AggregationMode::Average)).unwrap();

    // Every fixture player has three games, so per-game z-scores match totals.
    let sum_names: Vec<&str> = sum.iter().map(|p| p.name.as_str()).collect();
    let avg_names: Vec<&str> = avg.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(sum_names, avg_names);
    for (s, a) in sum.iter().zip(&avg) {
        assert!(approx_eq(s.stat(Stat::Rebounds), a.stat(Stat::Rebounds), 1e-9));
    }
}

#[test]
fn date_range_limits_games() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let (weights, _) = WeightVector::from_names(&weights_table());
    let opts = AggregationOptions {
        date_range: Some(DateRange {
            start: date(1),
            end: date(4),
        }),
        ..options(AggregationMode::Sum)
    };
    let scored = evaluate_players(&raw, &weights, &opts).unwrap();
    assert_eq!(scored.len(), 20);
    assert!(scored.iter().all(|p| p.games == 2));
}

#[test]
fn zero_weight_for_a_category_drops_it_from_value() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let opts = options(AggregationMode::Sum);
    let (full, _) = WeightVector::from_names(&weights_table());
    let mut table = weights_table();
    table.insert("blocks".into(), 0.0);
    let (no_blocks, _) = WeightVector::from_names(&table);
    assert!(!no_blocks.weighted_stats().contains(&Stat::Blocks));

    let with = evaluate_players(&raw, &full, &opts).unwrap();
    let without = evaluate_players(&raw, &no_blocks, &opts).unwrap();
    for p in &without {
        let q = with.iter().find(|q| q.name == p.name).unwrap();
        assert!(approx_eq(
            q.relative_value - p.relative_value,
            q.stat(Stat::Blocks),
            1e-9
        ));
    }
}

// ===========================================================================
// Roster selection
// ===========================================================================

#[test]
fn roster_pick_respects_rules() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let (weights, _) = WeightVector::from_names(&weights_table());
    let scored = evaluate_players(&raw, &weights, &options(AggregationMode::Sum)).unwrap();

    let rules = RosterRules::default();
    let selection = pick_roster(&scored, &rules, &BranchAndBound::default()).unwrap();
    assert_eq!(selection.players.len(), 12);
    assert!(selection.total_salary <= rules.salary_cap);
    for (pos, rule) in &rules.positions {
        let eligible = selection.players.iter().filter(|p| p.is_eligible(*pos)).count();
        assert!(eligible >= rule.min, "{pos} has {eligible} < {}", rule.min);
        assert!(eligible <= rule.max, "{pos} has {eligible} > {}", rule.max);
    }
    selection.check(&rules).unwrap();
}

#[test]
fn roster_pick_below_cheapest_roster_is_infeasible() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let (weights, _) = WeightVector::from_names(&weights_table());
    let scored = evaluate_players(&raw, &weights, &options(AggregationMode::Sum)).unwrap();

    // The twelve cheapest fixture salaries add up to 119.5M.
    let rules = RosterRules {
        salary_cap: 100_000_000,
        ..RosterRules::default()
    };
    match pick_roster(&scored, &rules, &BranchAndBound::default()) {
        Err(RosterError::Infeasible { .. }) => {}
        other => panic!("expected infeasible, got {other:?}"),
    }
}

// ===========================================================================
// SQLite store
// ===========================================================================

#[test]
fn database_round_trip_matches_csv_evaluation() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let mut db = Database::open(":memory:").unwrap();
    assert_eq!(db.import_game_logs(&raw).unwrap(), 60);
    assert_eq!(db.player_count().unwrap(), 20);

    let loaded = db.load_game_logs(None).unwrap();
    assert_eq!(loaded.len(), 60);

    let (weights, _) = WeightVector::from_names(&weights_table());
    let opts = options(AggregationMode::Sum);
    let from_csv = evaluate_players(&raw, &weights, &opts).unwrap();
    let from_db = evaluate_players(&loaded, &weights, &opts).unwrap();
    assert_eq!(from_csv.len(), from_db.len());
    for (a, b) in from_csv.iter().zip(&from_db) {
        assert_eq!(a.name, b.name);
        assert!(approx_eq(a.relative_value, b.relative_value, 1e-9));
    }
}

// ===========================================================================
// Projections
// ===========================================================================

#[test]
fn matchup_projection_skips_injured_and_unrostered() {
    let raw = sources::load_raw(&data_paths()).unwrap();
    let schedule = sources::load_schedule(&data_paths()).unwrap().unwrap();
    assert_eq!(schedule["DEN"], 4);

    let teams = projection::project_matchup(&raw, &schedule, &MeanRate);
    let names: Vec<&str> = teams.iter().map(|t| t.fantasy_team.as_str()).collect();
    assert_eq!(names, vec!["Bricklayers", "Hoopers"]);

    let hoopers = &teams[1];
    assert_eq!(hoopers.players.len(), 6);
    assert!(!hoopers.players.iter().any(|p| p == "Gray Grant"));
    assert_eq!(hoopers.games, 20);

    let bricklayers = &teams[0];
    assert_eq!(bricklayers.players.len(), 7);
    assert_eq!(bricklayers.games, 23);
    assert!(bricklayers.field_goal_pct > 0.0 && bricklayers.field_goal_pct <= 1.0);
}

// ===========================================================================
// Command handlers
// ===========================================================================

#[test]
fn evaluate_command_emits_limited_json() {
    let config = test_config("evaluate");
    let out = run(&config, &["evaluate", "--limit", "5", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let players = parsed.as_array().unwrap();
    assert_eq!(players.len(), 5);
    assert!(players[0]["relative_value"].as_f64().unwrap() >= players[4]["relative_value"].as_f64().unwrap());
}

#[test]
fn evaluate_by_manager_groups_rosters() {
    let config = test_config("by_manager");
    let out = run(&config, &["evaluate", "--by-manager", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let rosters = parsed["rosters"].as_object().unwrap();
    assert_eq!(rosters["ann"].as_array().unwrap().len(), 7);
    assert_eq!(rosters["bo"].as_array().unwrap().len(), 7);
    assert_eq!(parsed["standings"].as_array().unwrap().len(), 2);
}

#[test]
fn pick_command_reports_salary_summary() {
    let config = test_config("pick");
    let out = run(&config, &["pick"]);
    assert!(out.contains("Salary "), "unexpected output:\n{out}");
    assert!(out.contains("of 140.00M"));
    // Header, twelve players, blank line, salary and eligibility lines.
    assert_eq!(out.lines().count(), 16);
}

#[test]
fn free_agents_by_salary_lists_only_unrostered() {
    let config = test_config("free_agents");
    let out = run(&config, &["free-agents", "--by-salary", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let agents = parsed.as_array().unwrap();
    assert_eq!(agents.len(), 6);
    let ratios: Vec<f64> = agents
        .iter()
        .map(|a| a["value_per_million"].as_f64().unwrap())
        .collect();
    assert!(ratios.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn import_then_evaluate_from_db() {
    let config = test_config("import");
    let out = run(&config, &["import"]);
    assert!(out.starts_with("Imported 60 game log rows (20 players)"));

    let from_csv = run(&config, &["evaluate", "--json"]);
    let from_db = run(&config, &["evaluate", "--json", "--from-db"]);
    let a: serde_json::Value = serde_json::from_str(&from_csv).unwrap();
    let b: serde_json::Value = serde_json::from_str(&from_db).unwrap();
    let names = |v: &serde_json::Value| -> Vec<String> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(names(&a), names(&b));

    let _ = std::fs::remove_file(PathBuf::from(&config.db_path));
}

#[test]
fn project_command_uses_schedule_file() {
    let config = test_config("project");
    let out = run(&config, &["project", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let teams = parsed.as_array().unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0]["games"].as_u64(), Some(23));
}
