// Configuration loading and parsing (league.toml, strategy.toml).

use chrono::NaiveDate;
use courtcap_core::aggregate::{AggregationMode, AggregationOptions, DateRange};
use courtcap_core::optimizer::{PositionRule, RosterRules};
use courtcap_core::player::Position;
use courtcap_core::scoring::WeightVector;
use courtcap_core::solver::BranchAndBound;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub strategy: StrategyConfig,
    pub db_path: String,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Teams in the real league; spreads league shooting volume per team.
    pub num_teams: u32,
    pub roster_size: usize,
    pub salary_cap: u64,
    /// Count rule per position, keyed by position code.
    pub positions: BTreeMap<Position, PositionRule>,
}

impl LeagueConfig {
    pub fn roster_rules(&self) -> RosterRules {
        RosterRules {
            roster_size: self.roster_size,
            salary_cap: self.salary_cap,
            positions: self.positions.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    weights: BTreeMap<String, f64>,
    #[serde(default)]
    evaluation: EvaluationConfig,
    #[serde(default)]
    solver: SolverConfig,
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// The public strategy config assembled from the strategy.toml sections.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Stat weights keyed by stat name (`points`, `turnovers`, ...).
    pub weights: BTreeMap<String, f64>,
    pub evaluation: EvaluationConfig,
    pub solver: SolverConfig,
}

impl StrategyConfig {
    /// Typed weights plus the names that matched no scored stat.
    pub fn weight_vector(&self) -> (WeightVector, Vec<String>) {
        WeightVector::from_names(&self.weights)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub mode: AggregationMode,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl EvaluationConfig {
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        }
    }

    pub fn aggregation_options(&self, league_teams: u32) -> AggregationOptions {
        AggregationOptions {
            mode: self.mode,
            date_range: self.date_range(),
            league_teams,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub node_limit: Option<u64>,
    #[serde(default)]
    pub time_limit_secs: Option<f64>,
}

impl SolverConfig {
    pub fn backend(&self) -> BranchAndBound {
        BranchAndBound {
            node_limit: self.node_limit,
            time_limit: self.time_limit_secs.map(Duration::from_secs_f64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub game_logs: String,
    pub player_info: String,
    /// Optional `team,games` CSV for projections.
    #[serde(default)]
    pub schedule: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/strategy.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let strategy_path = config_dir.join("strategy.toml");
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        strategy: StrategyConfig {
            weights: strategy_file.weights,
            evaluation: strategy_file.evaluation,
            solver: strategy_file.solver,
        },
        db_path: strategy_file.database.path,
        data_paths: strategy_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Files that make up a configuration, looked up in `config/` and seeded
/// from `defaults/`.
const CONFIG_FILES: [&str; 2] = ["league.toml", "strategy.toml"];

/// Seed `config/` from `defaults/` for every config file that is missing.
/// Existing files are never overwritten. Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "no defaults/ or config/ directory under {}",
                    base_dir.display()
                ),
            })
        };
    }

    let copy_error = |action: &str, path: &Path, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {}: {e}", path.display()),
    };

    std::fs::create_dir_all(&config_dir).map_err(|e| copy_error("create", &config_dir, e))?;

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let source = defaults_dir.join(name);
        let target = config_dir.join(name);
        if target.exists() || !source.is_file() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| copy_error("copy", &source, e))?;
        info!("Seeded {} from defaults", target.display());
        copied.push(target);
    }
    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.num_teams == 0 {
        return Err(invalid("league.num_teams", "must be greater than 0"));
    }
    if league.roster_size == 0 {
        return Err(invalid("league.roster_size", "must be greater than 0"));
    }
    if league.salary_cap == 0 {
        return Err(invalid("league.salary_cap", "must be greater than 0"));
    }
    for pos in Position::ALL {
        let field = format!("league.positions.{pos}");
        let Some(rule) = league.positions.get(&pos) else {
            return Err(invalid(field, "missing count rule"));
        };
        if rule.min > rule.max {
            return Err(invalid(
                field,
                format!("min ({}) must not exceed max ({})", rule.min, rule.max),
            ));
        }
    }

    let weights = &config.strategy.weights;
    for (name, w) in weights {
        if !w.is_finite() {
            return Err(invalid(format!("weights.{name}"), format!("must be finite, got {w}")));
        }
    }
    if config.strategy.weight_vector().0.weighted_stats().is_empty() {
        return Err(invalid(
            "weights",
            "at least one scored stat must have a non-zero weight",
        ));
    }

    let eval = &config.strategy.evaluation;
    match (eval.start_date, eval.end_date) {
        (Some(start), Some(end)) if start > end => {
            return Err(invalid(
                "evaluation.start_date",
                format!("{start} is after end_date {end}"),
            ));
        }
        (Some(_), None) => {
            return Err(invalid("evaluation.end_date", "required when start_date is set"));
        }
        (None, Some(_)) => {
            return Err(invalid("evaluation.start_date", "required when end_date is set"));
        }
        _ => {}
    }

    let solver = &config.strategy.solver;
    if solver.node_limit == Some(0) {
        return Err(invalid("solver.node_limit", "must be greater than 0"));
    }
    if let Some(secs) = solver.time_limit_secs {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(invalid(
                "solver.time_limit_secs",
                format!("must be > 0, got {secs}"),
            ));
        }
    }

    if config.db_path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use courtcap_core::stats::Stat;
    use std::fs;

    /// Helper: returns the path to the app crate root
    /// (works whether `cargo test` runs from the crate root or repo root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/courtcap-app/defaults").exists() {
            cwd.join("crates/courtcap-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir with both default files copied into config/.
    fn temp_with_defaults(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        let root = project_root();
        fs::copy(root.join("defaults/league.toml"), config_dir.join("league.toml")).unwrap();
        fs::copy(
            root.join("defaults/strategy.toml"),
            config_dir.join("strategy.toml"),
        )
        .unwrap();
        tmp
    }

    fn rewrite(tmp: &Path, file: &str, from: &str, to: &str) {
        let path = tmp.join("config").join(file);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "{file} does not contain `{from}`");
        fs::write(&path, text.replace(from, to)).unwrap();
    }

    fn expect_field(tmp: &Path, expected: &str) {
        match load_config_from(tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_default_config() {
        let tmp = temp_with_defaults("courtcap_config_defaults");
        let config = load_config_from(&tmp).expect("should load default config");

        assert_eq!(config.league.num_teams, 30);
        assert_eq!(config.league.roster_size, 12);
        assert_eq!(config.league.salary_cap, 140_000_000);
        assert_eq!(config.league.positions[&Position::C], PositionRule::new(3, 6));
        assert_eq!(config.league.roster_rules(), RosterRules::default());

        let (weights, unknown) = config.strategy.weight_vector();
        assert!(unknown.is_empty());
        assert_eq!(weights.get(Stat::Turnovers), -1.0);
        assert_eq!(weights.get(Stat::FieldGoalImpact), 1.0);

        assert_eq!(config.strategy.evaluation.mode, AggregationMode::Sum);
        assert!(config.strategy.evaluation.date_range().is_none());
        assert_eq!(config.db_path, "courtcap.db");
        assert_eq!(config.data_paths.game_logs, "data/game_logs.csv");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_then_skips() {
        let tmp = std::env::temp_dir().join("courtcap_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        let root = project_root();
        fs::copy(root.join("defaults/league.toml"), tmp.join("defaults/league.toml")).unwrap();
        fs::write(tmp.join("defaults/notes.toml.example"), "x = 1").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/league.toml")]);
        assert!(ensure_config_files(&tmp).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_and_config_is_an_error() {
        let tmp = std::env::temp_dir().join("courtcap_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_strategy_toml() {
        let tmp = temp_with_defaults("courtcap_config_missing_strategy");
        fs::remove_file(tmp.join("config/strategy.toml")).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_names_the_file() {
        let tmp = temp_with_defaults("courtcap_config_parse_error");
        fs::write(tmp.join("config/league.toml"), "[league\nname = ").unwrap();
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("league.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_num_teams_zero() {
        let tmp = temp_with_defaults("courtcap_config_num_teams_zero");
        rewrite(&tmp, "league.toml", "num_teams = 30", "num_teams = 0");
        expect_field(&tmp, "league.num_teams");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_missing_position_rule() {
        let tmp = temp_with_defaults("courtcap_config_missing_position");
        rewrite(&tmp, "league.toml", "SF = { min = 2, max = 6 }\n", "");
        expect_field(&tmp, "league.positions.SF");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_min_above_max() {
        let tmp = temp_with_defaults("courtcap_config_min_above_max");
        rewrite(&tmp, "league.toml", "C = { min = 3, max = 6 }", "C = { min = 7, max = 6 }");
        expect_field(&tmp, "league.positions.C");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_weight_names_are_reported_not_fatal() {
        let tmp = temp_with_defaults("courtcap_config_unknown_weight");
        rewrite(&tmp, "strategy.toml", "[weights]\n", "[weights]\nplus_minus = 2.0\n");
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.strategy.weight_vector().1, vec!["plus_minus".to_string()]);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_half_open_date_range() {
        let tmp = temp_with_defaults("courtcap_config_half_range");
        rewrite(
            &tmp,
            "strategy.toml",
            "[evaluation]\n",
            "[evaluation]\nstart_date = \"2024-01-01\"\n",
        );
        expect_field(&tmp, "evaluation.end_date");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn date_range_feeds_aggregation_options() {
        let tmp = temp_with_defaults("courtcap_config_range");
        rewrite(
            &tmp,
            "strategy.toml",
            "[evaluation]\n",
            "[evaluation]\nstart_date = \"2024-01-01\"\nend_date = \"2024-01-31\"\n",
        );
        let config = load_config_from(&tmp).unwrap();
        let opts = config.strategy.evaluation.aggregation_options(config.league.num_teams);
        let range = opts.date_range.unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(opts.league_teams, 30);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn solver_limits_build_the_backend() {
        let solver = SolverConfig {
            node_limit: Some(10),
            time_limit_secs: Some(1.5),
        }
        .backend();
        assert_eq!(solver.node_limit, Some(10));
        assert_eq!(solver.time_limit, Some(Duration::from_millis(1500)));
    }
}
