// Command handlers. Each returns the text to print so the binary stays a
// thin shell and tests can drive the same paths.

use anyhow::{Context, Result};
use courtcap_core::aggregate::AggregationOptions;
use courtcap_core::analysis;
use courtcap_core::player::{PlayerRecord, RawGameLog};
use courtcap_core::projection::{self, MeanRate, Projector, RecentForm};
use courtcap_core::{evaluate_players, pick_roster};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cli::{Cli, Command, WindowArgs};
use crate::config::Config;
use crate::db::Database;
use crate::report;
use crate::sources;

/// Configured aggregation options with any command-line overrides applied.
pub fn aggregation_options(config: &Config, window: &WindowArgs) -> AggregationOptions {
    let mut options = config
        .strategy
        .evaluation
        .aggregation_options(config.league.num_teams);
    if let Some(mode) = window.mode {
        options.mode = mode.into();
    }
    if let (Some(start), Some(end)) = (window.start, window.end) {
        options.date_range = Some(courtcap_core::DateRange { start, end });
    }
    options
}

/// Raw rows from the CSV sources, or from the SQLite store with `from_db`.
pub fn load_raw(
    config: &Config,
    from_db: bool,
    options: &AggregationOptions,
) -> Result<Vec<RawGameLog>> {
    if from_db {
        let db = Database::open(&config.db_path).context("failed to open database")?;
        db.load_game_logs(options.date_range.as_ref())
    } else {
        sources::load_raw(&config.data_paths).context("failed to load CSV sources")
    }
}

/// Aggregate, normalize and score with the configured weights. Unknown
/// weight names are logged by `WeightVector::from_names` and ignored.
pub fn evaluate(
    raw: &[RawGameLog],
    config: &Config,
    options: &AggregationOptions,
) -> Result<Vec<PlayerRecord>> {
    let (weights, _unknown) = config.strategy.weight_vector();
    evaluate_players(raw, &weights, options).context("player evaluation failed")
}

fn render<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<String> {
    if json {
        report::to_json(value)
    } else {
        Ok(text())
    }
}

/// Run one parsed command against a loaded config.
pub fn run(cli: &Cli, config: &Config) -> Result<String> {
    match &cli.command {
        Command::Evaluate {
            window,
            limit,
            by_manager,
        } => {
            let options = aggregation_options(config, window);
            let raw = load_raw(config, cli.from_db, &options)?;
            let scored = evaluate(&raw, config, &options)?;
            if *by_manager {
                let (weights, _) = config.strategy.weight_vector();
                let rosters = analysis::by_manager(&scored);
                let standings = analysis::category_totals(&scored, &weights);
                #[derive(Serialize)]
                struct ManagerView<'a> {
                    rosters: &'a BTreeMap<String, Vec<PlayerRecord>>,
                    standings: &'a [analysis::CategoryTotals],
                }
                let view = ManagerView {
                    rosters: &rosters,
                    standings: &standings,
                };
                render(cli.json, &view, || {
                    let mut out = String::new();
                    for (manager, roster) in &rosters {
                        out.push_str(&format!("== {manager} ==\n"));
                        out.push_str(&report::players_table(roster));
                        out.push('\n');
                    }
                    out.push_str(&report::category_table(&standings));
                    out
                })
            } else {
                let shown = &scored[..scored.len().min(*limit)];
                render(cli.json, shown, || report::players_table(shown))
            }
        }

        Command::Pick {
            window,
            cap,
            free_agents_only,
        } => {
            let options = aggregation_options(config, window);
            let raw = load_raw(config, cli.from_db, &options)?;
            let scored = evaluate(&raw, config, &options)?;
            let pool = if *free_agents_only {
                analysis::free_agents(&scored)
            } else {
                scored
            };
            let mut rules = config.league.roster_rules();
            if let Some(cap) = cap {
                rules.salary_cap = *cap;
            }
            let solver = config.strategy.solver.backend();
            let selection = pick_roster(&pool, &rules, &solver).context("roster selection failed")?;
            render(cli.json, &selection, || report::roster_table(&selection, rules.salary_cap))
        }

        Command::FreeAgents {
            window,
            limit,
            by_salary,
        } => {
            let options = aggregation_options(config, window);
            let raw = load_raw(config, cli.from_db, &options)?;
            let scored = evaluate(&raw, config, &options)?;
            let agents = analysis::free_agents(&scored);
            let summary = analysis::value_summary(&agents);
            if *by_salary {
                let best = analysis::best_values(&agents, *limit);
                render(cli.json, &best, || {
                    report::value_table(&best) + &report::summary_line(summary.as_ref())
                })
            } else {
                let shown = &agents[..agents.len().min(*limit)];
                render(cli.json, shown, || {
                    report::players_table(shown) + &report::summary_line(summary.as_ref())
                })
            }
        }

        Command::Project { games, window } => {
            let options = config
                .strategy
                .evaluation
                .aggregation_options(config.league.num_teams);
            let raw = load_raw(config, cli.from_db, &options)?;
            let schedule = match sources::load_schedule(&config.data_paths)
                .context("failed to load schedule")?
            {
                Some(schedule) => schedule,
                None => uniform_schedule(&raw, *games),
            };
            let projector: Box<dyn Projector> = if *window == 0 {
                Box::new(MeanRate)
            } else {
                Box::new(RecentForm { window: *window })
            };
            let teams = projection::project_matchup(&raw, &schedule, projector.as_ref());
            render(cli.json, &teams, || report::matchup_table(&teams))
        }

        Command::Import => {
            let raw = sources::load_raw(&config.data_paths).context("failed to load CSV sources")?;
            let mut db = Database::open(&config.db_path).context("failed to open database")?;
            let imported = db.import_game_logs(&raw)?;
            let players = db.player_count()?;
            info!("Imported {} rows into {}", imported, config.db_path);
            Ok(format!(
                "Imported {imported} game log rows ({players} players) into {}\n",
                config.db_path
            ))
        }
    }
}

/// Same game count for every team that appears in the logs.
fn uniform_schedule(raw: &[RawGameLog], games: u32) -> BTreeMap<String, u32> {
    raw.iter().map(|r| (r.team.trim().to_string(), games)).collect()
}
