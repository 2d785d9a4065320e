// Command-line interface definition.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use courtcap_core::aggregate::AggregationMode;

#[derive(Debug, Parser)]
#[command(
    name = "courtcap",
    version,
    about = "Evaluate basketball players and pick a salary-capped fantasy roster"
)]
pub struct Cli {
    /// Print JSON instead of text tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Read game logs from the SQLite store instead of the CSV files.
    #[arg(long, global = true)]
    pub from_db: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank every player by relative value.
    Evaluate {
        #[command(flatten)]
        window: WindowArgs,
        /// Number of players to show.
        #[arg(long, default_value_t = 25)]
        limit: usize,
        /// Show per-manager rosters and category standings instead.
        #[arg(long)]
        by_manager: bool,
    },
    /// Choose the best roster under the salary cap.
    Pick {
        #[command(flatten)]
        window: WindowArgs,
        /// Override the configured salary cap.
        #[arg(long)]
        cap: Option<u64>,
        /// Only consider players on no fantasy roster.
        #[arg(long)]
        free_agents_only: bool,
    },
    /// List free agents by value, or by value per salary dollar.
    FreeAgents {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        /// Rank by value per million of salary.
        #[arg(long)]
        by_salary: bool,
    },
    /// Project fantasy team totals for upcoming games.
    Project {
        /// Games per NBA team when no schedule file is configured.
        #[arg(long, default_value_t = 3)]
        games: u32,
        /// Average only the last N games (0 = whole history).
        #[arg(long, default_value_t = 0)]
        window: usize,
    },
    /// Load the CSV sources into the SQLite store.
    Import,
}

/// Aggregation overrides shared by the evaluation commands.
#[derive(Debug, Clone, Default, Args)]
pub struct WindowArgs {
    /// Combine games as season totals or per-game averages.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// First game date to include (YYYY-MM-DD).
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,
    /// Last game date to include (YYYY-MM-DD).
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Sum,
    Average,
}

impl From<ModeArg> for AggregationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sum => AggregationMode::Sum,
            ModeArg::Average => AggregationMode::Average,
        }
    }
}
