// courtcap entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, keep stdout for results)
// 2. Parse the command line
// 3. Load config (seeding config/ from defaults/ on first run)
// 4. Run the command and print its output

use courtcap_app::cli::Cli;
use courtcap_app::commands;
use courtcap_app::config;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    info!("courtcap starting: {:?}", cli.command);

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, roster of {}, cap {}",
        config.league.name, config.league.roster_size, config.league.salary_cap
    );

    match commands::run(&cli, &config) {
        Ok(output) => {
            print!("{output}");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}

/// Initialize tracing to log to a file so command output stays clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtcap.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtcap=info,courtcap_core=info,courtcap_app=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
