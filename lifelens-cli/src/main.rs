use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use lifelens_core::MemorySource;

mod config;
mod generate;
mod journal_cmd;
mod plan_cmd;
mod state;
mod survey_cmd;

#[derive(Parser, Debug)]
#[command(name = "lifelens", version, about = "Behavioral insights and planning over exported life data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Whether a command may call the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Deterministic output only; no network calls.
    RuleOnly,
    /// Ask the generation service, then validate everything it returns.
    WithGeneration,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a period: overviews, sufficiency, effects, findings
    Survey {
        /// Exported data directory (tasks.csv, habits.csv, ...)
        #[arg(long)]
        data: PathBuf,

        /// last_7_days | last_30_days | last_90_days
        #[arg(long, default_value = "last_30_days")]
        period: String,

        #[arg(long, value_enum, default_value_t = Mode::RuleOnly)]
        mode: Mode,

        /// Emit the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Plan the upcoming window against goals and existing workload
    Plan {
        #[arg(long)]
        data: PathBuf,

        /// week | month
        #[arg(long, default_value = "week")]
        horizon: String,

        #[arg(long, value_enum, default_value_t = Mode::RuleOnly)]
        mode: Mode,

        #[arg(long)]
        json: bool,
    },

    /// Structure scanned journal text into tasks
    Journal {
        /// Plain-text file with the journal content
        #[arg(long)]
        file: PathBuf,
    },

    /// Manage ~/.lifelens configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config.toml if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Survey { data, period, mode, json } => {
            survey_cmd::run(&data, &period, mode, json).await?;
        }
        Command::Plan { data, horizon, mode, json } => {
            plan_cmd::run(&data, &horizon, mode, json).await?;
        }
        Command::Journal { file } => {
            journal_cmd::run(&file).await?;
        }
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}

/// Load the data directory; a missing profile.json falls back to the
/// user-level profile under ~/.lifelens.
pub fn load_source(data: &Path) -> Result<MemorySource> {
    let mut src = lifelens_ingest::load_dir(data)
        .with_context(|| format!("loading data from {}", data.display()))?;
    if !data.join("profile.json").exists() {
        src.profile = state::read_profile()?;
    }
    Ok(src)
}
