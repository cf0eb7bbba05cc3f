use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use clickclickclick::agent_engine::state::TaskOutcome;
use clickclickclick::commands::{self, RunOptions};
use clickclickclick::config::load_config;

#[derive(Parser, Debug)]
#[command(
    name = "clickclickclick",
    version,
    about = "Drive a device toward a natural-language goal with an LLM planner"
)]
struct Cli {
    /// Path to config.toml (default: next to the executable, then ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a task until it finishes, fails or times out
    Run {
        /// Task description; the configured sample prompt is used when empty
        task: Vec<String>,
        /// Target platform
        #[arg(long)]
        platform: Option<String>,
        /// Planner backend: provider or provider/model
        #[arg(long)]
        planner_model: Option<String>,
        /// Finder backend: provider or provider/model
        #[arg(long)]
        finder_model: Option<String>,
        /// Print a progress line for every step
        #[arg(long)]
        stream: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    clickclickclick::init_tracing();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Config => commands::show_config(&config).map(|_| ExitCode::SUCCESS),
        Commands::Run {
            task,
            platform,
            planner_model,
            finder_model,
            stream,
        } => {
            let opts = RunOptions {
                task: Some(task.join(" ")),
                platform,
                planner_model,
                finder_model,
                stream,
            };
            commands::run_task(config, opts).await.map(|outcome| match outcome {
                TaskOutcome::Finished => ExitCode::SUCCESS,
                TaskOutcome::Failed | TaskOutcome::TimedOut => ExitCode::FAILURE,
            })
        }
    };

    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "command failed");
        ExitCode::FAILURE
    })
}
