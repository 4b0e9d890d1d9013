pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fitsize_core::config::{AppConfig, LoadOptions, LogFormat};

use commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "fitsize",
    about = "Fitsize operator CLI",
    long_about = "Run size recommendations against a snapshot or the demo cohort, \
                  and inspect configuration.",
    after_help = "Examples:
  fitsize recommend --shopper demo-target --product demo-wrap-dress --explain
  fitsize config
  fitsize doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a fitsize.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend a size for one shopper and product; prints the result as JSON")]
    Recommend(RecommendArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, an optional snapshot, and the engine on the demo cohort")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Snapshot file to check for decode and status-mapping problems")]
        snapshot: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    // Commands report config failures themselves; logging just falls back to defaults.
    let logging_config = AppConfig::load(options.clone()).unwrap_or_default();
    init_logging(&logging_config);

    let result = match cli.command {
        Command::Recommend(args) => commands::recommend::run(&args, options),
        Command::Config => commands::config::run(options),
        Command::Doctor { json, snapshot } => {
            commands::doctor::run(json, snapshot.as_deref(), options)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command payload.
fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
