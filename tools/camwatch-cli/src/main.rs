//! camwatch CLI — motion-triggered camera surveillance.
//!
//! Usage:
//!   camwatch watch [OPTIONS]     Watch the camera and record on motion
//!   camwatch capture [OPTIONS]   Record a single clip immediately
//!   camwatch check               Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "camwatch",
    about = "Motion-triggered camera surveillance with an external recorder",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the camera and hand off to the recorder on motion
    Watch {
        /// Camera device node (defaults to the configured device)
        #[arg(long)]
        device: Option<PathBuf>,

        /// Disable recording; the camera session stays open continuously
        #[arg(short = 'n', long)]
        no_rec: bool,

        /// Minimum changed-region area (px^2) that counts as motion
        #[arg(short = 'a', long, default_value = "500")]
        min_area: u32,

        /// Clip duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Directory for capture artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read operator commands from stdin (f = force capture, q = quit)
        #[arg(long)]
        interactive: bool,
    },

    /// Record a single clip immediately
    Capture {
        /// Camera device node (defaults to the configured device)
        #[arg(long)]
        device: Option<PathBuf>,

        /// Clip duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Directory for capture artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = camwatch_common::config::AppConfig::load();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    camwatch_common::logging::init_logging(&camwatch_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: config.logging.json,
        file: config.logging.file.clone(),
    });

    match cli.command {
        Commands::Watch {
            device,
            no_rec,
            min_area,
            duration,
            output,
            interactive,
        } => {
            commands::watch::run(config, device, no_rec, min_area, duration, output, interactive)
                .await
        }
        Commands::Capture {
            device,
            duration,
            output,
        } => commands::capture::run(config, device, duration, output).await,
        Commands::Check => commands::check::run(config),
    }
}
