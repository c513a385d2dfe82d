//! ignition-rs - first-boot provisioning agent
//!
//! Acquires the machine config once per boot and runs the requested stage
//! against it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ignition_rs::providers::Platform;
use ignition_rs::state::{IgnitionPaths, paths};
use ignition_rs::{Engine, Report, config};

#[derive(Parser)]
#[command(name = "ignition-rs")]
#[command(author, version, about = "First-boot provisioning agent", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire the config and run one stage
    Run {
        /// Stage to run (e.g., fetch)
        #[arg(long)]
        stage: String,

        /// Root the provisioned system is mounted at
        #[arg(long, env = "IGNITION_ROOT", default_value = paths::ROOT_DIR)]
        root: PathBuf,

        /// Where the rendered config is cached between stages
        #[arg(long, env = "IGNITION_CONFIG_CACHE", default_value = paths::CONFIG_CACHE)]
        config_cache: PathBuf,

        /// Directory holding base.ign, default.ign and user.ign
        #[arg(long, env = "IGNITION_SYSTEM_CONFIG_DIR", default_value = paths::SYSTEM_CONFIG_DIR)]
        system_config_dir: PathBuf,

        /// Platform to fetch the user config from (file, metal, aws)
        #[arg(long, env = "IGNITION_PLATFORM", default_value = "file")]
        platform: String,

        /// Total timeout in seconds for fetches until a config sets its own
        #[arg(long, default_value_t = 120)]
        fetch_timeout: u64,
    },
    /// Parse and validate a config file
    Validate {
        /// Config file to check
        path: PathBuf,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            stage,
            root,
            config_cache,
            system_config_dir,
            platform,
            fetch_timeout,
        } => {
            let platform: Platform = platform.parse()?;
            let paths = IgnitionPaths {
                root,
                config_cache,
                system_config_dir,
                ..IgnitionPaths::new()
            };

            info!("running stage {} on platform {}", stage, platform);
            let mut engine = Engine::new(paths, platform)?
                .with_fetch_timeout(Duration::from_secs(fetch_timeout))?;
            engine
                .run(&stage)
                .await
                .with_context(|| format!("stage {} failed", stage))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { path } => {
            let raw = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let mut report = Report::default();
            let result = config::parse(&raw, &mut report);
            // The operator's own file: highlights are shown as is
            print!("{}", report);

            match result {
                Ok(_) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    if report.is_empty() {
                        println!("{}", e);
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
