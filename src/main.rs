//! dirmirror - Mirror folders and keep them in sync
//!
//! Main entry point for the dirmirror CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dirmirror::config::{validate_config, MirrorConfig, DEFAULT_CONFIG_FILE};
use dirmirror::logging::{self, TracingLog};
use dirmirror::{Mirror, SyncReport};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// dirmirror - Mirror source folders into destination folders
#[derive(Parser, Debug)]
#[command(name = "dirmirror")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ./dirmirror.yaml)
    #[arg(short, long, env = "DIRMIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Log every copied and removed entry
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration and list the mappings
    Check,

    /// Copy every source into its destination
    Copy {
        /// Print the per-mapping report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Empty every destination directory
    Clean {
        /// Print the per-mapping report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch sources and mirror changes until interrupted (Ctrl-C)
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "dirmirror=debug,info" } else { "info" };
    if let Err(e) = logging::init(level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match cli.command {
        Commands::Init { force } => handle_init(&config_path, force),

        Commands::Check => handle_check(&load_config(&config_path)?),

        Commands::Copy { json } => {
            let mirror = build_mirror(load_config(&config_path)?)?;
            let report = mirror.copy().await;
            print_report(&report, json)
        }

        Commands::Clean { json } => {
            let mirror = build_mirror(load_config(&config_path)?)?;
            let report = mirror.clean().await;
            print_report(&report, json)
        }

        Commands::Watch => {
            let mut mirror = build_mirror(load_config(&config_path)?)?;
            let started = mirror.watch()?;
            if started == 0 {
                anyhow::bail!("No watcher could be started");
            }
            println!("Watching {} director{} (Ctrl-C to stop)", started, if started == 1 { "y" } else { "ies" });

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            mirror.stop();
            Ok(0)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<MirrorConfig> {
    MirrorConfig::load(path)
        .with_context(|| format!("Run 'dirmirror init' to create {}", path.display()))
}

fn build_mirror(config: MirrorConfig) -> anyhow::Result<Mirror> {
    config
        .into_mirror(Arc::new(TracingLog))
        .context("Failed to register mappings")
}

fn handle_init(path: &Path, force: bool) -> anyhow::Result<i32> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    MirrorConfig::sample()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(0)
}

fn handle_check(config: &MirrorConfig) -> anyhow::Result<i32> {
    if let Err(errors) = validate_config(config) {
        println!("Configuration has {} problem(s):", errors.len());
        for error in errors {
            println!("  - {}", error);
        }
        return Ok(1);
    }

    println!("Configuration OK: {} mapping(s)", config.mappings.len());
    for mapping in &config.mappings {
        println!(
            "  {} -> {}",
            mapping.source.display(),
            mapping.destination.display()
        );
    }
    Ok(0)
}

fn print_report(report: &SyncReport, json: bool) -> anyhow::Result<i32> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report.message());
        for failure in report.failures() {
            println!(
                "  failed: {} -> {}: {}",
                failure.source.display(),
                failure.destination.display(),
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(if report.is_success() { 0 } else { 1 })
}
