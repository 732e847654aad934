//! # TimeWheel CLI
//!
//! Runs a timing wheel with the timers declared in the config file.
//!
//! Usage:
//!   timewheel run                      # Run until Ctrl+C
//!   timewheel run --duration 10        # Run for 10 seconds, then print stats
//!   timewheel config show              # Show effective configuration
//!   timewheel config init              # Write default config
//!   timewheel info                     # Show wheel geometry

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use timewheel_core::TimeWheelConfig;
use timewheel_scheduler::TimeWheel;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "timewheel",
    version,
    about = "⏱️ TimeWheel: hashed timing wheel for delayed and periodic callbacks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the wheel and schedule the configured timers
    Run {
        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version and wheel geometry
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print the default config path
    Path,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "timewheel=debug,timewheel_core=debug,timewheel_scheduler=debug"
    } else {
        "timewheel=info,timewheel_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(TimeWheelConfig::default_path);

    match cli.command {
        Commands::Run { duration } => {
            let config = load_config(cli.config.as_deref())?;
            run(config, duration.map(Duration::from_secs)).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", config.to_toml_string()?);
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        config_path.display()
                    );
                }
                TimeWheelConfig::default().save_to(&config_path)?;
                println!("✅ Wrote default config to {}", config_path.display());
            }
        },

        Commands::Info => {
            let config = load_config(cli.config.as_deref())?;
            println!("⏱️ TimeWheel v{}", env!("CARGO_PKG_VERSION"));
            println!("   Tick interval: {:?}", config.wheel.interval());
            println!("   Slots:         {}", config.wheel.slot_count);
            println!("   Rotation:      {:?}", config.wheel.rotation());
            println!("   Command queue: {}", config.wheel.command_buffer);
            println!("   Timers:        {}", config.timers.len());
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<TimeWheelConfig> {
    let config = match path {
        Some(path) => TimeWheelConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TimeWheelConfig::load()?,
    };
    Ok(config)
}

async fn run(config: TimeWheelConfig, duration: Option<Duration>) -> Result<()> {
    let wheel = TimeWheel::from_config(&config.wheel)?;
    wheel.start();

    for spec in &config.timers {
        let name = spec.name.clone();
        let message = spec.message.clone().unwrap_or_else(|| format!("timer '{name}' fired"));
        let count = Arc::new(AtomicU64::new(0));
        let callback = move || {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::info!(timer = %name, firing = n, "{message}");
        };

        match wheel.add_timer(spec.delay(), callback, spec.repeat).await {
            Some(handle) => tracing::info!(
                timer = %spec.name,
                id = %handle.id(),
                delay = ?handle.delay(),
                repeat = spec.repeat,
                "Scheduled"
            ),
            None => tracing::warn!(timer = %spec.name, "Timer not scheduled"),
        }
    }

    if config.timers.is_empty() {
        tracing::warn!("No timers configured; add [[timers]] entries to the config file");
    }

    match duration {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => {
            println!("Time wheel is running. Press Ctrl+C to stop.");
            tokio::signal::ctrl_c().await?;
        }
    }

    let stats = wheel.stats().await;
    wheel.stop().await;

    if let Some(stats) = stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    println!("👋 Time wheel stopped.");
    Ok(())
}
