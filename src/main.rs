//! hotlog: inspect and run the self-reconfiguring logging adapter.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use hotlog::backend::LoggerGraph;
use hotlog::config::{load_config, AdapterConfig};
use hotlog::lifecycle::signals::Signals;
use hotlog::lifecycle::{Shutdown, Signal};
use hotlog::observability::{StatusLevel, StatusManager};
use hotlog::source::{ConfigSource, ResourceBundle};
use hotlog::{ConfigDocument, LogAdapter};

#[derive(Parser)]
#[command(name = "hotlog")]
#[command(about = "Self-reconfiguring logging adapter", long_about = None)]
struct Cli {
    /// Adapter settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Logging configuration file, overriding the settings.
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SHA-256 content hash of a file
    Hash { file: PathBuf },
    /// Check that a logging configuration builds
    Check { file: PathBuf },
    /// Resolve the active configuration and print where it came from
    Resolve,
    /// Run with live reloading until interrupted
    Run {
        /// Seconds between heartbeat log lines
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_config(path)?,
        None => AdapterConfig::default(),
    };
    if let Some(file) = cli.config_file {
        settings.config_file = file;
    }

    match cli.command {
        Commands::Hash { file } => {
            let document = ConfigDocument::new(std::fs::read(&file)?);
            println!("{}  {}", document.hash(), file.display());
        }
        Commands::Check { file } => {
            let document = ConfigDocument::new(std::fs::read(&file)?);
            let graph = LoggerGraph::build(&document)?;
            let destinations: Vec<_> = graph
                .destinations()
                .into_iter()
                .map(|d| json!({ "name": d.name, "file": d.file }))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "hash": document.hash().to_string(),
                    "max_level": graph.max_level().to_string(),
                    "destinations": destinations,
                }))?
            );
        }
        Commands::Resolve => resolve(&settings)?,
        Commands::Run { interval } => run(&settings, Duration::from_secs(interval.max(1))).await?,
    }

    Ok(())
}

fn resolve(settings: &AdapterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut resources = ResourceBundle::bundled();
    if let Some(dir) = &settings.resource_dir {
        resources = resources.with_dir(dir);
    }
    let source = ConfigSource::new(resources, settings.resources.clone(), settings.absolute_config_file()?);
    let status = StatusManager::new();

    let output = match source.resolve(&status) {
        Ok(resolved) => json!({
            "location": resolved.location.to_string(),
            "watchable": resolved.location.watchable_path().is_some(),
            "hash": resolved.document.hash().to_string(),
            "statuses": status.statuses(),
        }),
        Err(e) => {
            status.error(module_path!(), "Could not resolve logging configuration.", &e);
            json!({ "error": e.to_string(), "statuses": status.statuses() })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(settings: &AdapterConfig, interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = hotlog::init(settings)?;
    if let Some(location) = adapter.try_get_log_configuration()? {
        tracing::info!(%location, "hotlog running, edit the configuration to reconfigure");
    }
    if let Some(dir) = adapter.try_get_log_file_directory()? {
        tracing::info!(directory = %dir.display(), "Writing log files");
    }

    let shutdown = Shutdown::new(Arc::new(adapter.clone()) as Arc<dyn LogAdapter>);
    let mut stop = shutdown.subscribe();
    let heartbeat = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut beat: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    beat += 1;
                    tracing::debug!(beat, "heartbeat");
                    tracing::info!(beat, "heartbeat");
                }
                _ = stop.recv() => break,
            }
        }
    });

    let mut signals = Signals::new()?;
    loop {
        match signals.recv().await? {
            Signal::Reload => {
                let outcome = adapter.reload()?;
                tracing::info!(?outcome, "Reload requested");
            }
            Signal::Shutdown => break,
        }
    }

    shutdown.trigger();
    heartbeat.await?;

    let errors = adapter.status().count(StatusLevel::Error);
    if errors > 0 {
        eprintln!("hotlog: {errors} logging error(s) reported during this run");
    }
    Ok(())
}
