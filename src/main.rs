//! Binary entry point for factkeeper.
//!
//! Runs the factoid engine against a console chat loop and offers a few
//! maintenance commands over the store.

#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use factkeeper::Factoid;
use factkeeper::config::FactkeeperConfig;
use factkeeper::observability::{self, EventBus, ObservabilityConfig};
use factkeeper::services::{EngineConfig, FactoidEngine, KeyNormalizer, SeededRandom};
use factkeeper::storage;
use factkeeper::transport::{Addressing, ConsoleTransport};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

/// Factkeeper - a factoid knowledge engine for chat bots.
#[derive(Parser)]
#[command(name = "factkeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "FACTKEEPER_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Chat with the engine on stdin, one `<scope> <nick> <text>` per line.
    Chat {
        /// Minimum gap between replies to one scope, in milliseconds.
        #[arg(long, default_value = "250")]
        flood_interval_ms: u64,

        /// Seed selection randomness for reproducible sessions.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print every value stored under a key.
    Literal {
        /// The key, normalized before lookup.
        key: String,
    },

    /// Count the factoids stored under a key.
    Count {
        /// The key, normalized before lookup.
        key: String,
    },

    /// Export every factoid as JSON lines.
    Export {
        /// Output file (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import factoids from a JSON lines file.
    Import {
        /// File written by `export`.
        file: PathBuf,
    },

    /// Show status.
    Status,

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Chat { .. });
    let _observability = match observability::init(ObservabilityConfig::from_config(
        &config,
        cli.verbose,
        expose_metrics,
    )) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run_command(command: Commands, config: FactkeeperConfig) -> Result<()> {
    match command {
        Commands::Chat {
            flood_interval_ms,
            seed,
        } => cmd_chat(config, Duration::from_millis(flood_interval_ms), seed).await,
        Commands::Literal { key } => cmd_literal(&config, &key),
        Commands::Count { key } => cmd_count(&config, &key),
        Commands::Export { output } => cmd_export(&config, output.as_deref()),
        Commands::Import { file } => cmd_import(&config, &file),
        Commands::Status => cmd_status(&config),
        Commands::Config { show } => cmd_config(&config, show),
    }
}

/// Loads configuration: explicit path, else the default locations, then
/// environment overrides.
fn load_config(path: Option<&Path>) -> Result<FactkeeperConfig> {
    let config = match path {
        Some(path) => FactkeeperConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => FactkeeperConfig::load_default(),
    };
    Ok(config.apply_env_overrides()?)
}

async fn cmd_chat(
    config: FactkeeperConfig,
    flood_interval: Duration,
    seed: Option<u64>,
) -> Result<()> {
    let store = storage::open_store(&config)?;
    let console = Arc::new(ConsoleTransport::stdout(
        config.bot_nick.clone(),
        flood_interval,
    ));
    let events = EventBus::default();
    let mut engine = FactoidEngine::new(EngineConfig::from_config(&config), store)
        .with_flood_control(console.clone())
        .with_event_bus(events.clone());
    if let Some(seed) = seed {
        engine = engine.with_random(Arc::new(SeededRandom::new(seed)));
    }
    let engine = Arc::new(engine);
    let addressing = Addressing::new(config.bot_nick.clone(), config.engine.clone());

    let mut audit = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = audit.recv().await {
            tracing::debug!(
                event = event.event_type(),
                factoid_id = %event.factoid_id(),
                "factoid event"
            );
        }
    });

    tracing::info!(bot_nick = %config.bot_nick, "chat session started");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let Some(message) = addressing.parse_line(&line) else {
            continue;
        };

        let engine = Arc::clone(&engine);
        let sink = Arc::clone(&console);
        tokio::task::spawn_blocking(move || engine.handle(&message, sink.as_ref()))
            .await
            .context("engine task panicked")??;
    }
    tracing::info!("chat session ended");
    Ok(())
}

fn cmd_literal(config: &FactkeeperConfig, key: &str) -> Result<()> {
    let store = storage::open_store(config)?;
    let key = KeyNormalizer::new(&config.bot_nick).normalize(key, false);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut found = 0usize;
    store.for_each_by_key(&key, &mut |factoid| {
        found += 1;
        writeln!(out, "[{}] {}", factoid.kind, factoid.value)
            .map_err(|e| factkeeper::Error::ReplyFailed(e.to_string()))
    })?;
    if found == 0 {
        bail!("no factoids stored under '{key}'");
    }
    Ok(())
}

fn cmd_count(config: &FactkeeperConfig, key: &str) -> Result<()> {
    let store = storage::open_store(config)?;
    let key = KeyNormalizer::new(&config.bot_nick).normalize(key, false);
    println!("{}", store.count_by_key(&key)?);
    Ok(())
}

fn cmd_export(config: &FactkeeperConfig, output: Option<&Path>) -> Result<()> {
    let store = storage::open_store(config)?;
    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut out = BufWriter::new(out);
    let mut exported = 0usize;
    store.for_each(&mut |factoid| {
        let line = serde_json::to_string(&factoid)
            .map_err(|e| factkeeper::Error::InvalidInput(e.to_string()))?;
        writeln!(out, "{line}").map_err(|e| factkeeper::Error::OperationFailed {
            operation: "export".to_string(),
            cause: e.to_string(),
        })?;
        exported += 1;
        Ok(())
    })?;
    out.flush().context("flushing export")?;
    tracing::info!(exported, "export finished");
    Ok(())
}

fn cmd_import(config: &FactkeeperConfig, file: &Path) -> Result<()> {
    let store = storage::open_store(config)?;
    let reader = std::io::BufReader::new(
        std::fs::File::open(file).with_context(|| format!("opening {}", file.display()))?,
    );
    let mut imported = 0usize;
    for (number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let factoid: Factoid = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {}", number + 1))?;
        store
            .insert(&factoid)
            .with_context(|| format!("importing line {}", number + 1))?;
        imported += 1;
    }
    println!("Imported {imported} factoids from {}", file.display());
    Ok(())
}

fn cmd_status(config: &FactkeeperConfig) -> Result<()> {
    println!("Factkeeper Status");
    println!("=================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Bot nick: {}", config.bot_nick);
    println!("Backend: {}", config.storage.backend.as_str());
    if config.storage.backend == factkeeper::config::StorageBackend::Sqlite {
        let path = config.storage.resolved_path(&config.data_dir);
        let state = if path.exists() {
            "Available"
        } else {
            "Will be created on first use"
        };
        println!("Database: {state}");
        println!("  Path: {}", path.display());
    }
    let store = storage::open_store(config)?;
    println!("Factoids: {}", store.count()?);
    println!(
        "Metrics: {}",
        if config.metrics.enabled {
            format!("enabled (port {})", config.metrics.port)
        } else {
            "disabled".to_string()
        }
    );
    Ok(())
}

fn cmd_config(config: &FactkeeperConfig, show: bool) -> Result<()> {
    if !show {
        println!("Use --show to display configuration");
        return Ok(());
    }
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Bot Nick: {}", config.bot_nick);
    println!("Data Directory: {}", config.data_dir.display());
    println!();
    println!("Storage:");
    println!("  Backend: {}", config.storage.backend.as_str());
    println!(
        "  Path: {}",
        config.storage.resolved_path(&config.data_dir).display()
    );
    println!("  Busy Timeout: {}ms", config.storage.busy_timeout_ms);
    println!();
    println!("Engine:");
    println!(
        "  Literal Public Limit: {}",
        config.engine.literal_public_limit
    );
    println!(
        "  Public Scope Prefixes: {}",
        config.engine.public_scope_prefixes.join(" ")
    );
    println!();
    println!("Logging:");
    println!(
        "  Format: {}",
        config.logging.format.as_deref().unwrap_or("pretty")
    );
    println!(
        "  Level: {}",
        config.logging.level.as_deref().unwrap_or("factkeeper=info")
    );
    if let Some(file) = &config.logging.file {
        println!("  File: {}", file.display());
    }
    println!();
    println!("Metrics:");
    println!("  Enabled: {}", config.metrics.enabled);
    println!("  Port: {}", config.metrics.port);
    Ok(())
}
