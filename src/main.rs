//! swiss-tariffs CLI: Swiss electricity tariffs from ElCom/LINDAS.

use std::path::{Path, PathBuf};

use chrono::Datelike;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use swiss_tariffs::client::TariffClient;
use swiss_tariffs::config::TariffConfig;
use swiss_tariffs::paths::TariffPaths;
use swiss_tariffs::refresh::TariffCoordinator;
use swiss_tariffs::sensor;
use swiss_tariffs::sparql::{HttpTransport, LocalStore, SparqlTransport};

#[derive(Parser)]
#[command(
    name = "swiss-tariffs",
    version,
    about = "Swiss electricity tariffs from the ElCom/LINDAS SPARQL endpoint"
)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/swiss-tariffs/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SPARQL endpoint URL, overriding the config file.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Answer queries from a local Turtle file instead of the endpoint.
    #[arg(long, global = true)]
    graph_file: Option<PathBuf>,

    /// Municipality IRI, overriding the config file.
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Municipality display label, overriding the config file.
    #[arg(long, global = true)]
    label: Option<String>,

    /// Tariff year, overriding the config file.
    #[arg(long, global = true)]
    year: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search municipalities by label.
    Search {
        /// Case-insensitive substring of the municipality name.
        text: String,

        /// Maximum number of matches (default: from config).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write a config file for one municipality (requires --uri).
    Init {
        /// Refresh period in hours.
        #[arg(long, default_value = "24")]
        interval_hours: u64,
    },

    /// Show the discovered municipality and year predicates.
    Discover,

    /// Run one refresh and print the readings.
    Fetch {
        /// Print the snapshot as JSON instead.
        #[arg(long)]
        json: bool,
    },

    /// Refresh periodically, printing the readings after each cycle.
    #[cfg(feature = "daemon")]
    Watch {
        /// Stop after this many cycles (0 = run until Ctrl+C).
        #[arg(long, default_value = "0")]
        max_cycles: usize,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => TariffPaths::resolve()?.config_file(),
    };

    match cli.command {
        Commands::Search { ref text, limit } => {
            let config = load_config(&cli, &config_path)?;
            config.validate_source()?;
            let client = TariffClient::from_config(transport(&cli, &config)?, &config);
            let matches = client.search_municipalities(text, limit.unwrap_or(config.search_limit))?;
            if matches.is_empty() {
                println!("No municipality matches \"{}\".", text.trim());
            }
            for m in &matches {
                println!("{}\t{}", m.label, m.uri);
            }
        }

        Commands::Init { interval_hours } => {
            let mut config = load_config(&cli, &config_path)?;
            config.update_interval_hours = interval_hours;
            config.validate()?;
            config.save(&config_path)?;
            println!("Wrote {}", config_path.display());
            println!(
                "  municipality: {} {}",
                config.municipality_uri, config.municipality_label
            );
            println!("  year:         {}", config.year);
        }

        Commands::Discover => {
            let config = load_config(&cli, &config_path)?;
            config.validate_source()?;
            let client = TariffClient::from_config(transport(&cli, &config)?, &config);
            let predicates = client.discover_model()?;
            println!("municipality predicate: {}", predicates.municipality_predicate);
            println!("year predicate:         {}", predicates.year_predicate);
        }

        Commands::Fetch { json } => {
            let config = load_config(&cli, &config_path)?;
            config.validate()?;
            let coordinator = TariffCoordinator::new(config.clone(), transport(&cli, &config)?);
            let snapshot = coordinator.refresh()?;
            if json {
                let body = serde_json::to_string_pretty(snapshot.as_ref()).into_diagnostic()?;
                println!("{body}");
            } else {
                for reading in sensor::readings(&config, &coordinator.state()) {
                    println!("{reading}");
                }
                println!("last update: {}", snapshot.meta().last_update());
            }
        }

        #[cfg(feature = "daemon")]
        Commands::Watch { max_cycles } => {
            use std::sync::Arc;

            use swiss_tariffs::daemon::{DaemonConfig, RefreshDaemon};

            let config = load_config(&cli, &config_path)?;
            config.validate()?;
            let coordinator = Arc::new(TariffCoordinator::new(
                config.clone(),
                transport(&cli, &config)?,
            ));
            let mut daemon = RefreshDaemon::new(
                Arc::clone(&coordinator),
                DaemonConfig {
                    interval: config.update_interval(),
                    max_cycles,
                },
            );

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .into_diagnostic()?;
            let cycles = runtime.block_on(daemon.run(|cycle, outcome| {
                match outcome {
                    Ok(_) => {
                        println!("-- cycle {cycle}");
                        for reading in sensor::readings(&config, &coordinator.state()) {
                            println!("{reading}");
                        }
                    }
                    Err(e) => println!("-- cycle {cycle} failed: {}", e.message),
                }
            }));
            // A refresh interrupted by Ctrl+C may still be blocking on the endpoint.
            runtime.shutdown_background();
            println!("Stopped after {cycles} cycle(s).");
        }
    }

    Ok(())
}

/// Load the config file if present, then apply command-line overrides.
fn load_config(cli: &Cli, path: &Path) -> Result<TariffConfig> {
    let mut config = if path.exists() {
        TariffConfig::load(path)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        TariffConfig::new("", "", chrono::Utc::now().year())
    };

    if let Some(uri) = &cli.uri {
        config.municipality_uri = uri.clone();
    }
    if let Some(label) = &cli.label {
        config.municipality_label = label.clone();
    }
    if let Some(year) = cli.year {
        config.year = year;
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    Ok(config)
}

/// The endpoint transport, or an in-memory store when `--graph-file` is given.
fn transport(cli: &Cli, config: &TariffConfig) -> Result<Box<dyn SparqlTransport>> {
    match &cli.graph_file {
        Some(path) => {
            let store = LocalStore::from_turtle_file(path, &config.named_graph)?;
            tracing::info!(path = %path.display(), triples = store.len(), "loaded local graph");
            Ok(Box::new(store))
        }
        None => Ok(Box::new(HttpTransport::new(
            config.endpoint.clone(),
            config.timeout(),
        ))),
    }
}
