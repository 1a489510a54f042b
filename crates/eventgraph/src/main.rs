//! eventgraph: Event-bus usage graph for C# codebases
//!
//! Finds every publication and subscription made through an event bus and
//! writes a class-keyed JSON report linking event types to their call sites.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eventgraph_core::{CodeIndex, EventGraph, Snapshot, SnapshotIndex, build_graph, export};
use eventgraph_csharp::{LoadOptions, SourceIndex};
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::Config;

/// Build an event-bus usage graph from C# sources
#[derive(Parser)]
#[command(name = "eventgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to .eventgraph directory or config file (default: search for .eventgraph/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true, env = "EVENTGRAPH_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and write the event graph report
    Analyze {
        /// Project root (not needed with --snapshot)
        #[arg(required_unless_present = "snapshot")]
        path: Option<PathBuf>,

        /// Report destination (default: [output].path from config)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Only report calls made from this assembly
        #[arg(long)]
        project: Option<String>,

        /// Build from a saved snapshot instead of parsing sources
        #[arg(long, conflicts_with = "project")]
        snapshot: Option<PathBuf>,
    },

    /// Save the bus-related part of a project's index for offline analysis
    Snapshot {
        /// Project root
        path: PathBuf,

        /// Snapshot destination
        #[arg(short, long)]
        out: PathBuf,

        /// Only record calls made from this assembly
        #[arg(long)]
        project: Option<String>,
    },

    /// Initialize a new .eventgraph directory with config file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize logging to stderr, plus a rotating log file when `log_dir` is set.
fn init_logging(verbose: bool, log_dir: Option<&Path>) {
    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Failed to create log directory: {}", e);
            return None;
        }

        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "eventgraph.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Dropping the guard stops the background writer
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(env_filter(verbose))
        .init();
}

/// Load configuration from an explicit path or by searching parent directories.
///
/// Returns the config and the `.eventgraph` directory it came from, if any.
fn load_config(override_path: Option<&PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = override_path {
        // Either the .eventgraph directory or the config file itself
        let config_file = if path.is_dir() {
            path.join(config::CONFIG_FILE)
        } else {
            path.clone()
        };
        let settings_dir = config_file.parent().unwrap_or(path).to_path_buf();

        let config = Config::from_file(&config_file)?;
        info!("Loaded config from {}", config_file.display());
        return Ok((config, Some(settings_dir)));
    }

    match Config::find_and_load() {
        Ok(Some((config, settings_dir))) => {
            info!("Found config at {}", settings_dir.display());
            Ok((config, Some(settings_dir)))
        }
        Ok(None) => {
            tracing::debug!("No .eventgraph/config.toml found, using defaults");
            Ok((Config::default(), None))
        }
        Err(e) => {
            warn!("Error searching for config: {}, using defaults", e);
            Ok((Config::default(), None))
        }
    }
}

/// Parse and bind every source under `root` off the async runtime.
async fn load_sources(root: PathBuf, options: LoadOptions) -> Result<SourceIndex> {
    let display = root.display().to_string();
    let index = tokio::task::spawn_blocking(move || SourceIndex::load(&root, &options))
        .await
        .context("Source indexing task panicked")?
        .with_context(|| format!("Failed to index {}", display))?;
    Ok(index)
}

fn print_summary(graph: &EventGraph, classes: usize, destination: &Path) {
    let stats = graph.stats();
    println!(
        "{} event types, {} connections ({} publish, {} subscribe) across {} classes -> {}",
        stats.nodes,
        stats.connections,
        stats.outgoing,
        stats.incoming,
        classes,
        destination.display()
    );
    let unheard = graph.unheard().count();
    if unheard > 0 {
        println!("{} event types have no subscribers", unheard);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_dir.as_deref());

    let (config, config_dir) = load_config(cli.config.as_ref())?;
    for error in config.validate() {
        warn!("Config: {}", error);
    }

    match cli.command {
        Commands::Analyze {
            path,
            out,
            project,
            snapshot,
        } => {
            let destination =
                out.unwrap_or_else(|| config.resolve_output_path(config_dir.as_deref()));

            let index: Box<dyn CodeIndex> = match (snapshot, path) {
                (Some(snapshot_path), _) => {
                    info!("Analyzing snapshot {}", snapshot_path.display());
                    let index = SnapshotIndex::from_file(&snapshot_path).with_context(|| {
                        format!("Failed to load snapshot {}", snapshot_path.display())
                    })?;
                    Box::new(index)
                }
                (None, Some(root)) => {
                    // Canonicalize to resolve relative paths like "." or ".."
                    let root = root.canonicalize().unwrap_or(root);
                    info!("Analyzing {}", root.display());
                    Box::new(load_sources(root, config.index.load_options(project)).await?)
                }
                (None, None) => anyhow::bail!("A project path or --snapshot is required."),
            };

            let summary = index.summary();
            info!(
                backend = %summary.backend,
                documents = summary.documents,
                types = summary.types,
                "Index ready"
            );

            let graph = build_graph(index.as_ref(), &config.bus).await;
            let written = export(
                &graph.nodes,
                &destination,
                config.output.export_options(),
            )
            .with_context(|| format!("Failed to write report to {}", destination.display()))?;

            for node in graph.unheard() {
                warn!(
                    event_type = %node.event_type,
                    publishers = node.connections.len(),
                    "Published but never subscribed"
                );
            }
            print_summary(&graph, written.classes, &written.path);
        }

        Commands::Snapshot { path, out, project } => {
            let root = path.canonicalize().unwrap_or(path);
            info!("Capturing snapshot of {}", root.display());

            let index = load_sources(root, config.index.load_options(project)).await?;
            let snapshot = Snapshot::capture(&index, &config.bus).await;
            let json = snapshot
                .to_json(config.output.pretty)
                .context("Failed to serialize snapshot")?;

            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&out, json)
                .with_context(|| format!("Failed to write snapshot to {}", out.display()))?;

            println!(
                "Snapshot with {} resolved invocations -> {}",
                snapshot.invocations.len(),
                out.display()
            );
        }

        Commands::Init { force } => {
            use config::{CONFIG_FILE, DEFAULT_CONFIG, EVENTGRAPH_DIR};

            let settings_dir = PathBuf::from(EVENTGRAPH_DIR);
            let config_path = settings_dir.join(CONFIG_FILE);

            if config_path.exists() && !force {
                anyhow::bail!(".eventgraph/config.toml already exists. Use --force to overwrite.");
            }

            if !settings_dir.exists() {
                std::fs::create_dir_all(&settings_dir)?;
                info!("Created {}/", settings_dir.display());
            }

            std::fs::write(&config_path, DEFAULT_CONFIG)?;
            info!("Created {}", config_path.display());
            info!("Next steps:");
            info!("  1. Edit .eventgraph/config.toml to name your event-bus type");
            info!("  2. Run 'eventgraph analyze .' to write the report");
        }
    }

    Ok(())
}
