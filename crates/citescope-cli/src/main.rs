use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use citescope_core::{AppConfig, CitescopeError, ExitCode, FetchOutcome, JsonRecordStore, save_network};
use citescope_science::crawl::fetch_all;
use citescope_science::{Crawler, KeyTermExtractor, NetworkBuilder, OpenAlexSource, ScienceError};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "citescope",
    about = "Citation crawler and text-similarity networks over OpenAlex",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting CITESCOPE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Use this config file instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch metadata for one or more works (DOIs or OpenAlex ids).
    Fetch {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Crawl the reference graph from a seed work and store every record.
    Crawl {
        seed: String,
        #[arg(long)]
        depth: Option<u32>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Build the similarity network over stored records.
    Network {
        #[arg(long)]
        depth: Option<u32>,
        /// Include every depth from 1 up to --depth, not just --depth itself.
        #[arg(long)]
        include_deeper: bool,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        key_terms: Option<usize>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the config file path.
    Path,
    /// Write a default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("CITESCOPE_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli, json_output).await {
        let code = exit_code_for(&err);
        if json_output {
            let _ = print_json(&serde_json::json!({
                "status": "error",
                "error": format!("{code:?}"),
                "message": format!("{err:#}"),
            }));
        } else {
            eprintln!("error: {err:#}");
        }
        std::process::exit(code as i32);
    }
}

async fn run(cli: Cli, json_output: bool) -> Result<()> {
    let start = Instant::now();

    // ── Config + env var overrides ─────────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    init_logging(&config.core.log_level);
    tracing::debug!(config = %config_path.display(), "config loaded");

    match cli.command {
        // ── Fetch ──────────────────────────────────────────────────────────

        Commands::Fetch { ids, email, batch_size } => {
            if email.is_some() {
                config.openalex.polite_email = email;
            }
            let source = OpenAlexSource::from_config(&config.openalex)?;
            let batch = batch_size.unwrap_or(config.crawl.batch_size);
            let outcomes = fetch_all(&source, &ids, batch).await;
            let dur = start.elapsed().as_millis();

            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            if json_output {
                let status = if failed == 0 { "ok" } else { "partial" };
                print_json(&serde_json::json!({
                    "status": status,
                    "data": { "items": outcomes, "total": outcomes.len(), "failed": failed },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for outcome in &outcomes {
                    match outcome {
                        FetchOutcome::Work(w) => {
                            let year = w.publication_year.map(|y| y.to_string()).unwrap_or_default();
                            println!("{}  {year:<4}  {}", w.id, w.title);
                            println!(
                                "    {} | cited by {} | {} references",
                                w.topics.primary_topic,
                                w.cited_by_count,
                                w.referenced_work_ids.len()
                            );
                        }
                        FetchOutcome::Error(e) => eprintln!("✗ {}: {}", e.identifier, e.error_message),
                    }
                }
            }
            if failed > 0 && failed == outcomes.len() {
                std::process::exit(ExitCode::NetworkError as i32);
            }
        }

        // ── Crawl ──────────────────────────────────────────────────────────

        Commands::Crawl { seed, depth, email, data_dir, batch_size } => {
            if email.is_some() {
                config.openalex.polite_email = email;
            }
            if let Some(dir) = data_dir {
                config.set_data_dir(dir);
            }
            let depth = depth.unwrap_or(config.crawl.max_depth);
            let source = OpenAlexSource::from_config(&config.openalex)?;
            let store = JsonRecordStore::new(config.records_dir());

            let report = Crawler::new(&source, &store)
                .with_batch_size(batch_size.unwrap_or(config.crawl.batch_size))
                .crawl(&seed, depth)
                .await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": report,
                    "meta": { "duration_ms": dur, "records_dir": config.records_dir() }
                }))?;
            } else {
                if let Some(seed_record) = report.seed_record() {
                    println!("Seed: {} — {}", seed_record.id, seed_record.title);
                }
                for level in &report.levels {
                    println!(
                        "  depth {}: {} fetched, {} failed",
                        level.depth,
                        level.records().count(),
                        level.errors().count()
                    );
                }
                for failure in &report.storage_failures {
                    eprintln!("✗ not stored {}: {}", failure.identifier, failure.error_message);
                }
                println!(
                    "{} works visited, records in {}",
                    report.visited.len(),
                    config.records_dir().display()
                );
            }
        }

        // ── Network ────────────────────────────────────────────────────────

        Commands::Network { depth, include_deeper, data_dir, output, key_terms } => {
            if let Some(dir) = data_dir {
                config.set_data_dir(dir);
            }
            let depth = depth.unwrap_or(config.crawl.max_depth);
            let include_deeper = include_deeper || config.network.include_deeper_levels;
            let store = JsonRecordStore::new(config.records_dir());

            let mut builder = NetworkBuilder::new(KeyTermExtractor::default())
                .with_key_terms(key_terms.unwrap_or(config.network.key_terms));
            let network = builder.build_from_store(&store, depth, include_deeper)?;

            let output = output.unwrap_or_else(|| {
                config
                    .results_dir()
                    .join(format!("network_results_depth_{depth}.json"))
            });
            save_network(&output, &network)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "output": output,
                        "nodes": network.nodes.len(),
                        "edges": network.edges.len(),
                        "depth": depth,
                        "include_deeper": include_deeper,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!(
                    "Network: {} nodes, {} edges → {}",
                    network.nodes.len(),
                    network.edges.len(),
                    output.display()
                );
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":config,"meta":{"path":config_path}}))?;
                } else {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":config_path,"exists":config_path.exists()}}))?;
                } else {
                    println!("{}", config_path.display());
                }
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    eprintln!("Config already exists: {} (use --force to overwrite)", config_path.display());
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
                AppConfig::default().save_to(&config_path)?;
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":config_path}}))?;
                } else {
                    println!("Wrote {}", config_path.display());
                }
            }
        },
    }

    tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "done");
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Log to stderr so stdout stays clean for `--json`. `RUST_LOG` wins over the config.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if let Some(e) = err.downcast_ref::<ScienceError>() {
        return match e {
            ScienceError::SeedFailed { .. } => ExitCode::SeedFailed,
            ScienceError::InvalidIdentifier(_) => ExitCode::InvalidArgs,
            ScienceError::Storage(inner) => storage_exit_code(inner),
            ScienceError::Parse(_) => ExitCode::GeneralError,
            ScienceError::Http(_)
            | ScienceError::Timeout
            | ScienceError::ApiError(..)
            | ScienceError::RateLimit(..)
            | ScienceError::NotFound => ExitCode::NetworkError,
        };
    }
    if let Some(e) = err.downcast_ref::<CitescopeError>() {
        return storage_exit_code(e);
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return ExitCode::FileSystemError;
    }
    ExitCode::GeneralError
}

fn storage_exit_code(err: &CitescopeError) -> ExitCode {
    match err {
        CitescopeError::ConfigError(_)
        | CitescopeError::TomlParse(_)
        | CitescopeError::TomlSerialize(_) => ExitCode::GeneralError,
        _ => ExitCode::FileSystemError,
    }
}

/// `CITESCOPE_DATA_DIR` and `CITESCOPE_MAILTO` take precedence over the file.
fn apply_env_overrides(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = var("CITESCOPE_DATA_DIR") {
        config.set_data_dir(dir.into());
    }
    if let Some(email) = var("CITESCOPE_MAILTO") {
        config.openalex.polite_email = Some(email);
    }
}
