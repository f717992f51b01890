use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use spark_history_mcp::config::Settings;
use spark_history_mcp::{EntityKind, Normalized, SchemaRegistry};

#[derive(Parser, Debug)]
#[command(name = "spark-history-mcp")]
#[command(about = "Normalize Spark history server REST payloads into typed entities")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/settings.toml", global = true)]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize captured payload files and print them as wire JSON
    Normalize {
        /// Entity name or label, e.g. `StageData` or `stage`
        #[arg(short, long)]
        entity: String,

        /// Payloads are arrays, as returned by list endpoints
        #[arg(long)]
        list: bool,

        /// Endpoint the payloads were captured from, for error reports
        #[arg(long)]
        endpoint: Option<String>,

        /// Server the payloads came from
        #[arg(short, long)]
        server: Option<String>,

        /// Pretty-print output
        #[arg(long)]
        pretty: bool,

        /// Payload files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the entity schemas
    Entities,
}

/// Where a batch of payloads came from, for error reports.
#[derive(Debug, Clone)]
struct Source {
    server: String,
    endpoint: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Entities => {
            list_entities();
            Ok(())
        }
        Command::Normalize {
            entity,
            list,
            endpoint,
            server,
            pretty,
            files,
        } => {
            // Load configuration
            let mut settings = Settings::load(&args.config)?;

            // Override with command line arguments
            if pretty {
                settings.output.pretty = true;
            }

            let kind: EntityKind = entity.parse()?;
            let server = match settings.resolve_server(server.as_deref()) {
                Ok((name, config)) => {
                    info!("Payloads from server '{}' ({})", name, config.url);
                    name.to_string()
                }
                Err(e) if server.is_none() => {
                    warn!("{}; reporting payloads as unattributed", e);
                    "unattributed".to_string()
                }
                Err(e) => return Err(e),
            };
            let source = Source {
                server,
                endpoint: endpoint
                    .unwrap_or_else(|| SchemaRegistry::global().get(kind).label.to_string()),
            };

            normalize_files(kind, list, &source, &settings, files).await
        }
    }
}

fn list_entities() {
    let registry = SchemaRegistry::global();
    println!("{:<36} {:<40} {:<7} FIELDS", "ENTITY", "LABEL", "STRICT");
    for schema in registry.iter() {
        println!(
            "{:<36} {:<40} {:<7} {}",
            schema.name,
            schema.label,
            schema.strict,
            schema.fields.len()
        );
    }
}

async fn normalize_files(
    kind: EntityKind,
    list: bool,
    source: &Source,
    settings: &Settings,
    files: Vec<PathBuf>,
) -> Result<()> {
    info!(
        "Normalizing {} file(s) as {}{}",
        files.len(),
        kind,
        if list { " list" } else { "" }
    );

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let source = source.clone();
            tokio::task::spawn_blocking(move || {
                let result = normalize_file(kind, list, &source, &path);
                (path, result)
            })
        })
        .collect();

    let total = handles.len();
    let mut failed = 0;
    for handle in handles {
        let (path, result) = handle.await.context("Normalization task panicked")?;
        match result.and_then(|normalized| check_warnings(normalized, settings, &path)) {
            Ok(value) => {
                let rendered = if settings.output.pretty {
                    serde_json::to_string_pretty(&value)?
                } else {
                    serde_json::to_string(&value)?
                };
                println!("{}", rendered);
            }
            Err(e) => {
                failed += 1;
                error!("{:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed to normalize", failed, total);
    }
    info!("Normalized {} file(s)", total);
    Ok(())
}

fn normalize_file(
    kind: EntityKind,
    list: bool,
    source: &Source,
    path: &Path,
) -> Result<Normalized<Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let payload: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let registry = SchemaRegistry::global();
    let normalized = if list {
        registry.normalize_list(kind, &payload)
    } else {
        registry.normalize(kind, &payload)
    };
    normalized.with_context(|| {
        format!(
            "Server '{}' endpoint '{}' returned a payload that does not normalize ({})",
            source.server,
            source.endpoint,
            path.display()
        )
    })
}

fn check_warnings(
    normalized: Normalized<Value>,
    settings: &Settings,
    path: &Path,
) -> Result<Value> {
    if settings.output.fail_on_warnings && !normalized.warnings.is_empty() {
        bail!(
            "{} normalized with {} warning(s), first: {}",
            path.display(),
            normalized.warnings.len(),
            normalized.warnings[0]
        );
    }
    Ok(normalized.value)
}
