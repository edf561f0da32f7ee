//! schema-migrate CLI - declarative database schema migration.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dialoguer::Select;
use schema_migrate::{
    diff, migrate, render, schema, Db, DiffFormat, IntrospectOptions, MigrateArgs, MigrateError,
    Registry, Schema, TableChange,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-migrate")]
#[command(about = "Declarative database schema migration")]
#[command(version)]
struct Cli {
    /// Log verbosity: trace, debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate schema documents, SQL, or diffs
    Generate {
        #[command(subcommand)]
        target: GenerateTarget,
    },

    /// Compare a schema against the database and apply the changes
    Migrate {
        /// Schema document (.yaml, .yml, or .json)
        file: PathBuf,

        /// The database url
        #[arg(long, env = "DATABASE_URL")]
        url: Option<String>,

        /// Drop and re-create the database before migrating
        #[arg(long)]
        drop: bool,

        /// Ask for confirmation before applying
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum GenerateTarget {
    /// Generate a schema document from an existing database
    Schema {
        /// The database url
        #[arg(long, env = "DATABASE_URL")]
        url: Option<String>,

        /// Table to include (repeatable); all tables when omitted
        #[arg(long = "table")]
        tables: Vec<String>,

        /// Output format: json, yaml
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Generate full CREATE DDL from a schema document
    Sql {
        /// Schema document (.yaml, .yml, or .json)
        file: PathBuf,
    },

    /// Show the changes between a schema document and the database
    Diff {
        /// Schema document (.yaml, .yml, or .json)
        file: PathBuf,

        /// The database url
        #[arg(long, env = "DATABASE_URL")]
        url: Option<String>,

        /// Output format: text, sql
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let registry = Registry::with_builtins();
    let cancel = setup_signal_handler();

    match cli.command {
        Commands::Generate { target } => match target {
            GenerateTarget::Schema {
                url,
                tables,
                format,
            } => generate_schema(&registry, url, tables, &format, cancel).await,
            GenerateTarget::Sql { file } => generate_sql(&registry, &file),
            GenerateTarget::Diff { file, url, format } => {
                generate_diff(&registry, &file, url, &format, cancel).await
            }
        },
        Commands::Migrate {
            file,
            url,
            drop,
            confirm,
        } => run_migrate(&registry, &file, url, drop, confirm, cancel).await,
    }
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel on ctrl-c; every database round-trip observes the token.
fn setup_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    cancel
}

/// The schema document's own URL wins; the flag (or DATABASE_URL) backs it up.
fn resolve_url(flag: Option<String>, schema_url: Option<&str>) -> Result<String, MigrateError> {
    if let Some(url) = schema_url.filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    flag.filter(|u| !u.is_empty()).ok_or_else(|| {
        MigrateError::input(
            "must provide either --url command line option or set the environment variable DATABASE_URL",
        )
    })
}

async fn generate_schema(
    registry: &Registry,
    url: Option<String>,
    tables: Vec<String>,
    format: &str,
    cancel: CancellationToken,
) -> Result<(), MigrateError> {
    let url = resolve_url(url, None)?;
    let url = schema_migrate::util::expand_env(&url)?;
    let (_, protocol) = migrate::driver_from_url(&url)?;
    let db = Db::connect(&url, cancel).await?;

    let opts = IntrospectOptions {
        table_filter: tables,
    };
    let mut generated = migrate::to_schema(registry, protocol, &db, &opts).await?;

    let out = match format {
        "yaml" | "yml" => {
            generated.schema_url = None;
            let body = serde_yaml::to_string(&generated)?;
            format!(
                "# yaml-language-server: $schema={}\n{}",
                schema::SCHEMA_URL,
                body
            )
        }
        _ => {
            generated.schema_url = Some(schema::SCHEMA_URL.to_string());
            serde_json::to_string_pretty(&generated)?
        }
    };
    println!("{}", out);
    Ok(())
}

fn generate_sql(registry: &Registry, file: &PathBuf) -> Result<(), MigrateError> {
    let loaded = migrate::load(registry, file)?;
    let url = schema_migrate::util::expand_env(&loaded.database.url)?;
    let (_, protocol) = migrate::driver_from_url(&url)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    migrate::from_schema(registry, protocol, &loaded, &mut out)?;
    out.flush()?;
    Ok(())
}

struct DiffRun {
    db: Db,
    protocol: &'static str,
    changes: Vec<TableChange>,
    existing: Schema,
    desired: Schema,
}

async fn run_diff(
    registry: &Registry,
    file: &PathBuf,
    url: Option<String>,
    cancel: CancellationToken,
) -> Result<DiffRun, MigrateError> {
    let desired = migrate::load(registry, file)?;
    let url = resolve_url(url, Some(&desired.database.url))?;
    let url = schema_migrate::util::expand_env(&url)?;
    let (_, protocol) = migrate::driver_from_url(&url)?;
    let db = Db::connect(&url, cancel).await?;

    let existing =
        migrate::to_schema(registry, protocol, &db, &IntrospectOptions::default()).await?;
    let adapter = registry.get(protocol)?;
    let changes = diff::diff(adapter.as_ref(), &desired, &existing)?;

    Ok(DiffRun {
        db,
        protocol,
        changes,
        existing,
        desired,
    })
}

async fn generate_diff(
    registry: &Registry,
    file: &PathBuf,
    url: Option<String>,
    format: &str,
    cancel: CancellationToken,
) -> Result<(), MigrateError> {
    let run = run_diff(registry, file, url, cancel).await?;
    if run.changes.is_empty() {
        println!("no changes detected");
        return Ok(());
    }

    let format: DiffFormat = format.parse()?;
    let adapter = registry.get(run.protocol)?;
    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    render::format_diff(format, adapter.as_ref(), &run.changes, &mut out, color)?;
    out.flush()?;
    Ok(())
}

async fn run_migrate(
    registry: &Registry,
    file: &PathBuf,
    url: Option<String>,
    drop: bool,
    confirm: bool,
    cancel: CancellationToken,
) -> Result<(), MigrateError> {
    let run = run_diff(registry, file, url, cancel).await?;
    if run.changes.is_empty() && !drop {
        info!("no changes detected");
        return Ok(());
    }

    if confirm && !confirm_apply(registry, &run)? {
        return Ok(());
    }

    migrate::migrate(
        registry,
        run.protocol,
        MigrateArgs {
            db: &run.db,
            existing: &run.existing,
            desired: &run.desired,
            changes: &run.changes,
            drop,
        },
    )
    .await
}

/// Prompt before applying; lets the user review the diff or the SQL first.
fn confirm_apply(registry: &Registry, run: &DiffRun) -> Result<bool, MigrateError> {
    let adapter = registry.get(run.protocol)?;
    let prompt = format!(
        "Apply {} database {}?",
        run.changes.len(),
        schema_migrate::util::plural(run.changes.len(), "change", "changes")
    );
    loop {
        let choice = Select::new()
            .with_prompt(prompt.as_str())
            .items(&["Yes", "Show Diff", "Show SQL", "No"])
            .default(0)
            .interact()
            .map_err(|e| MigrateError::input(e.to_string()))?;
        match choice {
            0 => return Ok(true),
            3 => return Ok(false),
            show => {
                let format = if show == 2 {
                    DiffFormat::Sql
                } else {
                    DiffFormat::Text
                };
                let stdout = std::io::stdout();
                let color = stdout.is_terminal();
                let mut out = stdout.lock();
                writeln!(out)?;
                render::format_diff(format, adapter.as_ref(), &run.changes, &mut out, color)?;
                writeln!(out)?;
            }
        }
    }
}
