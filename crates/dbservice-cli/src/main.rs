//! `dbservice` command-line client.
//!
//! Connection settings come from the environment (`DB_CONNECT_STRING`,
//! `DB_SERVICE_NAME`, `DB_POOL_MAX`, ...), optionally loaded from a `.env`
//! file, and can be overridden with flags. Log output is controlled with
//! `RUST_LOG`.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dbservice::{Column, Config, Database, KeyCase, Row, SqlValue, ToSql};
use dbservice_sqlite::SqliteDriver;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Check connectivity and run statements through a pooled database service.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database to open, overriding the environment.
    #[arg(long, global = true)]
    database: Option<String>,

    /// Connection string, overriding the environment.
    #[arg(long, global = true, conflicts_with = "database")]
    connect_string: Option<String>,

    /// Statement timeout in milliseconds.
    #[arg(long, global = true)]
    statement_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the service and report connectivity and pool status.
    Check,
    /// Run a query and print its rows.
    Query(QueryArgs),
    /// Run a statement and print the number of rows affected.
    Exec(ExecArgs),
}

#[derive(Parser)]
struct QueryArgs {
    /// SQL text, with `?` markers for parameters.
    sql: String,

    /// Parameter values, in marker order (`null`, integers and decimals are typed).
    #[arg(short, long = "param")]
    params: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Key case for JSON output.
    #[arg(long, value_enum, default_value_t = Case::Preserve)]
    case: Case,

    /// Fetch one page (1-based) instead of every row.
    #[arg(long, requires = "limit")]
    page: Option<u64>,

    /// Page size.
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Parser)]
struct ExecArgs {
    /// SQL text, with `?` markers for parameters.
    sql: String,

    /// Parameter values, in marker order.
    #[arg(short, long = "param")]
    params: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Case {
    Preserve,
    Lower,
    Camel,
    Snake,
}

impl From<Case> for KeyCase {
    fn from(case: Case) -> Self {
        match case {
            Case::Preserve => KeyCase::Preserve,
            Case::Lower => KeyCase::Lower,
            Case::Camel => KeyCase::Camel,
            Case::Snake => KeyCase::Snake,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialized");
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let db = Database::new(SqliteDriver::new(), config);

    let outcome = match cli.command {
        Commands::Check => check(&db).await,
        Commands::Query(args) => query(&db, args).await.map(|()| ExitCode::SUCCESS),
        Commands::Exec(args) => exec(&db, args).await.map(|()| ExitCode::SUCCESS),
    };

    db.close().await;
    outcome
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.connect_string {
        Some(conn_str) => Config::from_connection_string(conn_str)?,
        None => Config::from_env().context("reading database settings from the environment")?,
    };

    if let Some(database) = &cli.database {
        config = config.database(database.clone());
    }
    if let Some(ms) = cli.statement_timeout_ms {
        config = config.statement_timeout((ms > 0).then(|| Duration::from_millis(ms)));
    }

    // One-shot commands need a single session.
    let max = config.max_connections.max(1);
    Ok(config.pool_size(1, max))
}

async fn check(db: &Database) -> Result<ExitCode> {
    if let Err(e) = db.ensure_initialized().await {
        println!("unreachable: {e} ({:?})", e.kind());
        return Ok(ExitCode::FAILURE);
    }

    let report = db.probe().await;
    let status = db.status();
    match report.latency {
        Some(latency) if report.reachable => {
            println!("reachable in {:.1} ms", latency.as_secs_f64() * 1000.0);
        }
        _ => {
            let reason = report.error.map(|e| e.to_string()).unwrap_or_default();
            println!("unreachable: {reason}");
            return Ok(ExitCode::FAILURE);
        }
    }

    if let Some(pool) = status.pool {
        println!(
            "pool: {} in use, {} idle, {} max",
            pool.in_use, pool.available, pool.max
        );
    }
    println!("endpoint: {}", db.config().endpoint());
    Ok(ExitCode::SUCCESS)
}

async fn query(db: &Database, args: QueryArgs) -> Result<()> {
    let values: Vec<SqlValue> = args.params.iter().map(|p| parse_param(p)).collect();
    let refs: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

    match (args.page, args.limit) {
        (Some(page), Some(limit)) => {
            let page = db.execute_paginated(&args.sql, &refs, page, limit).await?;
            let columns = page.rows.first().map_or(&[][..], Row::columns);
            print_rows(columns, &page.rows, args.format, args.case.into())?;
            eprintln!(
                "page {} of {} ({} rows total)",
                page.page, page.pages, page.total
            );
        }
        _ => {
            let result = db.execute_query(&args.sql, &refs).await?;
            print_rows(result.columns(), result.rows(), args.format, args.case.into())?;
            if result.is_truncated() {
                eprintln!("(result truncated at {} rows)", result.len());
            }
        }
    }
    Ok(())
}

async fn exec(db: &Database, args: ExecArgs) -> Result<()> {
    let values: Vec<SqlValue> = args.params.iter().map(|p| parse_param(p)).collect();
    let refs: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

    let result = db.execute_query(&args.sql, &refs).await?;
    println!("{} row(s) affected", result.rows_affected());
    Ok(())
}

fn print_rows(columns: &[Column], rows: &[Row], format: Format, case: KeyCase) -> Result<()> {
    match format {
        Format::Json => {
            let json: Vec<_> = rows.iter().map(|row| row.to_json(case)).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Format::Table => {
            let header: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
            println!("{}", header.join("\t"));
            for row in rows {
                let cells: Vec<String> = row.values().iter().map(render).collect();
                println!("{}", cells.join("\t"));
            }
        }
    }
    Ok(())
}

fn render(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_param(raw: &str) -> SqlValue {
    if raw.eq_ignore_ascii_case("null") {
        SqlValue::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        SqlValue::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        SqlValue::Float(f)
    } else {
        SqlValue::Text(raw.to_string())
    }
}
