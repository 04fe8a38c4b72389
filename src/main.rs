use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{Level, info};

use sql_shim::prelude::*;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Run SQLite-flavored SQL against the configured database")]
struct Cli {
    /// Connection string; falls back to $DATABASE_URL and the SQL_SHIM_* variables
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// How datetime('now')-style helpers translate
    #[arg(long, value_enum, global = true)]
    now: Option<NowSemantics>,
    /// Log every statement to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the translated text of a statement without connecting
    Translate {
        sql: String,
        #[arg(long, value_enum)]
        target: Option<DatabaseType>,
    },
    /// Run migration scripts in the order given
    Exec {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run a query and print its rows as a JSON array
    Query {
        sql: String,
        /// Positional argument; parsed as JSON when possible, otherwise bound as text
        #[arg(long = "arg")]
        args: Vec<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Shim(#[from] SqlShimError),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot render rows: {0}")]
    Render(#[from] serde_json::Error),
}

fn parse_arg(raw: &str) -> RowValues {
    serde_json::from_str::<JsonValue>(raw).map_or_else(|_| RowValues::from(raw), RowValues::from)
}

fn load_config(cli: &Cli) -> Result<ShimConfig, SqlShimError> {
    let config = match &cli.database_url {
        Some(url) => ShimConfig::new(url.as_str())?,
        None => ShimConfig::from_env()?,
    };
    Ok(match cli.now {
        Some(now) => config.with_now(now),
        None => config,
    })
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Translate { sql, target } => {
            let dialect = target.map_or(Dialect::Postgres, Dialect::from);
            let options = TranslateOptions::for_target(dialect).with_now(cli.now.unwrap_or_default());
            let translated = translate(sql, &options);
            info!(shape = ?translated.shape, "translated");
            println!("{}", translated.sql);
        }
        Command::Exec { files } => {
            let shim = Shim::connect(load_config(&cli)?).await?;
            for path in files {
                let body = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CliError::Read {
                        path: path.clone(),
                        source,
                    })?;
                shim.exec(&body).await?;
                info!(path = %path.display(), "applied");
            }
            shim.close(DRAIN_TIMEOUT).await;
        }
        Command::Query { sql, args } => {
            let shim = Shim::connect(load_config(&cli)?).await?;
            let args: Vec<RowValues> = args.iter().map(|raw| parse_arg(raw)).collect();
            let rows = shim.prepare(sql).all(&args).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            shim.close(DRAIN_TIMEOUT).await;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
