//! SQLite MCP Server
//!
//! Serves one SQLite database over MCP on stdin/stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_common::{init_tracing, serve_stdio, shutdown_signal, LogFormat};
use sqlite_mcp::{Router, ServerConfig, Store};

#[derive(Parser, Debug)]
#[command(name = "sqlite-mcp", version, about = "MCP server for a SQLite database")]
struct Cli {
    /// Database file; created empty if it does not exist
    #[arg(long, env = "SQLITE_MCP_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Seed the demonstration tables before serving
    #[arg(long)]
    create_sample: bool,

    /// Config file (TOML)
    #[arg(long, env = "SQLITE_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Log format on stderr
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }
    if cli.create_sample {
        config.database.create_sample = true;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_tracing("sqlite_mcp", config.logging.format)?;

    let store = Store::open(&config.database.path)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?
        .with_busy_timeout(config.database.busy_timeout());

    if config.database.create_sample {
        store
            .seed_sample_data()
            .context("Failed to create sample data")?;
    }

    tracing::info!(
        db_path = %store.path().display(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting SQLite MCP server"
    );

    serve_stdio(Router::new(store), shutdown_signal())
        .await
        .context("Session I/O failed")?;

    Ok(())
}
