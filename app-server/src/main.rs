use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use taskmatrix_app_server::ServerConfig;
use tracing_subscriber::EnvFilter;

/// Classify tasks into urgency/importance quadrants over HTTP.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration file.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path).await?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    taskmatrix_app_server::run(config).await
}
