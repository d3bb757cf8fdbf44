//! # S3 Bucket Driver
//!
//! Stateless HTTP driver that provisions S3 buckets and ElastiCache Redis
//! clusters on `POST /` and removes them on `DELETE /{id}`.
//!
//! Configuration comes from environment variables (see `DriverConfig`); the
//! flags below override the corresponding variables.

use anyhow::Result;
use bucket_driver::config::{DriverConfig, ProviderBackend};
use bucket_driver::runtime::initialize;
use bucket_driver::server::start_server;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "s3-bucket-driver")]
#[command(about = "Stateless resource driver for S3 buckets and Redis clusters", long_about = None)]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Simulate buckets in memory instead of calling AWS (overrides USE_FAKE_AWS_CLIENT)
    #[arg(long)]
    fake_provider: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DriverConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.fake_provider {
        config.backend = ProviderBackend::InMemory;
    }

    let state = initialize(&config)?;
    start_server(config.port, state).await
}
