//! Kilat Storage connectivity check
//!
//! Loads `KILAT_*` settings (from the environment or `.env`), builds the
//! client and lists the buckets the credentials can see.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kilat_storage::{StorageClient, StorageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "kilat_storage=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = StorageConfig::from_env().context("Failed to load storage config")?;

    tracing::info!("Kilat Storage v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("S3 endpoint: {}", config.endpoint);
    tracing::info!("S3 region: {}", config.region);

    let client = StorageClient::new(config).context("Failed to initialize storage client")?;

    let buckets = client.list_buckets().await.context("Failed to list buckets")?;
    for bucket in &buckets.buckets {
        match bucket.creation_date {
            Some(created) => tracing::info!("{} (created {})", bucket.name, created),
            None => tracing::info!("{}", bucket.name),
        }
    }
    tracing::info!("{} bucket(s) visible", buckets.buckets.len());

    Ok(())
}
