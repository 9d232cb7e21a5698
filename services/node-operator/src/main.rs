//! EBS node operator
//!
//! Advertises per-node EBS attachment capacity as an extended resource.

use anyhow::{Context, Result};
use ebsop_node_operator::{config::Config, controller};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to EBSOP_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting EBS node operator");
    info!(
        resource = %config.resource_name,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        backoff_base_ms = config.backoff_base.as_millis() as u64,
        backoff_max_secs = config.backoff_max.as_secs(),
        resync_interval_secs = config.resync_interval.map(|d| d.as_secs()),
        node_label_selector = config.node_label_selector.as_deref(),
        "Configuration loaded"
    );

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    controller::run(client, &config).await?;

    info!("EBS node operator shutdown complete");
    Ok(())
}
