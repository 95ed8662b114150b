//! dimts-gw entry point.
//!
//! Boots the offline cache gateway as a local HTTP proxy in front of the
//! Amharic TTS application origin. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use dimts_client::{FetchClient, FetchConfig};
use dimts_core::{AppConfig, AssetManifest, BucketStore};

mod classify;
mod gateway;
mod proxy;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version_tag = %config.version_tag,
        upstream = %config.upstream,
        "starting dimts-gw"
    );

    let store = BucketStore::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;
    let manifest = AssetManifest::new(config.assets.clone())?;
    let gateway = gateway::Gateway::new(
        store,
        network,
        manifest,
        config.version_tag.clone(),
        &config.upstream,
    )?;

    // A failed install leaves the gateway serving network-only; the host
    // keeps running, the same way the page ignores a failed worker
    // registration. Activation only happens after a successful install.
    match gateway.on_install().await {
        Ok(()) => {
            if let Err(e) = gateway.on_activate().await {
                tracing::warn!(error = %e, "activate failed; stale buckets may remain");
            }
        }
        Err(e) => tracing::warn!(error = %e, "install failed; serving without offline cache"),
    }

    let app = proxy::router(Arc::new(gateway));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
