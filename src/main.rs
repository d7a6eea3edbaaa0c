#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Kudzu node entrypoint.
//!
//! Wires up the storage tiers, a default hologram, and the
//! consolidation engine, and serves the thin HTTP surface over them.
//! Each subsystem owns its own failure handling (§7); this
//! entrypoint's job is startup order and the foreground loop that
//! drives the periodic light-consolidation cycle.

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use kudzu::api::auth::ApiKeys;
use kudzu::api::rate_limit::RateLimiter;
use kudzu::api::{router, AppState};
use kudzu::config::KudzuConfig;
use kudzu::consolidation::{ConsolidationConfig, ConsolidationEngine};
use kudzu::constitution::{Constitution, DeploymentMode};
use kudzu::hologram::HologramEngine;
use kudzu::storage::{StorageConfig, StorageEngine};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Kudzu - a distributed, biomimetic memory substrate for autonomous agents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Port for the HTTP surface (0 to disable)
    #[arg(long, default_value = "3030")]
    api_port: u16,

    /// Path to a TOML config file; falls back to defaults when absent
    #[arg(long, default_value = "kudzu.toml")]
    config: String,

    /// This node's name in the peer mesh
    #[arg(long, default_value = "node-1")]
    node_name: String,

    /// Production deployment gates the Open constitution (spec.md §9)
    #[arg(long)]
    production: bool,
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn main() -> color_eyre::Result<()> {
    kudzu::resilience::install_panic_hooks()?;
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).with(filter).init();

    let config = match KudzuConfig::load(std::path::Path::new(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("failed to load config from {}, using defaults: {e}", args.config);
            KudzuConfig::default()
        }
    };

    info!(node = %args.node_name, "kudzu node starting");

    let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    runtime.block_on(run(args, config))
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn run(args: Args, config: KudzuConfig) -> color_eyre::Result<()> {
    let storage = Arc::new(Mutex::new(StorageEngine::new(StorageConfig {
        hot_to_warm_seconds: config.storage.hot_to_warm_seconds as i64,
        warm_to_cold_seconds: config.storage.warm_to_cold_seconds as i64,
        ..StorageConfig::default()
    })));

    let consolidation = Arc::new(Mutex::new(ConsolidationEngine::new(
        config.hrr.dimension,
        ConsolidationConfig {
            light_interval: std::time::Duration::from_millis(config.consolidation.light_interval_ms),
            deep_interval: std::time::Duration::from_millis(config.consolidation.deep_interval_ms),
            ..ConsolidationConfig::default()
        },
    )));

    let mut holograms = HashMap::new();
    holograms.insert("root".to_string(), HologramEngine::new("root", "bootstrap hologram", Constitution::Cautious, false));

    let deployment_mode = if args.production { DeploymentMode::Production } else { DeploymentMode::Development };

    let state = AppState {
        holograms: Arc::new(Mutex::new(holograms)),
        storage,
        consolidation,
        api_keys: Arc::new(ApiKeys::default()),
        auth_enabled: config.api_auth.enabled,
        deployment_mode,
        rate_limiter: Arc::new(RateLimiter::default()),
    };

    if args.api_port > 0 {
        let app = router(state.clone());
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.api_port));
        tokio::spawn(async move {
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    info!("api surface listening on {addr}");
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::error!("api server error: {e}");
                    }
                }
                Err(e) => tracing::error!("failed to bind api surface to {addr}: {e}"),
            }
        });
    }

    run_consolidation_loop(state, std::time::Duration::from_millis(config.consolidation.light_interval_ms)).await;
    Ok(())
}

/// Drives the periodic light consolidation cycle (spec.md §4.6). Deep
/// consolidation and the brain's own wake cycle are triggered
/// separately, over the API surface or the brain actor's own timer.
#[cfg_attr(coverage_nightly, coverage(off))]
async fn run_consolidation_loop(state: AppState, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let storage = state.storage.lock().await;
        state.consolidation.lock().await.light_cycle(&storage);
        drop(storage);
        info!("light consolidation cycle complete");
    }
}
