//! Thin JSON-RPC/HTTP surface over the node's engines (spec.md §4.12,
//! §6 Public Operation Surface). Mirrors the teacher's `api/mod.rs`
//! shape: a shared `AppState`, a router with an auth middleware layer,
//! typed handlers per route. No novel design lives here — every
//! handler is a direct call into a core engine.

pub mod auth;
pub mod handlers;
pub mod rate_limit;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::sync::Mutex;

use crate::constitution::DeploymentMode;
use crate::consolidation::ConsolidationEngine;
use crate::hologram::HologramEngine;
use crate::storage::StorageEngine;

use self::auth::ApiKeys;
use self::rate_limit::RateLimiter;

/// Application state shared across handlers. Holograms are kept
/// behind a single mutex rather than wired through `ractor`
/// `ActorRef`s — the full actor supervision tree is assembled at node
/// startup (`bin/main.rs`); this surface only needs shared, mutable
/// access to the engines it drives.
#[derive(Clone)]
pub struct AppState {
    pub holograms: Arc<Mutex<HashMap<String, HologramEngine>>>,
    pub storage: Arc<Mutex<StorageEngine>>,
    pub consolidation: Arc<Mutex<ConsolidationEngine>>,
    pub api_keys: Arc<ApiKeys>,
    pub auth_enabled: bool,
    pub deployment_mode: DeploymentMode,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/holograms", post(handlers::spawn_hologram))
        .route("/traces", post(handlers::record_trace))
        .route("/recall", post(handlers::recall))
        .route("/query_peer", post(handlers::query_peer))
        .route("/introduce_peer", post(handlers::introduce_peer))
        .route("/stimulate", post(handlers::stimulate))
        .route("/constitution", post(handlers::set_constitution))
        .route("/store", post(handlers::store))
        .route("/retrieve", post(handlers::retrieve))
        .route("/query", post(handlers::query))
        .route("/consolidate_now", post(handlers::consolidate_now))
        .route("/deep_consolidate_now", post(handlers::deep_consolidate_now))
        .route("/semantic_query", post(handlers::semantic_query))
        .route("/brain/chat", post(handlers::brain_chat))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .with_state(state)
}
