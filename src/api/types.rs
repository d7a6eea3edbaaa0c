//! Request/response types for the thin JSON-RPC/HTTP surface
//! (spec.md §6's Public Operation Surface table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constitution::Constitution;
use crate::core::{Hint, Purpose};

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnHologramRequest {
    pub id: String,
    pub purpose: String,
    pub constitution: Constitution,
    pub cognition_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnHologramResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordTraceRequest {
    pub hologram: String,
    pub purpose: Purpose,
    pub hint: Hint,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceResponse {
    pub trace_id: String,
    pub purpose: Purpose,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecallRequest {
    pub hologram: String,
    pub purpose: Option<Purpose>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryPeerRequest {
    pub hologram: String,
    pub peer_id: String,
    pub purpose: Purpose,
    pub max_hops: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntroducePeerRequest {
    pub hologram: String,
    pub peer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StimulateRequest {
    pub hologram: String,
    pub stimulus: String,
    pub max_actions: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StimulateResponse {
    pub text: String,
    pub actions: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetConstitutionRequest {
    pub hologram: String,
    pub framework: Constitution,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreRequest {
    pub hologram_id: String,
    pub purpose: Purpose,
    pub hint: Hint,
    pub importance: crate::core::Importance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
    pub trace_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub purpose: Purpose,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemanticQueryRequest {
    pub text: String,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticQueryResponse {
    pub matches: Vec<(Purpose, f32)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrainChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Extracted from a validated bearer token (§9's HMAC auth).
#[derive(Debug, Clone)]
pub struct AuthenticatedKey {
    pub key_id: String,
}
