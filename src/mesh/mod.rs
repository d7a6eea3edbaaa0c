//! Peer gossip & mesh (spec.md §4.9): node-to-node membership and an
//! RPC abstraction for cross-node calls. Grounded on
//! `resilience::supervisor`'s event/state bookkeeping style (plain
//! struct + `HashMap` registry + drained event log), retargeted from
//! actor restart tracking to node membership tracking, plus `reqwest`
//! for the outbound call the teacher never needed (it only ever serves
//! HTTP, never calls out).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("peer {0} is not a member of the mesh")]
    UnknownNode(String),
    #[error("rpc to {node} failed: {reason}")]
    BadRpc { node: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub address: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MeshEvent {
    pub node: String,
    pub kind: MeshEventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEventKind {
    Joined,
    Left,
}

/// Node registry plus the outbound RPC client. One instance per node;
/// shared behind the storage controller's cold tier for replication
/// join, and behind the brain for cross-node queries.
pub struct Mesh {
    self_name: String,
    nodes: HashMap<String, NodeInfo>,
    events: Vec<MeshEvent>,
    client: Client,
    timeout: Duration,
}

impl Mesh {
    #[must_use]
    pub fn new(self_name: impl Into<String>) -> Self {
        Self {
            self_name: self_name.into(),
            nodes: HashMap::new(),
            events: Vec::new(),
            client: Client::new(),
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// `connect(peer)`: establish a network link, triggering
    /// replication-table join for the cold tier at the caller's
    /// discretion (the mesh itself only tracks membership).
    pub fn connect(&mut self, name: impl Into<String>, address: impl Into<String>, now: DateTime<Utc>) {
        let name = name.into();
        self.nodes.insert(name.clone(), NodeInfo { name: name.clone(), address: address.into(), joined_at: now });
        self.events.push(MeshEvent { node: name, kind: MeshEventKind::Joined, timestamp: now });
    }

    #[must_use]
    pub fn list_nodes(&self) -> Vec<&NodeInfo> {
        self.nodes.values().collect()
    }

    #[must_use]
    pub fn mesh_peers(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn leave_mesh(&mut self, name: &str, now: DateTime<Utc>) {
        if self.nodes.remove(name).is_some() {
            self.events.push(MeshEvent { node: name.to_string(), kind: MeshEventKind::Left, timestamp: now });
        }
    }

    pub fn drain_events(&mut self) -> Vec<MeshEvent> {
        std::mem::take(&mut self.events)
    }

    /// Call `path` on `node` with a JSON body, decoding the JSON
    /// response as `R`. Never retried; the caller decides whether to
    /// retry a [`MeshError::BadRpc`].
    pub async fn call<B: Serialize, R: DeserializeOwned>(&self, node: &str, path: &str, body: &B) -> Result<R, MeshError> {
        let info = self.nodes.get(node).ok_or_else(|| MeshError::UnknownNode(node.to_string()))?;
        let url = format!("{}{}", info.address, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MeshError::BadRpc { node: node.to_string(), reason: e.to_string() })?;
        if !response.status().is_success() {
            return Err(MeshError::BadRpc { node: node.to_string(), reason: format!("status {}", response.status()) });
        }
        response.json::<R>().await.map_err(|e| MeshError::BadRpc { node: node.to_string(), reason: e.to_string() })
    }

    /// Fan `path`/`body` out to every known node, collecting whichever
    /// calls succeed. Failures are logged by the caller, not
    /// propagated — a single unreachable peer never blocks the
    /// broadcast.
    pub async fn broadcast<B: Serialize + Clone, R: DeserializeOwned>(&self, path: &str, body: &B) -> Vec<(String, Result<R, MeshError>)> {
        let mut results = Vec::new();
        for node in self.nodes.keys() {
            results.push((node.clone(), self.call(node, path, body).await));
        }
        results
    }

    #[must_use]
    pub fn self_name(&self) -> &str {
        &self.self_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_registers_node_and_emits_joined_event() {
        let mut mesh = Mesh::new("node-a");
        mesh.connect("node-b", "http://localhost:9001", Utc::now());
        assert_eq!(mesh.mesh_peers(), vec!["node-b".to_string()]);
        let events = mesh.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MeshEventKind::Joined);
    }

    #[test]
    fn leave_mesh_removes_node_and_emits_left_event() {
        let mut mesh = Mesh::new("node-a");
        mesh.connect("node-b", "http://localhost:9001", Utc::now());
        mesh.drain_events();
        mesh.leave_mesh("node-b", Utc::now());
        assert!(mesh.mesh_peers().is_empty());
        let events = mesh.drain_events();
        assert_eq!(events[0].kind, MeshEventKind::Left);
    }

    #[test]
    fn leaving_unknown_node_emits_no_event() {
        let mut mesh = Mesh::new("node-a");
        mesh.leave_mesh("ghost", Utc::now());
        assert!(mesh.drain_events().is_empty());
    }

    #[tokio::test]
    async fn calling_unknown_node_is_an_error() {
        let mesh = Mesh::new("node-a");
        let result: Result<serde_json::Value, MeshError> = mesh.call("node-z", "/ping", &serde_json::json!({})).await;
        assert!(matches!(result, Err(MeshError::UnknownNode(_))));
    }
}
