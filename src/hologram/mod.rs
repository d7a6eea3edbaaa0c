//! The hologram agent (spec.md §4.5): a long-lived cooperative task
//! owning traces, peer proximities, beamlets, desires, and a
//! constitution. Modeled on `actors/thought/mod.rs`'s split between an
//! actor-agnostic state/engine and a thin `ractor::Actor` shell.

pub mod registry;
pub mod types;

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use serde_json::{json, Map, Value};

use crate::constitution::{Action, Constitution, Decision, HologramState as ConstitutionState};
use crate::core::{Hint, Purpose, Trace, TraceOptions, VectorClock};

pub use types::{CognitionReply, HologramError, HologramMsg, PeerMessage, StimulateOptions};

const DESIRE_CAP: usize = 10;
const PROXIMITY_BOOST: f32 = 0.2;
const PROXIMITY_DECAY: f32 = 0.95;
const PROXIMITY_FLOOR: f32 = 0.01;
const PROXIMITY_CEIL: f32 = 1.0;

/// A backend that turns a prompt into a structured cognition reply.
/// External to core per §4.5; injected so the engine stays pure and
/// testable without a live model endpoint.
#[ractor::async_trait]
pub trait CognitionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CognitionReply, HologramError>;
}

/// Executes a permitted action. Injected for the same reason as
/// [`CognitionBackend`] — the core spec never mandates a concrete
/// effect system.
#[ractor::async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &Action);
}

/// Sends a peer-protocol message to another hologram and awaits its
/// reply. Implemented locally (same-process) or over the mesh
/// (`crate::mesh`) by reqwest-backed RPC.
#[ractor::async_trait]
pub trait PeerLink: Send + Sync {
    async fn send(&self, peer_id: &str, message: PeerMessage) -> Result<PeerMessage, HologramError>;
}

/// The hologram's own state: traces, peers, beamlets, clock, desires,
/// constitution. Free functions below operate on this engine so that
/// async peer/cognition calls aren't tangled with the `ractor::Actor`
/// message loop.
#[derive(Debug, Clone)]
pub struct HologramEngine {
    pub id: String,
    pub purpose: String,
    pub traces: HashMap<String, Trace>,
    pub peers: HashMap<String, f32>,
    pub beamlets: HashMap<String, HashMap<String, f32>>,
    pub clock: VectorClock,
    pub desires: VecDeque<String>,
    pub cognition_enabled: bool,
    pub constitution: Constitution,
    pub metadata: Map<String, Value>,
    /// Per-hologram override of the node-wide model endpoint (Open
    /// Question resolution, see DESIGN.md).
    pub ollama_url: Option<String>,
}

impl HologramEngine {
    #[must_use]
    pub fn new(id: impl Into<String>, purpose: impl Into<String>, constitution: Constitution, cognition_enabled: bool) -> Self {
        let id = id.into();
        let clock = VectorClock::new().increment(&id);
        Self {
            purpose: purpose.into(),
            traces: HashMap::new(),
            peers: HashMap::new(),
            beamlets: HashMap::new(),
            clock,
            desires: VecDeque::new(),
            cognition_enabled,
            constitution,
            metadata: Map::new(),
            ollama_url: None,
            id,
        }
    }

    /// `record_trace(purpose, hint) -> Trace`.
    pub fn record_trace(&mut self, purpose: Purpose, hint: Hint, now: DateTime<Utc>) -> Trace {
        self.clock = self.clock.increment(&self.id);
        let trace = Trace::new(&self.id, purpose, hint, self.clock.clone(), now, TraceOptions::default());
        self.traces.insert(trace.id.clone(), trace.clone());
        trace
    }

    #[must_use]
    pub fn recall(&self, purpose: Purpose) -> Vec<Trace> {
        self.traces.values().filter(|t| t.purpose == purpose).cloned().collect()
    }

    #[must_use]
    pub fn recall_all(&self) -> Vec<Trace> {
        self.traces.values().cloned().collect()
    }

    /// Boost a peer's proximity, capped at 1.0. Repeated boosts
    /// saturate rather than compound unboundedly.
    pub fn introduce_peer(&mut self, peer_id: &str) {
        boost(&mut self.peers, peer_id);
    }

    pub fn boost_beamlet(&mut self, capability: &str, beamlet_id: &str) {
        boost(self.beamlets.entry(capability.to_string()).or_default(), beamlet_id);
    }

    /// `receive_trace(trace, from_id)`: follow, merge clocks, store,
    /// boost proximity with the sender.
    pub fn receive_trace(&mut self, trace: &Trace, from_id: &str) -> Trace {
        let followed = trace.follow(&self.id);
        self.clock = self.clock.merge(&followed.timestamp);
        self.traces.insert(followed.id.clone(), followed.clone());
        boost(&mut self.peers, from_id);
        followed
    }

    /// # Errors
    /// Returns [`HologramError::DesireQueueFull`] once 10 desires are
    /// queued.
    pub fn add_desire(&mut self, desire: String) -> Result<(), HologramError> {
        if self.desires.len() >= DESIRE_CAP {
            return Err(HologramError::DesireQueueFull);
        }
        self.desires.push_back(desire);
        Ok(())
    }

    pub fn remove_desire(&mut self, desire: &str) {
        self.desires.retain(|d| d != desire);
    }

    #[must_use]
    pub fn get_desires(&self) -> Vec<String> {
        self.desires.iter().cloned().collect()
    }

    pub fn clear_desires(&mut self) {
        self.desires.clear();
    }

    /// Hot-swap the constitution: desires are unconditionally cleared
    /// (§4.5: "clear after constitution change is mandatory") and a
    /// `constitution_change` trace is recorded.
    pub fn set_constitution(&mut self, constitution: Constitution, now: DateTime<Utc>) -> Trace {
        self.constitution = constitution;
        self.clear_desires();
        let mut hint = Hint::new();
        hint.insert("constitution".to_string(), json!(constitution.as_str()));
        self.record_trace(Purpose::ConstitutionChange, hint, now)
    }

    /// §3 timer: every ~30s, decay all peer and beamlet proximities by
    /// 0.95 and drop entries below the floor.
    pub fn decay_proximities(&mut self) {
        decay(&mut self.peers);
        for beamlets in self.beamlets.values_mut() {
            decay(beamlets);
        }
    }

    /// Top-`n` peers by proximity, excluding `exclude`. Used both for
    /// query-peer's suggested-peers hint and for `delegate_io`'s
    /// proximity-based beamlet selection.
    #[must_use]
    fn top_peers(&self, n: usize, exclude: &str) -> Vec<String> {
        let mut ranked: Vec<(&String, &f32)> = self.peers.iter().filter(|(id, _)| id.as_str() != exclude).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.into_iter().take(n).map(|(id, _)| id.clone()).collect()
    }

    /// Proximity-based beamlet selection for `delegate_io`: the
    /// highest-proximity beamlet registered for `capability`.
    #[must_use]
    pub fn select_beamlet(&self, capability: &str) -> Option<String> {
        self.beamlets.get(capability).and_then(|map| {
            map.iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(id, _)| id.clone())
        })
    }

    fn build_prompt(&self, stimulus: &str) -> String {
        let desires = self.get_desires().join("; ");
        format!("hologram={} purpose={} desires=[{desires}] stimulus={stimulus}", self.id, self.purpose)
    }
}

fn boost(map: &mut HashMap<String, f32>, id: &str) {
    let entry = map.entry(id.to_string()).or_insert(0.0);
    *entry = (*entry + PROXIMITY_BOOST).min(PROXIMITY_CEIL);
}

fn decay(map: &mut HashMap<String, f32>) {
    for value in map.values_mut() {
        *value *= PROXIMITY_DECAY;
    }
    map.retain(|_, v| *v >= PROXIMITY_FLOOR);
}

fn action_tag_json(action: &Action) -> Value {
    json!(action.tag())
}

/// `query_peer(peer_id, purpose, max_hops)`: recurse through suggested
/// peers, bounded by `max_hops`, guarded by a visited set against
/// loops. Boosts proximity with whichever peer actually answers.
///
/// # Errors
/// Returns [`HologramError::MaxHopsExceeded`] if no peer along the
/// chain has a match, or [`HologramError::PeerUnreachable`] if a hop
/// fails to respond.
pub async fn query_peer(
    engine: &mut HologramEngine,
    link: &dyn PeerLink,
    peer_id: &str,
    purpose: Purpose,
    max_hops: u32,
    now: DateTime<Utc>,
) -> Result<Vec<Trace>, HologramError> {
    let mut visited = vec![engine.id.clone()];
    let mut current = peer_id.to_string();
    let mut hops_left = max_hops;

    loop {
        visited.push(current.clone());
        let message = PeerMessage::Query {
            origin: engine.id.clone(),
            timestamp: now,
            purpose,
            visited: visited.clone(),
        };

        let reply = link
            .send(&current, message)
            .await
            .map_err(|_| HologramError::PeerUnreachable(current.clone()))?;

        let PeerMessage::QueryResponse { traces, suggested_peers, .. } = reply else {
            return Err(HologramError::PeerUnreachable(current));
        };

        if !traces.is_empty() {
            boost(&mut engine.peers, &current);
            return Ok(traces);
        }

        if hops_left == 0 {
            return Err(HologramError::MaxHopsExceeded(max_hops));
        }
        hops_left -= 1;

        match suggested_peers.into_iter().find(|p| !visited.contains(p)) {
            Some(next) => current = next,
            None => return Err(HologramError::MaxHopsExceeded(max_hops)),
        }
    }
}

/// `stimulate(stimulus, opts)`: build a prompt, invoke cognition,
/// submit each proposed action through the constitutional gate, record
/// an `action_audit` trace per decision (plus an `action_denied` trace
/// on denial), and finally record the stimulus itself.
///
/// # Errors
/// Returns [`HologramError::CognitionDisabled`] if the hologram has
/// cognition turned off, or whatever error the backend surfaces.
pub async fn stimulate(
    engine: &mut HologramEngine,
    cognition: &dyn CognitionBackend,
    executor: &dyn ActionExecutor,
    stimulus: &str,
    opts: StimulateOptions,
    now: DateTime<Utc>,
) -> Result<(String, Vec<Action>), HologramError> {
    if !engine.cognition_enabled {
        return Err(HologramError::CognitionDisabled);
    }

    let prompt = engine.build_prompt(stimulus);
    let reply = cognition.complete(&prompt).await?;

    let max = opts.max_actions.unwrap_or(reply.actions.len());
    let mut executed = Vec::new();

    for action in reply.actions.into_iter().take(max) {
        let decision = engine.constitution.permitted(
            &action,
            ConstitutionState { cognition_enabled: engine.cognition_enabled },
        );

        match decision {
            Decision::Permitted => {
                executor.execute(&action).await;
                let mut hint = Hint::new();
                hint.insert("action".to_string(), action_tag_json(&action));
                hint.insert("decision".to_string(), json!("permitted"));
                engine.record_trace(Purpose::ActionAudit, hint, now);
                executed.push(action);
            }
            Decision::Denied { reason } => {
                let mut denied_hint = Hint::new();
                denied_hint.insert("action".to_string(), action_tag_json(&action));
                denied_hint.insert("reason".to_string(), json!(reason));
                denied_hint.insert("constitution".to_string(), json!(engine.constitution.as_str()));
                engine.record_trace(Purpose::ActionDenied, denied_hint, now);

                let mut audit_hint = Hint::new();
                audit_hint.insert("action".to_string(), action_tag_json(&action));
                audit_hint.insert("decision".to_string(), json!("denied"));
                engine.record_trace(Purpose::ActionAudit, audit_hint, now);
            }
            Decision::RequiresConsensus { threshold } => {
                tracing::info!(action = action.tag(), threshold, "action requires consensus, not executed");
                let mut hint = Hint::new();
                hint.insert("action".to_string(), action_tag_json(&action));
                hint.insert("decision".to_string(), json!("requires_consensus"));
                hint.insert("threshold".to_string(), json!(threshold));
                engine.record_trace(Purpose::ActionAudit, hint, now);
            }
        }
    }

    let mut stimulus_hint = Hint::new();
    stimulus_hint.insert("content".to_string(), json!(stimulus));
    engine.record_trace(Purpose::Stimulus, stimulus_hint, now);

    Ok((reply.text, executed))
}

/// `ractor::Actor` shell. Peer/cognition I/O happens outside the
/// actor's own message loop via the free functions above, invoked by
/// whatever owns an `ActorRef` and the relevant trait objects — the
/// actor itself only guards the engine's synchronous operations.
pub struct HologramActor;

#[ractor::async_trait]
impl Actor for HologramActor {
    type Msg = HologramMsg;
    type State = HologramEngine;
    type Arguments = HologramEngine;

    async fn pre_start(&self, _myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        Ok(args)
    }

    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            HologramMsg::RecordTrace { purpose, hint, reply } => {
                let trace = state.record_trace(purpose, hint, Utc::now());
                let _ = reply.send(trace);
            }
            HologramMsg::Recall { purpose, reply } => {
                let _ = reply.send(state.recall(purpose));
            }
            HologramMsg::RecallAll { reply } => {
                let _ = reply.send(state.recall_all());
            }
            HologramMsg::IntroducePeer { peer_id } => {
                state.introduce_peer(&peer_id);
            }
            HologramMsg::ReceiveTrace { trace, from_id } => {
                state.receive_trace(&trace, &from_id);
            }
            HologramMsg::AddDesire { desire, reply } => {
                let _ = reply.send(state.add_desire(desire));
            }
            HologramMsg::RemoveDesire { desire } => {
                state.remove_desire(&desire);
            }
            HologramMsg::GetDesires { reply } => {
                let _ = reply.send(state.get_desires());
            }
            HologramMsg::ClearDesires => {
                state.clear_desires();
            }
            HologramMsg::GetConstitution { reply } => {
                let _ = reply.send(state.constitution);
            }
            HologramMsg::SetConstitution { constitution } => {
                state.set_constitution(constitution, Utc::now());
            }
            HologramMsg::DecayProximities => {
                state.decay_proximities();
            }
        }
        Ok(())
    }
}
