//! Message, response, and peer-protocol types for the hologram actor.
//! Kept separate from `mod.rs`, mirroring `actors/thought/types.rs`'s
//! role in the teacher (message enum, response enum, and the domain
//! error type live next to each other, away from the actor shell).

use chrono::{DateTime, Utc};
use ractor::RpcReplyPort;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constitution::{Action, Constitution};
use crate::core::{Purpose, Trace};

#[derive(Debug, Error, PartialEq)]
pub enum HologramError {
    #[error("cognition is disabled for this hologram")]
    CognitionDisabled,
    #[error("cognition backend error: {0}")]
    CognitionError(String),
    #[error("cognition backend timed out")]
    Timeout,
    #[error("peer {0} unreachable")]
    PeerUnreachable(String),
    #[error("max hops ({0}) exceeded without a match")]
    MaxHopsExceeded(u32),
    #[error("desire queue is full (max 10)")]
    DesireQueueFull,
}

/// Peer protocol messages (§4.5). The tag is validated against this
/// closed enum on deserialization; there is no path from untrusted
/// wire bytes to code execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    Ping {
        origin: String,
        timestamp: DateTime<Utc>,
    },
    Pong {
        origin: String,
        timestamp: DateTime<Utc>,
    },
    Query {
        origin: String,
        timestamp: DateTime<Utc>,
        purpose: Purpose,
        visited: Vec<String>,
    },
    QueryResponse {
        origin: String,
        timestamp: DateTime<Utc>,
        traces: Vec<Trace>,
        suggested_peers: Vec<String>,
    },
    TraceShare {
        origin: String,
        timestamp: DateTime<Utc>,
        trace: Trace,
    },
    Ack {
        origin: String,
        timestamp: DateTime<Utc>,
    },
    ReconstructionRequest {
        origin: String,
        timestamp: DateTime<Utc>,
        trace_id: String,
    },
    ReconstructionResponse {
        origin: String,
        timestamp: DateTime<Utc>,
        trace: Option<Trace>,
    },
}

/// Options accepted by `stimulate`.
#[derive(Debug, Clone, Default)]
pub struct StimulateOptions {
    pub max_actions: Option<usize>,
}

/// The cognition backend's structured reply: free text plus zero or
/// more proposed actions. Parsing the backend's raw output into this
/// shape is `crate::tools::client`'s job; the hologram only consumes
/// it.
#[derive(Debug, Clone)]
pub struct CognitionReply {
    pub text: String,
    pub actions: Vec<Action>,
}

/// Messages the hologram actor accepts.
pub enum HologramMsg {
    RecordTrace {
        purpose: Purpose,
        hint: crate::core::Hint,
        reply: RpcReplyPort<Trace>,
    },
    Recall {
        purpose: Purpose,
        reply: RpcReplyPort<Vec<Trace>>,
    },
    RecallAll {
        reply: RpcReplyPort<Vec<Trace>>,
    },
    IntroducePeer {
        peer_id: String,
    },
    ReceiveTrace {
        trace: Box<Trace>,
        from_id: String,
    },
    AddDesire {
        desire: String,
        reply: RpcReplyPort<Result<(), HologramError>>,
    },
    RemoveDesire {
        desire: String,
    },
    GetDesires {
        reply: RpcReplyPort<Vec<String>>,
    },
    ClearDesires,
    GetConstitution {
        reply: RpcReplyPort<Constitution>,
    },
    SetConstitution {
        constitution: Constitution,
    },
    DecayProximities,
}
