#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Kudzu - a distributed, biomimetic memory substrate for autonomous agents
//!
//! Each node runs one or more holograms, long-lived agents that record
//! traces of experience, recall and recombine them through a
//! holographic reduced-representation encoder, and consolidate hot
//! memory down through warm and cold storage tiers over time. A
//! sovereign brain loop escalates unresolved recall through successive
//! reasoning tiers, from reflexes to an external reasoning model, under
//! a monthly budget ceiling. Nodes gossip traces and introduce
//! holograms to one another over a peer mesh.
//!
//! # Architecture
//!
//! - **Core**: vector clocks, trace/hint/purpose primitives shared
//!   across every other module
//! - **HRR**: the holographic reduced-representation encoder (bind,
//!   unbind, superpose, cleanup memory)
//! - **Storage**: hot/warm/cold tiers and the record format that moves
//!   between them
//! - **Hologram**: the per-agent engine (traces, peers, beamlets,
//!   desires, constitution)
//! - **Consolidation**: light and deep cycles that promote, decay, and
//!   archive traces
//! - **Silo**: domain-scoped associative memory used by the brain's
//!   cross-silo recall
//! - **Brain**: the sovereign reasoning loop (reflex, thought, external
//!   model, distiller, curiosity, budget)
//! - **Mesh**: peer discovery and cross-node RPC
//! - **Tools**: the static tool catalog and bounded tool-use loop
//!   driving the external model
//! - **Api**: the thin HTTP surface over the above
//! - **Resilience**: panic hooks and actor supervision

pub mod api;
pub mod brain;
pub mod config;
pub mod consolidation;
pub mod constitution;
pub mod core;
pub mod encoder;
pub mod hologram;
pub mod hrr;
pub mod mesh;
pub mod resilience;
pub mod silo;
pub mod storage;
pub mod tools;
