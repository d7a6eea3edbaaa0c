//! Tiered storage: hot (in-memory) -> warm (local append file) ->
//! cold (replicated table), with content-addressable dedup within a
//! tier and a periodic aging loop that demotes stale records.
//!
//! The `StorageController` is one of the node's three long-lived
//! singleton tasks (spec.md §9), modeled on `actors/thought`'s
//! `ThoughtAssemblyActor` shape: a `ractor::Actor` with a typed message
//! enum and `RpcReplyPort` replies.

pub mod cold;
pub mod hot;
pub mod record;
pub mod warm;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use thiserror::Error;

use crate::core::{Importance, Purpose, Trace};
use cold::LocalColdStub;
use hot::HotTier;
use record::Record;
use warm::WarmTier;

/// Which tier a record was found in, or is targeted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("trace not found in any tier")]
    NotFound,
    #[error("{0:?} tier unreachable")]
    Unreachable(Tier),
}

/// Default aging thresholds (spec.md §4.4).
const HOT_TO_WARM_SECONDS: i64 = 3600;
const WARM_TO_COLD_SECONDS: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub warm_path: PathBuf,
    pub hot_to_warm_seconds: i64,
    pub warm_to_cold_seconds: i64,
    pub aging_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            warm_path: PathBuf::from("data/warm.jsonl"),
            hot_to_warm_seconds: HOT_TO_WARM_SECONDS,
            warm_to_cold_seconds: WARM_TO_COLD_SECONDS,
            aging_interval: Duration::from_secs(600),
        }
    }
}

/// Tier engine: the actual store/retrieve/query/aging logic, kept
/// separate from the actor shell so it's unit-testable without ractor
/// machinery.
pub struct StorageEngine {
    hot: HotTier,
    warm: WarmTier,
    cold: LocalColdStub,
    config: StorageConfig,
}

impl StorageEngine {
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        let warm = WarmTier::new(config.warm_path.clone());
        Self {
            hot: HotTier::new(),
            warm,
            cold: LocalColdStub::new(),
            config,
        }
    }

    /// Always inserts into hot; no cross-tier dedup check (content
    /// addressing already collapses duplicates within a tier).
    pub fn store(&self, trace: &Trace, hologram_id: &str) {
        let record = Record::from_trace(trace, hologram_id, Utc::now());
        self.hot.insert(record);
    }

    /// Probe hot -> warm -> cold; promote on a hit below hot.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if no tier has the trace.
    pub fn retrieve(&self, trace_id: &str) -> Result<(Tier, Record), StorageError> {
        if let Some(record) = self.hot.get(trace_id) {
            return Ok((Tier::Hot, record));
        }

        if let Some(mut record) = self.warm.get(trace_id) {
            record.record_access(Utc::now());
            let _ = self.warm.remove(trace_id);
            self.hot.insert(record.clone());
            return Ok((Tier::Warm, record));
        }

        if let Some(mut record) = self.cold.get(trace_id) {
            record.record_access(Utc::now());
            let _ = self.cold.remove(trace_id);
            self.hot.insert(record.clone());
            return Ok((Tier::Cold, record));
        }

        Err(StorageError::NotFound)
    }

    /// Merged, unique-by-id scan: hot first, then warm, then cold, up
    /// to `limit` total.
    #[must_use]
    pub fn query(&self, purpose: Purpose, limit: usize) -> Vec<Record> {
        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();

        for record in self.hot.query(purpose, limit) {
            if seen.insert(record.trace_id.clone()) {
                results.push(record);
            }
        }
        if results.len() < limit {
            for record in self.warm.query(purpose, limit - results.len()) {
                if seen.insert(record.trace_id.clone()) {
                    results.push(record);
                }
            }
        }
        if results.len() < limit {
            for record in self.cold.query(purpose, limit - results.len()) {
                if seen.insert(record.trace_id.clone()) {
                    results.push(record);
                }
            }
        }
        results
    }

    /// One pass of the aging loop: Hot -> Warm after 1hr idle
    /// (importance != critical), Warm -> Cold after 7 days idle
    /// (importance != critical). Deletion from the source tier happens
    /// only after a successful insert into the target.
    pub fn run_aging_cycle(&self) {
        let now = Utc::now();

        for record in self.hot.all() {
            if record.importance == Importance::Critical {
                continue;
            }
            if record.hours_since_access(now) * 3600.0 >= self.config.hot_to_warm_seconds as f64 {
                if self.warm.insert(&record).is_ok() {
                    self.hot.remove(&record.trace_id);
                }
            }
        }

        for record in self.warm.read_all() {
            if record.importance == Importance::Critical {
                continue;
            }
            if record.hours_since_access(now) * 3600.0 >= self.config.warm_to_cold_seconds as f64 {
                self.cold.insert(record.clone(), Vec::new());
                let _ = self.warm.remove(&record.trace_id);
            }
        }
    }

    /// A batch of hot traces for the consolidation daemon's light
    /// cycle (§4.6 step 1), spanning whatever purposes are currently
    /// hot rather than one purpose at a time.
    #[must_use]
    pub fn sample_hot(&self, limit: usize) -> Vec<Record> {
        self.hot.all().into_iter().take(limit).collect()
    }

    /// Every record for `purpose` across all three tiers, capped at
    /// `cap`, for the deep cycle's full rebuild (§4.6 step 2).
    #[must_use]
    pub fn all_for_purpose(&self, purpose: Purpose, cap: usize) -> Vec<Record> {
        self.query(purpose, cap)
    }

    /// Archival candidates per §4.6: idle >168h, access_count < 5,
    /// importance != critical. Consolidation calls this; only the
    /// aging loop above actually moves anything.
    #[must_use]
    pub fn archival_candidates(&self) -> Vec<Record> {
        let now = Utc::now();
        self.warm
            .read_all()
            .into_iter()
            .filter(|r| {
                r.importance != Importance::Critical
                    && r.access_count < 5
                    && r.hours_since_access(now) > 168.0
            })
            .collect()
    }
}

/// Messages the storage controller actor accepts.
pub enum StorageMsg {
    Store {
        trace: Box<Trace>,
        hologram_id: String,
    },
    Retrieve {
        trace_id: String,
        reply: RpcReplyPort<Result<(Tier, Record), StorageError>>,
    },
    Query {
        purpose: Purpose,
        limit: usize,
        reply: RpcReplyPort<Vec<Record>>,
    },
    RunAgingCycle,
}

pub struct StorageController;

#[ractor::async_trait]
impl Actor for StorageController {
    type Msg = StorageMsg;
    type State = StorageEngine;
    type Arguments = StorageConfig;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(StorageEngine::new(args))
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            StorageMsg::Store { trace, hologram_id } => {
                state.store(&trace, &hologram_id);
            }
            StorageMsg::Retrieve { trace_id, reply } => {
                let _ = reply.send(state.retrieve(&trace_id));
            }
            StorageMsg::Query { purpose, limit, reply } => {
                let _ = reply.send(state.query(purpose, limit));
            }
            StorageMsg::RunAgingCycle => {
                state.run_aging_cycle();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hint, TraceOptions, VectorClock};

    fn temp_config(name: &str) -> StorageConfig {
        StorageConfig {
            warm_path: std::env::temp_dir()
                .join(format!("kudzu-storage-test-{}-{name}.jsonl", std::process::id())),
            ..StorageConfig::default()
        }
    }

    fn sample_trace(origin: &str, importance: Importance) -> Trace {
        Trace::new(
            origin,
            Purpose::Memory,
            Hint::new(),
            VectorClock::new().increment(origin),
            Utc::now(),
            TraceOptions {
                content_addressable: true,
                importance,
            },
        )
    }

    #[test]
    fn store_always_lands_in_hot() {
        let config = temp_config("store-hot");
        let engine = StorageEngine::new(config);
        let trace = sample_trace("h1", Importance::Normal);
        engine.store(&trace, "h1");
        let (tier, record) = engine.retrieve(&trace.id).unwrap();
        assert_eq!(tier, Tier::Hot);
        assert_eq!(record.trace_id, trace.id);
    }

    #[test]
    fn retrieve_not_found_when_absent_everywhere() {
        let config = temp_config("not-found");
        let engine = StorageEngine::new(config);
        assert_eq!(engine.retrieve("missing"), Err(StorageError::NotFound));
    }

    #[test]
    fn tiered_aging_demotes_then_promotes_on_access() {
        let config = temp_config("tiered-aging");
        let engine = StorageEngine::new(config);
        let trace = sample_trace("h1", Importance::Normal);
        engine.store(&trace, "h1");

        // Simulate T=3600s idle by back-dating the hot record directly.
        let mut record = engine.hot.get(&trace.id).unwrap();
        record.last_accessed = Utc::now() - chrono::Duration::seconds(3600);
        engine.hot.insert(record);

        engine.run_aging_cycle();
        assert!(engine.hot.get(&trace.id).is_none());
        let (tier, _) = engine.retrieve(&trace.id).unwrap();
        assert_eq!(tier, Tier::Warm);

        // Promotion on access: now back in hot.
        let (tier2, _) = engine.retrieve(&trace.id).unwrap();
        assert_eq!(tier2, Tier::Hot);
    }

    #[test]
    fn critical_importance_is_never_aged_out_of_hot() {
        let config = temp_config("critical");
        let engine = StorageEngine::new(config);
        let trace = sample_trace("h1", Importance::Critical);
        engine.store(&trace, "h1");

        let mut record = engine.hot.get(&trace.id).unwrap();
        record.last_accessed = Utc::now() - chrono::Duration::days(30);
        engine.hot.insert(record);

        engine.run_aging_cycle();
        assert!(engine.hot.get(&trace.id).is_some());
    }

    #[test]
    fn query_merges_unique_by_id_across_tiers() {
        let config = temp_config("query-merge");
        let engine = StorageEngine::new(config);
        let t1 = sample_trace("h1", Importance::Normal);
        engine.store(&t1, "h1");
        let results = engine.query(Purpose::Memory, 10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn archival_candidates_require_low_access_and_long_idle() {
        let config = temp_config("archival");
        let engine = StorageEngine::new(config);
        let trace = sample_trace("h1", Importance::Normal);
        engine.warm.insert(&Record::from_trace(&trace, "h1", Utc::now() - chrono::Duration::hours(200))).unwrap();

        let candidates = engine.archival_candidates();
        assert_eq!(candidates.len(), 1);
    }
}
