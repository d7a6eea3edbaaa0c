//! Consolidation daemon (spec.md §4.6): the light cycle keeps the
//! encoder's co-occurrence matrix and per-purpose vectors fresh in
//! near-real-time; the deep cycle rebuilds from scratch and ages
//! stale vocabulary out. Grounded on `memory_db::get_replay_candidates`
//! / `cluster_memories`'s batch-pull-then-process shape, retargeted
//! from a single Qdrant collection to the three-tier storage engine.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::core::Purpose;
use crate::encoder::{tokenizer, EncoderState};
use crate::hrr::{self, Vector};
use crate::storage::StorageEngine;

const DEFAULT_LIGHT_BATCH: usize = 100;
const DEFAULT_DEEP_CAP_PER_PURPOSE: usize = 1000;
const ARCHIVAL_IDLE_HOURS: f64 = 168.0;
const ARCHIVAL_MAX_ACCESS_COUNT: u64 = 5;

#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    pub light_interval: Duration,
    pub deep_interval: Duration,
    pub light_batch: usize,
    pub deep_cap_per_purpose: usize,
    pub encoder_state_path: PathBuf,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            light_interval: Duration::from_secs(600),
            deep_interval: Duration::from_secs(6 * 3600),
            light_batch: DEFAULT_LIGHT_BATCH,
            deep_cap_per_purpose: DEFAULT_DEEP_CAP_PER_PURPOSE,
            encoder_state_path: PathBuf::from("data/encoder_state.json"),
        }
    }
}

/// Result of one archival-candidate scan: purpose counts only, since
/// actually moving a record between tiers is the storage controller's
/// aging loop's job (§4.6 step 5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchivalSummary {
    pub candidate_count: usize,
}

pub struct ConsolidationEngine {
    encoder: EncoderState,
    consolidated_vectors: BTreeMap<Purpose, Vector>,
    config: ConsolidationConfig,
}

impl ConsolidationEngine {
    #[must_use]
    pub fn new(dimension: usize, config: ConsolidationConfig) -> Self {
        let encoder = EncoderState::load_or_default(&config.encoder_state_path, dimension);
        Self {
            encoder,
            consolidated_vectors: BTreeMap::new(),
            config,
        }
    }

    /// Light cycle: pull a batch of hot traces, update co-occurrence
    /// per trace, then bundle each purpose's batch vector into its
    /// running consolidated vector. Individual encoding failures are
    /// logged and skipped — the cycle always finishes.
    pub fn light_cycle(&mut self, storage: &StorageEngine) {
        let batch = storage.sample_hot(self.config.light_batch);
        let mut by_purpose: BTreeMap<Purpose, Vec<Vector>> = BTreeMap::new();

        for record in &batch {
            let tokens = tokenizer::tokenize(&record.reconstruction_hint);
            self.encoder.update_co_occurrence(&tokens);

            match self.encoder.encode_trace_content(&record.reconstruction_hint) {
                Ok(vector) => by_purpose.entry(record.purpose).or_default().push(vector),
                Err(error) => warn!(trace_id = %record.trace_id, %error, "skipping trace: encoding failed"),
            }
        }

        for (purpose, vectors) in by_purpose {
            let Ok(batch_vector) = hrr::bundle(&vectors) else {
                continue;
            };
            self.merge_into_consolidated(purpose, batch_vector);
        }
    }

    /// Deep cycle: rebuild every purpose's consolidated vector from
    /// every tier, run encoder maintenance, persist, and report
    /// archival candidates (selection only — the storage aging loop
    /// performs the actual move).
    pub fn deep_cycle(&mut self, storage: &StorageEngine) -> ArchivalSummary {
        for purpose in Purpose::ALL {
            let records = storage.all_for_purpose(purpose, self.config.deep_cap_per_purpose);
            let mut vectors = Vec::with_capacity(records.len());
            for record in &records {
                let tokens = tokenizer::tokenize(&record.reconstruction_hint);
                self.encoder.update_co_occurrence(&tokens);
                match self.encoder.encode_trace_content(&record.reconstruction_hint) {
                    Ok(vector) => vectors.push(vector),
                    Err(error) => warn!(trace_id = %record.trace_id, %error, "skipping trace: encoding failed"),
                }
            }
            if let Ok(rebuilt) = hrr::bundle(&vectors) {
                self.consolidated_vectors.insert(purpose, rebuilt);
            } else {
                self.consolidated_vectors.remove(&purpose);
            }
        }

        self.encoder.deep_maintenance();

        if let Err(error) = self.encoder.save(&self.config.encoder_state_path) {
            warn!(%error, "encoder state persistence failed, continuing");
        }

        let candidate_count = storage.archival_candidates().len();
        ArchivalSummary { candidate_count }
    }

    #[must_use]
    pub fn get_consolidated_vector(&self, purpose: Purpose) -> Option<&Vector> {
        self.consolidated_vectors.get(&purpose)
    }

    /// `query_memory(query_vector, threshold)`: similarity against
    /// every consolidated purpose vector, descending, thresholded.
    #[must_use]
    pub fn query_memory(&self, query_vector: &Vector, threshold: f32) -> Vec<(Purpose, f32)> {
        let mut results: Vec<(Purpose, f32)> = self
            .consolidated_vectors
            .iter()
            .map(|(purpose, vector)| (*purpose, hrr::similarity(query_vector, vector)))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results
    }

    /// `semantic_query(text, threshold)`: encode `text` as a query
    /// vector with the current encoder, then behave as
    /// [`Self::query_memory`].
    #[must_use]
    pub fn semantic_query(&mut self, text: &str, threshold: f32) -> Vec<(Purpose, f32)> {
        let mut hint = crate::core::Hint::new();
        hint.insert("content".to_string(), serde_json::json!(text));
        match self.encoder.encode_trace_content(&hint) {
            Ok(vector) => self.query_memory(&vector, threshold),
            Err(_) => Vec::new(),
        }
    }

    fn merge_into_consolidated(&mut self, purpose: Purpose, batch_vector: Vector) {
        match self.consolidated_vectors.get(&purpose) {
            Some(existing) => {
                if let Ok(bundled) = hrr::bundle(&[existing.clone(), batch_vector]) {
                    self.consolidated_vectors.insert(purpose, bundled);
                }
            }
            None => {
                self.consolidated_vectors.insert(purpose, batch_vector);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hint, Importance, Trace, TraceOptions, VectorClock};
    use chrono::Utc;

    fn temp_config(name: &str) -> ConsolidationConfig {
        ConsolidationConfig {
            encoder_state_path: std::env::temp_dir()
                .join(format!("kudzu-consolidation-test-{}-{name}.json", std::process::id())),
            ..ConsolidationConfig::default()
        }
    }

    fn storage_with_traces(n: usize) -> StorageEngine {
        let storage = StorageEngine::new(crate::storage::StorageConfig {
            warm_path: std::env::temp_dir()
                .join(format!("kudzu-consolidation-warm-{}-{}.jsonl", std::process::id(), n)),
            ..crate::storage::StorageConfig::default()
        });
        for i in 0..n {
            let mut hint = Hint::new();
            hint.insert("content".to_string(), serde_json::json!(format!("observation number {i}")));
            let clock = VectorClock::new().increment("h1");
            let trace = Trace::new(
                "h1",
                Purpose::Observation,
                hint,
                clock,
                Utc::now(),
                TraceOptions { content_addressable: false, importance: Importance::Normal },
            );
            storage.store(&trace, "h1");
        }
        storage
    }

    #[test]
    fn light_cycle_builds_a_consolidated_vector_per_purpose() {
        let storage = storage_with_traces(3);
        let mut engine = ConsolidationEngine::new(64, temp_config("light"));
        engine.light_cycle(&storage);
        assert!(engine.get_consolidated_vector(Purpose::Observation).is_some());
        assert!(engine.get_consolidated_vector(Purpose::Memory).is_none());
    }

    #[test]
    fn query_memory_returns_descending_above_threshold() {
        let storage = storage_with_traces(2);
        let mut engine = ConsolidationEngine::new(64, temp_config("query"));
        engine.light_cycle(&storage);
        let vector = engine.get_consolidated_vector(Purpose::Observation).unwrap().clone();
        let results = engine.query_memory(&vector, 0.0);
        assert_eq!(results[0].0, Purpose::Observation);
    }

    #[test]
    fn semantic_query_encodes_text_then_matches() {
        let storage = storage_with_traces(2);
        let mut engine = ConsolidationEngine::new(64, temp_config("semantic"));
        engine.light_cycle(&storage);
        let results = engine.semantic_query("observation number 0", 0.0);
        assert!(!results.is_empty());
    }

    #[test]
    fn deep_cycle_persists_and_reports_archival_summary() {
        let storage = storage_with_traces(1);
        let mut engine = ConsolidationEngine::new(64, temp_config("deep"));
        let summary = engine.deep_cycle(&storage);
        assert_eq!(summary, ArchivalSummary { candidate_count: 0 });
    }
}
