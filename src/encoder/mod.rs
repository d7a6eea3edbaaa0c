//! Encoder state
//!
//! Learns a co-occurrence matrix over tokens extracted from trace
//! hints and uses it to bias otherwise-random seeded token vectors
//! toward their semantic neighbors. This is what lets
//! [`crate::consolidation`] and [`crate::silo`] compare traces by
//! meaning instead of by identity.

pub mod tokenizer;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Hint;
use crate::hrr::{self, Vector};

/// Current on-disk encoder state format version. Forward-compatible:
/// unknown versions are rejected with [`EncoderError::Incompatible`]
/// rather than partially parsed, and callers treat that the same as a
/// missing file — cold start, never a hard error.
const STATE_VERSION: u32 = 1;

const TOP_NEIGHBORS: usize = 5;
const DECAY_FACTOR: f32 = 0.98;
const PRUNE_THRESHOLD: f32 = 1.0;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoder state file version {0} is not supported")]
    Incompatible(u32),
}

/// Persisted + working encoder state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderState {
    version: u32,
    dimension: usize,
    blend_strength: f32,
    /// role tag -> fixed seeded vector (content, subject, object, event, ...)
    codebook: BTreeMap<String, Vector>,
    /// token -> cached contextual vector
    vocabulary: BTreeMap<String, Vector>,
    /// token_a -> token_b -> count, updated symmetrically
    co_occurrence: BTreeMap<String, BTreeMap<String, f32>>,
    token_counts: BTreeMap<String, u64>,
    traces_processed: u64,
}

impl EncoderState {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            version: STATE_VERSION,
            dimension,
            blend_strength: 0.3,
            codebook: BTreeMap::new(),
            vocabulary: BTreeMap::new(),
            co_occurrence: BTreeMap::new(),
            token_counts: BTreeMap::new(),
            traces_processed: 0,
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub const fn traces_processed(&self) -> u64 {
        self.traces_processed
    }

    #[must_use]
    pub fn blend_strength(&self) -> f32 {
        self.blend_strength
    }

    pub fn set_blend_strength(&mut self, strength: f32) {
        self.blend_strength = strength.clamp(0.0, 1.0);
    }

    /// Vector for a field-role tag (content, subject, object, event,
    /// ...), created on first use and cached thereafter.
    fn role_vector(&mut self, role: &str) -> Vector {
        if let Some(v) = self.codebook.get(role) {
            return v.clone();
        }
        let v = hrr::seeded_vector(&format!("role_v1_{role}"), self.dimension);
        self.codebook.insert(role.to_string(), v.clone());
        v
    }

    /// Update the co-occurrence matrix for one trace's token set: every
    /// unordered pair gets +1.0 in both directions.
    pub fn update_co_occurrence(&mut self, tokens: &BTreeSet<String>) {
        let list: Vec<&String> = tokens.iter().collect();
        for i in 0..list.len() {
            for j in (i + 1)..list.len() {
                let (a, b) = (list[i].clone(), list[j].clone());
                *self
                    .co_occurrence
                    .entry(a.clone())
                    .or_default()
                    .entry(b.clone())
                    .or_insert(0.0) += 1.0;
                *self
                    .co_occurrence
                    .entry(b)
                    .or_default()
                    .entry(a)
                    .or_insert(0.0) += 1.0;
            }
        }
        for token in tokens {
            *self.token_counts.entry(token.clone()).or_insert(0) += 1;
        }
        self.traces_processed += 1;
    }

    /// Deep maintenance: decay all weights by 0.98, prune below 1.0
    /// (both directions), then evict tokens with zero incoming weight.
    pub fn deep_maintenance(&mut self) {
        for neighbors in self.co_occurrence.values_mut() {
            for weight in neighbors.values_mut() {
                *weight *= DECAY_FACTOR;
            }
            neighbors.retain(|_, w| *w >= PRUNE_THRESHOLD);
        }
        self.co_occurrence.retain(|_, neighbors| !neighbors.is_empty());

        let alive: BTreeSet<String> = self.co_occurrence.keys().cloned().collect();
        self.vocabulary.retain(|token, _| alive.contains(token));
    }

    /// The contextual vector for a single token: a seeded base vector
    /// blended toward its top co-occurring neighbors.
    #[must_use]
    pub fn contextual_token_vector(&self, token: &str) -> Vector {
        let base = hrr::seeded_vector(&format!("token_v2_{token}"), self.dimension);

        let Some(neighbors) = self.co_occurrence.get(token) else {
            return base;
        };
        if neighbors.is_empty() {
            return base;
        }

        let mut sorted: Vec<(&String, &f32)> = neighbors.iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        sorted.truncate(TOP_NEIGHBORS);

        let total: f32 = sorted.iter().map(|(_, w)| **w).sum();
        if total <= 0.0 {
            return base;
        }

        let dim = self.dimension;
        let mut blend = vec![0.0f32; dim];
        for (neighbor, weight) in &sorted {
            let nv = hrr::seeded_vector(&format!("token_v2_{neighbor}"), dim);
            let scale = *weight / total;
            for (b, v) in blend.iter_mut().zip(nv.iter()) {
                *b += v * scale;
            }
        }

        let combined: Vector = base
            .iter()
            .zip(blend.iter())
            .map(|(b, x)| b + self.blend_strength * x)
            .collect();
        normalize_vector(combined)
    }

    /// Encode a trace's reconstruction hint into a single content
    /// vector: each present field is tokenized, its tokens' contextual
    /// vectors are bound to that field's role vector, and the results
    /// are bundled.
    pub fn encode_trace_content(&mut self, hint: &Hint) -> Result<Vector, hrr::HrrError> {
        let tokens = tokenizer::tokenize(hint);
        if tokens.is_empty() {
            return Ok(self.role_vector("content"));
        }

        let mut bound = Vec::with_capacity(tokens.len());
        let role = self.role_vector("content");
        for token in &tokens {
            let token_vec = self.contextual_token_vector(token);
            bound.push(hrr::bind(&token_vec, &role)?);
        }
        hrr::bundle(&bound)
    }

    /// Save to a local JSON file with a version header. Callers should
    /// treat write failures as a logged warning, not a hard error
    /// (§4.6 failure model).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load from a local JSON file. Missing or corrupt files are
    /// treated as a cold start (empty state), never an error; an
    /// explicitly unsupported version returns
    /// [`EncoderError::Incompatible`] so callers can decide whether to
    /// start fresh.
    pub fn load_or_default(path: &Path, dimension: usize) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(state) if state.version == STATE_VERSION => state,
                _ => Self::new(dimension),
            },
            Err(_) => Self::new(dimension),
        }
    }
}

fn normalize_vector(mut v: Vector) -> Vector {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(content: &str) -> Hint {
        let mut h = Hint::new();
        h.insert("content".to_string(), serde_json::json!(content));
        h
    }

    #[test]
    fn co_occurrence_update_is_symmetric() {
        let mut state = EncoderState::new(64);
        let tokens: BTreeSet<String> = ["a", "b", "c"].into_iter().map(String::from).collect();
        state.update_co_occurrence(&tokens);
        assert_eq!(
            state.co_occurrence["a"]["b"],
            state.co_occurrence["b"]["a"]
        );
        assert_eq!(
            state.co_occurrence["a"]["c"],
            state.co_occurrence["c"]["a"]
        );
    }

    #[test]
    fn co_occurrence_weight_exactly_one_is_pruned_next_deep_cycle() {
        let mut state = EncoderState::new(64);
        let tokens: BTreeSet<String> = ["x", "y"].into_iter().map(String::from).collect();
        state.update_co_occurrence(&tokens);
        // weight is 1.0 after a single co-occurrence; decay by 0.98 drops
        // it to 0.98, which then fails the >= 1.0 prune threshold.
        state.deep_maintenance();
        assert!(state.co_occurrence.get("x").is_none_or(|n| !n.contains_key("y")));
    }

    #[test]
    fn contextual_vector_without_neighbors_is_base_seeded_vector() {
        let state = EncoderState::new(64);
        let v = state.contextual_token_vector("lonely");
        let base = hrr::seeded_vector("token_v2_lonely", 64);
        assert_eq!(v, base);
    }

    #[test]
    fn contextual_vector_with_neighbors_differs_from_base() {
        let mut state = EncoderState::new(64);
        let tokens: BTreeSet<String> = ["alpha", "beta"].into_iter().map(String::from).collect();
        for _ in 0..5 {
            state.update_co_occurrence(&tokens);
        }
        let v = state.contextual_token_vector("alpha");
        let base = hrr::seeded_vector("token_v2_alpha", 64);
        assert_ne!(v, base);
    }

    #[test]
    fn encode_trace_content_is_unit_norm() {
        let mut state = EncoderState::new(64);
        let v = state.encode_trace_content(&hint("supervision tree missing")).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("kudzu-encoder-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("encoder_state.json");

        let mut state = EncoderState::new(64);
        let tokens: BTreeSet<String> = ["a", "b"].into_iter().map(String::from).collect();
        state.update_co_occurrence(&tokens);
        state.save(&path).unwrap();

        let loaded = EncoderState::load_or_default(&path, 64);
        assert_eq!(loaded.traces_processed(), 1);
        assert_eq!(loaded.co_occurrence["a"]["b"], 1.0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_loads_empty_state_not_an_error() {
        let path = std::env::temp_dir().join("kudzu-does-not-exist-encoder.json");
        let state = EncoderState::load_or_default(&path, 128);
        assert_eq!(state.traces_processed(), 0);
        assert_eq!(state.dimension(), 128);
    }

    #[test]
    fn corrupt_file_loads_empty_state_not_an_error() {
        let dir = std::env::temp_dir().join(format!("kudzu-encoder-corrupt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.json");
        std::fs::write(&path, "not json at all").unwrap();

        let state = EncoderState::load_or_default(&path, 64);
        assert_eq!(state.traces_processed(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
